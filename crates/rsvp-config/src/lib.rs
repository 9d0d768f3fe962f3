use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use rsvp_core::rules::{validate_audience_baseline, DEFAULT_AUDIENCE_BASELINE};
use serde::Deserialize;
use thiserror::Error;

const APP_DIR: &str = "rsvp";
const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_BIND: &str = "0.0.0.0:8001";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_BIND: &str = "RSVP_BIND";
pub const ENV_API_PREFIX: &str = "RSVP_API_PREFIX";
pub const ENV_DB_PATH: &str = "RSVP_DB_PATH";
pub const ENV_AUDIENCE_BASELINE: &str = "RSVP_AUDIENCE_BASELINE";
pub const ENV_STORAGE_TIMEOUT_MS: &str = "RSVP_STORAGE_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "RSVP_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "RSVP_LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// Normalized: empty, or starts with `/` and has no trailing `/`.
    pub api_prefix: String,
    pub db_path: Option<PathBuf>,
    pub audience_baseline: u32,
    pub storage_timeout_ms: u64,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8001))),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            db_path: None,
            audience_baseline: DEFAULT_AUDIENCE_BASELINE,
            storage_timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
            logging: LoggingConfig {
                level: DEFAULT_LOG_LEVEL.to_string(),
                format: LogFormat::Compact,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("config file permissions too permissive: {0}")]
    InsecurePermissions(PathBuf),
    #[error("invalid bind address: {0}")]
    InvalidBind(String),
    #[error("invalid api_prefix value: {0}")]
    InvalidApiPrefix(String),
    #[error("invalid audience_baseline value: {0}")]
    InvalidAudienceBaseline(u32),
    #[error("invalid storage_timeout_ms value: {0}")]
    InvalidStorageTimeout(u64),
    #[error("invalid db_path value: {0}")]
    InvalidDbPath(PathBuf),
    #[error("invalid value for {key}: {value}")]
    InvalidEnvValue { key: &'static str, value: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    bind: Option<String>,
    api_prefix: Option<String>,
    db_path: Option<PathBuf>,
    audience_baseline: Option<u32>,
    storage_timeout_ms: Option<u64>,
    logging: Option<LoggingFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingFile {
    level: Option<String>,
    format: Option<LogFormat>,
}

/// Loads the config file (if any), then applies `RSVP_*` environment
/// overrides. An explicit `config_path` must exist.
pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let config = load_file(config_path)?;
    apply_env_overrides(config, |key| env::var(key).ok())
}

fn load_file(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    ensure_permissions(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(bind) = parsed.bind {
        config.bind = parse_bind(&bind)?;
    }
    if let Some(prefix) = parsed.api_prefix {
        config.api_prefix = normalize_api_prefix(&prefix)?;
    }
    if let Some(path) = parsed.db_path {
        config.db_path = Some(validate_db_path(path)?);
    }
    if let Some(baseline) = parsed.audience_baseline {
        config.audience_baseline = validate_audience_baseline(baseline)
            .map_err(|_| ConfigError::InvalidAudienceBaseline(baseline))?;
    }
    if let Some(timeout) = parsed.storage_timeout_ms {
        config.storage_timeout_ms = validate_storage_timeout(timeout)?;
    }
    if let Some(logging) = parsed.logging {
        if let Some(level) = logging.level {
            config.logging.level = level;
        }
        if let Some(format) = logging.format {
            config.logging.format = format;
        }
    }

    Ok(config)
}

/// Applies `RSVP_*` overrides read through `lookup`. Blank values are ignored.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(bind) = get(ENV_BIND) {
        config.bind = parse_bind(&bind)?;
    }
    if let Some(prefix) = get(ENV_API_PREFIX) {
        config.api_prefix = normalize_api_prefix(&prefix)?;
    }
    if let Some(path) = get(ENV_DB_PATH) {
        config.db_path = Some(validate_db_path(PathBuf::from(path))?);
    }
    if let Some(raw) = get(ENV_AUDIENCE_BASELINE) {
        let baseline: u32 = parse_env(ENV_AUDIENCE_BASELINE, &raw)?;
        config.audience_baseline = validate_audience_baseline(baseline)
            .map_err(|_| ConfigError::InvalidAudienceBaseline(baseline))?;
    }
    if let Some(raw) = get(ENV_STORAGE_TIMEOUT_MS) {
        let timeout: u64 = parse_env(ENV_STORAGE_TIMEOUT_MS, &raw)?;
        config.storage_timeout_ms = validate_storage_timeout(timeout)?;
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = level.trim().to_string();
    }
    if let Some(raw) = get(ENV_LOG_FORMAT) {
        config.logging.format = raw.parse().map_err(|_| ConfigError::InvalidEnvValue {
            key: ENV_LOG_FORMAT,
            value: raw.clone(),
        })?;
    }

    Ok(config)
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
        key,
        value: raw.to_string(),
    })
}

pub fn parse_bind(raw: &str) -> Result<SocketAddr> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidBind(raw.to_string()))
}

/// `""` and `"/"` mean no prefix; otherwise a leading `/` is required and a
/// trailing one is dropped.
pub fn normalize_api_prefix(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/')
        || trimmed.contains("//")
        || trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || ch == ':' || ch == '*' || ch == '{' || ch == '}')
    {
        return Err(ConfigError::InvalidApiPrefix(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_db_path(path: PathBuf) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidDbPath(path));
    }
    Ok(path)
}

fn validate_storage_timeout(timeout: u64) -> Result<u64> {
    if timeout == 0 {
        return Err(ConfigError::InvalidStorageTimeout(timeout));
    }
    Ok(timeout)
}

#[cfg(unix)]
fn ensure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(ConfigError::InsecurePermissions(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        apply_env_overrides, load_at_path, merge_config, normalize_api_prefix, AppConfig,
        ConfigFile, LogFormat, LoggingFile, ENV_AUDIENCE_BASELINE, ENV_DB_PATH, ENV_LOG_FORMAT,
        ENV_STORAGE_TIMEOUT_MS,
    };
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn restrict_permissions(path: &Path) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path).expect("metadata").permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).expect("chmod");
        }
    }

    fn empty_file() -> ConfigFile {
        ConfigFile {
            bind: None,
            api_prefix: None,
            db_path: None,
            audience_baseline: None,
            storage_timeout_ms: None,
            logging: None,
        }
    }

    #[test]
    fn defaults_match_reference_behavior() {
        let config = AppConfig::default();
        assert_eq!(config.audience_baseline, 100);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.bind.port(), 8001);
    }

    #[test]
    fn merge_config_applies_values() {
        let parsed = ConfigFile {
            bind: Some("127.0.0.1:9000".to_string()),
            api_prefix: Some("/v1/".to_string()),
            db_path: Some(PathBuf::from("/tmp/rsvp.sqlite3")),
            audience_baseline: Some(150),
            storage_timeout_ms: Some(250),
            logging: Some(LoggingFile {
                level: Some("debug".to_string()),
                format: Some(LogFormat::Json),
            }),
        };
        let merged = merge_config(parsed).expect("merge");
        assert_eq!(merged.bind.to_string(), "127.0.0.1:9000");
        assert_eq!(merged.api_prefix, "/v1");
        assert_eq!(merged.db_path, Some(PathBuf::from("/tmp/rsvp.sqlite3")));
        assert_eq!(merged.audience_baseline, 150);
        assert_eq!(merged.storage_timeout_ms, 250);
        assert_eq!(merged.logging.level, "debug");
        assert_eq!(merged.logging.format, LogFormat::Json);
    }

    #[test]
    fn merge_config_rejects_zero_baseline() {
        let parsed = ConfigFile {
            audience_baseline: Some(0),
            ..empty_file()
        };
        let err = merge_config(parsed).unwrap_err();
        assert!(err.to_string().contains("audience_baseline"));
    }

    #[test]
    fn api_prefix_normalization() {
        assert_eq!(normalize_api_prefix("/").unwrap(), "");
        assert_eq!(normalize_api_prefix("").unwrap(), "");
        assert_eq!(normalize_api_prefix("/api/").unwrap(), "/api");
        assert!(normalize_api_prefix("api").is_err());
        assert!(normalize_api_prefix("/:id").is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_AUDIENCE_BASELINE, "250"),
            (ENV_STORAGE_TIMEOUT_MS, "1500"),
            (ENV_DB_PATH, "/var/lib/rsvp/rsvp.sqlite3"),
            (ENV_LOG_FORMAT, "JSON"),
        ]);
        let config = apply_env_overrides(AppConfig::default(), |key| {
            vars.get(key).map(|value| value.to_string())
        })
        .expect("overrides");
        assert_eq!(config.audience_baseline, 250);
        assert_eq!(config.storage_timeout_ms, 1500);
        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/rsvp/rsvp.sqlite3"))
        );
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn env_override_rejects_garbage() {
        let err = apply_env_overrides(AppConfig::default(), |key| {
            (key == ENV_STORAGE_TIMEOUT_MS).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("RSVP_STORAGE_TIMEOUT_MS"));
    }

    #[test]
    fn load_at_path_requires_file_when_requested() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("config.toml");
        let err = load_at_path(&missing, true).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_at_path_parses_toml() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "audience_baseline = 80\napi_prefix = \"/rsvp-api\"\n[logging]\nlevel = \"warn\"\nformat = \"compact\"\n",
        )
        .expect("write config");
        restrict_permissions(&path);

        let config = load_at_path(&path, true).expect("load").expect("config");
        assert_eq!(config.audience_baseline, 80);
        assert_eq!(config.api_prefix, "/rsvp-api");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn load_at_path_rejects_unknown_keys() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "mongo_url = \"mongodb://localhost\"\n").expect("write config");
        restrict_permissions(&path);

        let err = load_at_path(&path, true).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }
}
