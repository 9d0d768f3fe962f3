use std::path::PathBuf;
use std::time::Duration;

use rsvp_config::AppConfig;

use crate::repository::RsvpRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub rsvps: RsvpRepository,
}

impl AppState {
    /// `db_path` must already be migrated.
    pub fn new(config: AppConfig, db_path: PathBuf) -> Self {
        let rsvps = RsvpRepository::new(db_path, Duration::from_millis(config.storage_timeout_ms));
        Self { config, rsvps }
    }

    #[cfg(test)]
    pub fn with_repository(config: AppConfig, rsvps: RsvpRepository) -> Self {
        Self { config, rsvps }
    }
}
