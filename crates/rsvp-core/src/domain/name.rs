use crate::error::CoreError;
use crate::rules::sanitize::normalize_guest_name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A guest name that has passed normalization: trimmed, tag-stripped and
/// within the accepted length bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestName(String);

impl GuestName {
    pub fn new(raw: &str) -> Result<Self, CoreError> {
        let normalized = normalize_guest_name(raw)?;
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded form used as the dedup key.
    pub fn key(&self) -> String {
        fold_name_key(&self.0)
    }
}

impl fmt::Display for GuestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fold_name_key(name: &str) -> String {
    name.to_lowercase()
}
