use crate::domain::Rsvp;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Assumed audience size used as the response-rate denominator.
///
/// The rate is `total / baseline * 100`, not `total / total`. Kept this way
/// until someone confirms which one the dashboard actually wants.
pub const DEFAULT_AUDIENCE_BASELINE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpCounts {
    pub total: u64,
    pub attending: u64,
    pub not_attending: u64,
}

impl RsvpCounts {
    /// Builds counts from a total and the attending subset; the remainder is
    /// not attending.
    pub fn from_totals(total: u64, attending: u64) -> Self {
        let attending = attending.min(total);
        Self {
            total,
            attending,
            not_attending: total - attending,
        }
    }

    pub fn from_records(records: &[Rsvp]) -> Self {
        let attending = records.iter().filter(|rsvp| rsvp.attending).count() as u64;
        Self::from_totals(records.len() as u64, attending)
    }

    pub fn response_rate(&self, audience_baseline: u32) -> String {
        format_response_rate(self.total, audience_baseline)
    }
}

pub fn validate_audience_baseline(value: u32) -> Result<u32, CoreError> {
    if value == 0 {
        return Err(CoreError::InvalidAudienceBaseline(value));
    }
    Ok(value)
}

pub fn format_response_rate(total: u64, audience_baseline: u32) -> String {
    if total == 0 || audience_baseline == 0 {
        return "0%".to_string();
    }
    let rate = (total as f64 / f64::from(audience_baseline)) * 100.0;
    format!("{rate:.1}%")
}
