use crate::domain::{Rsvp, RsvpId, SubmitOutcome};
use crate::rules::RsvpCounts;
use crate::time::format_timestamp_rfc3339;
use serde::{Deserialize, Serialize};

pub const CREATED_MESSAGE: &str = "RSVP submitted successfully";
pub const UPDATED_MESSAGE: &str = "RSVP updated successfully";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpDto {
    pub id: RsvpId,
    pub name: String,
    pub attending: bool,
    pub comment: Option<String>,
    pub timestamp: String,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl From<Rsvp> for RsvpDto {
    fn from(rsvp: Rsvp) -> Self {
        Self {
            id: rsvp.id,
            name: rsvp.name,
            attending: rsvp.attending,
            comment: rsvp.comment,
            timestamp: format_timestamp_rfc3339(&rsvp.timestamp),
            ip_address: rsvp.metadata.ip_address,
            user_agent: rsvp.metadata.user_agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpSummaryDto {
    pub rsvps: Vec<RsvpDto>,
    pub total: u64,
    pub attending_count: u64,
    pub not_attending_count: u64,
}

impl RsvpSummaryDto {
    pub fn new(records: Vec<Rsvp>, counts: RsvpCounts) -> Self {
        Self {
            rsvps: records.into_iter().map(RsvpDto::from).collect(),
            total: counts.total,
            attending_count: counts.attending,
            not_attending_count: counts.not_attending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpStatsDto {
    pub total: u64,
    pub attending: u64,
    pub not_attending: u64,
    pub response_rate: String,
}

impl RsvpStatsDto {
    pub fn new(counts: RsvpCounts, audience_baseline: u32) -> Self {
        Self {
            total: counts.total,
            attending: counts.attending,
            not_attending: counts.not_attending,
            response_rate: counts.response_rate(audience_baseline),
        }
    }
}

/// Confirmation returned for a submission. `id` and `timestamp` are only
/// present when a new record was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpConfirmationDto {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RsvpId>,
    pub name: String,
    pub attending: bool,
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl From<SubmitOutcome> for RsvpConfirmationDto {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Created(rsvp) => Self {
                message: CREATED_MESSAGE.to_string(),
                id: Some(rsvp.id),
                timestamp: Some(format_timestamp_rfc3339(&rsvp.timestamp)),
                name: rsvp.name,
                attending: rsvp.attending,
                comment: rsvp.comment,
            },
            SubmitOutcome::Updated {
                record,
                submitted_name,
            } => Self {
                message: UPDATED_MESSAGE.to_string(),
                id: None,
                timestamp: None,
                name: submitted_name,
                attending: record.attending,
                comment: record.comment,
            },
        }
    }
}
