use crate::domain::ids::RsvpId;
use crate::domain::name::GuestName;
use crate::error::CoreError;
use crate::rules::sanitize::normalize_comment;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rsvp {
    pub id: RsvpId,
    /// First-seen spelling; resubmissions never change it.
    pub name: String,
    pub attending: bool,
    pub comment: Option<String>,
    /// Time of the last write, creation or update, at millisecond precision.
    pub timestamp: DateTime<Utc>,
    pub metadata: SubmitterMetadata,
}

/// Request context captured on every write. Only the latest submission is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitterMetadata {
    pub ip_address: Option<String>,
    pub user_agent: String,
}

/// A submission whose free-text fields have been normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpSubmission {
    pub name: GuestName,
    pub attending: bool,
    pub comment: Option<String>,
}

impl RsvpSubmission {
    pub fn new(
        raw_name: &str,
        attending: bool,
        raw_comment: Option<&str>,
    ) -> Result<Self, CoreError> {
        let name = GuestName::new(raw_name)?;
        let comment = match raw_comment {
            Some(raw) => normalize_comment(raw)?,
            None => None,
        };
        Ok(Self {
            name,
            attending,
            comment,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Rsvp),
    /// `submitted_name` is the normalized name from this submission, which
    /// may differ in case from the stored `record.name`.
    Updated {
        record: Rsvp,
        submitted_name: String,
    },
}

impl SubmitOutcome {
    pub fn record(&self) -> &Rsvp {
        match self {
            SubmitOutcome::Created(record) | SubmitOutcome::Updated { record, .. } => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SubmitOutcome::Created(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitOutcome::Created(_) => "created",
            SubmitOutcome::Updated { .. } => "updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RsvpSubmission;
    use crate::error::CoreError;

    #[test]
    fn submission_normalizes_both_fields() {
        let submission =
            RsvpSubmission::new("  <b>Ann</b> ", true, Some(" <i>see you</i> ")).unwrap();
        assert_eq!(submission.name.as_str(), "Ann");
        assert_eq!(submission.comment.as_deref(), Some("see you"));
        assert!(submission.attending);
    }

    #[test]
    fn submission_rejects_short_name() {
        let err = RsvpSubmission::new("A", false, None).unwrap_err();
        assert_eq!(err, CoreError::NameTooShort);
    }

    #[test]
    fn blank_comment_becomes_absent() {
        let submission = RsvpSubmission::new("Ann", false, Some("   ")).unwrap();
        assert!(submission.comment.is_none());
    }
}
