pub mod ids;
pub mod name;
pub mod rsvp;

pub use ids::RsvpId;
pub use name::{fold_name_key, GuestName};
pub use rsvp::{Rsvp, RsvpSubmission, SubmitOutcome, SubmitterMetadata};
