pub mod rsvps;

pub use rsvps::{RsvpSummary, RsvpsRepo};
