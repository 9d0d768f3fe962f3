pub mod sanitize;
pub mod stats;

pub use sanitize::{
    normalize_comment, normalize_guest_name, sanitize_text, strip_tags, MAX_COMMENT_CHARS,
    MAX_NAME_CHARS, MIN_NAME_CHARS,
};
pub use stats::{
    format_response_rate, validate_audience_baseline, RsvpCounts, DEFAULT_AUDIENCE_BASELINE,
};
