use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Name must be at least 2 characters long")]
    NameTooShort,
    #[error("Name must be less than 100 characters")]
    NameTooLong,
    #[error("Comment must be at most 500 characters")]
    CommentTooLong,
    #[error("invalid audience baseline: {0}")]
    InvalidAudienceBaseline(u32),
}
