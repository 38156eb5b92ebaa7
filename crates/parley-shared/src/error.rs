use thiserror::Error;

/// Rejections of a request body before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message must contain text or an image")]
    EmptyMessage,

    #[error("Message too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Invalid id: {0}")]
    InvalidId(String),
}
