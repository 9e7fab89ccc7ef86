use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("incomplete action {id}: missing {field}")]
    IncompleteAction { id: String, field: &'static str },
}
