use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event '{name}' has an empty id")]
    MissingId { name: String },
}
