//! Error types.
//!
//! Graph-consistency problems (dangling wires, duplicates, invalid gesture
//! targets) are repaired silently and never surface here. Only a malformed
//! top-level document is rejected.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to parse graph document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("graph document must be a JSON object")]
    NotAnObject,
    #[error("graph document has no `{0}` array")]
    MissingSection(&'static str),
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
