use thiserror::Error;

use crate::env::EnvError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("channel closed")]
    Closed,

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Env(#[from] EnvError),
}

impl Error {
    /// True for failures to move a value across the channel boundary.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialize(_) | Error::Deserialize(_))
    }
}
