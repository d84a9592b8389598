use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Environment error: {0}")]
    EnvError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("unknown environment id: {0}")]
    UnknownId(String),

    #[error("invalid environment config: {0}")]
    InvalidConfig(String),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

impl EnvError {
    /// Wrap a plain message raised by simulation code.
    pub fn other(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        EnvError::EnvError(msg.into())
    }
}
