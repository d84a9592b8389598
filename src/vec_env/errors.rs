use thiserror::Error;

use crate::runtime;

/// Anything a pool operation can fail with.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to construct pool: {0}")]
    Construction(#[from] ConstructionError),

    #[error("caller contract violated: {0}")]
    Contract(#[from] ContractError),

    /// A command or reply for this worker could not cross the channel.
    #[error("worker {index}: {source}")]
    Serialization {
        index: usize,
        #[source]
        source: runtime::Error,
    },

    /// The environment returned an error; that worker has shut down.
    #[error("worker {index} failed: {message}")]
    Env { index: usize, message: String },

    /// The worker's channel is gone (panic, earlier failure, or protocol
    /// violation).
    #[error("worker {index} crashed: channel closed")]
    WorkerCrashed { index: usize },

    #[error("worker {index} sent an unexpected `{reply}` reply to `{command}`")]
    UnexpectedReply {
        index: usize,
        command: &'static str,
        reply: &'static str,
    },
}

impl PoolError {
    /// Attribute a transport error to worker `index`.
    pub(crate) fn from_runtime(index: usize, err: runtime::Error) -> Self {
        match err {
            runtime::Error::Closed | runtime::Error::Protocol(_) => {
                PoolError::WorkerCrashed { index }
            }
            runtime::Error::Env(e) => PoolError::Env {
                index,
                message: e.to_string(),
            },
            source => PoolError::Serialization { index, source },
        }
    }

    /// Index of the worker this error is about, if any.
    pub fn worker_index(&self) -> Option<usize> {
        match self {
            PoolError::Construction(e) => e.worker_index(),
            PoolError::Contract(_) => None,
            PoolError::Serialization { index, .. }
            | PoolError::Env { index, .. }
            | PoolError::WorkerCrashed { index }
            | PoolError::UnexpectedReply { index, .. } => Some(*index),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("pool requires at least one environment")]
    Empty,

    #[error("worker {index}: cannot wrap environment spec: {source}")]
    Serialization {
        index: usize,
        #[source]
        source: runtime::Error,
    },

    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {index} failed to start: {message}")]
    Startup { index: usize, message: String },

    #[error("worker {index} reports different spaces than worker 0")]
    SpaceMismatch { index: usize },
}

impl ConstructionError {
    pub fn worker_index(&self) -> Option<usize> {
        match self {
            ConstructionError::Empty => None,
            ConstructionError::Serialization { index, .. }
            | ConstructionError::Spawn { index, .. }
            | ConstructionError::Startup { index, .. }
            | ConstructionError::SpaceMismatch { index } => Some(*index),
        }
    }
}

/// Calls made out of order. Rejected before anything is sent or received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("step_async called while a step is already pending")]
    AlreadyWaiting,

    #[error("step_wait called without a pending step_async")]
    NotWaiting,

    #[error("pool is closed")]
    Closed,

    #[error("expected {expected} actions, got {got}")]
    ActionCount { expected: usize, got: usize },
}
