use crate::env::errors::EnvError;
use crate::env::types::Space;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Bounds every payload needs to cross a worker channel.
///
/// Frames are `bincode`, so payloads must deserialize without
/// `deserialize_any`: no `serde_json::Value`, untagged or internally tagged
/// enums.
pub trait Payload: Serialize + DeserializeOwned + Send + Clone + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Send + Clone + 'static {}

/// What `reset` hands back. Simulations pick whichever shape they have.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutput<O, I> {
    Obs(O),
    WithInfo(O, I),
}

impl<O, I> ResetOutput<O, I> {
    /// Drop the info, if any.
    pub fn into_obs(self) -> O {
        match self {
            ResetOutput::Obs(obs) | ResetOutput::WithInfo(obs, _) => obs,
        }
    }
}

/// What `step` hands back: either a single `done` flag or the
/// terminated/truncated split.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput<O, I> {
    Legacy {
        obs: O,
        rew: f32,
        done: bool,
        info: I,
    },
    Split {
        obs: O,
        rew: f32,
        terminated: bool,
        truncated: bool,
        info: I,
    },
}

/// One stateful simulation. A pool owns exactly one per worker.
pub trait Env: Send + 'static {
    type Obs: Payload;
    type Act: Payload;
    type Info: Payload;

    fn observation_space(&self) -> Space;
    fn action_space(&self) -> Space;

    fn reset(&mut self) -> Result<ResetOutput<Self::Obs, Self::Info>, EnvError>;
    fn step(&mut self, act: Self::Act) -> Result<StepOutput<Self::Obs, Self::Info>, EnvError>;

    /// Switch to a new task and return the first observation of it.
    fn reset_task(&mut self) -> Result<Self::Obs, EnvError> {
        Err(EnvError::Unsupported("reset_task"))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        Ok(())
    }
}
