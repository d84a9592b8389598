use async_trait::async_trait;

use super::errors::PoolError;
use crate::env::{Space, StepBatch};

/// A batch of N environments driven as one.
///
/// Batch position `i` always belongs to environment `i`.
pub trait VecEnv {
    type Obs: Send;
    type Act: Send;
    type Info: Send;

    fn num_envs(&self) -> usize;
    fn observation_space(&self) -> &Space;
    fn action_space(&self) -> &Space;

    /// Reset every environment and return the observations. Any step still
    /// pending from `step_async` is discarded first.
    fn reset(&mut self) -> Result<Vec<Self::Obs>, PoolError>;

    fn reset_task(&mut self) -> Result<Vec<Self::Obs>, PoolError>;

    /// Start a step on every environment without waiting for results.
    /// Not allowed while a previous step is still pending.
    fn step_async(&mut self, actions: Vec<Self::Act>) -> Result<(), PoolError>;

    /// Collect the results of the pending `step_async`.
    fn step_wait(&mut self) -> Result<StepBatch<Self::Obs, Self::Info>, PoolError>;

    /// Release every environment. Calling it again does nothing.
    fn close(&mut self) -> Result<(), PoolError>;

    fn step(
        &mut self,
        actions: Vec<Self::Act>,
    ) -> Result<StepBatch<Self::Obs, Self::Info>, PoolError> {
        self.step_async(actions)?;
        self.step_wait()
    }
}

/// Await-based collection for callers already running inside an async
/// runtime, where the blocking receives of [`VecEnv`] are not allowed.
///
/// The awaited calls are cancel-safe: a dropped `step_wait_await` leaves the
/// step pending, and a later `step_wait_await`, `reset_await` or
/// `close_await` picks up from where it stopped.
#[async_trait]
pub trait AsyncVecEnv: VecEnv + Send {
    async fn reset_await(&mut self) -> Result<Vec<Self::Obs>, PoolError>;

    async fn reset_task_await(&mut self) -> Result<Vec<Self::Obs>, PoolError>;

    async fn step_wait_await(&mut self) -> Result<StepBatch<Self::Obs, Self::Info>, PoolError>;

    /// Like [`VecEnv::close`], but drains a pending step by awaiting it.
    async fn close_await(&mut self) -> Result<(), PoolError>;

    async fn step_await(
        &mut self,
        actions: Vec<Self::Act>,
    ) -> Result<StepBatch<Self::Obs, Self::Info>, PoolError> {
        self.step_async(actions)?;
        self.step_wait_await().await
    }
}
