//! Drive N stateful environments in parallel behind one batched interface.
//!
//! Each environment lives on its own worker thread and talks to the
//! coordinator ([`SubprocVecEnv`]) over an ordered duplex channel. Callers
//! send one action per environment and get back one
//! observation/reward/done/info row per environment, always in worker order.

pub mod env;
pub mod runtime;
pub mod vec_env;

pub use env::{Env, EnvError, EnvRegistry, EnvSpec, ResetOutput, Space, StepBatch, StepOutput};
pub use vec_env::{
    AsyncVecEnv, ConstructionError, ContractError, DummyVecEnv, PoolConfig, PoolError,
    SubprocVecEnv, VecEnv,
};
