mod config;
mod dummy;
mod errors;
mod subproc;
mod traits;

pub use config::PoolConfig;
pub use dummy::DummyVecEnv;
pub use errors::{ConstructionError, ContractError, PoolError};
pub use subproc::SubprocVecEnv;
pub use traits::{AsyncVecEnv, VecEnv};
