#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parallel_env::{
    DummyVecEnv, Env, EnvError, EnvRegistry, EnvSpec, PoolConfig, ResetOutput, Space,
    StepOutput, SubprocVecEnv,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCRIPTED: &str = "scripted";
pub const BASE_SEED: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    pub seed: u64,
    pub episode: u32,
    pub t: u32,
    pub last_action: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub seed: u64,
    pub episode: u32,
    pub t: u32,
}

/// Deterministic simulation driven entirely by its spec.
///
/// kwargs:
/// - `done_every`: episode length (0 = never done)
/// - `api`: `"legacy"` or `"split"` step shape
/// - `reset_info`: reset returns `(obs, info)` instead of a bare obs
/// - `obs_n`: size of the discrete observation space
/// - `fail_on_step` / `panic_on_step`: total step count at which to blow up
/// - `step_delay_ms`: sleep inside each step
/// - `tasks`: support `reset_task`
pub struct ScriptedEnv {
    seed: u64,
    episode: u32,
    t: u32,
    total_steps: u32,
    done_every: u32,
    split: bool,
    reset_info: bool,
    obs_n: u64,
    fail_on_step: Option<u32>,
    panic_on_step: Option<u32>,
    step_delay: Duration,
    tasks: bool,
}

impl ScriptedEnv {
    pub fn from_spec(spec: &EnvSpec) -> Result<Self, EnvError> {
        let api = spec.kwarg::<String>("api")?.unwrap_or_else(|| "split".into());
        let split = match api.as_str() {
            "split" => true,
            "legacy" => false,
            other => return Err(EnvError::InvalidConfig(format!("unknown api {other}"))),
        };
        Ok(Self {
            seed: spec.seed.unwrap_or(0),
            episode: 0,
            t: 0,
            total_steps: 0,
            done_every: spec.kwarg("done_every")?.unwrap_or(0),
            split,
            reset_info: spec.kwarg("reset_info")?.unwrap_or(false),
            obs_n: spec.kwarg("obs_n")?.unwrap_or(10),
            fail_on_step: spec.kwarg("fail_on_step")?,
            panic_on_step: spec.kwarg("panic_on_step")?,
            step_delay: Duration::from_millis(spec.kwarg("step_delay_ms")?.unwrap_or(0)),
            tasks: spec.kwarg("tasks")?.unwrap_or(false),
        })
    }

    fn obs(&self, last_action: i64) -> Obs {
        Obs {
            seed: self.seed,
            episode: self.episode,
            t: self.t,
            last_action,
        }
    }

    fn info(&self) -> Info {
        Info {
            seed: self.seed,
            episode: self.episode,
            t: self.t,
        }
    }
}

impl Env for ScriptedEnv {
    type Obs = Obs;
    type Act = i64;
    type Info = Info;

    fn observation_space(&self) -> Space {
        Space::Discrete { n: self.obs_n }
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 4 }
    }

    fn reset(&mut self) -> Result<ResetOutput<Obs, Info>, EnvError> {
        self.episode += 1;
        self.t = 0;
        let obs = self.obs(0);
        Ok(if self.reset_info {
            ResetOutput::WithInfo(obs, self.info())
        } else {
            ResetOutput::Obs(obs)
        })
    }

    fn step(&mut self, act: i64) -> Result<StepOutput<Obs, Info>, EnvError> {
        self.total_steps += 1;
        if Some(self.total_steps) == self.panic_on_step {
            panic!("scripted panic at step {}", self.total_steps);
        }
        if Some(self.total_steps) == self.fail_on_step {
            return Err(EnvError::other(format!("scripted failure at step {}", self.total_steps)));
        }
        if !self.step_delay.is_zero() {
            std::thread::sleep(self.step_delay);
        }

        self.t += 1;
        let obs = self.obs(act);
        let rew = act as f32 * 0.5 + self.t as f32;
        let ended = self.done_every > 0 && self.t >= self.done_every;
        let info = self.info();
        Ok(if self.split {
            StepOutput::Split {
                obs,
                rew,
                terminated: ended,
                truncated: false,
                info,
            }
        } else {
            StepOutput::Legacy {
                obs,
                rew,
                done: ended,
                info,
            }
        })
    }

    fn reset_task(&mut self) -> Result<Obs, EnvError> {
        if !self.tasks {
            return Err(EnvError::Unsupported("reset_task"));
        }
        self.seed += 1000;
        self.t = 0;
        Ok(self.obs(0))
    }
}

pub fn registry() -> Arc<EnvRegistry<ScriptedEnv>> {
    Arc::new(EnvRegistry::new().with(SCRIPTED, ScriptedEnv::from_spec))
}

pub fn spec(kwargs: Value) -> EnvSpec {
    EnvSpec::new(SCRIPTED)
        .with_kwargs(kwargs)
        .with_seed(BASE_SEED)
}

/// One spec per worker, seeds `BASE_SEED + i`.
pub fn specs(n: usize, kwargs: Value) -> Vec<EnvSpec> {
    let base = spec(kwargs);
    (0..n).map(|i| base.for_worker(i)).collect()
}

pub fn pool(n: usize, kwargs: Value) -> SubprocVecEnv<ScriptedEnv> {
    SubprocVecEnv::new(registry(), specs(n, kwargs), PoolConfig::default())
        .expect("pool should start")
}

/// The same environments, stepped in-thread.
pub fn reference(n: usize, kwargs: Value) -> DummyVecEnv<ScriptedEnv> {
    let registry = registry();
    let envs = specs(n, kwargs)
        .iter()
        .map(|s| registry.make(s).expect("reference env"))
        .collect();
    DummyVecEnv::from_envs(envs).expect("reference pool")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
