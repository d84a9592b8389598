use super::{EnvError, EnvSpec, ResetOutput, Space, StepOutput};
use crate::env::traits::Env;

// Simple counting environment
pub struct DummyEnv {
    step_count: usize,
    episode_len: usize,
    episodes: u64,
}

impl DummyEnv {
    pub fn new(episode_len: usize) -> Self {
        Self {
            step_count: 0,
            episode_len,
            episodes: 0,
        }
    }

    /// Registry constructor. Reads `episode_len` (default 10) from kwargs.
    pub fn from_spec(spec: &EnvSpec) -> Result<Self, EnvError> {
        let episode_len = spec.kwarg::<usize>("episode_len")?.unwrap_or(10);
        if episode_len == 0 {
            return Err(EnvError::InvalidConfig("episode_len must be > 0".into()));
        }
        Ok(Self::new(episode_len))
    }
}

impl Default for DummyEnv {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Env for DummyEnv {
    type Obs = f32;
    type Act = f32;
    type Info = u64;

    fn observation_space(&self) -> Space {
        Space::uniform_box(0.0, self.episode_len as f32, vec![1])
    }

    fn action_space(&self) -> Space {
        Space::uniform_box(-1.0, 1.0, vec![1])
    }

    fn reset(&mut self) -> Result<ResetOutput<Self::Obs, Self::Info>, EnvError> {
        self.step_count = 0;
        self.episodes += 1;
        Ok(ResetOutput::WithInfo(0.0, self.episodes))
    }

    fn step(&mut self, act: Self::Act) -> Result<StepOutput<Self::Obs, Self::Info>, EnvError> {
        self.step_count += 1;
        Ok(StepOutput::Split {
            obs: self.step_count as f32,
            rew: act,
            terminated: self.step_count >= self.episode_len,
            truncated: false,
            info: self.episodes,
        })
    }
}
