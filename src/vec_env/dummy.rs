use super::errors::{ConstructionError, ContractError, PoolError};
use super::traits::VecEnv;
use crate::env::{self, Env, Space, StepBatch};

/// Steps N environments one after another on the calling thread.
///
/// Same contract as [`SubprocVecEnv`](super::SubprocVecEnv), without any
/// threads: useful for debugging and as a reference for pooled runs.
pub struct DummyVecEnv<E: Env> {
    envs: Vec<E>,
    observation_space: Space,
    action_space: Space,
    pending: Option<Vec<E::Act>>,
    closed: bool,
}

impl<E: Env> DummyVecEnv<E> {
    pub fn new<F>(make_env: F, num_envs: usize) -> Result<Self, PoolError>
    where
        F: Fn() -> E,
    {
        let envs = (0..num_envs).map(|_| make_env()).collect();
        Self::from_envs(envs)
    }

    /// # Errors
    ///
    /// [`ConstructionError::Empty`] if `envs` is empty.
    pub fn from_envs(envs: Vec<E>) -> Result<Self, PoolError> {
        let first = envs.first().ok_or(ConstructionError::Empty)?;
        Ok(Self {
            observation_space: first.observation_space(),
            action_space: first.action_space(),
            envs,
            pending: None,
            closed: false,
        })
    }

    fn check_open(&self) -> Result<(), PoolError> {
        if self.closed {
            return Err(ContractError::Closed.into());
        }
        Ok(())
    }

    fn env_err(index: usize) -> impl FnOnce(env::EnvError) -> PoolError {
        move |e| PoolError::Env {
            index,
            message: e.to_string(),
        }
    }
}

impl<E: Env> VecEnv for DummyVecEnv<E> {
    type Obs = E::Obs;
    type Act = E::Act;
    type Info = E::Info;

    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn reset(&mut self) -> Result<Vec<E::Obs>, PoolError> {
        self.check_open()?;
        self.pending = None;
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| env::reset_obs(env).map_err(Self::env_err(i)))
            .collect()
    }

    fn reset_task(&mut self) -> Result<Vec<E::Obs>, PoolError> {
        self.check_open()?;
        self.pending = None;
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| env.reset_task().map_err(Self::env_err(i)))
            .collect()
    }

    fn step_async(&mut self, actions: Vec<E::Act>) -> Result<(), PoolError> {
        self.check_open()?;
        if self.pending.is_some() {
            return Err(ContractError::AlreadyWaiting.into());
        }
        if actions.len() != self.envs.len() {
            return Err(ContractError::ActionCount {
                expected: self.envs.len(),
                got: actions.len(),
            }
            .into());
        }
        self.pending = Some(actions);
        Ok(())
    }

    fn step_wait(&mut self) -> Result<StepBatch<E::Obs, E::Info>, PoolError> {
        self.check_open()?;
        let actions = self.pending.take().ok_or(ContractError::NotWaiting)?;
        self.envs
            .iter_mut()
            .zip(actions)
            .enumerate()
            .map(|(i, (env, action))| {
                env::step_with_auto_reset(env, action).map_err(Self::env_err(i))
            })
            .collect()
    }

    fn close(&mut self) -> Result<(), PoolError> {
        if self.closed {
            return Ok(());
        }
        self.pending = None;
        for (i, env) in self.envs.iter_mut().enumerate() {
            env.close().map_err(Self::env_err(i))?;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::DummyEnv;

    #[test]
    fn steps_every_env_with_its_own_action() {
        let mut venv = DummyVecEnv::new(|| DummyEnv::new(3), 2).unwrap();
        assert_eq!(venv.num_envs(), 2);
        assert_eq!(venv.reset().unwrap(), vec![0.0, 0.0]);

        let batch = venv.step(vec![0.1, 0.2]).unwrap();
        assert_eq!(batch.obs, vec![1.0, 1.0]);
        assert_eq!(batch.rews, vec![0.1, 0.2]);
        assert_eq!(batch.dones, vec![false, false]);
    }

    #[test]
    fn auto_resets_on_done() {
        let mut venv = DummyVecEnv::from_envs(vec![DummyEnv::new(1), DummyEnv::new(2)]).unwrap();
        venv.reset().unwrap();
        let batch = venv.step(vec![1.0, 1.0]).unwrap();
        assert_eq!(batch.dones, vec![true, false]);
        assert_eq!(batch.obs, vec![0.0, 1.0]);
        // Env 0 started its second episode inside the step.
        assert_eq!(batch.infos, vec![1, 1]);
        let batch = venv.step(vec![1.0, 1.0]).unwrap();
        assert_eq!(batch.infos, vec![2, 1]);
    }

    #[test]
    fn contract_is_enforced() {
        let mut venv = DummyVecEnv::new(DummyEnv::default, 2).unwrap();
        assert!(matches!(
            venv.step_wait(),
            Err(PoolError::Contract(ContractError::NotWaiting))
        ));
        assert!(matches!(
            venv.step_async(vec![0.0]),
            Err(PoolError::Contract(ContractError::ActionCount {
                expected: 2,
                got: 1
            }))
        ));
        venv.step_async(vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            venv.step_async(vec![0.0, 0.0]),
            Err(PoolError::Contract(ContractError::AlreadyWaiting))
        ));
        venv.close().unwrap();
        venv.close().unwrap();
        assert!(matches!(
            venv.reset(),
            Err(PoolError::Contract(ContractError::Closed))
        ));
    }

    #[test]
    fn reset_task_is_reported_per_env() {
        let mut venv = DummyVecEnv::new(DummyEnv::default, 3).unwrap();
        match venv.reset_task() {
            Err(PoolError::Env { index, message }) => {
                assert_eq!(index, 0);
                assert!(message.contains("reset_task"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(
            DummyVecEnv::<DummyEnv>::from_envs(Vec::new()),
            Err(PoolError::Construction(ConstructionError::Empty))
        ));
        assert!(DummyVecEnv::new(DummyEnv::default, 0).is_err());
    }
}
