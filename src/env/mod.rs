mod dummy;
mod errors;
mod registry;
mod traits;
mod types;

pub use dummy::DummyEnv;
pub use errors::EnvError;
pub use registry::{EnvRegistry, EnvSpec};
pub use traits::{Env, Payload, ResetOutput, StepOutput};
pub use types::{Space, StepBatch, Transition};

/// Reset `env` and keep only the observation.
pub fn reset_obs<E: Env>(env: &mut E) -> Result<E::Obs, EnvError> {
    env.reset().map(ResetOutput::into_obs)
}

/// Step `env` and fold the result into a [`Transition`].
///
/// `terminated || truncated` becomes `done`. When `done` is set the
/// environment is reset on the spot and the fresh observation replaces the
/// terminal one, so every observation handed back can be stepped again.
pub fn step_with_auto_reset<E: Env>(
    env: &mut E,
    act: E::Act,
) -> Result<Transition<E::Obs, E::Info>, EnvError> {
    let (obs, rew, done, info) = match env.step(act)? {
        StepOutput::Legacy {
            obs,
            rew,
            done,
            info,
        } => (obs, rew, done, info),
        StepOutput::Split {
            obs,
            rew,
            terminated,
            truncated,
            info,
        } => (obs, rew, terminated || truncated, info),
    };
    let obs = if done { reset_obs(env)? } else { obs };
    Ok(Transition {
        obs,
        rew,
        done,
        info,
    })
}
