use std::sync::Arc;

use parallel_env::env::DummyEnv;
use parallel_env::{EnvRegistry, EnvSpec, PoolConfig, SubprocVecEnv, VecEnv};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(EnvRegistry::new().with("counter", DummyEnv::from_spec));
    let spec = EnvSpec::new("counter")
        .with_kwargs(json!({"episode_len": 3}))
        .with_seed(7);

    let mut venv = SubprocVecEnv::make(registry, &spec, 4, PoolConfig::default())?;
    println!("🚀 Pool {} with {} envs", venv.pool_id(), venv.num_envs());
    println!("   observation space: {:?}", venv.observation_space());

    let obs = venv.reset()?;
    println!("reset -> {obs:?}");

    for t in 0..5 {
        let actions = (0..venv.num_envs())
            .map(|i| ((t + i) % 3) as f32 - 1.0)
            .collect();
        let batch = venv.step(actions)?;
        println!(
            "step {t}: obs={:?} rews={:?} dones={:?} episodes={:?}",
            batch.obs, batch.rews, batch.dones, batch.infos
        );
    }

    venv.close()?;
    println!("✅ Closed");
    Ok(())
}
