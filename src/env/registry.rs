use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::env::errors::EnvError;
use crate::env::traits::Env;

/// Describes how to build one environment: a registered id plus its
/// parameters. This is what travels to a worker instead of a closure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvSpec {
    pub id: String,
    #[serde(default)]
    pub kwargs: serde_json::Value,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EnvSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kwargs: serde_json::Value::Null,
            seed: None,
        }
    }

    pub fn with_kwargs(mut self, kwargs: serde_json::Value) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Copy of this spec for worker `index`; a base seed becomes `seed + index`
    /// so replicas do not share a random stream.
    pub fn for_worker(&self, index: usize) -> Self {
        let mut spec = self.clone();
        spec.seed = self.seed.map(|s| s.wrapping_add(index as u64));
        spec
    }

    /// Read one keyword argument. `Ok(None)` if absent.
    pub fn kwarg<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, EnvError> {
        match self.kwargs.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| EnvError::InvalidConfig(format!("{}.{key}: {e}", self.id))),
        }
    }
}

type Factory<E> = Arc<dyn Fn(&EnvSpec) -> Result<E, EnvError> + Send + Sync>;

/// Maps environment ids to constructors. Shared read-only with every worker.
pub struct EnvRegistry<E> {
    factories: HashMap<String, Factory<E>>,
}

impl<E: Env> EnvRegistry<E> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a constructor under `id`, replacing any previous one.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&EnvSpec) -> Result<E, EnvError> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&EnvSpec) -> Result<E, EnvError> + Send + Sync + 'static,
    {
        self.register(id, factory);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn make(&self, spec: &EnvSpec) -> Result<E, EnvError> {
        let factory = self
            .factories
            .get(&spec.id)
            .ok_or_else(|| EnvError::UnknownId(spec.id.clone()))?;
        factory(spec)
    }
}

impl<E: Env> Default for EnvRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EnvRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("EnvRegistry").field("ids", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::DummyEnv;
    use serde_json::json;

    #[test]
    fn for_worker_offsets_seed() {
        let spec = EnvSpec::new("dummy").with_seed(40);
        assert_eq!(spec.for_worker(2).seed, Some(42));
        assert_eq!(EnvSpec::new("dummy").for_worker(3).seed, None);
    }

    #[test]
    fn kwarg_reads_typed_values() {
        let spec = EnvSpec::new("dummy").with_kwargs(json!({"episode_len": 5, "name": null}));
        assert_eq!(spec.kwarg::<u32>("episode_len").unwrap(), Some(5));
        assert_eq!(spec.kwarg::<u32>("name").unwrap(), None);
        assert_eq!(spec.kwarg::<u32>("missing").unwrap(), None);
        assert!(matches!(
            spec.kwarg::<String>("episode_len"),
            Err(EnvError::InvalidConfig(_))
        ));
    }

    #[test]
    fn make_unknown_id_fails() {
        let registry = EnvRegistry::<DummyEnv>::new().with("dummy", DummyEnv::from_spec);
        assert!(registry.contains("dummy"));
        assert!(matches!(
            registry.make(&EnvSpec::new("pong")),
            Err(EnvError::UnknownId(id)) if id == "pong"
        ));
        assert!(registry.make(&EnvSpec::new("dummy")).is_ok());
    }
}
