use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Worker threads are named `<prefix>-<index>`.
    pub thread_name_prefix: String,
    /// Stack size for worker threads; `None` keeps the platform default.
    pub stack_size: Option<usize>,
    /// Query every worker for its spaces at startup and reject the pool if
    /// any differ from worker 0. Off by default: worker 0's spaces are
    /// adopted as-is.
    pub verify_spaces: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "env-worker".to_string(),
            stack_size: None,
            verify_spaces: false,
        }
    }
}

impl PoolConfig {
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn with_verify_spaces(mut self, verify: bool) -> Self {
        self.verify_spaces = verify;
        self
    }

    pub(crate) fn thread_builder(&self, index: usize) -> std::thread::Builder {
        let builder =
            std::thread::Builder::new().name(format!("{}-{index}", self.thread_name_prefix));
        match self.stack_size {
            Some(bytes) => builder.stack_size(bytes),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PoolConfig = serde_json::from_str(r#"{"verify_spaces": true}"#).unwrap();
        assert_eq!(cfg, PoolConfig::default().with_verify_spaces(true));
        assert_eq!(cfg.thread_name_prefix, "env-worker");
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = PoolConfig::default()
            .with_thread_name_prefix("atari")
            .with_stack_size(1 << 20);
        assert_eq!(cfg.thread_name_prefix, "atari");
        assert_eq!(cfg.stack_size, Some(1 << 20));
        assert!(!cfg.verify_spaces);
    }
}
