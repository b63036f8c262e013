use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::errors::{DagrunError, Result};

/// What the runner does with the rest of the graph after a node fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Successors of a failed node are still released and executed. The graph
    /// completes structurally; the verdict stays an error.
    #[default]
    Continue,
    /// Transitive dependents of a failed node are not executed. They still
    /// count as completed for their own successors.
    SkipDependents,
    /// Fail fast: once the verdict is an error no new node is dispatched.
    /// Nodes already running finish normally.
    Stop,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Maximum number of element bodies executing at once
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Failure policy
    #[serde(default)]
    pub on_failure: OnFailure,
    /// Per-node execution deadline. A node exceeding it is reported as an
    /// error; its dependency bookkeeping is unaffected.
    #[serde(default)]
    pub node_timeout: Option<Duration>,
    /// Upper bound on released-but-not-dispatched nodes. `None` sizes the
    /// queue to the graph.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

fn default_max_workers() -> usize {
    num_cpus::get().max(1)
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            on_failure: OnFailure::Continue,
            node_timeout: None,
            queue_capacity: None,
        }
    }
}

impl RunnerConfig {
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::new()
    }

    /// One node at a time, in release order.
    pub fn sequential() -> Self {
        Self {
            max_workers: 1,
            ..Default::default()
        }
    }

    /// Small pool, fail fast, one minute per node.
    pub fn development() -> Self {
        Self {
            max_workers: 4,
            on_failure: OnFailure::Stop,
            node_timeout: Some(Duration::from_secs(60)),
            queue_capacity: None,
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            DagrunError::configuration(format!("invalid runner configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(DagrunError::configuration_field(
                "max_workers must be greater than 0",
                "max_workers",
            ));
        }
        if let Some(timeout) = self.node_timeout {
            if timeout.is_zero() {
                return Err(DagrunError::configuration_field(
                    "node_timeout must be greater than 0",
                    "node_timeout",
                ));
            }
        }
        if self.queue_capacity == Some(0) {
            return Err(DagrunError::configuration_field(
                "queue_capacity must be greater than 0",
                "queue_capacity",
            ));
        }
        Ok(())
    }
}

/// Builder for RunnerConfig
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RunnerConfig::default(),
        }
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = max_workers;
        self
    }

    pub fn on_failure(mut self, policy: OnFailure) -> Self {
        self.config.on_failure = policy;
        self
    }

    pub fn node_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.node_timeout = timeout;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<RunnerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RunnerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.max_workers >= 1);
        assert_eq!(config.on_failure, OnFailure::Continue);
    }

    #[test]
    fn test_presets() {
        assert_eq!(RunnerConfig::sequential().max_workers, 1);
        let dev = RunnerConfig::development();
        assert!(dev.validate().is_ok());
        assert_eq!(dev.on_failure, OnFailure::Stop);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = RunnerConfig::default();
        config.max_workers = 0;
        assert!(config.validate().is_err());

        config.max_workers = 2;
        config.node_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());

        config.node_timeout = None;
        config.queue_capacity = Some(0);
        assert!(matches!(
            config.validate(),
            Err(DagrunError::Configuration { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let config = RunnerConfig::builder()
            .max_workers(8)
            .on_failure(OnFailure::SkipDependents)
            .node_timeout(Some(Duration::from_millis(250)))
            .queue_capacity(64)
            .build()
            .unwrap();

        assert_eq!(config.max_workers, 8);
        assert_eq!(config.on_failure, OnFailure::SkipDependents);
        assert_eq!(config.node_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.queue_capacity, Some(64));

        assert!(RunnerConfig::builder().max_workers(0).build().is_err());
    }

    #[test]
    fn test_deserialize() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "max_workers": 3, "on_failure": "stop" }"#).unwrap();
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.on_failure, OnFailure::Stop);
        assert_eq!(config.node_timeout, None);

        let config: RunnerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = RunnerConfig::from_json(
            r#"{ "on_failure": "skip_dependents", "node_timeout": { "secs": 2, "nanos": 0 } }"#,
        )
        .unwrap();
        assert_eq!(config.on_failure, OnFailure::SkipDependents);
        assert_eq!(config.node_timeout, Some(Duration::from_secs(2)));

        assert!(matches!(
            RunnerConfig::from_json(r#"{ "max_workers": 0 }"#),
            Err(DagrunError::Configuration { .. })
        ));
        assert!(RunnerConfig::from_json(r#"{ "on_failure": "retry" }"#).is_err());
    }
}
