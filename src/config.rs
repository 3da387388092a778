//! Experiment configuration
//!
//! Settings are grouped into an experiment-level struct (name, seed,
//! directories, environment dimensions) and the training hyperparameters
//! consumed by the loop. Both deserialize from a TOML file; any omitted
//! field falls back to its default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::env::CatchConfig;

/// Training hyperparameters consumed by the training loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Discount factor for future rewards
    pub gamma: f32,

    /// Learning rate shared by both Adam optimizers
    pub learning_rate: f64,

    /// Probability of overriding the sampled action with a uniformly
    /// random one; negative values disable the override entirely
    pub random_action_p: f64,

    /// Hidden layer width of the policy network
    pub policy_hidden_size: usize,

    /// Hidden layer width of the baseline network
    pub value_hidden_size: usize,

    /// Total number of epochs to train
    pub num_episodes: usize,

    /// Environment-step budget per epoch
    pub steps_per_episode: usize,

    /// Maximum steps per trajectory; also the experience buffer capacity
    pub max_steps_per_trajectory: usize,

    /// Dashboard logging cadence in environment steps
    pub log_steps: usize,

    /// Checkpoint cadence in epochs
    pub save_every: usize,

    /// Global gradient-norm clip threshold
    pub clip_norm: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            gamma: 0.97,
            learning_rate: 1e-3,
            random_action_p: -1.0,
            policy_hidden_size: 64,
            value_hidden_size: 64,
            num_episodes: 500,
            steps_per_episode: 2000,
            max_steps_per_trajectory: 1000,
            log_steps: 500,
            save_every: 10,
            clip_norm: 5.0,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1], got {}", self.gamma));
        }
        if self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.random_action_p > 1.0 {
            return Err(format!(
                "random_action_p must not exceed 1.0, got {}",
                self.random_action_p
            ));
        }
        if self.policy_hidden_size == 0 {
            return Err("policy_hidden_size must be at least 1".to_string());
        }
        if self.value_hidden_size == 0 {
            return Err("value_hidden_size must be at least 1".to_string());
        }
        if self.num_episodes == 0 {
            return Err("num_episodes must be at least 1".to_string());
        }
        if self.steps_per_episode == 0 {
            return Err("steps_per_episode must be at least 1".to_string());
        }
        if self.max_steps_per_trajectory == 0 {
            return Err("max_steps_per_trajectory must be at least 1".to_string());
        }
        if self.log_steps == 0 {
            return Err("log_steps must be at least 1".to_string());
        }
        if self.save_every == 0 {
            return Err("save_every must be at least 1".to_string());
        }
        if self.clip_norm <= 0.0 {
            return Err(format!(
                "clip_norm must be positive, got {}",
                self.clip_norm
            ));
        }
        Ok(())
    }
}

/// Top-level experiment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Experiment name; the seed is appended as `-seed{N}` for run naming
    pub exp_name: String,

    /// Seed for action sampling and the environment
    pub seed: u64,

    /// Directory for dashboard event files
    pub log_dir: PathBuf,

    /// Directory for policy/baseline snapshots
    pub checkpoint_dir: PathBuf,

    /// Built-in environment dimensions
    pub env: CatchConfig,

    /// Training hyperparameters
    pub train: TrainConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            exp_name: "catch".to_string(),
            seed: 0,
            log_dir: PathBuf::from("runs"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            env: CatchConfig::default(),
            train: TrainConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Run name: experiment name with the seed suffix appended.
    pub fn run_name(&self) -> String {
        format!("{}-seed{}", self.exp_name, self.seed)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.exp_name.is_empty() {
            return Err("exp_name must not be empty".to_string());
        }
        self.env.validate()?;
        self.train.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.run_name(), "catch-seed0");
    }

    #[test]
    fn test_exploration_sentinel_is_valid() {
        // the default -1.0 disables exploration and must pass validation
        let config = TrainConfig::default();
        assert_eq!(config.random_action_p, -1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = TrainConfig::default();
        config.gamma = 1.5;
        assert!(config.validate().is_err());

        let mut config = TrainConfig::default();
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = TrainConfig::default();
        config.random_action_p = 1.1;
        assert!(config.validate().is_err());

        let mut config = TrainConfig::default();
        config.max_steps_per_trajectory = 0;
        assert!(config.validate().is_err());

        let mut config = TrainConfig::default();
        config.clip_norm = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            exp_name = "pong"
            seed = 3

            [train]
            gamma = 0.99
            num_episodes = 42
        "#;
        let config: ExperimentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.exp_name, "pong");
        assert_eq!(config.seed, 3);
        assert_eq!(config.train.gamma, 0.99);
        assert_eq!(config.train.num_episodes, 42);
        // untouched fields keep their defaults
        assert_eq!(config.train.save_every, 10);
        assert_eq!(config.env, CatchConfig::default());
    }

    #[test]
    fn test_from_file_round_trip() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("experiment.toml");

        let mut config = ExperimentConfig::default();
        config.exp_name = "roundtrip".to_string();
        config.train.log_steps = 250;
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = ExperimentConfig::from_file(&path).unwrap();
        assert_eq!(loaded.exp_name, "roundtrip");
        assert_eq!(loaded.train.log_steps, 250);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ExperimentConfig::from_file(Path::new("does-not-exist.toml"));
        assert!(result.is_err());
    }
}
