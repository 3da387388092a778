//! REINFORCE training core
//!
//! Provides:
//! - Backend aliases for training and inference
//! - Policy and baseline networks
//! - Action selection with optional uniform exploration override
//! - Experience buffer with discounted returns and advantages
//! - Update engine (policy gradient step + baseline refits)
//! - Checkpoint persistence for resumable runs

pub mod backend;
pub mod buffer;
pub mod network;
pub mod persistence;
pub mod policy;
pub mod update;

pub use backend::{InferenceBackend, TrainingBackend, default_device};
pub use buffer::{ExperienceBuffer, TrainingBatch};
pub use network::{PolicyNet, PolicyNetConfig, ValueNet, ValueNetConfig};
pub use persistence::CheckpointStore;
pub use policy::{greedy_action, normalized_entropy, select_action};
pub use update::UpdateEngine;
