//! Environment interface for trajectory collection
//!
//! The training core treats an environment as an opaque provider of
//! feature-vector observations and scalar rewards behind a small
//! reset/step surface.

pub mod catch;

pub use catch::{CatchConfig, CatchEnv};

/// Outcome of a single environment step.
#[derive(Debug, Clone)]
pub struct Step {
    /// Feature-vector observation after the step
    pub observation: Vec<f32>,
    /// Scalar reward for the transition
    pub reward: f32,
    /// Episode ended naturally
    pub terminated: bool,
    /// Episode was cut off (step limit)
    pub truncated: bool,
}

/// A discrete-action environment with feature-vector observations.
///
/// `reset` reseeds the environment RNG when a seed is given and returns the
/// initial observation; `step` advances one transition. The observation
/// length must stay constant across an environment's lifetime.
pub trait Environment {
    /// Number of discrete actions
    fn n_actions(&self) -> usize;

    /// Start a new episode and return the initial observation
    fn reset(&mut self, seed: Option<u64>) -> Vec<f32>;

    /// Advance the episode by one action
    fn step(&mut self, action: usize) -> Step;
}
