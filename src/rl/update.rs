//! Policy-gradient and baseline updates
//!
//! One trajectory drives exactly one policy gradient step plus a small
//! number of baseline regression refits. Both optimizers clip gradients to
//! a global norm before stepping. Non-finite losses are never intercepted
//! here; they surface in the training run.

use burn::{
    grad_clipping::GradientClippingConfig,
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::{ElementConversion, Tensor, TensorData, backend::AutodiffBackend},
};

use super::buffer::TrainingBatch;
use super::network::{PolicyNet, ValueNet};

pub type PolicyOptimizer<B> = OptimizerAdaptor<Adam, PolicyNet<B>, B>;
pub type ValueOptimizer<B> = OptimizerAdaptor<Adam, ValueNet<B>, B>;

/// Every 50 trajectory steps buy one extra baseline refit iteration
const STEPS_PER_VALUE_ITER: usize = 50;

/// Adam configuration with global-norm gradient clipping
pub fn clipped_adam(clip_norm: f32) -> AdamConfig {
    AdamConfig::new().with_grad_clipping(Some(GradientClippingConfig::Norm(clip_norm)))
}

/// Owns the policy and baseline networks together with their optimizers and
/// applies one trajectory's worth of updates at a time.
pub struct UpdateEngine<B: AutodiffBackend> {
    policy: PolicyNet<B>,
    value: ValueNet<B>,
    policy_optim: PolicyOptimizer<B>,
    value_optim: ValueOptimizer<B>,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> UpdateEngine<B> {
    /// Create an engine with freshly initialized optimizers.
    pub fn new(
        policy: PolicyNet<B>,
        value: ValueNet<B>,
        learning_rate: f64,
        clip_norm: f32,
        device: B::Device,
    ) -> Self {
        Self::from_parts(
            policy,
            value,
            clipped_adam(clip_norm).init(),
            clipped_adam(clip_norm).init(),
            learning_rate,
            device,
        )
    }

    /// Assemble an engine from pre-built parts (checkpoint resume).
    pub fn from_parts(
        policy: PolicyNet<B>,
        value: ValueNet<B>,
        policy_optim: PolicyOptimizer<B>,
        value_optim: ValueOptimizer<B>,
        learning_rate: f64,
        device: B::Device,
    ) -> Self {
        Self {
            policy,
            value,
            policy_optim,
            value_optim,
            learning_rate,
            device,
        }
    }

    pub fn policy(&self) -> &PolicyNet<B> {
        &self.policy
    }

    pub fn value(&self) -> &ValueNet<B> {
        &self.value
    }

    pub fn policy_optim(&self) -> &PolicyOptimizer<B> {
        &self.policy_optim
    }

    pub fn value_optim(&self) -> &ValueOptimizer<B> {
        &self.value_optim
    }

    /// Baseline value estimate for a single observation, graph-tracked so
    /// the buffer can hand it back to the first refit iteration.
    pub fn estimate_value(&self, features: &[f32]) -> Tensor<B, 1> {
        let input = Tensor::<B, 2>::from_data(
            TensorData::new(features.to_vec(), [1, features.len()]),
            &self.device,
        );
        self.value.forward(input).squeeze::<1>(1)
    }

    /// Apply one policy gradient step and the baseline refit iterations for
    /// a finalized trajectory batch.
    ///
    /// The policy loss is the negative mean of `log_prob * advantage` over
    /// the trajectory. The baseline is refit `max(1, len / 50)` times
    /// against the fixed return targets, re-evaluating its predictions on
    /// the same observations after every optimizer step; the first
    /// iteration consumes the value estimates recorded during collection.
    ///
    /// Returns the final-iteration policy and baseline losses as detached
    /// scalars for logging.
    pub fn update(&mut self, batch: TrainingBatch<B>) -> (f32, f32) {
        let policy_loss =
            (batch.log_probs.clone() * batch.advantages.clone()).neg().mean();
        let grads = policy_loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.policy);
        self.policy = self
            .policy_optim
            .step(self.learning_rate, self.policy.clone(), grads);
        let policy_loss_val = policy_loss.into_scalar().elem::<f32>();

        let trajectory_len = batch.returns.dims()[0];
        let value_iters = usize::max(1, trajectory_len / STEPS_PER_VALUE_ITER);

        let mut values = batch.values;
        let mut value_loss_val = 0.0;
        for _ in 0..value_iters {
            let diff = batch.returns.clone() - values;
            let value_loss = (diff.clone() * diff).mean();
            let grads = value_loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.value);
            self.value = self
                .value_optim
                .step(self.learning_rate, self.value.clone(), grads);
            value_loss_val = value_loss.into_scalar().elem::<f32>();

            values = self
                .value
                .forward(batch.observations.clone())
                .squeeze::<1>(1);
        }

        (policy_loss_val, value_loss_val)
    }
}
