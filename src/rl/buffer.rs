//! Experience buffer for trajectory collection
//!
//! Stores one trajectory's observations, rewards, baseline value estimates
//! and action log-probabilities, then derives discounted Monte-Carlo
//! returns and advantages for a single policy update. Value estimates and
//! log-probabilities are kept as graph-tracked scalar tensors: the policy
//! update backpropagates through the log-probabilities collected here, and
//! the first baseline refit backpropagates through the collected value
//! estimates.

use burn::tensor::{ElementConversion, Tensor, TensorData, backend::Backend};

/// Read-only training batch derived from one finalized trajectory.
///
/// Consumed exactly once by the update engine.
pub struct TrainingBatch<B: Backend> {
    /// Observations `[n, obs_len]`
    pub observations: Tensor<B, 2>,
    /// Discounted returns `[n]`
    pub returns: Tensor<B, 1>,
    /// Standardized advantages `[n]`
    pub advantages: Tensor<B, 1>,
    /// Log-probabilities of the sampled actions `[n]`, graph-tracked
    pub log_probs: Tensor<B, 1>,
    /// Baseline value estimates collected during the rollout `[n]`,
    /// graph-tracked for the first refit iteration
    pub values: Tensor<B, 1>,
}

/// Append-only trajectory buffer with derived returns and advantages.
///
/// Created once per training run and `reset` between trajectories. The
/// capacity is a contract bound, not a ring: `add` panics once the pointer
/// reaches it, because overrunning the per-trajectory step budget is a
/// programming error, never a recoverable condition.
pub struct ExperienceBuffer<B: Backend> {
    observations: Vec<Vec<f32>>,
    rewards: Vec<f32>,
    values: Vec<Tensor<B, 1>>,
    log_probs: Vec<Tensor<B, 1>>,

    /// Discounted returns (populated by `finalize`)
    returns: Vec<f32>,
    /// Returns minus value estimates (populated by `finalize`,
    /// standardized in place by `get`)
    advantages: Vec<f32>,

    ptr: usize,
    max_size: usize,
    gamma: f32,
}

impl<B: Backend> ExperienceBuffer<B> {
    pub fn new(max_size: usize, gamma: f32) -> Self {
        Self {
            observations: Vec::with_capacity(max_size),
            rewards: Vec::with_capacity(max_size),
            values: Vec::with_capacity(max_size),
            log_probs: Vec::with_capacity(max_size),
            returns: Vec::new(),
            advantages: Vec::new(),
            ptr: 0,
            max_size,
            gamma,
        }
    }

    /// Append one trajectory step.
    ///
    /// # Panics
    ///
    /// Panics when called after the buffer has reached its configured
    /// capacity.
    pub fn add(
        &mut self,
        observation: Vec<f32>,
        reward: f32,
        value: Tensor<B, 1>,
        log_prob: Tensor<B, 1>,
    ) {
        assert!(
            self.ptr < self.max_size,
            "experience buffer overflow: capacity {} exceeded",
            self.max_size
        );
        self.observations.push(observation);
        self.rewards.push(reward);
        self.values.push(value);
        self.log_probs.push(log_prob);
        self.ptr += 1;
    }

    /// Compute discounted returns and advantages for the stored trajectory.
    ///
    /// `returns[t] = rewards[t] + gamma * returns[t + 1]` with a terminal
    /// seed of 0; `advantages = returns - values` with the value estimates
    /// detached to scalars. An empty buffer yields empty derived vectors.
    pub fn finalize(&mut self) {
        let n = self.ptr;
        let vals: Vec<f32> = self
            .values
            .iter()
            .map(|v| v.clone().into_scalar().elem::<f32>())
            .collect();

        self.returns = vec![0.0; n];
        let mut ret = 0.0;
        for t in (0..n).rev() {
            ret = self.rewards[t] + self.gamma * ret;
            self.returns[t] = ret;
        }

        self.advantages = self
            .returns
            .iter()
            .zip(vals.iter())
            .map(|(r, v)| r - v)
            .collect();
    }

    /// Standardize advantages in place and assemble the training batch.
    ///
    /// Advantages are shifted and scaled by the batch's own mean and
    /// (population) standard deviation. A zero-variance batch divides by
    /// zero and propagates non-finite values; that degenerate case is not
    /// masked and surfaces as a run failure downstream.
    ///
    /// # Panics
    ///
    /// Panics when the buffer is empty.
    pub fn get(&mut self, device: &B::Device) -> TrainingBatch<B> {
        assert!(
            self.ptr > 0,
            "cannot build a training batch from an empty buffer"
        );
        let n = self.ptr;

        let mean = self.advantages.iter().sum::<f32>() / n as f32;
        let variance =
            self.advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n as f32;
        let std = variance.sqrt();
        for a in &mut self.advantages {
            *a = (*a - mean) / std;
        }

        let obs_len = self.observations[0].len();
        let mut flat = Vec::with_capacity(n * obs_len);
        for obs in &self.observations {
            flat.extend_from_slice(obs);
        }

        TrainingBatch {
            observations: Tensor::from_data(TensorData::new(flat, [n, obs_len]), device),
            returns: Tensor::from_data(TensorData::new(self.returns.clone(), [n]), device),
            advantages: Tensor::from_data(TensorData::new(self.advantages.clone(), [n]), device),
            log_probs: Tensor::cat(self.log_probs.clone(), 0),
            values: Tensor::cat(self.values.clone(), 0),
        }
    }

    /// Clear the buffer for the next trajectory.
    ///
    /// Drops all stored steps and derived sequences; `gamma` and the
    /// capacity are unchanged.
    pub fn reset(&mut self) {
        self.observations.clear();
        self.rewards.clear();
        self.values.clear();
        self.log_probs.clear();
        self.returns.clear();
        self.advantages.clear();
        self.ptr = 0;
    }

    pub fn len(&self) -> usize {
        self.ptr
    }

    pub fn is_empty(&self) -> bool {
        self.ptr == 0
    }

    /// Derived returns (empty before `finalize`)
    pub fn returns(&self) -> &[f32] {
        &self.returns
    }

    /// Derived advantages (raw after `finalize`, standardized after `get`)
    pub fn advantages(&self) -> &[f32] {
        &self.advantages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    fn scalar(value: f32) -> Tensor<TestBackend, 1> {
        Tensor::from_floats([value], &NdArrayDevice::default())
    }

    fn fill(buffer: &mut ExperienceBuffer<TestBackend>, rewards: &[f32], values: &[f32]) {
        for (&r, &v) in rewards.iter().zip(values.iter()) {
            buffer.add(vec![0.0, 0.0, 0.0], r, scalar(v), scalar(-1.0));
        }
    }

    #[test]
    fn test_returns_recurrence() {
        let mut buffer = ExperienceBuffer::<TestBackend>::new(16, 0.9);
        fill(&mut buffer, &[1.0, 0.0, 2.0, -1.0], &[0.0; 4]);
        buffer.finalize();

        let returns = buffer.returns();
        assert_eq!(returns.len(), 4);
        // returns[last + 1] := 0
        assert!((returns[3] - (-1.0)).abs() < 1e-6);
        for t in 0..3 {
            let expected = [1.0, 0.0, 2.0, -1.0][t] + 0.9 * returns[t + 1];
            assert!((returns[t] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_five_step_unit_rewards_half_gamma() {
        let mut buffer = ExperienceBuffer::<TestBackend>::new(8, 0.5);
        fill(&mut buffer, &[1.0; 5], &[0.0; 5]);
        buffer.finalize();

        let expected = [1.9375, 1.875, 1.75, 1.5, 1.0];
        for (ret, exp) in buffer.returns().iter().zip(expected.iter()) {
            assert!((ret - exp).abs() < 1e-6);
        }
    }

    #[test]
    fn test_advantages_are_returns_minus_values() {
        let mut buffer = ExperienceBuffer::<TestBackend>::new(8, 1.0);
        fill(&mut buffer, &[1.0, 1.0, 1.0], &[0.5, 2.0, -1.0]);
        buffer.finalize();

        let returns = buffer.returns().to_vec();
        let advantages = buffer.advantages();
        let values = [0.5, 2.0, -1.0];
        for t in 0..3 {
            assert!((advantages[t] - (returns[t] - values[t])).abs() < 1e-6);
        }
    }

    #[test]
    fn test_standardized_advantages_zero_mean_unit_std() {
        let device = NdArrayDevice::default();
        let mut buffer = ExperienceBuffer::<TestBackend>::new(16, 0.99);
        let rewards: Vec<f32> = (0..10).map(|i| i as f32).collect();
        fill(&mut buffer, &rewards, &[0.5; 10]);
        buffer.finalize();
        let _batch = buffer.get(&device);

        let advantages = buffer.advantages();
        let n = advantages.len() as f32;
        let mean = advantages.iter().sum::<f32>() / n;
        let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n;
        assert!(mean.abs() < 1e-5);
        assert!((variance.sqrt() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_finalize_on_empty_buffer_is_empty() {
        let mut buffer = ExperienceBuffer::<TestBackend>::new(8, 0.99);
        buffer.reset();
        buffer.finalize();
        assert!(buffer.returns().is_empty());
        assert!(buffer.advantages().is_empty());
    }

    #[test]
    #[should_panic(expected = "experience buffer overflow")]
    fn test_add_beyond_capacity_panics() {
        let mut buffer = ExperienceBuffer::<TestBackend>::new(2, 0.99);
        fill(&mut buffer, &[1.0, 1.0], &[0.0, 0.0]);
        buffer.add(vec![0.0], 1.0, scalar(0.0), scalar(-1.0));
    }

    #[test]
    #[should_panic(expected = "empty buffer")]
    fn test_get_on_empty_buffer_panics() {
        let device = NdArrayDevice::default();
        let mut buffer = ExperienceBuffer::<TestBackend>::new(2, 0.99);
        buffer.get(&device);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut buffer = ExperienceBuffer::<TestBackend>::new(8, 0.99);
        fill(&mut buffer, &[1.0, 2.0], &[0.1, 0.2]);
        buffer.finalize();
        assert_eq!(buffer.len(), 2);

        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.returns().is_empty());
        assert!(buffer.advantages().is_empty());

        // Capacity and gamma survive a reset
        fill(&mut buffer, &[1.0; 8], &[0.0; 8]);
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_batch_shapes() {
        let device = NdArrayDevice::default();
        let mut buffer = ExperienceBuffer::<TestBackend>::new(8, 0.99);
        for i in 0..5 {
            buffer.add(
                vec![i as f32, 0.0, 1.0],
                1.0,
                scalar(0.3),
                scalar(-0.7),
            );
        }
        buffer.finalize();
        let batch = buffer.get(&device);

        assert_eq!(batch.observations.dims(), [5, 3]);
        assert_eq!(batch.returns.dims(), [5]);
        assert_eq!(batch.advantages.dims(), [5]);
        assert_eq!(batch.log_probs.dims(), [5]);
        assert_eq!(batch.values.dims(), [5]);
    }

    #[test]
    fn test_zero_variance_advantages_go_non_finite() {
        // Degenerate batches are documented to propagate, not be masked.
        // Zero rewards against identical value estimates give identical
        // advantages, so the standardization divides by a zero std.
        let device = NdArrayDevice::default();
        let mut buffer = ExperienceBuffer::<TestBackend>::new(8, 1.0);
        fill(&mut buffer, &[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0]);
        buffer.finalize();
        let _batch = buffer.get(&device);
        assert!(buffer.advantages().iter().any(|a| !a.is_finite()));
    }
}
