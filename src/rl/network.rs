//! Policy and baseline networks
//!
//! Both networks are two-layer MLPs over the environment's feature vector.
//! The policy head outputs one logit per discrete action; the baseline head
//! outputs a single state-value estimate used to reduce gradient variance.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{Tensor, activation::relu, backend::Backend},
};
use serde::{Deserialize, Serialize};

/// Configuration for the policy network
///
/// Serialized into checkpoint sidecars so a saved policy can be rebuilt
/// without the originating experiment config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyNetConfig {
    /// Observation feature count
    pub obs_len: usize,
    /// Hidden layer width
    pub hidden_size: usize,
    /// Number of discrete actions
    pub n_actions: usize,
}

impl PolicyNetConfig {
    pub fn new(obs_len: usize, hidden_size: usize, n_actions: usize) -> Self {
        Self {
            obs_len,
            hidden_size,
            n_actions,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNet<B> {
        PolicyNet {
            fc1: LinearConfig::new(self.obs_len, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.n_actions).init(device),
        }
    }
}

/// Policy network: features -> action logits
#[derive(Module, Debug)]
pub struct PolicyNet<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> PolicyNet<B> {
    /// Forward pass over a batch of observations `[batch, obs_len]`,
    /// returning unnormalized action logits `[batch, n_actions]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(input));
        self.fc2.forward(x)
    }
}

/// Configuration for the baseline (value) network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueNetConfig {
    /// Observation feature count
    pub obs_len: usize,
    /// Hidden layer width
    pub hidden_size: usize,
}

impl ValueNetConfig {
    pub fn new(obs_len: usize, hidden_size: usize) -> Self {
        Self {
            obs_len,
            hidden_size,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ValueNet<B> {
        ValueNet {
            fc1: LinearConfig::new(self.obs_len, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, 1).init(device),
        }
    }
}

/// Baseline network: features -> state-value estimate
#[derive(Module, Debug)]
pub struct ValueNet<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> ValueNet<B> {
    /// Forward pass over a batch of observations `[batch, obs_len]`,
    /// returning value estimates `[batch, 1]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(input));
        self.fc2.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_policy_forward_shapes() {
        let device = NdArrayDevice::default();
        let net = PolicyNetConfig::new(3, 16, 4).init::<TestBackend>(&device);

        let input = Tensor::zeros([2, 3], &device);
        let logits = net.forward(input);
        assert_eq!(logits.dims(), [2, 4]);
    }

    #[test]
    fn test_value_forward_shapes() {
        let device = NdArrayDevice::default();
        let net = ValueNetConfig::new(3, 16).init::<TestBackend>(&device);

        let input = Tensor::zeros([5, 3], &device);
        let values = net.forward(input);
        assert_eq!(values.dims(), [5, 1]);
    }

    #[test]
    fn test_outputs_finite() {
        let device = NdArrayDevice::default();
        let policy = PolicyNetConfig::new(4, 8, 3).init::<TestBackend>(&device);
        let value = ValueNetConfig::new(4, 8).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.3f32, -1.0, 0.5, 2.0], [1, 4]),
            &device,
        );
        let logits_data = policy.forward(input.clone()).into_data();
        for &v in logits_data.as_slice::<f32>().unwrap() {
            assert!(v.is_finite());
        }
        let value_data = value.forward(input).into_data();
        for &v in value_data.as_slice::<f32>().unwrap() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = PolicyNetConfig::new(12, 64, 6);
        let json = serde_json::to_string(&config).unwrap();
        let back: PolicyNetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
