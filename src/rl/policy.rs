//! Action selection for trajectory collection
//!
//! The selector always samples from the policy's categorical distribution
//! and records the log-probability of the *sampled* action, then may
//! replace the returned action with a uniformly random one. Keeping the
//! sample-then-override order means the gradient target stays tied to the
//! sampled action even when exploration overrides what the environment
//! actually executes.

use burn::tensor::{
    ElementConversion, Int, Tensor, TensorData,
    activation::{log_softmax, softmax},
    backend::Backend,
};
use rand::Rng;

use super::network::PolicyNet;

/// Select an action for the given observation.
///
/// Returns the action to execute, the log-probability of the sampled action
/// (graph-tracked on an autodiff backend, so the policy update can
/// backpropagate through it), and the full action-probability distribution
/// for diagnostics.
///
/// `random_action_p` is the probability of overriding the sampled action
/// with a uniform one; any negative value (the configured default is -1.0)
/// disables the override since the uniform draw in [0, 1) can never fall
/// below it. The comparison draw is consumed on every call, so two runs
/// from a cloned RNG differing only in `random_action_p` sample the same
/// action.
pub fn select_action<B: Backend, R: Rng>(
    features: &[f32],
    policy: &PolicyNet<B>,
    random_action_p: f64,
    device: &B::Device,
    rng: &mut R,
) -> (usize, Tensor<B, 1>, Vec<f32>) {
    let input = Tensor::<B, 2>::from_data(
        TensorData::new(features.to_vec(), [1, features.len()]),
        device,
    );
    let logits = policy.forward(input);

    let probs_data = softmax(logits.clone(), 1).into_data();
    let probs: Vec<f32> = probs_data
        .to_vec()
        .expect("Failed to convert probs to vec");
    let sampled = sample_categorical(&probs, rng);

    let sampled_tensor = Tensor::<B, 1, Int>::from_ints([sampled as i32], device);
    let log_prob = log_softmax(logits, 1)
        .gather(1, sampled_tensor.unsqueeze_dim(1))
        .squeeze::<1>(1);

    let action = if rng.gen::<f64>() <= random_action_p {
        rng.gen_range(0..probs.len())
    } else {
        sampled
    };

    (action, log_prob, probs)
}

/// Greedy action for evaluation rollouts: the index of the largest logit.
pub fn greedy_action<B: Backend>(
    features: &[f32],
    policy: &PolicyNet<B>,
    device: &B::Device,
) -> usize {
    let input = Tensor::<B, 2>::from_data(
        TensorData::new(features.to_vec(), [1, features.len()]),
        device,
    );
    let logits = policy.forward(input);
    logits.argmax(1).into_scalar().elem::<i64>() as usize
}

/// Policy entropy normalized to [0, 1] by `log(n_actions)`.
///
/// Zero-probability actions contribute nothing. 1.0 for a uniform
/// distribution, 0.0 for a one-hot one. Logged for monitoring only; never
/// part of the loss.
pub fn normalized_entropy(probs: &[f32]) -> f32 {
    let log_n = (probs.len() as f32).ln();
    -probs
        .iter()
        .filter(|&&p| p != 0.0)
        .map(|&p| p * (p.ln() / log_n))
        .sum::<f32>()
}

/// Sample an index from a categorical distribution via inverse transform
fn sample_categorical<R: Rng>(probs: &[f32], rng: &mut R) -> usize {
    let random_val: f32 = rng.sample(rand::distributions::Standard);
    let mut cumsum = 0.0;
    for (idx, &prob) in probs.iter().enumerate() {
        cumsum += prob;
        if random_val < cumsum {
            return idx;
        }
    }
    // Fallback to last action
    probs.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::network::PolicyNetConfig;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    type TestBackend = NdArray<f32>;

    fn test_policy(n_actions: usize) -> PolicyNet<TestBackend> {
        let device = NdArrayDevice::default();
        PolicyNetConfig::new(3, 8, n_actions).init(&device)
    }

    #[test]
    fn test_entropy_uniform_is_one() {
        let probs = vec![0.25; 4];
        assert!((normalized_entropy(&probs) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_entropy_one_hot_is_zero() {
        let probs = vec![0.0, 1.0, 0.0];
        assert_eq!(normalized_entropy(&probs), 0.0);
    }

    #[test]
    fn test_entropy_skewed_between_zero_and_one() {
        let probs = vec![0.7, 0.2, 0.1];
        let entropy = normalized_entropy(&probs);
        assert!(entropy > 0.0 && entropy < 1.0);
    }

    #[test]
    fn test_sample_categorical_respects_support() {
        let mut rng = StdRng::seed_from_u64(0);
        let probs = vec![0.0, 1.0, 0.0];
        for _ in 0..100 {
            assert_eq!(sample_categorical(&probs, &mut rng), 1);
        }
    }

    #[test]
    fn test_select_action_returns_valid_outputs() {
        let device = NdArrayDevice::default();
        let policy = test_policy(4);
        let mut rng = StdRng::seed_from_u64(1);

        let (action, log_prob, probs) =
            select_action(&[0.1, 0.5, 0.9], &policy, -1.0, &device, &mut rng);

        assert!(action < 4);
        assert_eq!(probs.len(), 4);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        let log_prob_val = log_prob.into_scalar();
        assert!(log_prob_val < 0.0);
    }

    #[test]
    fn test_exploration_override_is_uniform() {
        let device = NdArrayDevice::default();
        let policy = test_policy(3);
        let mut rng = StdRng::seed_from_u64(2);

        let draws = 3000;
        let mut counts = [0usize; 3];
        for _ in 0..draws {
            let (action, _, _) =
                select_action(&[0.2, 0.4, 0.6], &policy, 1.0, &device, &mut rng);
            counts[action] += 1;
        }

        // Loose uniformity bound: each action within 15% of the expected share
        let expected = draws as f32 / 3.0;
        for &count in &counts {
            assert!(
                (count as f32 - expected).abs() < expected * 0.15,
                "override not uniform: {:?}",
                counts
            );
        }
    }

    #[test]
    fn test_log_prob_tracks_sampled_action_under_override() {
        let device = NdArrayDevice::default();
        let policy = test_policy(3);
        let features = [0.3, 0.1, 0.8];

        // Identical RNG state, only the override probability differs: the
        // sampled action (and therefore its log-probability) must match.
        let rng = StdRng::seed_from_u64(3);
        let (_, log_prob_overridden, _) =
            select_action(&features, &policy, 1.0, &device, &mut rng.clone());
        let (sampled, log_prob_plain, _) =
            select_action(&features, &policy, -1.0, &device, &mut rng.clone());

        assert!(sampled < 3);
        assert_eq!(
            log_prob_overridden.into_scalar(),
            log_prob_plain.into_scalar()
        );
    }

    #[test]
    fn test_negative_p_never_overrides() {
        let device = NdArrayDevice::default();
        let policy = test_policy(3);

        for seed in 0..50 {
            let rng = StdRng::seed_from_u64(seed);
            let (a1, _, _) = select_action(&[0.5, 0.5, 0.5], &policy, -1.0, &device, &mut rng.clone());
            let (a2, _, _) = select_action(&[0.5, 0.5, 0.5], &policy, -1.0, &device, &mut rng.clone());
            assert_eq!(a1, a2);
        }
    }

    #[test]
    fn test_greedy_action_in_range() {
        let device = NdArrayDevice::default();
        let policy = test_policy(5);
        let action = greedy_action(&[0.0, 1.0, 0.0], &policy, &device);
        assert!(action < 5);
    }
}
