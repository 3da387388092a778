//! Rolling training statistics
//!
//! The loop keeps two interval accumulators over completed trajectories:
//! one flushed to the dashboard on the logging cadence, one flushed to
//! stdout at the end of each epoch. Incomplete trajectories (step budget
//! exhausted mid-trajectory) never reach these accumulators. None of this
//! state is persisted; it restarts empty with the process.

/// Smoothing factor for the exponentially weighted running return
const RUNNING_RETURN_SMOOTHING: f32 = 0.05;

/// Sums over completed trajectories since the last flush.
#[derive(Debug, Clone, Default)]
pub struct IntervalStats {
    return_sum: f32,
    policy_loss_sum: f32,
    value_loss_sum: f32,
    entropy_sum: f32,
    step_sum: f32,
    updates: usize,
}

impl IntervalStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        ep_return: f32,
        policy_loss: f32,
        value_loss: f32,
        entropy: f32,
        steps: usize,
    ) {
        self.return_sum += ep_return;
        self.policy_loss_sum += policy_loss;
        self.value_loss_sum += value_loss;
        self.entropy_sum += entropy;
        self.step_sum += steps as f32;
        self.updates += 1;
    }

    /// Completed trajectories recorded since the last reset
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn avg_return(&self) -> f32 {
        self.return_sum / self.updates as f32
    }

    pub fn avg_policy_loss(&self) -> f32 {
        self.policy_loss_sum / self.updates as f32
    }

    pub fn avg_value_loss(&self) -> f32 {
        self.value_loss_sum / self.updates as f32
    }

    pub fn avg_entropy(&self) -> f32 {
        self.entropy_sum / self.updates as f32
    }

    pub fn avg_steps(&self) -> f32 {
        self.step_sum / self.updates as f32
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Mutable per-run training state owned by the loop.
#[derive(Debug, Clone, Default)]
pub struct TrainingState {
    running_return: Option<f32>,
    /// Flushed on the dashboard logging cadence
    pub interval: IntervalStats,
    /// Flushed to stdout once per epoch
    pub epoch: IntervalStats,
}

impl TrainingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed trajectory into both accumulators and fold its
    /// return into the running average.
    pub fn record_trajectory(
        &mut self,
        ep_return: f32,
        policy_loss: f32,
        value_loss: f32,
        entropy: f32,
        steps: usize,
    ) {
        self.interval
            .record(ep_return, policy_loss, value_loss, entropy, steps);
        self.epoch
            .record(ep_return, policy_loss, value_loss, entropy, steps);

        self.running_return = Some(match self.running_return {
            None => ep_return,
            Some(running) => {
                RUNNING_RETURN_SMOOTHING * ep_return + (1.0 - RUNNING_RETURN_SMOOTHING) * running
            }
        });
    }

    /// Exponentially smoothed episodic return; `None` until the first
    /// completed trajectory
    pub fn running_return(&self) -> Option<f32> {
        self.running_return
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_averages() {
        let mut stats = IntervalStats::new();
        stats.record(1.0, 0.2, 0.4, 0.9, 10);
        stats.record(3.0, 0.4, 0.8, 0.7, 30);

        assert_eq!(stats.updates(), 2);
        assert!((stats.avg_return() - 2.0).abs() < 1e-6);
        assert!((stats.avg_policy_loss() - 0.3).abs() < 1e-6);
        assert!((stats.avg_value_loss() - 0.6).abs() < 1e-6);
        assert!((stats.avg_entropy() - 0.8).abs() < 1e-6);
        assert!((stats.avg_steps() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_interval_reset() {
        let mut stats = IntervalStats::new();
        stats.record(1.0, 0.2, 0.4, 0.9, 10);
        stats.reset();
        assert_eq!(stats.updates(), 0);
    }

    #[test]
    fn test_running_return_starts_at_first_value() {
        let mut state = TrainingState::new();
        assert!(state.running_return().is_none());

        state.record_trajectory(10.0, 0.0, 0.0, 0.5, 5);
        assert_eq!(state.running_return(), Some(10.0));
    }

    #[test]
    fn test_running_return_smoothing() {
        let mut state = TrainingState::new();
        state.record_trajectory(10.0, 0.0, 0.0, 0.5, 5);
        state.record_trajectory(0.0, 0.0, 0.0, 0.5, 5);

        // 0.05 * 0.0 + 0.95 * 10.0
        assert!((state.running_return().unwrap() - 9.5).abs() < 1e-6);
    }

    #[test]
    fn test_both_accumulators_record() {
        let mut state = TrainingState::new();
        state.record_trajectory(2.0, 0.1, 0.2, 0.3, 4);
        assert_eq!(state.interval.updates(), 1);
        assert_eq!(state.epoch.updates(), 1);

        state.interval.reset();
        assert_eq!(state.interval.updates(), 0);
        assert_eq!(state.epoch.updates(), 1);
    }
}
