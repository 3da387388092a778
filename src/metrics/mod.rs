pub mod dashboard;
pub mod training_stats;

pub use dashboard::ScalarWriter;
pub use training_stats::{IntervalStats, TrainingState};
