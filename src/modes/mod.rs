pub mod eval;
pub mod train;

pub use eval::{EvalRecord, eval_load, run_evaluation, write_results_csv};
pub use train::TrainMode;
