use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use ml_catch::config::ExperimentConfig;
use ml_catch::env::CatchEnv;
use ml_catch::modes::{TrainMode, eval_load, run_evaluation, write_results_csv};
use ml_catch::rl::{TrainingBackend, default_device};

#[derive(Parser)]
#[command(name = "ml_catch")]
#[command(version, about = "Catch game with a REINFORCE agent")]
struct Cli {
    /// Execution mode
    #[arg(long, default_value = "train")]
    mode: Mode,

    /// Experiment config file (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the experiment name
    #[arg(long)]
    exp_name: Option<String>,

    /// Override the experiment seed
    #[arg(long)]
    seed: Option<u64>,

    /// Evaluation seeds (eval mode)
    #[arg(long, value_delimiter = ',', default_values_t = [123u64, 456, 789, 1011])]
    eval_seeds: Vec<u64>,

    /// Episodes per evaluation seed (eval mode)
    #[arg(long, default_value = "5")]
    episodes_per_seed: usize,

    /// Evaluation worker threads (eval mode)
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Evaluation results CSV path (eval mode)
    #[arg(long, default_value = "eval_results.csv")]
    out: PathBuf,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    /// Train the agent, resuming from the latest checkpoint if present
    Train,
    /// Evaluate the trained policy across seeds and write a results CSV
    Eval,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_file(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(exp_name) = cli.exp_name {
        config.exp_name = exp_name;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    match cli.mode {
        Mode::Train => {
            let env = Box::new(CatchEnv::new(config.env.clone()));
            let mut mode = TrainMode::<TrainingBackend>::new(config, env, default_device())?;
            mode.run()
        }
        Mode::Eval => {
            let (policy, _epoch) = eval_load(&config)?;
            let env_config = config.env.clone();
            let records = run_evaluation(
                &policy,
                || CatchEnv::new(env_config.clone()),
                &cli.eval_seeds,
                cli.episodes_per_seed,
                cli.workers,
            );
            write_results_csv(&cli.out, &config.exp_name, &records)?;
            for record in &records {
                println!(
                    "seed {}: reward {:.2} +/- {:.2} over {} episodes ({:.1} steps avg)",
                    record.eval_seed,
                    record.reward_mean,
                    record.reward_std,
                    record.episodes,
                    record.steps_mean,
                );
            }
            println!("Results written to {:?}", cli.out);
            Ok(())
        }
    }
}
