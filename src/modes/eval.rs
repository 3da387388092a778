//! Evaluation mode
//!
//! Loads a trained policy (policy role only; the baseline, optimizer state
//! and buffer are never touched) and measures it across evaluation seeds.
//! Seeds fan out over worker threads through a bounded job queue; each
//! worker owns its own environment and policy copy, rolls out greedy
//! episodes and reports per-seed statistics through a results queue. The
//! workers share nothing mutable.

use anyhow::{Context, Result, bail};
use burn::backend::ndarray::NdArrayDevice;
use crossbeam_channel::bounded;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::ExperimentConfig;
use crate::env::Environment;
use crate::rl::backend::{InferenceBackend, default_device};
use crate::rl::persistence::CheckpointStore;
use crate::rl::{PolicyNet, greedy_action};

/// Per-seed evaluation statistics
#[derive(Debug, Clone)]
pub struct EvalRecord {
    pub eval_seed: u64,
    pub episodes: usize,
    pub reward_mean: f32,
    pub reward_std: f32,
    pub steps_mean: f32,
    pub steps_std: f32,
}

/// Load the policy checkpoint for the configured experiment/seed, ready
/// for external rollout on the inference backend.
pub fn eval_load(
    config: &ExperimentConfig,
) -> Result<(PolicyNet<InferenceBackend>, usize)> {
    let run_name = config.run_name();
    println!("Experiment name: {run_name}");
    println!("Evaluation mode");

    let store = CheckpointStore::new(&config.checkpoint_dir)?;
    let device = default_device();
    match store.load_policy_for_eval(&run_name, &device)? {
        Some((policy, epoch)) => {
            println!("Epochs trained: {epoch}");
            Ok((policy, epoch))
        }
        None => bail!(
            "no policy snapshot found for '{run_name}' in {:?}",
            config.checkpoint_dir
        ),
    }
}

/// Evaluate a policy over the given seeds with a pool of worker threads.
///
/// Each seed becomes one job; workers pull jobs until the queue drains.
/// Results are sorted by seed, so the output is deterministic regardless
/// of worker scheduling.
pub fn run_evaluation<E, F>(
    policy: &PolicyNet<InferenceBackend>,
    make_env: F,
    seeds: &[u64],
    episodes_per_seed: usize,
    workers: usize,
) -> Vec<EvalRecord>
where
    E: Environment,
    F: Fn() -> E + Sync,
{
    let capacity = seeds.len().max(1);
    let (job_tx, job_rx) = bounded::<u64>(capacity);
    let (done_tx, done_rx) = bounded::<EvalRecord>(capacity);
    for &seed in seeds {
        job_tx
            .send(seed)
            .expect("job queue closed before evaluation started");
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        let make_env = &make_env;
        for _ in 0..workers.max(1) {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let policy = policy.clone();
            scope.spawn(move || {
                let device = default_device();
                while let Ok(seed) = job_rx.recv() {
                    let record =
                        evaluate_seed(&policy, make_env(), seed, episodes_per_seed, &device);
                    if done_tx.send(record).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);
    });

    let mut records: Vec<EvalRecord> = done_rx.iter().collect();
    records.sort_by_key(|record| record.eval_seed);
    records
}

/// Roll out `episodes` greedy episodes on a freshly seeded environment.
fn evaluate_seed<E: Environment>(
    policy: &PolicyNet<InferenceBackend>,
    mut env: E,
    seed: u64,
    episodes: usize,
    device: &NdArrayDevice,
) -> EvalRecord {
    let mut rewards = Vec::with_capacity(episodes);
    let mut steps = Vec::with_capacity(episodes);

    let mut obs = env.reset(Some(seed));
    for _ in 0..episodes {
        let mut ep_reward = 0.0;
        let mut ep_steps = 0usize;
        loop {
            let action = greedy_action(&obs, policy, device);
            let step = env.step(action);
            ep_reward += step.reward;
            ep_steps += 1;
            obs = step.observation;
            if step.terminated || step.truncated {
                break;
            }
        }
        rewards.push(ep_reward);
        steps.push(ep_steps as f32);
        obs = env.reset(None);
    }

    EvalRecord {
        eval_seed: seed,
        episodes,
        reward_mean: mean(&rewards),
        reward_std: std_dev(&rewards),
        steps_mean: mean(&steps),
        steps_std: std_dev(&steps),
    }
}

/// Write evaluation records as CSV, one row per seed.
pub fn write_results_csv(path: &Path, exp_name: &str, records: &[EvalRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create results file {:?}", path))?;
    let mut out = BufWriter::new(file);
    writeln!(
        out,
        "exp_name,eval_seed,episodes,reward_mean,reward_std,steps_mean,steps_std"
    )?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            exp_name,
            record.eval_seed,
            record.episodes,
            record.reward_mean,
            record.reward_std,
            record.steps_mean,
            record.steps_std,
        )?;
    }
    out.flush()?;
    Ok(())
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population standard deviation
fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}
