//! Checkpoint persistence for policy and baseline snapshots
//!
//! Each experiment keeps two independent snapshots under the checkpoint
//! directory, named `{role}_{experiment}_model`: one for the policy and one
//! for the baseline. A snapshot is the module record, the matching Adam
//! optimizer record, and a versioned JSON sidecar carrying the role, the
//! epoch counter and the network dimensions needed to rebuild the module.
//! Missing snapshots are not errors; training simply starts fresh.

use anyhow::{Context, Result, bail};
use burn::{
    backend::ndarray::NdArrayDevice,
    module::Module,
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::backend::InferenceBackend;
use super::network::{PolicyNet, PolicyNetConfig, ValueNet, ValueNetConfig};
use super::update::{PolicyOptimizer, ValueOptimizer};

/// Bumped whenever the snapshot layout changes; older snapshots are
/// rejected instead of being reinterpreted.
pub const SNAPSHOT_VERSION: u32 = 1;

const POLICY_ROLE: &str = "policy";
const BASELINE_ROLE: &str = "baseline";

/// Sidecar metadata for a policy snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySnapshotMeta {
    pub version: u32,
    pub role: String,
    pub epoch: usize,
    pub net: PolicyNetConfig,
}

/// Sidecar metadata for a baseline snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineSnapshotMeta {
    pub version: u32,
    pub role: String,
    pub epoch: usize,
    pub net: ValueNetConfig,
}

/// Persists and restores role snapshots under one checkpoint directory.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Open a store, creating the directory if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create checkpoint directory {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base path for a role snapshot; the recorder appends its own
    /// extension for the record files.
    fn base_path(&self, role: &str, exp_name: &str) -> PathBuf {
        self.dir.join(format!("{role}_{exp_name}_model"))
    }

    fn optim_path(&self, role: &str, exp_name: &str) -> PathBuf {
        self.dir.join(format!("{role}_{exp_name}_model_optim"))
    }

    fn meta_path(&self, role: &str, exp_name: &str) -> PathBuf {
        self.dir.join(format!("{role}_{exp_name}_model.meta.json"))
    }

    pub fn save_policy<B: AutodiffBackend>(
        &self,
        exp_name: &str,
        epoch: usize,
        config: &PolicyNetConfig,
        net: &PolicyNet<B>,
        optim: &PolicyOptimizer<B>,
    ) -> Result<()> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(net.clone().into_record(), self.base_path(POLICY_ROLE, exp_name))
            .context("failed to save policy parameters")?;
        recorder
            .record(optim.to_record(), self.optim_path(POLICY_ROLE, exp_name))
            .context("failed to save policy optimizer state")?;

        let meta = PolicySnapshotMeta {
            version: SNAPSHOT_VERSION,
            role: POLICY_ROLE.to_string(),
            epoch,
            net: config.clone(),
        };
        self.write_meta(POLICY_ROLE, exp_name, &serde_json::to_string_pretty(&meta)?)
    }

    pub fn save_baseline<B: AutodiffBackend>(
        &self,
        exp_name: &str,
        epoch: usize,
        config: &ValueNetConfig,
        net: &ValueNet<B>,
        optim: &ValueOptimizer<B>,
    ) -> Result<()> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(
                net.clone().into_record(),
                self.base_path(BASELINE_ROLE, exp_name),
            )
            .context("failed to save baseline parameters")?;
        recorder
            .record(optim.to_record(), self.optim_path(BASELINE_ROLE, exp_name))
            .context("failed to save baseline optimizer state")?;

        let meta = BaselineSnapshotMeta {
            version: SNAPSHOT_VERSION,
            role: BASELINE_ROLE.to_string(),
            epoch,
            net: config.clone(),
        };
        self.write_meta(
            BASELINE_ROLE,
            exp_name,
            &serde_json::to_string_pretty(&meta)?,
        )
    }

    /// Restore the policy snapshot into the given network and optimizer.
    ///
    /// Returns the (possibly restored) pair together with the snapshot's
    /// epoch, or `None` as the epoch when no snapshot exists.
    pub fn load_policy<B: AutodiffBackend>(
        &self,
        exp_name: &str,
        config: &PolicyNetConfig,
        net: PolicyNet<B>,
        optim: PolicyOptimizer<B>,
        device: &B::Device,
    ) -> Result<(PolicyNet<B>, PolicyOptimizer<B>, Option<usize>)> {
        let meta = match self.read_policy_meta(exp_name)? {
            Some(meta) => meta,
            None => return Ok((net, optim, None)),
        };
        if meta.net != *config {
            bail!(
                "policy snapshot for '{exp_name}' was built for different network dimensions ({:?} vs {:?})",
                meta.net,
                config
            );
        }

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(self.base_path(POLICY_ROLE, exp_name), device)
            .context("failed to load policy parameters")?;
        let net = net.load_record(record);
        let optim_record = recorder
            .load(self.optim_path(POLICY_ROLE, exp_name), device)
            .context("failed to load policy optimizer state")?;
        let optim = optim.load_record(optim_record);

        Ok((net, optim, Some(meta.epoch)))
    }

    /// Restore the baseline snapshot into the given network and optimizer.
    pub fn load_baseline<B: AutodiffBackend>(
        &self,
        exp_name: &str,
        config: &ValueNetConfig,
        net: ValueNet<B>,
        optim: ValueOptimizer<B>,
        device: &B::Device,
    ) -> Result<(ValueNet<B>, ValueOptimizer<B>, Option<usize>)> {
        let meta_path = self.meta_path(BASELINE_ROLE, exp_name);
        if !meta_path.exists() {
            return Ok((net, optim, None));
        }
        let meta: BaselineSnapshotMeta = read_meta(&meta_path)?;
        check_snapshot(meta.version, &meta.role, BASELINE_ROLE, &meta_path)?;
        if meta.net != *config {
            bail!(
                "baseline snapshot for '{exp_name}' was built for different network dimensions ({:?} vs {:?})",
                meta.net,
                config
            );
        }

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(self.base_path(BASELINE_ROLE, exp_name), device)
            .context("failed to load baseline parameters")?;
        let net = net.load_record(record);
        let optim_record = recorder
            .load(self.optim_path(BASELINE_ROLE, exp_name), device)
            .context("failed to load baseline optimizer state")?;
        let optim = optim.load_record(optim_record);

        Ok((net, optim, Some(meta.epoch)))
    }

    /// Load only the policy, rebuilt from its sidecar dimensions on the
    /// inference backend. The baseline, optimizer state and buffer are
    /// never touched on this path.
    pub fn load_policy_for_eval(
        &self,
        exp_name: &str,
        device: &NdArrayDevice,
    ) -> Result<Option<(PolicyNet<InferenceBackend>, usize)>> {
        let meta = match self.read_policy_meta(exp_name)? {
            Some(meta) => meta,
            None => return Ok(None),
        };

        let net = meta.net.init::<InferenceBackend>(device);
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(self.base_path(POLICY_ROLE, exp_name), device)
            .context("failed to load policy parameters")?;
        Ok(Some((net.load_record(record), meta.epoch)))
    }

    fn read_policy_meta(&self, exp_name: &str) -> Result<Option<PolicySnapshotMeta>> {
        let meta_path = self.meta_path(POLICY_ROLE, exp_name);
        if !meta_path.exists() {
            return Ok(None);
        }
        let meta: PolicySnapshotMeta = read_meta(&meta_path)?;
        check_snapshot(meta.version, &meta.role, POLICY_ROLE, &meta_path)?;
        Ok(Some(meta))
    }

    fn write_meta(&self, role: &str, exp_name: &str, json: &str) -> Result<()> {
        let path = self.meta_path(role, exp_name);
        fs::write(&path, json)
            .with_context(|| format!("failed to write snapshot metadata to {:?}", path))
    }
}

fn read_meta<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot metadata from {:?}", path))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse snapshot metadata in {:?}", path))
}

fn check_snapshot(version: u32, role: &str, expected_role: &str, path: &Path) -> Result<()> {
    if version != SNAPSHOT_VERSION {
        bail!(
            "unsupported snapshot version {version} in {:?} (expected {SNAPSHOT_VERSION})",
            path
        );
    }
    if role != expected_role {
        bail!(
            "snapshot role mismatch in {:?}: expected '{expected_role}', found '{role}'",
            path
        );
    }
    Ok(())
}
