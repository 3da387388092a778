//! Dashboard scalar sink
//!
//! The training loop pushes (tag, value, global step) triples on its
//! logging cadence; this writer appends them as one JSON object per line to
//! an `events.jsonl` file under the run's log directory. Purely
//! observational: nothing here feeds back into training, and write errors
//! propagate instead of being retried.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ScalarEvent<'a> {
    step: usize,
    tag: &'a str,
    value: f32,
}

/// Appends dashboard scalars to `log_dir/run_name/events.jsonl`.
pub struct ScalarWriter {
    out: BufWriter<File>,
    path: PathBuf,
}

impl ScalarWriter {
    /// Create the run directory (if needed) and start a fresh event file.
    pub fn create(log_dir: &Path, run_name: &str) -> Result<Self> {
        let dir = log_dir.join(run_name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {:?}", dir))?;
        let path = dir.join("events.jsonl");
        let file = File::create(&path)
            .with_context(|| format!("failed to create event file {:?}", path))?;
        Ok(Self {
            out: BufWriter::new(file),
            path,
        })
    }

    /// Append one scalar keyed by the global step index.
    pub fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()> {
        let line = serde_json::to_string(&ScalarEvent { step, tag, value })?;
        writeln!(self.out, "{line}")
            .with_context(|| format!("failed to append to {:?}", self.path))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .with_context(|| format!("failed to flush {:?}", self.path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
