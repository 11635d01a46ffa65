use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Serialize;

/// Receives per-batch training losses and per-epoch test losses while a model trains.
pub trait LossRecorder {
    /// `loss` is the batch loss divided by the batch size. `step` counts batches from 0
    /// across all epochs.
    fn train_item(&mut self, step: usize, loss: f64);

    /// `loss` is the summed test loss divided by the number of test items.
    fn test_item(&mut self, epoch: usize, batches_per_epoch: usize, loss: f64);

    fn flush(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LossPoint {
    pub split: &'static str,
    pub step: usize,
    pub loss: f64,
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Loss curve kept in the results directory: training loss averaged over `plot_interval`
/// batches, test loss once per epoch.
pub struct LossPlot {
    path: PathBuf,
    plot_interval: usize,
    pending: Vec<f64>,
    points: Vec<LossPoint>,
}

impl LossPlot {
    pub fn new(dir: &Path, plot_interval: usize) -> Self {
        Self {
            path: dir.join("loss_plot.csv"),
            plot_interval: plot_interval.max(1),
            pending: Vec::new(),
            points: Vec::new(),
        }
    }

    pub fn points(&self) -> &[LossPoint] {
        &self.points
    }
}

impl LossRecorder for LossPlot {
    fn train_item(&mut self, step: usize, loss: f64) {
        self.pending.push(loss);
        if self.pending.len() == self.plot_interval {
            let mean = self.pending.iter().sum::<f64>() / self.pending.len() as f64;
            self.pending.clear();
            self.points.push(LossPoint {
                split: "train",
                step,
                loss: mean,
            });
        }
    }

    fn test_item(&mut self, epoch: usize, batches_per_epoch: usize, loss: f64) {
        self.points.push(LossPoint {
            split: "test",
            step: epoch * batches_per_epoch,
            loss,
        });
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        write_csv(&self.path, &self.points)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Scalar {
    pub tag: &'static str,
    pub step: usize,
    pub value: f64,
}

/// Event stream of every scalar under `runs/<name>/`, mirrored as `tracing` events on the
/// `scalars` target.
pub struct ScalarLog {
    path: PathBuf,
    scalars: Vec<Scalar>,
}

impl ScalarLog {
    pub fn new(runs_dir: &Path, run_name: &str) -> anyhow::Result<Self> {
        let dir = runs_dir.join(run_name);
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self {
            path: dir.join("scalars.csv"),
            scalars: Vec::new(),
        })
    }

    fn add_scalar(&mut self, tag: &'static str, step: usize, value: f64) {
        tracing::info!(target: "scalars", tag, step, value);
        self.scalars.push(Scalar { tag, step, value });
    }

    pub fn scalars(&self) -> &[Scalar] {
        &self.scalars
    }
}

impl LossRecorder for ScalarLog {
    fn train_item(&mut self, step: usize, loss: f64) {
        self.add_scalar("train_data/loss", step, loss);
    }

    fn test_item(&mut self, epoch: usize, batches_per_epoch: usize, loss: f64) {
        self.add_scalar("test_data/loss", epoch * batches_per_epoch, loss);
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        write_csv(&self.path, &self.scalars)
    }
}
