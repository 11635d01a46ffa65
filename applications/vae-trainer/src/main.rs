use std::path::Path;

use anyhow::Context;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};
use clap::Parser;
use image_datasets::DatasetSplits;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vae::{
    metrics::{LossPlot, LossRecorder, ScalarLog},
    train, Checkpoint, RunOutput, TrainingConfig,
};

mod cli;

#[cfg(test)]
mod test;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cmd = cli::Cli::parse();
    info!("Running on GPU: {}", !cmd.no_gpu);
    info!("Arguments: {cmd:#?}");

    let dir_name = cmd.results_dir_name();
    let artifact_dir = Path::new(&dir_name);
    prepare_results_dir(artifact_dir)?;

    let splits = cmd.data.load(&cmd.data_dir, cmd.val_split, cmd.seed)?;
    let config = cmd.training_config();

    let mut recorder: Box<dyn LossRecorder> = if cmd.scalar_log {
        Box::new(ScalarLog::new(Path::new("runs"), &dir_name)?)
    } else {
        Box::new(LossPlot::new(artifact_dir, config.plot_interval))
    };
    let output = RunOutput {
        artifact_dir,
        checkpoint: Checkpoint::new(artifact_dir, cmd.model_name.name()),
        resume: cmd.resume,
    };

    if cmd.no_gpu {
        type MyAutodiffBackend = Autodiff<NdArray<f32>>;
        run::<MyAutodiffBackend>(splits, output, config, NdArrayDevice::default(), recorder.as_mut())
    } else {
        type MyAutodiffBackend = Autodiff<Wgpu>;
        run::<MyAutodiffBackend>(splits, output, config, WgpuDevice::default(), recorder.as_mut())
    }
}

fn run<B: AutodiffBackend>(
    splits: DatasetSplits,
    output: RunOutput<'_>,
    config: TrainingConfig,
    device: B::Device,
    recorder: &mut dyn LossRecorder,
) -> anyhow::Result<()> {
    train::<B, _>(splits.train, splits.test, output, config, device, recorder)?;
    Ok(())
}

fn prepare_results_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        info!("Directory {} already exists", dir.display());
    } else {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        info!("Directory {} created", dir.display());
    }
    Ok(())
}
