use std::path::PathBuf;

use burn::optim::AdamConfig;
use clap::Parser;
use image_datasets::DatasetKind;
use vae::{ModelKind, TrainingConfig, VaeConfig};

/// Train a VAE on MNIST or dSprites and write reconstructions, samples and a checkpoint.
#[derive(Parser, Debug)]
pub struct Cli {
    /// Dataset: mnist or dsprites
    #[arg(long, default_value = "mnist")]
    pub data: DatasetKind,

    /// Model variant: vae or conv_vae
    #[arg(long, default_value = "vae")]
    pub model_name: ModelKind,

    #[arg(long, default_value_t = 10)]
    pub z_dim: usize,

    /// Weight of the KL-divergence term
    #[arg(long, default_value_t = 1.0)]
    pub beta: f64,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1.0e-3)]
    pub lr: f64,

    /// Per-epoch learning-rate decay factor
    #[arg(long, default_value_t = 0.98)]
    pub lr_decay: f64,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Batches between training log lines
    #[arg(long, default_value_t = 10)]
    pub log_interval: usize,

    /// Directory holding the dSprites archive
    #[arg(long, default_value = "datasets")]
    pub data_dir: PathBuf,

    /// Fraction of dSprites held out for testing
    #[arg(long, default_value_t = 0.1)]
    pub val_split: f64,

    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    /// Log every scalar under runs/ instead of writing the loss plot
    #[arg(long)]
    pub scalar_log: bool,

    /// Train on the CPU backend
    #[arg(long)]
    pub no_gpu: bool,

    /// Continue from the checkpoint in the results directory, if any
    #[arg(long)]
    pub resume: bool,
}

impl Cli {
    /// `results_<data>_<model>_zdim-<z>_beta-<b>`, with β in shortest round-trip form.
    pub fn results_dir_name(&self) -> String {
        format!(
            "results_{}_{}_zdim-{}_beta-{}",
            self.data,
            self.model_name,
            self.z_dim,
            format_beta(self.beta)
        )
    }

    pub fn training_config(&self) -> TrainingConfig {
        let model = VaeConfig::for_images(self.model_name, self.z_dim, self.data.img_size());

        TrainingConfig::new(model, AdamConfig::new())
            .with_num_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_num_workers(self.num_workers)
            .with_seed(self.seed)
            .with_learning_rate(self.lr)
            .with_lr_decay(self.lr_decay)
            .with_beta(self.beta)
            .with_log_interval(self.log_interval)
    }
}

/// Shortest round-trip form of `value` (`1.0`, `0.25`) with a signed, two-digit
/// exponent once it switches to scientific notation (`1e-05`, `1e+16`).
fn format_beta(value: f64) -> String {
    let repr = format!("{value:?}");
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => repr,
    }
}
