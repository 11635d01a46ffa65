use std::path::Path;

use anyhow::Context;
use burn::{
    config::Config,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::{AutodiffModule, Module},
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion, Tensor},
};
use image_datasets::{ImageBatcher, ImageItem};
use tracing::info;

use crate::{
    images::save_image_grid,
    latent::{prior_samples, traversal_grid},
    loss::vae_loss,
    metrics::LossRecorder,
    Checkpoint, Vae, VaeConfig,
};

const SAMPLES_PER_ROW: usize = 8;

#[derive(Config)]
pub struct TrainingConfig {
    pub model: VaeConfig,
    pub optimizer: AdamConfig,
    #[config(default = 10)]
    pub num_epochs: usize,
    #[config(default = 128)]
    pub batch_size: usize,
    #[config(default = 4)]
    pub num_workers: usize,
    #[config(default = 1)]
    pub seed: u64,
    #[config(default = 1.0e-3)]
    pub learning_rate: f64,
    /// Multiplicative learning-rate decay applied once per epoch.
    #[config(default = 0.98)]
    pub lr_decay: f64,
    #[config(default = 1.0)]
    pub beta: f64,
    #[config(default = 10)]
    pub log_interval: usize,
    #[config(default = 50)]
    pub plot_interval: usize,
    #[config(default = 64)]
    pub num_samples: usize,
    #[config(default = 11)]
    pub traversal_steps: usize,
    #[config(default = 3.0)]
    pub traversal_range: f32,
    #[config(default = 8)]
    pub comparison_images: usize,
}

impl TrainingConfig {
    /// Learning rate used throughout `epoch` (1-based).
    pub fn epoch_learning_rate(&self, epoch: usize) -> f64 {
        self.learning_rate * self.lr_decay.powi(epoch.saturating_sub(1) as i32)
    }

    /// Rate in effect once `epoch` has finished and the schedule has decayed.
    pub fn learning_rate_after(&self, epoch: usize) -> f64 {
        self.epoch_learning_rate(epoch + 1)
    }
}

/// Where a run keeps its artifacts and whether it picks up an earlier checkpoint.
pub struct RunOutput<'a> {
    pub artifact_dir: &'a Path,
    pub checkpoint: Checkpoint,
    pub resume: bool,
}

pub fn train<B, D>(
    train_set: D,
    test_set: D,
    output: RunOutput<'_>,
    config: TrainingConfig,
    device: B::Device,
    recorder: &mut dyn LossRecorder,
) -> anyhow::Result<Vae<B>>
where
    B: AutodiffBackend,
    D: Dataset<ImageItem> + 'static,
{
    let artifact_dir = output.artifact_dir;
    std::fs::create_dir_all(artifact_dir)
        .with_context(|| format!("failed to create {}", artifact_dir.display()))?;
    config
        .save(artifact_dir.join("config.json"))
        .context("failed to save training config")?;

    B::seed(config.seed);

    let train_len = train_set.len();
    let test_len = test_set.len();
    anyhow::ensure!(train_len > 0, "training set is empty");
    anyhow::ensure!(test_len > 0, "test set is empty");

    let batcher_train = ImageBatcher::<B>::new(device.clone());
    let batcher_test = ImageBatcher::<B::InnerBackend>::new(device.clone());

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(train_set);

    let dataloader_test = DataLoaderBuilder::new(batcher_test)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(test_set);

    let mut model = config.model.init::<B>(&device);
    let mut optim = config.optimizer.init::<B, Vae<B>>();

    if output.resume && output.checkpoint.exists() {
        let (_, loaded) = output.checkpoint.load_model::<B>(&device)?;
        model = loaded;
        optim = output.checkpoint.load_optimizer::<B, _>(optim, &device)?;
        info!("Resumed from {}", output.checkpoint.model_path().display());
    }

    info!("Total parameters: {}", model.num_params());

    let batches_per_epoch = train_len.div_ceil(config.batch_size);
    let log_interval = config.log_interval.max(1);
    let mut step = 0;

    for epoch in 1..=config.num_epochs {
        let lr = config.epoch_learning_rate(epoch);

        let mut running_loss = 0.0;
        for (iteration, batch) in dataloader_train.iter().enumerate() {
            let batch_len = batch.images.dims()[0];
            let prediction = model.forward(batch.images.clone());
            let loss = vae_loss(
                prediction.reconstruction,
                batch.images,
                prediction.mu,
                prediction.logvar,
                config.beta,
            );

            let loss_value = loss.total.clone().into_scalar().elem::<f64>();
            let grads = GradientsParams::from_grads(loss.total.backward(), &model);
            model = optim.step(lr, model, grads);

            running_loss += loss_value;
            recorder.train_item(step, loss_value / batch_len as f64);
            step += 1;

            if iteration % log_interval == 0 && iteration != 0 {
                info!(
                    "Train Epoch: {} [{}/{} ({:.0}%)]\tLoss: {:.6}",
                    epoch,
                    iteration * batch_len,
                    train_len,
                    100.0 * iteration as f64 / batches_per_epoch as f64,
                    loss_value / batch_len as f64
                );
            }
        }
        info!(
            "====> Epoch: {} Average loss: {:.4}",
            epoch,
            running_loss / train_len as f64
        );

        let model_valid = model.valid();
        let mut test_loss = 0.0;
        for (iteration, batch) in dataloader_test.iter().enumerate() {
            let prediction = model_valid.forward(batch.images.clone());
            if iteration == 0 {
                let shown = batch.images.dims()[0].min(config.comparison_images);
                let comparison = Tensor::cat(
                    vec![
                        batch.images.clone().slice([0..shown]),
                        prediction.reconstruction.clone().slice([0..shown]),
                    ],
                    0,
                );
                save_image_grid(
                    comparison,
                    shown,
                    &artifact_dir.join(format!("reconstruction_{epoch}.png")),
                )?;
            }

            let loss = vae_loss(
                prediction.reconstruction,
                batch.images,
                prediction.mu,
                prediction.logvar,
                config.beta,
            );
            test_loss += loss.total.into_scalar().elem::<f64>();
        }
        test_loss /= test_len as f64;
        recorder.test_item(epoch, batches_per_epoch, test_loss);
        info!("====> Test set loss: {:.4}", test_loss);
        info!("====> Learning rate: {:.7}", config.learning_rate_after(epoch));

        let samples = prior_samples(&model_valid, config.num_samples, &device);
        save_image_grid(
            samples,
            SAMPLES_PER_ROW,
            &artifact_dir.join(format!("sample_{epoch}.png")),
        )?;
    }

    recorder.flush()?;
    output.checkpoint.save(&config, &model, &optim)?;

    let traversal = traversal_grid(
        &model.valid(),
        config.traversal_steps,
        config.traversal_range,
        &device,
    );
    save_image_grid(
        traversal,
        config.traversal_steps,
        &artifact_dir.join("sample_latent_space.png"),
    )?;
    info!("Latent space sampled");
    info!("--- training complete ---");

    Ok(model)
}
