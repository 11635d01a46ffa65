use std::path::{Path, PathBuf};

use anyhow::Context;
use burn::{
    config::Config,
    module::Module,
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
};

use crate::{TrainingConfig, Vae};

/// File layout of a saved run: `<name>_config.json`, `<name>_model.mpk` and
/// `<name>_optimizer.mpk` side by side.
type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
    name: String,
}

impl Checkpoint {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(format!("{}_config.json", self.name))
    }

    /// Path handed to the recorder, which appends the `.mpk` extension.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{}_model", self.name))
    }

    pub fn optimizer_path(&self) -> PathBuf {
        self.dir.join(format!("{}_optimizer", self.name))
    }

    pub fn exists(&self) -> bool {
        self.config_path().exists() && self.model_path().with_extension("mpk").exists()
    }

    pub fn save<B, O>(&self, config: &TrainingConfig, model: &Vae<B>, optimizer: &O) -> anyhow::Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Vae<B>, B>,
    {
        config
            .save(self.config_path())
            .with_context(|| format!("failed to write {}", self.config_path().display()))?;

        let recorder = CheckpointRecorder::new();
        model
            .clone()
            .save_file(self.model_path(), &recorder)
            .with_context(|| format!("failed to save model to {}", self.model_path().display()))?;
        Recorder::<B>::record(&recorder, optimizer.to_record(), self.optimizer_path())
            .with_context(|| format!("failed to save optimizer to {}", self.optimizer_path().display()))?;

        tracing::info!("Model saved to {}", self.model_path().display());
        Ok(())
    }

    pub fn load_config(&self) -> anyhow::Result<TrainingConfig> {
        TrainingConfig::load(self.config_path())
            .map_err(|err| anyhow::anyhow!("failed to read {}: {err}", self.config_path().display()))
    }

    /// Rebuilds the architecture from the saved config, then loads the trained parameters.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> anyhow::Result<(TrainingConfig, Vae<B>)> {
        let config = self.load_config()?;
        let model = config
            .model
            .init::<B>(device)
            .load_file(self.model_path(), &CheckpointRecorder::new(), device)
            .with_context(|| format!("failed to load model from {}", self.model_path().display()))?;

        Ok((config, model))
    }

    pub fn load_optimizer<B, O>(&self, optimizer: O, device: &B::Device) -> anyhow::Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<Vae<B>, B>,
    {
        let record = Recorder::<B>::load(&CheckpointRecorder::new(), self.optimizer_path(), device)
            .with_context(|| format!("failed to load optimizer from {}", self.optimizer_path().display()))?;

        Ok(optimizer.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelKind, VaeConfig};
    use burn::{
        backend::{Autodiff, NdArray},
        optim::{AdamConfig, GradientsParams},
        tensor::Tensor,
    };

    type TestBackend = Autodiff<NdArray<f32>>;

    fn decoder_step<O>(model: Vae<TestBackend>, optimizer: &mut O, codes: &Tensor<TestBackend, 2>) -> Vae<TestBackend>
    where
        O: Optimizer<Vae<TestBackend>, TestBackend>,
    {
        let grads = model.decode(codes.clone()).sum().backward();
        let grads = GradientsParams::from_grads(grads, &model);
        optimizer.step(1.0e-3, model, grads)
    }

    #[test]
    fn saved_model_decodes_like_the_trained_one() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = TrainingConfig::new(
            VaeConfig::for_images(ModelKind::ConvVae, 2, 28),
            AdamConfig::new(),
        );
        let model = config.model.init::<TestBackend>(&device);
        let optimizer = config.optimizer.init::<TestBackend, Vae<TestBackend>>();

        let checkpoint = Checkpoint::new(dir.path(), "conv_vae");
        assert!(!checkpoint.exists());
        checkpoint.save(&config, &model, &optimizer).unwrap();
        assert!(checkpoint.exists());

        let (loaded_config, loaded) = checkpoint.load_model::<TestBackend>(&device).unwrap();
        assert_eq!(loaded_config.model.kind, ModelKind::ConvVae);
        assert_eq!(loaded.num_params(), model.num_params());

        let codes = Tensor::<TestBackend, 2>::from_floats([[0.5, -1.0]], &device);
        let expected = model.decode(codes.clone()).into_data().to_vec::<f32>().unwrap();
        let actual = loaded.decode(codes).into_data().to_vec::<f32>().unwrap();
        assert_eq!(actual, expected);

        checkpoint
            .load_optimizer::<TestBackend, _>(optimizer, &device)
            .unwrap();
    }

    #[test]
    fn resumed_optimizer_takes_the_same_step() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = TrainingConfig::new(
            VaeConfig::for_images(ModelKind::Vae, 2, 8),
            AdamConfig::new(),
        );
        let codes = Tensor::<TestBackend, 2>::from_floats([[0.5, -1.0], [0.1, 2.0]], &device);

        let mut optimizer = config.optimizer.init::<TestBackend, Vae<TestBackend>>();
        let model = decoder_step(config.model.init::<TestBackend>(&device), &mut optimizer, &codes);

        let checkpoint = Checkpoint::new(dir.path(), "vae");
        checkpoint.save(&config, &model, &optimizer).unwrap();
        let (_, loaded) = checkpoint.load_model::<TestBackend>(&device).unwrap();
        let mut restored = checkpoint
            .load_optimizer::<TestBackend, _>(
                config.optimizer.init::<TestBackend, Vae<TestBackend>>(),
                &device,
            )
            .unwrap();

        let continued = decoder_step(model, &mut optimizer, &codes);
        let resumed = decoder_step(loaded, &mut restored, &codes);
        assert_eq!(
            resumed.decode(codes.clone()).into_data().to_vec::<f32>().unwrap(),
            continued.decode(codes.clone()).into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn missing_checkpoint_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path(), "vae");
        assert!(checkpoint.load_model::<TestBackend>(&Default::default()).is_err());
    }
}
