use clap::Parser;
use image_datasets::DatasetKind;
use vae::ModelKind;

use crate::{cli::Cli, prepare_results_dir};

#[test]
fn defaults_train_fully_connected_vae_on_mnist() {
    let cmd = Cli::try_parse_from(["vae-trainer"]).unwrap();

    assert_eq!(cmd.data, DatasetKind::Mnist);
    assert_eq!(cmd.model_name, ModelKind::Vae);
    assert_eq!(cmd.results_dir_name(), "results_mnist_vae_zdim-10_beta-1.0");

    let config = cmd.training_config();
    assert_eq!(config.model.img_size, 28);
    assert_eq!(config.num_epochs, 10);
    assert_eq!(config.learning_rate, 1.0e-3);
}

#[test]
fn flags_reach_the_training_config() {
    let cmd = Cli::try_parse_from([
        "vae-trainer",
        "--data",
        "dSprites",
        "--model-name",
        "conv_vae",
        "--z-dim",
        "6",
        "--beta",
        "4",
        "--epochs",
        "30",
        "--batch-size",
        "64",
        "--lr-decay",
        "0.9",
    ])
    .unwrap();

    assert_eq!(cmd.results_dir_name(), "results_dsprites_conv_vae_zdim-6_beta-4.0");

    let config = cmd.training_config();
    assert_eq!(config.model.kind, ModelKind::ConvVae);
    assert_eq!(config.model.z_dim, 6);
    assert_eq!(config.model.img_size, 64);
    assert_eq!(config.beta, 4.0);
    assert_eq!(config.num_epochs, 30);
    assert_eq!(config.batch_size, 64);
    assert_eq!(config.lr_decay, 0.9);
}

#[test]
fn extreme_betas_use_two_digit_exponents() {
    let small = Cli::try_parse_from(["vae-trainer", "--beta", "0.00001"]).unwrap();
    assert_eq!(small.results_dir_name(), "results_mnist_vae_zdim-10_beta-1e-05");

    let large = Cli::try_parse_from(["vae-trainer", "--beta", "2.5e16"]).unwrap();
    assert_eq!(large.results_dir_name(), "results_mnist_vae_zdim-10_beta-2.5e+16");

    let fraction = Cli::try_parse_from(["vae-trainer", "--beta", "0.25"]).unwrap();
    assert_eq!(fraction.results_dir_name(), "results_mnist_vae_zdim-10_beta-0.25");
}

#[test]
fn unsupported_dataset_is_rejected() {
    let result = Cli::try_parse_from(["vae-trainer", "--data", "cifar10"]);
    let message = result.unwrap_err().to_string();
    assert!(message.contains("Try: MNIST, dSprites"));
}

#[test]
fn unsupported_model_is_rejected() {
    assert!(Cli::try_parse_from(["vae-trainer", "--model-name", "gan"]).is_err());
}

#[test]
fn results_dir_is_created_once() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("results_mnist_vae_zdim-10_beta-1.0");

    prepare_results_dir(&dir).unwrap();
    assert!(dir.is_dir());
    prepare_results_dir(&dir).unwrap();
}
