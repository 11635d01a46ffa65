use burn::tensor::{backend::Backend, Tensor};

const PROBABILITY_EPSILON: f32 = 1e-7;

/// Batch-summed terms of the β-VAE objective.
#[derive(Debug, Clone)]
pub struct VaeLoss<B: Backend> {
    pub total: Tensor<B, 1>,
    pub reconstruction: Tensor<B, 1>,
    pub kl: Tensor<B, 1>,
}

/// Bernoulli negative log-likelihood of `target` under `reconstruction`, summed over every pixel.
pub fn binary_cross_entropy<B: Backend, const D: usize>(
    reconstruction: Tensor<B, D>,
    target: Tensor<B, D>,
) -> Tensor<B, 1> {
    let probabilities = reconstruction.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
    let log_p = probabilities.clone().log();
    let log_not_p = probabilities.neg().add_scalar(1.0).log();
    let not_target = target.clone().neg().add_scalar(1.0);

    (target * log_p + not_target * log_not_p).sum().neg()
}

/// `KL(N(mu, exp(logvar)) || N(0, I))` summed over the batch and latent dimensions.
pub fn kl_divergence<B: Backend>(mu: Tensor<B, 2>, logvar: Tensor<B, 2>) -> Tensor<B, 1> {
    let mu_squared = mu.clone() * mu;
    let variance = logvar.clone().exp();

    (logvar.add_scalar(1.0) - mu_squared - variance)
        .sum()
        .mul_scalar(-0.5)
}

pub fn vae_loss<B: Backend>(
    reconstruction: Tensor<B, 4>,
    target: Tensor<B, 4>,
    mu: Tensor<B, 2>,
    logvar: Tensor<B, 2>,
    beta: f64,
) -> VaeLoss<B> {
    let reconstruction = binary_cross_entropy(reconstruction, target);
    let kl = kl_divergence(mu, logvar);
    let total = reconstruction.clone() + kl.clone().mul_scalar(beta);

    VaeLoss {
        total,
        reconstruction,
        kl,
    }
}
