use burn::tensor::{backend::Backend, Distribution, Tensor, TensorData};

use crate::Vae;

/// Evenly spaced points over `[-range, range]`, endpoints included.
pub fn linspace(range: f32, steps: usize) -> Vec<f32> {
    match steps {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let step = 2.0 * range / (steps - 1) as f32;
            (0..steps).map(|k| -range + step * k as f32).collect()
        }
    }
}

/// Latent codes for a traversal: `z_dim * steps` rows of width `z_dim`, row `d * steps + k`
/// being zero except coordinate `d`, which takes the `k`-th point of the sweep.
pub fn traversal_codes(z_dim: usize, steps: usize, range: f32) -> Vec<f32> {
    let sweep = linspace(range, steps);
    let mut codes = vec![0.0; z_dim * steps * z_dim];
    for dim in 0..z_dim {
        for (k, value) in sweep.iter().enumerate() {
            codes[(dim * steps + k) * z_dim + dim] = *value;
        }
    }
    codes
}

/// Decodes a one-dimension-at-a-time sweep of the latent space, one row per dimension.
pub fn traversal_grid<B: Backend>(
    model: &Vae<B>,
    steps: usize,
    range: f32,
    device: &B::Device,
) -> Tensor<B, 4> {
    let z_dim = model.z_dim();
    let codes = TensorData::new(traversal_codes(z_dim, steps, range), [z_dim * steps, z_dim]);
    model.decode(Tensor::from_data(codes, device))
}

/// Decodes `count` codes drawn from the standard normal prior.
pub fn prior_samples<B: Backend>(model: &Vae<B>, count: usize, device: &B::Device) -> Tensor<B, 4> {
    let codes = Tensor::random([count, model.z_dim()], Distribution::Normal(0.0, 1.0), device);
    model.decode(codes)
}
