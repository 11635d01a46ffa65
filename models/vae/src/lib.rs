//! β-VAE models for single-channel images together with the loop that trains them and the
//! artifacts a run leaves behind: reconstructions, prior samples, latent traversals, loss
//! curves and a checkpoint.

mod checkpoint;
pub mod images;
pub mod latent;
pub mod loss;
pub mod metrics;
mod model;
mod training;

pub use checkpoint::Checkpoint;
pub use model::{Decoder, Encoder, ModelKind, UnknownModel, Vae, VaeConfig, VaeOutput};
pub use training::*;
