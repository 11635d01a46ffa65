use std::{fmt, str::FromStr};

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        Linear, LinearConfig, PaddingConfig2d,
    },
    tensor::{
        activation::{relu, sigmoid},
        backend::Backend,
        Distribution, Tensor,
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONV_CHANNELS: [usize; 4] = [32, 32, 64, 64];
const MAX_CONV_LAYERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Fully connected encoder and decoder.
    Vae,
    /// Strided convolutions in the encoder, transposed convolutions in the decoder.
    ConvVae,
}

#[derive(Debug, Error)]
#[error("unknown model `{0}`. Try: vae, conv_vae")]
pub struct UnknownModel(String);

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Vae => "vae",
            ModelKind::ConvVae => "conv_vae",
        }
    }
}

impl FromStr for ModelKind {
    type Err = UnknownModel;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "vae" => Ok(ModelKind::Vae),
            "conv_vae" => Ok(ModelKind::ConvVae),
            _ => Err(UnknownModel(name.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Config)]
pub struct VaeConfig {
    pub kind: ModelKind,
    pub z_dim: usize,
    pub img_size: usize,
    /// Widths of the hidden linear layers between the image features and the latent code.
    pub hidden: Vec<usize>,
}

impl VaeConfig {
    pub fn for_images(kind: ModelKind, z_dim: usize, img_size: usize) -> Self {
        let hidden = match kind {
            ModelKind::Vae if img_size <= 28 => vec![400],
            ModelKind::Vae => vec![1200, 1200],
            ModelKind::ConvVae => vec![256],
        };
        Self::new(kind, z_dim, img_size, hidden)
    }

    /// Number of stride-2 convolutions: halve while the side stays even and above 4.
    pub fn conv_layers(&self) -> usize {
        if self.kind == ModelKind::Vae {
            return 0;
        }
        let mut side = self.img_size;
        let mut layers = 0;
        while layers < MAX_CONV_LAYERS && side > 4 && side % 2 == 0 {
            side /= 2;
            layers += 1;
        }
        layers
    }

    /// `(channels, side)` of the feature map the encoder flattens.
    pub fn feature_shape(&self) -> (usize, usize) {
        let layers = self.conv_layers();
        if layers == 0 {
            (1, self.img_size)
        } else {
            (CONV_CHANNELS[layers - 1], self.img_size >> layers)
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Vae<B> {
        let layers = self.conv_layers();
        let (channels, side) = self.feature_shape();
        let features = channels * side * side;

        let convs = (0..layers)
            .map(|layer| {
                let input = if layer == 0 { 1 } else { CONV_CHANNELS[layer - 1] };
                Conv2dConfig::new([input, CONV_CHANNELS[layer]], [4, 4])
                    .with_stride([2, 2])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device)
            })
            .collect();

        let mut widths = vec![features];
        widths.extend(self.hidden.iter().copied());
        let encoder_hidden = widths
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();
        let last = *widths.last().unwrap_or(&features);

        let encoder = Encoder {
            convs,
            hidden: encoder_hidden,
            mu: LinearConfig::new(last, self.z_dim).init(device),
            logvar: LinearConfig::new(last, self.z_dim).init(device),
        };

        let mut widths = vec![self.z_dim];
        widths.extend(self.hidden.iter().rev().copied());
        widths.push(features);
        let decoder_hidden = widths
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();

        let deconvs = (0..layers)
            .rev()
            .map(|layer| {
                let output = if layer == 0 { 1 } else { CONV_CHANNELS[layer - 1] };
                ConvTranspose2dConfig::new([CONV_CHANNELS[layer], output], [4, 4])
                    .with_stride([2, 2])
                    .with_padding([1, 1])
                    .init(device)
            })
            .collect();

        let decoder = Decoder {
            hidden: decoder_hidden,
            deconvs,
            channels,
            side,
            img_size: self.img_size,
        };

        Vae {
            encoder,
            decoder,
            z_dim: self.z_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    convs: Vec<Conv2d<B>>,
    hidden: Vec<Linear<B>>,
    mu: Linear<B>,
    logvar: Linear<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mut features = images;
        for conv in &self.convs {
            features = relu(conv.forward(features));
        }

        let mut x = features.flatten::<2>(1, 3);
        for linear in &self.hidden {
            x = relu(linear.forward(x));
        }

        (self.mu.forward(x.clone()), self.logvar.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    hidden: Vec<Linear<B>>,
    deconvs: Vec<ConvTranspose2d<B>>,
    channels: usize,
    side: usize,
    img_size: usize,
}

impl<B: Backend> Decoder<B> {
    pub fn forward(&self, latents: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch_size, _] = latents.dims();
        let last_linear = self.hidden.len().saturating_sub(1);

        let mut x = latents;
        for (index, linear) in self.hidden.iter().enumerate() {
            x = linear.forward(x);
            // The final projection of the fully connected decoder is the image itself.
            if index < last_linear || !self.deconvs.is_empty() {
                x = relu(x);
            }
        }

        let mut features = x.reshape([batch_size, self.channels, self.side, self.side]);
        let last_deconv = self.deconvs.len().saturating_sub(1);
        for (index, deconv) in self.deconvs.iter().enumerate() {
            features = deconv.forward(features);
            if index < last_deconv {
                features = relu(features);
            }
        }

        sigmoid(features).reshape([batch_size, 1, self.img_size, self.img_size])
    }
}

#[derive(Module, Debug)]
pub struct Vae<B: Backend> {
    encoder: Encoder<B>,
    decoder: Decoder<B>,
    z_dim: usize,
}

#[derive(Debug, Clone)]
pub struct VaeOutput<B: Backend> {
    pub reconstruction: Tensor<B, 4>,
    pub mu: Tensor<B, 2>,
    pub logvar: Tensor<B, 2>,
}

impl<B: Backend> Vae<B> {
    pub fn z_dim(&self) -> usize {
        self.z_dim
    }

    pub fn encode(&self, images: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        self.encoder.forward(images)
    }

    /// Draws `z = mu + exp(logvar / 2) * eps` with `eps ~ N(0, I)`, keeping the sample
    /// differentiable with respect to `mu` and `logvar`.
    pub fn reparameterize(&self, mu: Tensor<B, 2>, logvar: Tensor<B, 2>) -> Tensor<B, 2> {
        let std = logvar.mul_scalar(0.5).exp();
        let eps = Tensor::random(std.shape(), Distribution::Normal(0.0, 1.0), &std.device());
        mu + eps * std
    }

    pub fn decode(&self, latents: Tensor<B, 2>) -> Tensor<B, 4> {
        self.decoder.forward(latents)
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> VaeOutput<B> {
        let (mu, logvar) = self.encode(images);
        let z = self.reparameterize(mu.clone(), logvar.clone());
        let reconstruction = self.decode(z);

        VaeOutput {
            reconstruction,
            mu,
            logvar,
        }
    }
}
