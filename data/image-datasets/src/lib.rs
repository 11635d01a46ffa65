use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{backend::Backend, Tensor, TensorData},
};

mod dataset;
mod dsprites;
mod error;
mod mnist;

pub use dataset::{DatasetKind, DatasetSplits, ImageDataset};
pub use dsprites::{DspritesImages, DSPRITES_FILE};
pub use error::DatasetError;
pub use mnist::MnistImages;

/// A single-channel square image with pixel intensities in `[0, 1]`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub side: usize,
}

impl ImageItem {
    pub fn new(pixels: Vec<f32>, side: usize) -> Self {
        debug_assert_eq!(pixels.len(), side * side);
        Self { pixels, side }
    }
}

#[derive(Clone)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let side = items.first().map(|item| item.side).unwrap_or_default();
        let len = items.len();
        let pixels: Vec<f32> = items.into_iter().flat_map(|item| item.pixels).collect();

        let data = TensorData::new(pixels, [len, 1, side, side]);
        let images = Tensor::<B, 4>::from_data(data, &self.device);
        tracing::trace!("loaded batch of {:?}", images.shape());

        ImageBatch { images }
    }
}

/// Images stacked as `[batch, 1, side, side]`.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    pub images: Tensor<B, 4>,
}
