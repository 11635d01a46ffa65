use burn::data::dataset::{
    vision::{MnistDataset, MnistItem},
    Dataset,
};

use crate::ImageItem;

pub const MNIST_SIDE: usize = 28;

/// MNIST digits with intensities rescaled from `0..=255` to `[0, 1]`. Labels are dropped.
pub struct MnistImages {
    inner: MnistDataset,
}

impl MnistImages {
    pub fn train() -> Self {
        Self {
            inner: MnistDataset::train(),
        }
    }

    pub fn test() -> Self {
        Self {
            inner: MnistDataset::test(),
        }
    }
}

impl Dataset<ImageItem> for MnistImages {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.inner.get(index).map(to_image_item)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

fn to_image_item(item: MnistItem) -> ImageItem {
    let pixels = item
        .image
        .iter()
        .flat_map(|row| row.iter())
        .map(|value| value / 255.0)
        .collect();

    ImageItem::new(pixels, MNIST_SIDE)
}
