use std::{fmt, path::Path, str::FromStr};

use burn::data::dataset::Dataset;

use crate::{
    dsprites::{DspritesImages, DSPRITES_FILE, DSPRITES_SIDE},
    mnist::{MnistImages, MNIST_SIDE},
    DatasetError, ImageItem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Mnist,
    Dsprites,
}

impl DatasetKind {
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Mnist => "mnist",
            DatasetKind::Dsprites => "dsprites",
        }
    }

    pub fn img_size(&self) -> usize {
        match self {
            DatasetKind::Mnist => MNIST_SIDE,
            DatasetKind::Dsprites => DSPRITES_SIDE,
        }
    }

    /// Loads the train and test splits. MNIST ships its own split; dSprites is read from
    /// `data_dir` and split with `val_split` and `seed`.
    pub fn load(
        &self,
        data_dir: &Path,
        val_split: f64,
        seed: u64,
    ) -> Result<DatasetSplits, DatasetError> {
        let splits = match self {
            DatasetKind::Mnist => DatasetSplits {
                train: ImageDataset::Mnist(MnistImages::train()),
                test: ImageDataset::Mnist(MnistImages::test()),
            },
            DatasetKind::Dsprites => {
                let images = DspritesImages::read_archive(&data_dir.join(DSPRITES_FILE))?;
                let (train, test) = DspritesImages::split(images, val_split, seed)?;
                DatasetSplits {
                    train: ImageDataset::Dsprites(train),
                    test: ImageDataset::Dsprites(test),
                }
            }
        };

        tracing::info!("Total training datapoints: {}", splits.train.len());
        tracing::info!("Total testing datapoints: {}", splits.test.len());

        Ok(splits)
    }
}

impl FromStr for DatasetKind {
    type Err = DatasetError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_lowercase().as_str() {
            "mnist" => Ok(DatasetKind::Mnist),
            "dsprites" => Ok(DatasetKind::Dsprites),
            _ => Err(DatasetError::UnknownDataset(name.to_string())),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub enum ImageDataset {
    Mnist(MnistImages),
    Dsprites(DspritesImages),
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        match self {
            ImageDataset::Mnist(dataset) => dataset.get(index),
            ImageDataset::Dsprites(dataset) => dataset.get(index),
        }
    }

    fn len(&self) -> usize {
        match self {
            ImageDataset::Mnist(dataset) => dataset.len(),
            ImageDataset::Dsprites(dataset) => dataset.len(),
        }
    }
}

pub struct DatasetSplits {
    pub train: ImageDataset,
    pub test: ImageDataset,
}
