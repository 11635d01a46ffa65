use std::{fs::File, path::Path, sync::Arc};

use burn::data::dataset::Dataset;
use ndarray::{Array3, Axis};
use ndarray_npy::NpzReader;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{DatasetError, ImageItem};

pub const DSPRITES_FILE: &str = "dsprites_ndarray_co1sh3sc6or40x32y32_64x64.npz";
pub const DSPRITES_SIDE: usize = 64;

/// A view over a subset of the dSprites images. All splits share the decoded archive.
#[derive(Clone)]
pub struct DspritesImages {
    images: Arc<Array3<u8>>,
    indices: Vec<usize>,
}

impl DspritesImages {
    /// Reads the `imgs` array (`[N, 64, 64]`, binary pixels) out of the dSprites archive.
    pub fn read_archive(path: &Path) -> Result<Arc<Array3<u8>>, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut npz = NpzReader::new(file)?;

        let name = npz
            .names()?
            .into_iter()
            .find(|name| name == "imgs.npy" || name == "imgs")
            .ok_or(DatasetError::MissingArray("imgs"))?;
        let images: Array3<u8> = npz.by_name(&name)?;

        let shape = images.shape();
        if shape[1] != DSPRITES_SIDE || shape[2] != DSPRITES_SIDE {
            return Err(DatasetError::ImageShape {
                expected: DSPRITES_SIDE,
                found: shape.to_vec(),
            });
        }
        tracing::info!("read {} dSprites images from {}", shape[0], path.display());

        Ok(Arc::new(images))
    }

    #[cfg(test)]
    pub fn all(images: Arc<Array3<u8>>) -> Self {
        let indices = (0..images.len_of(Axis(0))).collect();
        Self { images, indices }
    }

    /// Shuffles image indices with `seed` and returns `(train, validation)`, where the
    /// validation part holds the first `floor(val_split * N)` shuffled indices.
    pub fn split(
        images: Arc<Array3<u8>>,
        val_split: f64,
        seed: u64,
    ) -> Result<(Self, Self), DatasetError> {
        if !(0.0..1.0).contains(&val_split) {
            return Err(DatasetError::InvalidSplit(val_split));
        }

        let total = images.len_of(Axis(0));
        let mut indices: Vec<usize> = (0..total).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let split = (val_split * total as f64).floor() as usize;
        let train_indices = indices.split_off(split);

        let validation = Self {
            images: images.clone(),
            indices,
        };
        let train = Self {
            images,
            indices: train_indices,
        };

        Ok((train, validation))
    }

    #[cfg(test)]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl Dataset<ImageItem> for DspritesImages {
    fn get(&self, index: usize) -> Option<ImageItem> {
        let image_index = *self.indices.get(index)?;
        let pixels = self
            .images
            .index_axis(Axis(0), image_index)
            .iter()
            .map(|&value| f32::from(value))
            .collect();

        Some(ImageItem::new(pixels, DSPRITES_SIDE))
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::NpzWriter;
    use std::collections::HashSet;

    fn synthetic_images(count: usize) -> Arc<Array3<u8>> {
        Arc::new(Array3::from_shape_fn(
            (count, DSPRITES_SIDE, DSPRITES_SIDE),
            |(n, y, x)| ((n + y + x) % 2) as u8,
        ))
    }

    #[test]
    fn split_is_disjoint_and_covers_every_image() {
        let images = synthetic_images(25);
        let (train, validation) = DspritesImages::split(images, 0.1, 7).unwrap();

        assert_eq!(validation.len(), 2);
        assert_eq!(train.len(), 23);

        let train_set: HashSet<_> = train.indices().iter().copied().collect();
        let validation_set: HashSet<_> = validation.indices().iter().copied().collect();
        assert!(train_set.is_disjoint(&validation_set));
        assert_eq!(train_set.len() + validation_set.len(), 25);
    }

    #[test]
    fn split_depends_only_on_seed() {
        let images = synthetic_images(40);
        let (_, first) = DspritesImages::split(images.clone(), 0.25, 11).unwrap();
        let (_, second) = DspritesImages::split(images.clone(), 0.25, 11).unwrap();
        let (_, other) = DspritesImages::split(images, 0.25, 12).unwrap();

        assert_eq!(first.indices(), second.indices());
        assert_ne!(first.indices(), other.indices());
    }

    #[test]
    fn split_rejects_fraction_outside_unit_interval() {
        let images = synthetic_images(4);
        assert!(matches!(
            DspritesImages::split(images, 1.0, 0),
            Err(DatasetError::InvalidSplit(_))
        ));
    }

    #[test]
    fn items_follow_shuffled_indices() {
        let images = synthetic_images(3);
        let all = DspritesImages::all(images.clone());
        let item = all.get(2).unwrap();

        assert_eq!(item.side, DSPRITES_SIDE);
        assert_eq!(item.pixels.len(), DSPRITES_SIDE * DSPRITES_SIDE);
        assert_eq!(item.pixels[0], f32::from(images[[2, 0, 0]]));
        assert_eq!(item.pixels[1], f32::from(images[[2, 0, 1]]));
        assert!(all.get(3).is_none());
    }

    #[test]
    fn reads_imgs_array_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DSPRITES_FILE);
        let images = Array3::<u8>::from_shape_fn((5, DSPRITES_SIDE, DSPRITES_SIDE), |(n, _, x)| {
            u8::from(x == n)
        });

        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array("imgs.npy", &images).unwrap();
        npz.finish().unwrap();

        let loaded = DspritesImages::read_archive(&path).unwrap();
        assert_eq!(loaded.shape(), &[5, DSPRITES_SIDE, DSPRITES_SIDE]);
        assert_eq!(*loaded, images);
    }

    #[test]
    fn rejects_archives_with_wrong_image_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DSPRITES_FILE);
        let images = Array3::<u8>::zeros((2, 28, 28));

        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array("imgs.npy", &images).unwrap();
        npz.finish().unwrap();

        assert!(matches!(
            DspritesImages::read_archive(&path),
            Err(DatasetError::ImageShape { expected: 64, .. })
        ));
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DspritesImages::read_archive(&dir.path().join(DSPRITES_FILE));
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }
}
