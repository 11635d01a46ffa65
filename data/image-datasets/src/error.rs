use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset not found: {0}. Try: MNIST, dSprites")]
    UnknownDataset(String),

    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read npz archive: {0}")]
    Npz(#[from] ndarray_npy::ReadNpzError),

    #[error("array `{0}` not present in archive")]
    MissingArray(&'static str),

    #[error("expected {expected}x{expected} images, found {found:?}")]
    ImageShape { expected: usize, found: Vec<usize> },

    #[error("validation split must be within [0, 1), got {0}")]
    InvalidSplit(f64),
}
