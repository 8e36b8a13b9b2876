//! Read-only access to the datasets of a tome container.
//!
//! A tome is a hierarchical container addressed by slash-separated paths
//! (`gene_names`, `data/exon/p`, ...). Everything above this module talks to
//! the container exclusively through [`TomeBackend`], so the catalogs and the
//! sparse readers work the same over an HDF5 file and over arrays already held
//! in memory.

use std::ops::Range;

use crate::catalog::AnnotationColumn;
use crate::error::Result;

#[cfg(feature = "hdf5")]
pub mod h5;
pub mod memory;

#[cfg(feature = "hdf5")]
pub use h5::H5Backend;
pub use memory::{MemoryBackend, MemoryDataset};

pub trait TomeBackend {
    /// Whether a dataset exists at `path`.
    fn has_dataset(&self, path: &str) -> bool;

    /// Names of the direct members of a group, in container order.
    fn member_names(&self, group: &str) -> Result<Vec<String>>;

    /// Number of elements of a one-dimensional dataset.
    fn dataset_len(&self, path: &str) -> Result<usize>;

    /// Read a whole string dataset, decoding every entry as UTF-8.
    fn read_strings(&self, path: &str) -> Result<Vec<String>>;

    /// Read a whole annotation column, keeping its element kind.
    fn read_column(&self, path: &str) -> Result<AnnotationColumn>;

    /// Read a whole integer dataset as unsigned 64-bit values.
    fn read_u64(&self, path: &str) -> Result<Vec<u64>>;

    /// Positional read of `range` from an integer dataset.
    fn read_u32_range(&self, path: &str, range: Range<usize>) -> Result<Vec<u32>>;
}

impl<T: TomeBackend + ?Sized> TomeBackend for &T {
    fn has_dataset(&self, path: &str) -> bool {
        (**self).has_dataset(path)
    }

    fn member_names(&self, group: &str) -> Result<Vec<String>> {
        (**self).member_names(group)
    }

    fn dataset_len(&self, path: &str) -> Result<usize> {
        (**self).dataset_len(path)
    }

    fn read_strings(&self, path: &str) -> Result<Vec<String>> {
        (**self).read_strings(path)
    }

    fn read_column(&self, path: &str) -> Result<AnnotationColumn> {
        (**self).read_column(path)
    }

    fn read_u64(&self, path: &str) -> Result<Vec<u64>> {
        (**self).read_u64(path)
    }

    fn read_u32_range(&self, path: &str, range: Range<usize>) -> Result<Vec<u32>> {
        (**self).read_u32_range(path, range)
    }
}

/// Decode raw byte strings, stripping the NUL padding of fixed-length storage.
pub(crate) fn decode_utf8(path: &str, raw: Vec<Vec<u8>>) -> Result<Vec<String>> {
    raw.into_iter()
        .enumerate()
        .map(|(row, mut bytes)| {
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            String::from_utf8(bytes).map_err(|err| crate::TomeError::Decode {
                path: path.to_string(),
                reason: format!("entry {row} is not valid UTF-8: {err}"),
            })
        })
        .collect()
}

pub(crate) fn missing_dataset(path: &str) -> crate::TomeError {
    crate::TomeError::Schema(format!("missing dataset '{path}'"))
}

pub(crate) fn negative_value(path: &str, row: usize, value: i64) -> crate::TomeError {
    crate::TomeError::Schema(format!("'{path}' holds negative value {value} at entry {row}"))
}
