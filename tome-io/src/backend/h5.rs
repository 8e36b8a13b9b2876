use std::ops::Range;
use std::path::Path;

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File};

use super::{TomeBackend, decode_utf8, missing_dataset, negative_value};
use crate::catalog::AnnotationColumn;
use crate::error::{Result, TomeError};

///
/// A tome stored as an HDF5 file, opened read-only.
///
/// The file handle is closed when the backend is dropped.
///
#[derive(Debug)]
pub struct H5Backend {
    file: File,
}

impl H5Backend {
    ///
    /// Open a tome file read-only.
    ///
    /// # Arguments
    /// - path: path to the `.tome` file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TomeError::StoreOpen {
                path: path.display().to_string(),
                reason: "no such file".to_string(),
            });
        }

        let file = File::open(path).map_err(|err| TomeError::StoreOpen {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self { file })
    }

    fn dataset(&self, path: &str) -> Result<Dataset> {
        self.file.dataset(path).map_err(|_| missing_dataset(path))
    }

    fn descriptor(dataset: &Dataset) -> Result<TypeDescriptor> {
        Ok(dataset.dtype()?.to_descriptor()?)
    }

    fn read_raw_strings(&self, path: &str, dataset: &Dataset) -> Result<Vec<Vec<u8>>> {
        match Self::descriptor(dataset)? {
            TypeDescriptor::VarLenUnicode => Ok(dataset
                .read_raw::<VarLenUnicode>()?
                .iter()
                .map(|s| s.as_bytes().to_vec())
                .collect()),
            TypeDescriptor::VarLenAscii => Ok(dataset
                .read_raw::<VarLenAscii>()?
                .iter()
                .map(|s| s.as_bytes().to_vec())
                .collect()),
            TypeDescriptor::FixedAscii(size) => match size {
                0..=16 => read_fixed_ascii::<16>(dataset),
                17..=64 => read_fixed_ascii::<64>(dataset),
                65..=256 => read_fixed_ascii::<256>(dataset),
                257..=1024 => read_fixed_ascii::<1024>(dataset),
                _ => Err(too_wide(path, size)),
            },
            TypeDescriptor::FixedUnicode(size) => match size {
                0..=16 => read_fixed_unicode::<16>(dataset),
                17..=64 => read_fixed_unicode::<64>(dataset),
                65..=256 => read_fixed_unicode::<256>(dataset),
                257..=1024 => read_fixed_unicode::<1024>(dataset),
                _ => Err(too_wide(path, size)),
            },
            other => Err(TomeError::Decode {
                path: path.to_string(),
                reason: format!("expected a string dataset, found {other:?}"),
            }),
        }
    }
}

fn read_fixed_ascii<const N: usize>(dataset: &Dataset) -> Result<Vec<Vec<u8>>> {
    Ok(dataset
        .read_raw::<FixedAscii<N>>()?
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect())
}

fn read_fixed_unicode<const N: usize>(dataset: &Dataset) -> Result<Vec<Vec<u8>>> {
    Ok(dataset
        .read_raw::<FixedUnicode<N>>()?
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect())
}

fn too_wide(path: &str, size: usize) -> TomeError {
    TomeError::Decode {
        path: path.to_string(),
        reason: format!("fixed-length strings of {size} bytes are not supported"),
    }
}

impl TomeBackend for H5Backend {
    fn has_dataset(&self, path: &str) -> bool {
        self.file.dataset(path).is_ok()
    }

    fn member_names(&self, group: &str) -> Result<Vec<String>> {
        let group = self
            .file
            .group(group)
            .map_err(|_| TomeError::Schema(format!("missing group '{group}'")))?;
        Ok(group.member_names()?)
    }

    fn dataset_len(&self, path: &str) -> Result<usize> {
        let dataset = self.dataset(path)?;
        if dataset.ndim() != 1 {
            return Err(TomeError::Schema(format!(
                "dataset '{path}' has {} dimensions, expected 1",
                dataset.ndim()
            )));
        }
        Ok(dataset.size())
    }

    fn read_strings(&self, path: &str) -> Result<Vec<String>> {
        let dataset = self.dataset(path)?;
        let raw = self.read_raw_strings(path, &dataset)?;
        decode_utf8(path, raw)
    }

    fn read_column(&self, path: &str) -> Result<AnnotationColumn> {
        let dataset = self.dataset(path)?;
        match Self::descriptor(&dataset)? {
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
                Ok(AnnotationColumn::Integer(dataset.read_raw::<i64>()?))
            }
            TypeDescriptor::Boolean => Ok(AnnotationColumn::Integer(
                dataset
                    .read_raw::<bool>()?
                    .into_iter()
                    .map(i64::from)
                    .collect(),
            )),
            TypeDescriptor::Float(_) => Ok(AnnotationColumn::Float(dataset.read_raw::<f64>()?)),
            _ => {
                let raw = self.read_raw_strings(path, &dataset)?;
                Ok(AnnotationColumn::Text(decode_utf8(path, raw)?))
            }
        }
    }

    fn read_u64(&self, path: &str) -> Result<Vec<u64>> {
        let dataset = self.dataset(path)?;
        match Self::descriptor(&dataset)? {
            TypeDescriptor::Unsigned(_) => Ok(dataset.read_raw::<u64>()?),
            // signed storage converts negatives to 0 when read as u64
            TypeDescriptor::Integer(_) => dataset
                .read_raw::<i64>()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| u64::try_from(v).map_err(|_| negative_value(path, row, v)))
                .collect(),
            other => Err(TomeError::Decode {
                path: path.to_string(),
                reason: format!("expected an integer dataset, found {other:?}"),
            }),
        }
    }

    fn read_u32_range(&self, path: &str, range: Range<usize>) -> Result<Vec<u32>> {
        let dataset = self.dataset(path)?;
        if range.start > range.end || range.end > dataset.size() {
            return Err(TomeError::Schema(format!(
                "range {}..{} is out of bounds for '{path}' of length {}",
                range.start,
                range.end,
                dataset.size()
            )));
        }

        // empty hyperslabs are not valid selections
        if range.is_empty() {
            return Ok(Vec::new());
        }

        Ok(dataset.read_slice_1d::<u32, _>(range)?.to_vec())
    }
}
