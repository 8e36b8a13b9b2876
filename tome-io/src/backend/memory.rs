use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use super::{TomeBackend, decode_utf8, missing_dataset, negative_value};
use crate::catalog::AnnotationColumn;
use crate::consts::{
    GENE_NAMES_PATH, SAMPLE_NAMES_PATH, annotation_path, counts_path, pointer_path,
    sample_index_path,
};
use crate::error::{Result, TomeError};

/// One dataset held by a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryDataset {
    Bytes(Vec<Vec<u8>>),
    Unsigned(Vec<u64>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
}

impl MemoryDataset {
    pub fn len(&self) -> usize {
        match self {
            MemoryDataset::Bytes(values) => values.len(),
            MemoryDataset::Unsigned(values) => values.len(),
            MemoryDataset::Integer(values) => values.len(),
            MemoryDataset::Float(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///
/// A tome container held entirely in memory, keyed by dataset path.
///
/// Useful for fixtures and for callers that already hold the catalogs and the
/// sparse arrays and want to run them through the same readers as a file.
///
/// # Examples
///
/// ```rust
/// use tome_io::MemoryBackend;
/// use tome_io::TomeBackend;
///
/// let backend = MemoryBackend::tome(&["BRCA1", "TP53"], &["s1", "s2"])
///     .with_region("exon", vec![0, 1, 3], vec![0, 0, 1], vec![4, 2, 7]);
///
/// assert_eq!(backend.dataset_len("data/exon/x").unwrap(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    datasets: BTreeMap<String, MemoryDataset>,
}

impl MemoryBackend {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container holding the gene and sample catalogs.
    pub fn tome(genes: &[&str], samples: &[&str]) -> Self {
        Self::new()
            .with_strings(GENE_NAMES_PATH, genes)
            .with_strings(SAMPLE_NAMES_PATH, samples)
    }

    /// Adds the pointer table, sample indices and read counts of a region.
    pub fn with_region(self, region: &str, p: Vec<u64>, i: Vec<u64>, x: Vec<u64>) -> Self {
        self.with_unsigned(&pointer_path(region), p)
            .with_unsigned(&sample_index_path(region), i)
            .with_unsigned(&counts_path(region), x)
    }

    /// Adds a per-sample annotation column.
    pub fn with_annotation(self, field: &str, column: AnnotationColumn) -> Self {
        let dataset = match column {
            AnnotationColumn::Text(values) => {
                MemoryDataset::Bytes(values.into_iter().map(String::into_bytes).collect())
            }
            AnnotationColumn::Integer(values) => MemoryDataset::Integer(values),
            AnnotationColumn::Float(values) => MemoryDataset::Float(values),
        };
        self.with_dataset(&annotation_path(field), dataset)
    }

    pub fn with_strings(self, path: &str, values: &[&str]) -> Self {
        let bytes = values.iter().map(|v| v.as_bytes().to_vec()).collect();
        self.with_dataset(path, MemoryDataset::Bytes(bytes))
    }

    pub fn with_bytes(self, path: &str, values: Vec<Vec<u8>>) -> Self {
        self.with_dataset(path, MemoryDataset::Bytes(values))
    }

    pub fn with_unsigned(self, path: &str, values: Vec<u64>) -> Self {
        self.with_dataset(path, MemoryDataset::Unsigned(values))
    }

    pub fn with_integers(self, path: &str, values: Vec<i64>) -> Self {
        self.with_dataset(path, MemoryDataset::Integer(values))
    }

    pub fn with_floats(self, path: &str, values: Vec<f64>) -> Self {
        self.with_dataset(path, MemoryDataset::Float(values))
    }

    pub fn with_dataset(mut self, path: &str, dataset: MemoryDataset) -> Self {
        self.datasets.insert(path.to_string(), dataset);
        self
    }

    /// Removes a dataset, returning it if it was present.
    pub fn remove(&mut self, path: &str) -> Option<MemoryDataset> {
        self.datasets.remove(path)
    }

    fn get(&self, path: &str) -> Result<&MemoryDataset> {
        self.datasets.get(path).ok_or_else(|| missing_dataset(path))
    }
}

fn decode_error(path: &str, reason: impl Into<String>) -> TomeError {
    TomeError::Decode {
        path: path.to_string(),
        reason: reason.into(),
    }
}

impl TomeBackend for MemoryBackend {
    fn has_dataset(&self, path: &str) -> bool {
        self.datasets.contains_key(path)
    }

    fn member_names(&self, group: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", group.trim_end_matches('/'));
        let members: BTreeSet<String> = self
            .datasets
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();

        if members.is_empty() {
            return Err(TomeError::Schema(format!("missing group '{group}'")));
        }
        Ok(members.into_iter().collect())
    }

    fn dataset_len(&self, path: &str) -> Result<usize> {
        Ok(self.get(path)?.len())
    }

    fn read_strings(&self, path: &str) -> Result<Vec<String>> {
        match self.get(path)? {
            MemoryDataset::Bytes(values) => decode_utf8(path, values.clone()),
            _ => Err(decode_error(path, "expected a string dataset")),
        }
    }

    fn read_column(&self, path: &str) -> Result<AnnotationColumn> {
        match self.get(path)? {
            MemoryDataset::Bytes(values) => {
                Ok(AnnotationColumn::Text(decode_utf8(path, values.clone())?))
            }
            MemoryDataset::Unsigned(values) => values
                .iter()
                .map(|&v| i64::try_from(v).map_err(|_| decode_error(path, "value overflows i64")))
                .collect::<Result<Vec<_>>>()
                .map(AnnotationColumn::Integer),
            MemoryDataset::Integer(values) => Ok(AnnotationColumn::Integer(values.clone())),
            MemoryDataset::Float(values) => Ok(AnnotationColumn::Float(values.clone())),
        }
    }

    fn read_u64(&self, path: &str) -> Result<Vec<u64>> {
        match self.get(path)? {
            MemoryDataset::Unsigned(values) => Ok(values.clone()),
            MemoryDataset::Integer(values) => values
                .iter()
                .enumerate()
                .map(|(row, &v)| u64::try_from(v).map_err(|_| negative_value(path, row, v)))
                .collect(),
            _ => Err(decode_error(path, "expected an integer dataset")),
        }
    }

    fn read_u32_range(&self, path: &str, range: Range<usize>) -> Result<Vec<u32>> {
        let dataset = self.get(path)?;
        if range.start > range.end || range.end > dataset.len() {
            return Err(TomeError::Schema(format!(
                "range {}..{} is out of bounds for '{path}' of length {}",
                range.start,
                range.end,
                dataset.len()
            )));
        }

        match dataset {
            MemoryDataset::Unsigned(values) => values[range]
                .iter()
                .map(|&v| u32::try_from(v).map_err(|_| decode_error(path, "value overflows u32")))
                .collect(),
            MemoryDataset::Integer(values) => values[range]
                .iter()
                .map(|&v| u32::try_from(v).map_err(|_| decode_error(path, "value is not a u32")))
                .collect(),
            _ => Err(decode_error(path, "expected an integer dataset")),
        }
    }
}
