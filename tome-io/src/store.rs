use std::path::Path;

use fxhash::FxHashMap;
use once_cell::unsync::OnceCell;

#[cfg(feature = "hdf5")]
use crate::backend::H5Backend;
use crate::backend::TomeBackend;
use crate::catalog::{SampleAnnotations, load_annotations, load_catalog};
use crate::consts::{DATA_GROUP, GENE_NAMES_PATH, SAMPLE_NAMES_PATH, pointer_path};
use crate::error::{Result, TomeError};

///
/// An open tome: the backing store plus its lazily loaded catalogs.
///
/// Catalogs are read on first access and cached for the lifetime of the
/// store. A failed load is not cached, so the error surfaces again on the
/// next call. Readers returned by the store borrow it, so it cannot be closed
/// while one is alive.
///
pub struct TomeStore<B: TomeBackend> {
    backend: B,
    identifier: String,
    gene_names: OnceCell<Vec<String>>,
    sample_names: OnceCell<Vec<String>>,
    gene_lookup: OnceCell<FxHashMap<String, usize>>,
    sample_annotations: OnceCell<SampleAnnotations>,
}

#[cfg(feature = "hdf5")]
impl TomeStore<H5Backend> {
    ///
    /// Open a tome file read-only.
    ///
    /// The store identifier is the file stem (`/data/gtex.tome` -> `gtex`).
    ///
    /// # Arguments
    /// - path: path to the tome file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let backend = H5Backend::open(path)?;
        Ok(Self::from_backend(backend).with_identifier(identifier_from_path(path)))
    }
}

impl<B: TomeBackend> TomeStore<B> {
    pub fn from_backend(backend: B) -> Self {
        TomeStore {
            backend,
            identifier: String::from("tome"),
            gene_names: OnceCell::new(),
            sample_names: OnceCell::new(),
            gene_lookup: OnceCell::new(),
            sample_annotations: OnceCell::new(),
        }
    }

    /// Sets the name used to tell this tome apart from others in combined output.
    pub fn with_identifier<S: Into<String>>(mut self, identifier: S) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ordered gene catalog; position is the gene index.
    pub fn gene_names(&self) -> Result<&[String]> {
        self.gene_names
            .get_or_try_init(|| load_catalog(&self.backend, GENE_NAMES_PATH))
            .map(Vec::as_slice)
    }

    /// Ordered sample catalog; position is the sample index.
    pub fn sample_names(&self) -> Result<&[String]> {
        self.sample_names
            .get_or_try_init(|| load_catalog(&self.backend, SAMPLE_NAMES_PATH))
            .map(Vec::as_slice)
    }

    pub fn sample_annotations(&self) -> Result<&SampleAnnotations> {
        self.sample_annotations.get_or_try_init(|| {
            // a broken sample catalog does not hide the annotations
            let num_samples = self.num_samples().ok();
            load_annotations(&self.backend, num_samples)
        })
    }

    pub fn num_genes(&self) -> Result<usize> {
        Ok(self.gene_names()?.len())
    }

    pub fn num_samples(&self) -> Result<usize> {
        Ok(self.sample_names()?.len())
    }

    /// Catalog index of a gene. Duplicated names resolve to their first position.
    pub fn gene_index(&self, name: &str) -> Result<Option<usize>> {
        let lookup = self.gene_lookup.get_or_try_init(|| {
            let names = self.gene_names()?;
            let mut lookup = FxHashMap::default();
            for (index, name) in names.iter().enumerate() {
                lookup.entry(name.clone()).or_insert(index);
            }
            Ok::<_, TomeError>(lookup)
        })?;
        Ok(lookup.get(name).copied())
    }

    pub fn gene_name(&self, index: usize) -> Result<&str> {
        let names = self.gene_names()?;
        names
            .get(index)
            .map(String::as_str)
            .ok_or(TomeError::IndexOutOfRange {
                kind: "gene",
                index,
                len: names.len(),
            })
    }

    pub fn sample_name(&self, index: usize) -> Result<&str> {
        let names = self.sample_names()?;
        names
            .get(index)
            .map(String::as_str)
            .ok_or(TomeError::IndexOutOfRange {
                kind: "sample",
                index,
                len: names.len(),
            })
    }

    /// Regions with sparse data in this tome.
    pub fn regions(&self) -> Result<Vec<String>> {
        self.backend.member_names(DATA_GROUP)
    }

    /// Total number of stored readings for a region, `p[G]`.
    pub fn region_row_count(&self, region: &str) -> Result<usize> {
        let path = pointer_path(region);
        let pointers = self.backend.read_u64(&path)?;
        let last = pointers.last().copied().ok_or_else(|| {
            TomeError::Schema(format!("pointer table '{path}' is empty"))
        })?;
        usize::try_from(last)
            .map_err(|_| TomeError::Schema(format!("pointer table '{path}' overflows usize")))
    }

    /// Close the store, releasing the backing file.
    pub fn close(self) {
        drop(self)
    }
}

fn identifier_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
