//! # Read-side access to tome files.
//!
//! A tome stores per-sample gene read counts: an ordered gene catalog, an
//! ordered sample catalog, a per-sample annotation table and, for every region
//! (`exon`, `intron`, ...), a compressed-sparse layout of the counts. This crate
//! decodes that layout without loading a whole region unless asked to.
//!
//! The readers build on each other:
//!
//! - [`TomeStore`] opens the container and lazily loads the catalogs.
//! - [`GeneBlocks`] streams one [`ReadsBlock`] per gene, optionally for a subset.
//! - [`GeneTable`] collects the blocks into flat, long-form columns.
//! - [`GeneMatrix`] pivots the table into a dense sample × gene matrix.
//!
//! ## Quick Start
//!
//! ```rust
//! use tome_io::{GeneSelection, MemoryBackend, TomeStore};
//!
//! let backend = MemoryBackend::tome(&["BRCA1", "TP53", "EGFR"], &["s1", "s2"])
//!     .with_region("exon", vec![0, 2, 2, 3], vec![0, 1, 1], vec![5, 3, 8]);
//! let store = TomeStore::from_backend(backend);
//!
//! // stream blocks for two genes; output rows are renumbered from zero
//! let selection = GeneSelection::names(["EGFR", "BRCA1"]);
//! for block in store.iter_gene_blocks("exon", &selection).unwrap() {
//!     let block = block.unwrap();
//!     println!("{} rows {}..{}", store.gene_name(block.gene_index).unwrap(), block.start, block.end);
//! }
//!
//! let matrix = store.read_gene_matrix("exon", &GeneSelection::All, true).unwrap();
//! assert_eq!(matrix.get_by_name("s2", "EGFR"), Some(8.0));
//! ```
//!
//! With the default `hdf5` feature, [`TomeStore::open`] reads a tome file from
//! disk.
pub mod backend;
pub mod blocks;
pub mod catalog;
pub mod consts;
pub mod error;
pub mod matrix;
pub mod store;
pub mod table;

// re-exports
#[cfg(feature = "hdf5")]
pub use backend::H5Backend;
pub use backend::{MemoryBackend, MemoryDataset, TomeBackend};
pub use blocks::{GeneBlocks, GeneSelection, ReadsBlock};
pub use catalog::{AnnotationColumn, SampleAnnotations};
pub use error::*;
pub use matrix::GeneMatrix;
pub use store::TomeStore;
pub use table::{GeneTable, RowLabels};
