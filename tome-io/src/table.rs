use crate::backend::TomeBackend;
use crate::blocks::{GeneSelection, ReadsBlock};
use crate::error::{Result, TomeError};
use crate::store::TomeStore;

/// Sample and gene label columns of a [`GeneTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowLabels {
    Index {
        sample_index: Vec<u32>,
        gene_index: Vec<u32>,
    },
    Names {
        sample_name: Vec<String>,
        gene_name: Vec<String>,
    },
}

///
/// Long-form table of a region: one row per stored reading.
///
/// `num_reads[r]` belongs to the sample and gene given by row `r` of
/// `labels`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct GeneTable {
    pub num_reads: Vec<u32>,
    pub labels: RowLabels,
}

impl GeneTable {
    ///
    /// Copy a sequence of contiguous blocks into a table of `total_rows` rows.
    ///
    /// The columns are allocated once, up front. Each block lands in
    /// `block.start..block.end`, with its gene index repeated over the block.
    pub fn from_blocks<I>(blocks: I, total_rows: usize) -> Result<Self>
    where
        I: IntoIterator<Item = Result<ReadsBlock>>,
    {
        let mut num_reads = vec![0u32; total_rows];
        let mut sample_index = vec![0u32; total_rows];
        let mut gene_index = vec![0u32; total_rows];

        let mut filled = 0;
        for block in blocks {
            let block = block?;
            if block.start != filled || block.end < block.start || block.end > total_rows {
                return Err(TomeError::Schema(format!(
                    "block {}..{} of gene {} does not continue a table filled to {filled} of {total_rows} rows",
                    block.start, block.end, block.gene_index
                )));
            }

            if block.num_reads.len() != block.len() || block.sample_index.len() != block.len() {
                return Err(TomeError::Schema(format!(
                    "block of gene {} spans {} rows but carries {} counts and {} sample indices",
                    block.gene_index,
                    block.len(),
                    block.num_reads.len(),
                    block.sample_index.len()
                )));
            }

            let gene = u32::try_from(block.gene_index).map_err(|_| {
                TomeError::Schema(format!("gene index {} overflows u32", block.gene_index))
            })?;

            let range = block.range();
            num_reads[range.clone()].copy_from_slice(&block.num_reads);
            sample_index[range.clone()].copy_from_slice(&block.sample_index);
            gene_index[range].fill(gene);
            filled = block.end;
        }

        if filled != total_rows {
            return Err(TomeError::Schema(format!(
                "blocks cover {filled} rows, expected {total_rows}"
            )));
        }

        Ok(GeneTable {
            num_reads,
            labels: RowLabels::Index {
                sample_index,
                gene_index,
            },
        })
    }

    pub fn len(&self) -> usize {
        self.num_reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_reads.is_empty()
    }

    pub fn has_names(&self) -> bool {
        matches!(self.labels, RowLabels::Names { .. })
    }

    /// `(sample_index, gene_index, num_reads)` rows of an index-labelled table.
    pub fn index_rows(&self) -> Option<impl Iterator<Item = (u32, u32, u32)> + '_> {
        match &self.labels {
            RowLabels::Index {
                sample_index,
                gene_index,
            } => Some(
                sample_index
                    .iter()
                    .zip(gene_index)
                    .zip(&self.num_reads)
                    .map(|((&s, &g), &n)| (s, g, n)),
            ),
            RowLabels::Names { .. } => None,
        }
    }

    ///
    /// Reduce an index-labelled table back to per-gene row ranges.
    ///
    /// Returns `(start, end, gene_index)` for every run of rows that share a
    /// gene. Genes without readings occupy no rows and do not appear.
    pub fn gene_runs(&self) -> Option<Vec<(usize, usize, u32)>> {
        let RowLabels::Index { gene_index, .. } = &self.labels else {
            return None;
        };

        let mut runs = Vec::new();
        let mut start = 0;
        for (row, gene) in gene_index.iter().enumerate() {
            if row > start && gene_index[start] != *gene {
                runs.push((start, row, gene_index[start]));
                start = row;
            }
        }
        if start < gene_index.len() {
            runs.push((start, gene_index.len(), gene_index[start]));
        }
        Some(runs)
    }

    /// Replace numeric labels with names from the catalogs of `store`.
    pub fn into_named<B: TomeBackend>(self, store: &TomeStore<B>) -> Result<Self> {
        let (sample_index, gene_index) = match self.labels {
            RowLabels::Names { .. } => return Ok(self),
            RowLabels::Index {
                sample_index,
                gene_index,
            } => (sample_index, gene_index),
        };

        let sample_name = resolve(&sample_index, store.sample_names()?, "sample")?;
        let gene_name = resolve(&gene_index, store.gene_names()?, "gene")?;

        Ok(GeneTable {
            num_reads: self.num_reads,
            labels: RowLabels::Names {
                sample_name,
                gene_name,
            },
        })
    }
}

fn resolve(indices: &[u32], catalog: &[String], kind: &'static str) -> Result<Vec<String>> {
    indices
        .iter()
        .map(|&index| {
            catalog
                .get(index as usize)
                .cloned()
                .ok_or(TomeError::IndexOutOfRange {
                    kind,
                    index: index as usize,
                    len: catalog.len(),
                })
        })
        .collect()
}

impl<B: TomeBackend> TomeStore<B> {
    ///
    /// Read a region into a flat, long-form table.
    ///
    /// # Arguments
    /// - region: region to read, e.g. `exon`.
    /// - selection: which genes to read.
    /// - resolve_names: label rows with sample and gene names instead of indices.
    pub fn read_gene_table(
        &self,
        region: &str,
        selection: &GeneSelection,
        resolve_names: bool,
    ) -> Result<GeneTable> {
        let blocks = self.iter_gene_blocks(region, selection)?;
        let total_rows = blocks.total_rows();
        let table = GeneTable::from_blocks(blocks, total_rows)?;

        if resolve_names {
            table.into_named(self)
        } else {
            Ok(table)
        }
    }
}
