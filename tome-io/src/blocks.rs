//! Per-gene iteration over the sparse read counts of a region.
//!
//! Each region stores a compressed-sparse layout: a pointer table `p` of
//! length `G + 1` and two parallel value arrays, `x` (read counts) and `i`
//! (sample indices). The readings of gene `g` are `x[p[g]..p[g + 1]]` and
//! `i[p[g]..p[g + 1]]`.
//!
//! [`GeneBlocks`] walks the selected genes in ascending index order and yields
//! one [`ReadsBlock`] per gene. Block positions are given in a compact output
//! range that starts at zero and has no gaps, whether or not a gene subset was
//! requested, so consecutive blocks can be copied straight into preallocated
//! flat arrays.

use std::ops::Range;

use indicatif::ProgressBar;

use crate::backend::TomeBackend;
use crate::consts::{PROGRESS_INTERVAL, counts_path, pointer_path, sample_index_path};
use crate::error::{Result, TomeError};
use crate::store::TomeStore;

/// Which genes to read from a region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeneSelection {
    /// Every gene of the catalog, in index order.
    #[default]
    All,
    /// Only the named genes. Names missing from the catalog are ignored.
    Names(Vec<String>),
}

impl GeneSelection {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GeneSelection::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, GeneSelection::All)
    }
}

/// The readings of one gene, placed in the compact output range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadsBlock {
    /// First output row of this block.
    pub start: usize,
    /// One past the last output row of this block.
    pub end: usize,
    pub sample_index: Vec<u32>,
    pub gene_index: usize,
    pub num_reads: Vec<u32>,
}

impl ReadsBlock {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Output rows covered by this block.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Gene indices to visit, in visiting order.
#[derive(Debug, Clone)]
enum GeneOrder {
    All(usize),
    Subset(Vec<usize>),
}

impl GeneOrder {
    fn len(&self) -> usize {
        match self {
            GeneOrder::All(num_genes) => *num_genes,
            GeneOrder::Subset(genes) => genes.len(),
        }
    }

    fn get(&self, position: usize) -> Option<usize> {
        match self {
            GeneOrder::All(num_genes) => (position < *num_genes).then_some(position),
            GeneOrder::Subset(genes) => genes.get(position).copied(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter_map(|position| self.get(position))
    }
}

///
/// Lazy, single-pass iterator over the [`ReadsBlock`]s of a region.
///
/// Created by [`TomeStore::iter_gene_blocks`]. The pointer table is read and
/// validated up front; value arrays are read one block at a time as the
/// iterator is pulled. Dropping the iterator early releases only its own
/// state.
///
pub struct GeneBlocks<'a, B: TomeBackend> {
    backend: &'a B,
    counts_path: String,
    samples_path: String,
    pointers: Vec<usize>,
    genes: GeneOrder,
    position: usize,
    offset: usize,
    total_rows: usize,
    progress: ProgressBar,
}

impl<'a, B: TomeBackend> GeneBlocks<'a, B> {
    pub(crate) fn new(
        store: &'a TomeStore<B>,
        region: &str,
        selection: &GeneSelection,
    ) -> Result<Self> {
        let num_genes = store.num_genes()?;
        let backend = store.backend();

        let p_path = pointer_path(region);
        if !backend.has_dataset(&p_path) {
            return Err(TomeError::Schema(format!(
                "region '{region}' not found in tome '{}'",
                store.identifier()
            )));
        }

        let pointers = backend
            .read_u64(&p_path)?
            .into_iter()
            .map(usize::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| TomeError::Schema(format!("pointer table '{p_path}' overflows usize")))?;

        if pointers.len() != num_genes + 1 {
            return Err(TomeError::Schema(format!(
                "pointer table '{p_path}' has {} entries for {num_genes} genes",
                pointers.len()
            )));
        }

        let row_count = pointers[num_genes];
        let counts_path = counts_path(region);
        let samples_path = sample_index_path(region);
        for path in [&counts_path, &samples_path] {
            let len = backend.dataset_len(path)?;
            if len != row_count {
                return Err(TomeError::Schema(format!(
                    "'{path}' has {len} values but the pointer table ends at {row_count}"
                )));
            }
        }

        let genes = match selection {
            GeneSelection::All => GeneOrder::All(num_genes),
            GeneSelection::Names(names) => {
                let mut genes = Vec::with_capacity(names.len());
                for name in names {
                    if let Some(index) = store.gene_index(name)? {
                        genes.push(index);
                    }
                }
                genes.sort_unstable();
                genes.dedup();
                GeneOrder::Subset(genes)
            }
        };

        let mut total_rows = 0;
        for gene in genes.iter() {
            let (start, end) = (pointers[gene], pointers[gene + 1]);
            if start > end || end > row_count {
                return Err(TomeError::Schema(format!(
                    "pointer table '{p_path}' is not monotonic at gene {gene} ({start}..{end})"
                )));
            }
            total_rows += end - start;
        }

        let progress = ProgressBar::hidden();
        progress.set_length(genes.len() as u64);

        Ok(GeneBlocks {
            backend,
            counts_path,
            samples_path,
            pointers,
            genes,
            position: 0,
            offset: 0,
            total_rows,
            progress,
        })
    }

    /// Report progress on `progress` every [`PROGRESS_INTERVAL`] genes.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        progress.set_length(self.genes.len() as u64);
        self.progress = progress;
        self
    }

    /// Sum of the lengths of all blocks this iterator yields.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Number of genes this iterator visits.
    pub fn num_selected(&self) -> usize {
        self.genes.len()
    }

    /// Gene indices in visiting order.
    pub fn selected_genes(&self) -> Vec<usize> {
        self.genes.iter().collect()
    }

    fn read_block(&mut self, gene: usize) -> Result<ReadsBlock> {
        let range = self.pointers[gene]..self.pointers[gene + 1];

        let (num_reads, sample_index) = if range.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                self.backend
                    .read_u32_range(&self.counts_path, range.clone())?,
                self.backend
                    .read_u32_range(&self.samples_path, range.clone())?,
            )
        };

        if num_reads.len() != range.len() || sample_index.len() != range.len() {
            return Err(TomeError::Schema(format!(
                "short read for gene {gene}: expected {} values",
                range.len()
            )));
        }

        let start = self.offset;
        self.offset += range.len();

        Ok(ReadsBlock {
            start,
            end: self.offset,
            sample_index,
            gene_index: gene,
            num_reads,
        })
    }
}

impl<B: TomeBackend> Iterator for GeneBlocks<'_, B> {
    type Item = Result<ReadsBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(gene) = self.genes.get(self.position) else {
            if !self.progress.is_finished() {
                self.progress.finish();
            }
            return None;
        };

        self.position += 1;
        if self.position % PROGRESS_INTERVAL == 0 {
            self.progress.set_position(self.position as u64);
        }

        Some(self.read_block(gene))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.genes.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl<B: TomeBackend> ExactSizeIterator for GeneBlocks<'_, B> {}

impl<B: TomeBackend> TomeStore<B> {
    ///
    /// Iterate over the per-gene read blocks of a region.
    ///
    /// # Arguments
    /// - region: region to read, e.g. `exon`.
    /// - selection: which genes to visit; subsets are visited in ascending
    ///   catalog order.
    pub fn iter_gene_blocks(
        &self,
        region: &str,
        selection: &GeneSelection,
    ) -> Result<GeneBlocks<'_, B>> {
        GeneBlocks::new(self, region, selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::backend::MemoryBackend;

    #[fixture]
    fn store() -> TomeStore<MemoryBackend> {
        let backend = MemoryBackend::tome(
            &["gene0", "gene1", "gene2", "gene3"],
            &["s0", "s1", "s2", "s3", "s4", "s5"],
        )
        .with_region(
            "exon",
            vec![0, 3, 5, 5, 8],
            vec![0, 1, 2, 3, 1, 5, 0, 2],
            vec![1, 2, 1, 3, 4, 1, 1, 2],
        );
        TomeStore::from_backend(backend)
    }

    fn collect(blocks: GeneBlocks<'_, MemoryBackend>) -> Vec<ReadsBlock> {
        blocks.collect::<Result<Vec<_>>>().unwrap()
    }

    #[rstest]
    fn test_blocks_for_every_gene(store: TomeStore<MemoryBackend>) {
        let blocks = collect(store.iter_gene_blocks("exon", &GeneSelection::All).unwrap());

        assert_eq!(
            blocks,
            vec![
                ReadsBlock {
                    start: 0,
                    end: 3,
                    sample_index: vec![0, 1, 2],
                    gene_index: 0,
                    num_reads: vec![1, 2, 1],
                },
                ReadsBlock {
                    start: 3,
                    end: 5,
                    sample_index: vec![3, 1],
                    gene_index: 1,
                    num_reads: vec![3, 4],
                },
                ReadsBlock {
                    start: 5,
                    end: 5,
                    sample_index: vec![],
                    gene_index: 2,
                    num_reads: vec![],
                },
                ReadsBlock {
                    start: 5,
                    end: 8,
                    sample_index: vec![5, 0, 2],
                    gene_index: 3,
                    num_reads: vec![1, 1, 2],
                },
            ]
        );
    }

    #[rstest]
    fn test_subset_offsets_are_compacted(store: TomeStore<MemoryBackend>) {
        let selection = GeneSelection::names(["gene3"]);
        let blocks = collect(store.iter_gene_blocks("exon", &selection).unwrap());

        assert_eq!(
            blocks,
            vec![ReadsBlock {
                start: 0,
                end: 3,
                sample_index: vec![5, 0, 2],
                gene_index: 3,
                num_reads: vec![1, 1, 2],
            }]
        );
    }

    #[rstest]
    fn test_subset_is_sorted_deduplicated_and_filtered(store: TomeStore<MemoryBackend>) {
        let selection = GeneSelection::names(["gene3", "nope", "gene0", "gene3", "gene2"]);
        let blocks = store.iter_gene_blocks("exon", &selection).unwrap();

        assert_eq!(blocks.selected_genes(), vec![0, 2, 3]);
        assert_eq!(blocks.total_rows(), 6);

        let blocks = collect(blocks);
        let ranges: Vec<_> = blocks.iter().map(|b| (b.gene_index, b.start, b.end)).collect();
        assert_eq!(ranges, vec![(0, 0, 3), (2, 3, 3), (3, 3, 6)]);
    }

    #[rstest]
    fn test_total_rows_and_contiguity(store: TomeStore<MemoryBackend>) {
        let blocks = store.iter_gene_blocks("exon", &GeneSelection::All).unwrap();
        assert_eq!(blocks.total_rows(), 8);
        assert_eq!(blocks.len(), 4);

        let blocks = collect(blocks);
        assert_eq!(blocks.iter().map(ReadsBlock::len).sum::<usize>(), 8);
        assert_eq!(blocks[0].start, 0);
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].start, pair[0].end);
        }
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec!["not-a-gene"])]
    fn test_empty_subset_yields_nothing(store: TomeStore<MemoryBackend>, #[case] names: Vec<&str>) {
        let blocks = store
            .iter_gene_blocks("exon", &GeneSelection::names(names))
            .unwrap();
        assert_eq!(blocks.total_rows(), 0);
        assert_eq!(collect(blocks), Vec::<ReadsBlock>::new());
    }

    #[rstest]
    fn test_store_without_genes() {
        let backend = MemoryBackend::tome(&[], &["s0"]).with_region("exon", vec![0], vec![], vec![]);
        let store = TomeStore::from_backend(backend);

        let blocks = store.iter_gene_blocks("exon", &GeneSelection::All).unwrap();
        assert_eq!(blocks.total_rows(), 0);
        assert_eq!(collect(blocks), Vec::<ReadsBlock>::new());
    }

    #[rstest]
    fn test_missing_region(store: TomeStore<MemoryBackend>) {
        assert!(matches!(
            store.iter_gene_blocks("intron", &GeneSelection::All),
            Err(TomeError::Schema(_))
        ));
    }

    #[rstest]
    #[case::short_pointer_table(vec![0, 3, 5, 8], vec![0; 8])]
    #[case::pointer_end_disagrees(vec![0, 3, 5, 5, 7], vec![0; 8])]
    #[case::not_monotonic(vec![0, 4, 3, 5, 8], vec![0; 8])]
    #[case::short_sample_index(vec![0, 3, 5, 5, 8], vec![0; 7])]
    fn test_layout_errors(#[case] p: Vec<u64>, #[case] i: Vec<u64>) {
        let backend = MemoryBackend::tome(&["g0", "g1", "g2", "g3"], &["s0"])
            .with_region("exon", p, i, vec![1; 8]);
        let store = TomeStore::from_backend(backend);

        assert!(matches!(
            store.iter_gene_blocks("exon", &GeneSelection::All),
            Err(TomeError::Schema(_))
        ));
    }

    #[rstest]
    fn test_progress_bar_reaches_the_end(store: TomeStore<MemoryBackend>) {
        let progress = ProgressBar::hidden();
        let blocks = store
            .iter_gene_blocks("exon", &GeneSelection::All)
            .unwrap()
            .with_progress(progress.clone());

        assert_eq!(progress.length(), Some(4));
        assert_eq!(collect(blocks).len(), 4);
        assert!(progress.is_finished());
    }

    #[rstest]
    fn test_progress_moves_every_interval() {
        let num_genes = PROGRESS_INTERVAL + 500;
        let names: Vec<String> = (0..num_genes).map(|g| format!("gene{g}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let backend = MemoryBackend::tome(&names, &["s0"]).with_region(
            "exon",
            vec![0; num_genes + 1],
            vec![],
            vec![],
        );
        let store = TomeStore::from_backend(backend);

        let progress = ProgressBar::hidden();
        let mut blocks = store
            .iter_gene_blocks("exon", &GeneSelection::All)
            .unwrap()
            .with_progress(progress.clone());

        for _ in 0..PROGRESS_INTERVAL - 1 {
            blocks.next().unwrap().unwrap();
        }
        assert_eq!(progress.position(), 0);

        blocks.next().unwrap().unwrap();
        assert_eq!(progress.position(), PROGRESS_INTERVAL as u64);

        for _ in 0..499 {
            blocks.next().unwrap().unwrap();
        }
        assert_eq!(progress.position(), PROGRESS_INTERVAL as u64);
        assert!(!progress.is_finished());

        assert!(blocks.next().is_none());
        assert!(progress.is_finished());
        assert_eq!(progress.position(), num_genes as u64);
    }

    #[rstest]
    fn test_iterator_can_stop_early(store: TomeStore<MemoryBackend>) {
        let mut blocks = store.iter_gene_blocks("exon", &GeneSelection::All).unwrap();
        let first = blocks.next().unwrap().unwrap();
        assert_eq!(first.gene_index, 0);
        drop(blocks);

        // a fresh iterator starts over
        let again = collect(store.iter_gene_blocks("exon", &GeneSelection::All).unwrap());
        assert_eq!(again.len(), 4);
    }
}
