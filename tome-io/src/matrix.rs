use fxhash::FxHashMap;
use ndarray::{Array2, Zip};

use crate::backend::TomeBackend;
use crate::blocks::GeneSelection;
use crate::error::{Result, TomeError};
use crate::store::TomeStore;
use crate::table::{GeneTable, RowLabels};

///
/// Dense sample × gene matrix of read counts.
///
/// Rows are the samples and columns the genes that have at least one reading,
/// both in ascending index order. A cell holds the mean of all readings for
/// its (sample, gene) pair, or `0.0` when there are none.
///
#[derive(Debug, Clone, PartialEq)]
pub struct GeneMatrix {
    pub values: Array2<f64>,
    pub sample_index: Vec<u32>,
    pub gene_index: Vec<u32>,
    pub sample_names: Option<Vec<String>>,
    pub gene_names: Option<Vec<String>>,
}

fn sorted_unique(values: &[u32]) -> Vec<u32> {
    let mut unique = values.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

fn positions(labels: &[u32]) -> FxHashMap<u32, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(position, &label)| (label, position))
        .collect()
}

impl GeneMatrix {
    ///
    /// Pivot long-form rows into a dense matrix.
    ///
    /// # Arguments
    /// - sample_index: row label of every reading.
    /// - gene_index: column label of every reading.
    /// - num_reads: the readings.
    ///
    /// The three columns must have the same length.
    pub fn pivot(sample_index: &[u32], gene_index: &[u32], num_reads: &[u32]) -> Result<Self> {
        if sample_index.len() != num_reads.len() || gene_index.len() != num_reads.len() {
            return Err(TomeError::Schema(format!(
                "cannot pivot {} sample labels and {} gene labels over {} readings",
                sample_index.len(),
                gene_index.len(),
                num_reads.len()
            )));
        }

        let rows = sorted_unique(sample_index);
        let cols = sorted_unique(gene_index);
        let row_of = positions(&rows);
        let col_of = positions(&cols);

        let mut sums = Array2::<f64>::zeros((rows.len(), cols.len()));
        let mut counts = Array2::<u32>::zeros((rows.len(), cols.len()));

        for ((sample, gene), &reads) in sample_index.iter().zip(gene_index).zip(num_reads) {
            let cell = (row_of[sample], col_of[gene]);
            sums[cell] += f64::from(reads);
            counts[cell] += 1;
        }

        // duplicates of a (sample, gene) pair average out
        Zip::from(&mut sums).and(&counts).for_each(|sum, &n| {
            if n > 1 {
                *sum /= f64::from(n);
            }
        });

        Ok(GeneMatrix {
            values: sums,
            sample_index: rows,
            gene_index: cols,
            sample_names: None,
            gene_names: None,
        })
    }

    /// Pivot an index-labelled [`GeneTable`].
    pub fn from_table(table: &GeneTable) -> Result<Self> {
        match &table.labels {
            RowLabels::Index {
                sample_index,
                gene_index,
            } => Self::pivot(sample_index, gene_index, &table.num_reads),
            RowLabels::Names { .. } => Err(TomeError::Schema(
                "a matrix can only be built from an index-labelled table".to_string(),
            )),
        }
    }

    /// Attach sample and gene names from the catalogs of `store`.
    pub fn with_names<B: TomeBackend>(mut self, store: &TomeStore<B>) -> Result<Self> {
        let sample_names = self
            .sample_index
            .iter()
            .map(|&index| store.sample_name(index as usize).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
        let gene_names = self
            .gene_index
            .iter()
            .map(|&index| store.gene_name(index as usize).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        self.sample_names = Some(sample_names);
        self.gene_names = Some(gene_names);
        Ok(self)
    }

    /// `(samples, genes)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Cell value for a sample and gene index; `None` if either has no readings.
    pub fn get(&self, sample_index: u32, gene_index: u32) -> Option<f64> {
        let row = self.sample_index.binary_search(&sample_index).ok()?;
        let col = self.gene_index.binary_search(&gene_index).ok()?;
        Some(self.values[(row, col)])
    }

    /// Cell value for a sample and gene name, once names are attached.
    pub fn get_by_name(&self, sample: &str, gene: &str) -> Option<f64> {
        let row = self.sample_names.as_ref()?.iter().position(|s| s == sample)?;
        let col = self.gene_names.as_ref()?.iter().position(|g| g == gene)?;
        Some(self.values[(row, col)])
    }

    /// Row labels as text: names when attached, indices otherwise.
    pub fn row_labels(&self) -> Vec<String> {
        match &self.sample_names {
            Some(names) => names.clone(),
            None => self.sample_index.iter().map(u32::to_string).collect(),
        }
    }

    /// Column labels as text: names when attached, indices otherwise.
    pub fn column_labels(&self) -> Vec<String> {
        match &self.gene_names {
            Some(names) => names.clone(),
            None => self.gene_index.iter().map(u32::to_string).collect(),
        }
    }
}

impl<B: TomeBackend> TomeStore<B> {
    ///
    /// Read a region into a dense sample × gene matrix.
    ///
    /// Aggregation always runs on indices; with `resolve_names` the axis labels
    /// are looked up afterwards.
    pub fn read_gene_matrix(
        &self,
        region: &str,
        selection: &GeneSelection,
        resolve_names: bool,
    ) -> Result<GeneMatrix> {
        let table = self.read_gene_table(region, selection, false)?;
        let matrix = GeneMatrix::from_table(&table)?;

        if resolve_names {
            matrix.with_names(self)
        } else {
            Ok(matrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;
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

    #[rstest]
    fn test_read_gene_matrix(store: TomeStore<MemoryBackend>) {
        let matrix = store.read_gene_matrix("exon", &GeneSelection::All, false).unwrap();

        // s4 has no readings and gene2 is empty, so neither gets a label
        assert_eq!(matrix.sample_index, vec![0, 1, 2, 3, 5]);
        assert_eq!(matrix.gene_index, vec![0, 1, 3]);
        assert_eq!(
            matrix.values,
            array![
                [1.0, 0.0, 1.0],
                [2.0, 4.0, 0.0],
                [1.0, 0.0, 2.0],
                [0.0, 3.0, 0.0],
                [0.0, 0.0, 1.0],
            ]
        );
        assert_eq!(matrix.shape(), (5, 3));
        assert_eq!(matrix.sample_names, None);
    }

    #[rstest]
    fn test_matrix_density_law(store: TomeStore<MemoryBackend>) {
        let table = store.read_gene_table("exon", &GeneSelection::All, false).unwrap();
        let matrix = GeneMatrix::from_table(&table).unwrap();
        let rows: Vec<_> = table.index_rows().unwrap().collect();

        for &s in &matrix.sample_index {
            for &g in &matrix.gene_index {
                let matching: Vec<f64> = rows
                    .iter()
                    .filter(|&&(rs, rg, _)| rs == s && rg == g)
                    .map(|&(_, _, n)| f64::from(n))
                    .collect();
                let expected = if matching.is_empty() {
                    0.0
                } else {
                    matching.iter().sum::<f64>() / matching.len() as f64
                };
                assert_eq!(matrix.get(s, g), Some(expected));
            }
        }
    }

    #[rstest]
    fn test_duplicates_are_averaged() {
        let matrix = GeneMatrix::pivot(&[0, 0, 1, 0], &[2, 2, 2, 5], &[1, 4, 3, 7]).unwrap();

        assert_eq!(matrix.values, array![[2.5, 7.0], [3.0, 0.0]]);
        assert_eq!(matrix.get(0, 2), Some(2.5));
        assert_eq!(matrix.get(1, 5), Some(0.0));
        assert_eq!(matrix.get(2, 5), None);
    }

    #[rstest]
    #[case(&[0, 1], &[0], &[5, 6])]
    #[case(&[0], &[0, 1], &[5, 6])]
    #[case(&[0, 1], &[0, 1], &[5])]
    fn test_pivot_rejects_uneven_columns(
        #[case] sample_index: &[u32],
        #[case] gene_index: &[u32],
        #[case] num_reads: &[u32],
    ) {
        assert!(matches!(
            GeneMatrix::pivot(sample_index, gene_index, num_reads),
            Err(TomeError::Schema(_))
        ));
    }

    #[rstest]
    fn test_names_do_not_change_values(store: TomeStore<MemoryBackend>) {
        let selection = GeneSelection::names(["gene3", "gene0"]);
        let by_index = store.read_gene_matrix("exon", &selection, false).unwrap();
        let by_name = store.read_gene_matrix("exon", &selection, true).unwrap();

        assert_eq!(by_index.values, by_name.values);
        assert_eq!(
            by_name.column_labels(),
            vec!["gene0".to_string(), "gene3".to_string()]
        );
        assert_eq!(by_name.row_labels(), vec!["s0", "s1", "s2", "s5"]);
        assert_eq!(by_name.get_by_name("s5", "gene3"), Some(1.0));
        assert_eq!(by_index.row_labels(), vec!["0", "1", "2", "5"]);
    }

    #[rstest]
    fn test_empty_region_gives_empty_matrix() {
        let backend =
            MemoryBackend::tome(&["g0"], &["s0"]).with_region("exon", vec![0, 0], vec![], vec![]);
        let store = TomeStore::from_backend(backend);

        let matrix = store.read_gene_matrix("exon", &GeneSelection::All, true).unwrap();
        assert_eq!(matrix.shape(), (0, 0));
    }

    #[rstest]
    fn test_named_table_is_rejected(store: TomeStore<MemoryBackend>) {
        let table = store.read_gene_table("exon", &GeneSelection::All, true).unwrap();
        assert!(GeneMatrix::from_table(&table).is_err());
    }
}
