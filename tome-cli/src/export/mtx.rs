use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;

use tome_io::{GeneTable, TomeBackend, TomeStore};

fn gz_writer(path: &str) -> Result<BufWriter<GzEncoder<File>>> {
    let file = File::create(path)?;
    Ok(BufWriter::new(GzEncoder::new(file, Compression::default())))
}

/// Write sample × gene read counts in Matrix Market format
///
/// Takes an index-labelled table from `read_gene_table` and writes 3 files:
/// - {prefix}_matrix.mtx.gz: sparse triplets (sample, gene, num_reads)
/// - {prefix}_samples.tsv.gz: sample names (one per line, full catalog)
/// - {prefix}_genes.tsv.gz: gene names (one per line, full catalog)
///
/// Triplets are sorted by (sample, gene) and written 1-indexed. Returns the
/// number of triplets written.
pub fn write_table_to_mtx<B: TomeBackend>(
    store: &TomeStore<B>,
    table: &GeneTable,
    output_prefix: &str,
) -> Result<usize> {
    let Some(rows) = table.index_rows() else {
        anyhow::bail!("Matrix Market output needs an index-labelled table");
    };

    let samples = store.sample_names()?;
    let genes = store.gene_names()?;

    let mut triplets: Vec<(u32, u32, u32)> = rows.collect();
    triplets.sort_by_key(|&(s, g, _)| (s, g));

    if let Some(&(s, g, _)) = triplets
        .iter()
        .find(|&&(s, g, _)| s as usize >= samples.len() || g as usize >= genes.len())
    {
        anyhow::bail!("Reading at sample {s}, gene {g} lies outside the catalogs");
    }

    // 1. matrix
    let mut mtx_writer = gz_writer(&format!("{output_prefix}_matrix.mtx.gz"))?;
    writeln!(
        mtx_writer,
        "%%MatrixMarket matrix coordinate integer general"
    )?;
    writeln!(
        mtx_writer,
        "{} {} {}",
        samples.len(),
        genes.len(),
        triplets.len()
    )?;
    for &(sample, gene, num_reads) in &triplets {
        writeln!(mtx_writer, "{} {} {}", sample + 1, gene + 1, num_reads)?;
    }
    mtx_writer.flush()?;

    // 2. samples
    let mut samples_writer = gz_writer(&format!("{output_prefix}_samples.tsv.gz"))?;
    for sample in samples {
        writeln!(samples_writer, "{sample}")?;
    }
    samples_writer.flush()?;

    // 3. genes
    let mut genes_writer = gz_writer(&format!("{output_prefix}_genes.tsv.gz"))?;
    for gene in genes {
        writeln!(genes_writer, "{gene}")?;
    }
    genes_writer.flush()?;

    Ok(triplets.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use flate2::read::GzDecoder;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use tome_io::{GeneSelection, MemoryBackend};

    fn read_gz(path: &std::path::Path) -> String {
        let mut text = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    #[rstest]
    fn test_write_table_to_mtx() {
        let backend = MemoryBackend::tome(&["g0", "g1"], &["s0", "s1", "s2"]).with_region(
            "exon",
            vec![0, 2, 3],
            vec![2, 0, 1],
            vec![5, 6, 7],
        );
        let store = TomeStore::from_backend(backend);
        let table = store
            .read_gene_table("exon", &GeneSelection::All, false)
            .unwrap();

        let tempdir = tempfile::tempdir().unwrap();
        let prefix = tempdir.path().join("demo");
        let prefix = prefix.to_string_lossy();

        assert_eq!(write_table_to_mtx(&store, &table, &prefix).unwrap(), 3);

        assert_eq!(
            read_gz(&tempdir.path().join("demo_matrix.mtx.gz")),
            "%%MatrixMarket matrix coordinate integer general\n3 2 3\n1 1 6\n2 2 7\n3 1 5\n"
        );
        assert_eq!(read_gz(&tempdir.path().join("demo_samples.tsv.gz")), "s0\ns1\ns2\n");
        assert_eq!(read_gz(&tempdir.path().join("demo_genes.tsv.gz")), "g0\ng1\n");
    }

    #[rstest]
    fn test_named_table_is_rejected() {
        let backend = MemoryBackend::tome(&["g0"], &["s0"]).with_region(
            "exon",
            vec![0, 1],
            vec![0],
            vec![1],
        );
        let store = TomeStore::from_backend(backend);
        let table = store
            .read_gene_table("exon", &GeneSelection::All, true)
            .unwrap();

        let tempdir = tempfile::tempdir().unwrap();
        let prefix = tempdir.path().join("demo");
        assert!(write_table_to_mtx(&store, &table, &prefix.to_string_lossy()).is_err());
    }
}
