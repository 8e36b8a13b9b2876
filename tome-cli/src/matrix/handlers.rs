use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use flate2::Compression;
use flate2::write::GzEncoder;

use tome_io::{GeneMatrix, TomeStore};

use crate::common::gene_selection;

/// Write `matrix` as tab-separated text: a `sample` header followed by one line per row.
pub fn write_matrix_tsv<W: Write>(matrix: &GeneMatrix, mut writer: W) -> Result<()> {
    write!(writer, "sample")?;
    for label in matrix.column_labels() {
        write!(writer, "\t{label}")?;
    }
    writeln!(writer)?;

    for (label, row) in matrix.row_labels().iter().zip(matrix.values.rows()) {
        write!(writer, "{label}")?;
        for value in row {
            write!(writer, "\t{value}")?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_matrix_file(matrix: &GeneMatrix, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Can't create matrix file {}", path.display()))?;

    match path.extension().is_some_and(|ext| ext == "gz") {
        true => {
            let mut encoder = GzEncoder::new(file, Compression::default());
            write_matrix_tsv(matrix, BufWriter::new(&mut encoder))?;
            encoder.finish()?;
        }
        false => write_matrix_tsv(matrix, BufWriter::new(file))?,
    }
    Ok(())
}

pub fn run_matrix(matches: &ArgMatches) -> Result<()> {
    let tome = matches
        .get_one::<String>("tome")
        .expect("A tome file is required.");

    let output = matches
        .get_one::<String>("output")
        .expect("An output path is required.");

    let region = matches
        .get_one::<String>("region")
        .expect("The region has a default value.");

    let names = matches.get_flag("names");
    let selection = gene_selection(matches)?;

    let store = TomeStore::open(tome).with_context(|| format!("Failed to open {tome}"))?;
    let matrix = store
        .read_gene_matrix(region, &selection, names)
        .with_context(|| format!("Failed to read region '{region}' of {tome}"))?;

    let (samples, genes) = matrix.shape();
    write_matrix_file(&matrix, Path::new(output))?;
    println!("Wrote {samples} x {genes} matrix to {output}");

    Ok(())
}
