use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;

use tome_io::{GeneSelection, TomeBackend, TomeStore};

use super::mtx::write_table_to_mtx;
use super::sink::{ExportFormat, RowSink, create_sink};
use crate::common::{gene_progress_bar, gene_selection};

///
/// Stream every selected block of a store into `sink`, resolving names as it goes.
///
/// Returns the number of rows written.
pub fn export_store<B: TomeBackend>(
    store: &TomeStore<B>,
    region: &str,
    selection: &GeneSelection,
    sink: &mut dyn RowSink,
    with_tome: bool,
) -> Result<usize> {
    let blocks = store.iter_gene_blocks(region, selection)?;
    let bar = gene_progress_bar(
        blocks.num_selected(),
        format!("{} {}", store.identifier(), region),
    );
    let blocks = blocks.with_progress(bar);

    let tome = with_tome.then(|| store.identifier());
    let mut rows = 0;
    for block in blocks {
        let block = block?;
        let gene = store.gene_name(block.gene_index)?;
        for (&sample, &num_reads) in block.sample_index.iter().zip(&block.num_reads) {
            sink.write_row(num_reads, store.sample_name(sample as usize)?, gene, tome)?;
        }
        rows += block.len();
    }

    Ok(rows)
}

pub fn run_export(matches: &ArgMatches) -> Result<()> {
    let output = matches
        .get_one::<String>("output")
        .expect("An output path is required.");

    let tomes: Vec<&String> = matches
        .get_many::<String>("tomes")
        .expect("At least one tome file is required.")
        .collect();

    let region = matches
        .get_one::<String>("region")
        .expect("The region has a default value.");

    let format = match matches.get_one::<String>("format") {
        Some(format) => match ExportFormat::from_str(format) {
            Ok(format) => format,
            Err(err) => anyhow::bail!(err),
        },
        None => ExportFormat::from_path(output),
    };

    let selection = gene_selection(matches)?;

    if format == ExportFormat::Mtx {
        if tomes.len() != 1 {
            anyhow::bail!("mtx output takes exactly one tome, got {}", tomes.len());
        }
        let store =
            TomeStore::open(tomes[0]).with_context(|| format!("Failed to open {}", tomes[0]))?;
        let table = store.read_gene_table(region, &selection, false)?;
        let triplets = write_table_to_mtx(&store, &table, output)?;
        println!("Wrote {triplets} entries to {output}_matrix.mtx.gz");
        return Ok(());
    }

    let with_tome = tomes.len() > 1;
    let mut sink = create_sink(format, Path::new(output), with_tome)?;

    for path in &tomes {
        let store = TomeStore::open(path).with_context(|| format!("Failed to open {path}"))?;
        let rows = export_store(&store, region, &selection, sink.as_mut(), with_tome)
            .with_context(|| format!("Failed to export region '{region}' of {path}"))?;
        println!("{}: {rows} rows", store.identifier());
    }

    let rows = sink.finish()?;
    println!("Wrote {rows} rows to {output}");

    Ok(())
}
