use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, arg};
use indicatif::{ProgressBar, ProgressStyle};

use tome_io::GeneSelection;
use tome_io::consts::DEFAULT_REGION;

/// `--region`, `--genes` and `--gene`, shared by the reading subcommands.
pub fn selection_args() -> [Arg; 3] {
    [
        arg!(--region <REGION>)
            .required(false)
            .default_value(DEFAULT_REGION)
            .help("Region to read (e.g. exon, intron)"),
        arg!(--genes <FILE>)
            .required(false)
            .help("File with one gene name per line; only these genes are read"),
        Arg::new("gene")
            .long("gene")
            .action(ArgAction::Append)
            .required(false)
            .help("Gene name to read; may be repeated"),
    ]
}

///
/// Read a gene list: one name per line, blank lines and `#` comments skipped.
///
/// # Arguments
/// - path: path to the gene list on disk.
pub fn read_gene_list(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("Can't open gene list {}", path.display()))?;

    let mut genes = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let name = line.trim();
        if name.is_empty() || name.starts_with('#') {
            continue;
        }
        genes.push(name.to_string());
    }
    Ok(genes)
}

/// Build the gene selection requested on the command line.
pub fn gene_selection(matches: &ArgMatches) -> Result<GeneSelection> {
    let mut names: Vec<String> = Vec::new();
    let mut requested = false;

    if let Some(path) = matches.get_one::<String>("genes") {
        names.extend(read_gene_list(Path::new(path))?);
        requested = true;
    }
    if let Some(genes) = matches.get_many::<String>("gene") {
        names.extend(genes.cloned());
        requested = true;
    }

    Ok(match requested {
        true => GeneSelection::Names(names),
        false => GeneSelection::All,
    })
}

pub fn gene_progress_bar(num_genes: usize, message: String) -> ProgressBar {
    let bar = ProgressBar::new(num_genes as u64);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );
    bar.set_message(message);
    bar
}
