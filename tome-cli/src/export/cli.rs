use clap::{Arg, ArgAction, Command, arg};

use crate::common::selection_args;

pub const EXPORT_CMD: &str = "export";

pub fn create_export_cli() -> Command {
    Command::new(EXPORT_CMD)
        .about("Stream the read counts of one or more tome files into a long-form table.")
        .arg(Arg::new("output").required(true).help("Output file (or prefix for mtx)"))
        .arg(
            Arg::new("tomes")
                .required(true)
                .action(ArgAction::Append)
                .help("Tome files to export; rows get a tome column when more than one is given"),
        )
        .args(selection_args())
        .arg(
            arg!(--format <FORMAT>)
                .required(false)
                .help("Output format: parquet, tsv or mtx (default: from the output extension)"),
        )
}
