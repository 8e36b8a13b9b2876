use clap::{Arg, Command, arg};

use crate::common::selection_args;

pub const MATRIX_CMD: &str = "matrix";

pub fn create_matrix_cli() -> Command {
    Command::new(MATRIX_CMD)
        .about("Pivot one region of a tome file into a dense sample x gene matrix.")
        .arg(Arg::new("tome").required(true).help("Path to the tome file"))
        .arg(
            Arg::new("output")
                .required(true)
                .help("Output TSV file; gzipped when it ends in .gz"),
        )
        .args(selection_args())
        .arg(
            arg!(--names)
                .help("Label rows and columns with sample and gene names instead of indices")
                .action(clap::ArgAction::SetTrue),
        )
}
