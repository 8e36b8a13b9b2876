mod export;
mod info;
mod matrix;
mod common;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "tome";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Inspect tome files and export their read counts as tables or matrices.")
        .subcommand_required(true)
        .subcommand(info::cli::create_info_cli())
        .subcommand(export::cli::create_export_cli())
        .subcommand(matrix::cli::create_matrix_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // INFO
        //
        Some((info::cli::INFO_CMD, matches)) => {
            info::handlers::run_info(matches)?;
        }

        //
        // LONG-FORM EXPORT
        //
        Some((export::cli::EXPORT_CMD, matches)) => {
            export::handlers::run_export(matches)?;
        }

        //
        // DENSE MATRIX
        //
        Some((matrix::cli::MATRIX_CMD, matches)) => {
            matrix::handlers::run_matrix(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
