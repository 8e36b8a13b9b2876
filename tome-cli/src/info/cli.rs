use clap::{Arg, Command, arg};

pub const INFO_CMD: &str = "info";

pub fn create_info_cli() -> Command {
    Command::new(INFO_CMD)
        .about("Summarize the catalogs, regions and annotations of a tome file.")
        .arg(Arg::new("tome").required(true).help("Path to the tome file"))
        .arg(
            arg!(--json)
                .help("Print the summary as JSON")
                .action(clap::ArgAction::SetTrue),
        )
}
