use anyhow::Result;
use barcond::cli::{self, Cli};
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::run(cli)
}
