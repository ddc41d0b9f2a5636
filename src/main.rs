use anyhow::Result;
use clap::Parser;
use cyberguard::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
