use anyhow::Result;
use clap::Parser;

use gispull::cli::{Cli, Commands};
use gispull::commands::{heatmap, links, tiles};

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Tiles(args) => tiles::run(&cli, args),
        Commands::Links(args) => links::run(&cli, args),
        Commands::Heatmap(args) => heatmap::run(&cli, args),
    }
}
