use anyhow::Result;

use crate::cli::{Cli, LinksArgs};
use crate::common::fs::ensure_dir_exists;
use crate::fetch::{fetch_links, links_from_csv, FetchOptions, PortalSession};

pub fn run(cli: &Cli, args: &LinksArgs) -> Result<()> {
    if cli.verbose > 0 {
        eprintln!("[links] reading {}", args.csv.display());
    }
    println!("Reading CSV...");
    let links = links_from_csv(
        &args.csv,
        &args.url_column,
        &args.extension_column,
        args.name_column.as_deref(),
    )?;

    ensure_dir_exists(&args.fetch.out_dir)?;
    println!(
        "Downloading {} file{} to {}...",
        links.len(),
        if links.len() == 1 { "" } else { "s" },
        args.fetch.out_dir.display()
    );

    let session = PortalSession::anonymous(cli.verbose)?;
    let opts = FetchOptions { keep_going: args.fetch.keep_going, verbose: cli.verbose };
    let report = fetch_links(&session, &links, &args.fetch.out_dir, &opts)?;

    super::finish_run(&report, &args.fetch, cli.verbose)
}
