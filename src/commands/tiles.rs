use anyhow::Result;

use crate::cli::{Cli, TilesArgs};
use crate::common::fs::ensure_dir_exists;
use crate::fetch::{fetch_links, FetchOptions, PortalSession, TileBounds, TileService};

pub fn run(cli: &Cli, args: &TilesArgs) -> Result<()> {
    let bounds = TileBounds::new(args.min_x, args.max_x, args.min_y, args.max_y)?;
    let service = TileService::new(
        &args.portal,
        &args.quad_word,
        &args.product,
        &args.layer,
        &args.service,
        args.zoom,
        &args.extension,
    );
    let links = service.expand(&bounds)?;

    if cli.verbose > 0 {
        eprintln!(
            "[tiles] layer={} zoom={} x={}..={} y={}..={}",
            args.layer, args.zoom, args.min_x, args.max_x, args.min_y, args.max_y
        );
    }

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
