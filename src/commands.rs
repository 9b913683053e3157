use anyhow::{bail, Result};

use crate::cli::FetchArgs;
use crate::common::fs::extract_all;
use crate::fetch::FetchReport;

pub mod heatmap;
pub mod links;
pub mod tiles;

/// Shared tail of every fetch-and-extract run: extract what arrived, write
/// the report if one was asked for, then surface accumulated failures as a
/// nonzero exit.
pub(crate) fn finish_run(report: &FetchReport, args: &FetchArgs, verbose: u8) -> Result<()> {
    if !args.skip_extract {
        println!("Extracting to {}...", args.unzip_dir.display());
        let extracted = extract_all(&args.out_dir, &args.unzip_dir, verbose)?;
        println!(
            "Extracted {extracted} file{}",
            if extracted == 1 { "" } else { "s" }
        );
    }

    if let Some(path) = &args.report {
        report.write_json(path)?;
        println!("Wrote fetch report to {}", path.display());
    }

    if !report.failed.is_empty() {
        eprintln!("{} download(s) failed:", report.failed.len());
        for failed in &report.failed {
            eprintln!("  {}: {}", failed.url, failed.error);
        }
        bail!(
            "{} of {} downloads failed",
            report.failed.len(),
            report.failed.len() + report.completed.len()
        );
    }

    Ok(())
}
