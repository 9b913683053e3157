use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::common::fs::ensure_dir_exists;
use crate::fetch::{Link, PortalSession};
use crate::progress::{self, Eta};

/// Rough prior for the first remaining-time estimate; observed times take
/// over as downloads complete.
const ETA_PRIOR: Duration = Duration::from_secs(15);

/// Knobs for one fetch run.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Record failures and keep going instead of aborting on the first one.
    pub keep_going: bool,
    pub verbose: u8,
}

/// A link that could not be downloaded, with the error that stopped it.
#[derive(Debug, Serialize)]
pub struct FailedLink {
    pub url: String,
    pub file_name: String,
    pub error: String,
}

/// What a fetch run produced.
#[derive(Debug, Default, Serialize)]
pub struct FetchReport {
    pub completed: Vec<PathBuf>,
    pub failed: Vec<FailedLink>,
}

impl FetchReport {
    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing fetch report")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing fetch report to {}", path.display()))?;
        Ok(())
    }
}

/// Download every link serially into `out_dir`, one at a time over the
/// shared session, with a run-level progress bar and a rough remaining-time
/// estimate. With `keep_going` set, a failed link is recorded and the loop
/// moves on; otherwise the first failure aborts the run. No link is retried.
pub fn fetch_links(
    session: &PortalSession,
    links: &[Link],
    out_dir: &Path,
    opts: &FetchOptions,
) -> Result<FetchReport> {
    ensure_dir_exists(out_dir)?;

    let bar = progress::run_bar(links.len() as u64);
    let mut eta = Eta::new(ETA_PRIOR);
    let mut report = FetchReport::default();

    for (i, link) in links.iter().enumerate() {
        let left = (links.len() - i) as u64;
        bar.set_message(format!(
            "{}, {} of {}, {} rem. (rough)",
            link.file_name,
            i + 1,
            links.len(),
            progress::human_duration(eta.remaining(left)),
        ));
        if opts.verbose > 0 {
            eprintln!(
                "[fetch] {} -> {} ({} of {}, {:.0}%)",
                link.url,
                link.file_name,
                i + 1,
                links.len(),
                100.0 * progress::fraction(i as u64, links.len() as u64),
            );
        }

        let start = Instant::now();
        match session.download(&link.url, out_dir, &link.file_name) {
            Ok((path, _written)) => report.completed.push(path),
            Err(err) if opts.keep_going => {
                if opts.verbose > 0 {
                    eprintln!("[fetch] failed {}: {err:#}", link.url);
                }
                report.failed.push(FailedLink {
                    url: link.url.clone(),
                    file_name: link.file_name.clone(),
                    error: format!("{err:#}"),
                });
            }
            Err(err) => {
                bar.abandon();
                return Err(err.context(format!("downloading {}", link.url)));
            }
        }
        eta.record(start.elapsed());
        bar.inc(1);
    }

    bar.finish_and_clear();
    Ok(report)
}
