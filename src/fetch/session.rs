use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use tempfile::NamedTempFile;

use crate::common::fs::collision_free_path;
use crate::progress;

/// Marker the portal serves inside the body of any page that requires a
/// login; its presence in an API response means the session never
/// authenticated.
const LOGIN_MARKER: &str = "login";

/// Streamed copies go through this buffer.
const CHUNK_SIZE: usize = 1024 * 1024;

/// Credentials for the portal's form-based login.
#[derive(Debug, Clone)]
pub struct PortalAuth {
    pub login_url: String,
    pub username: String,
    pub password: String,
}

/// One authenticated (or anonymous) HTTP session against the portal.
///
/// The client keeps cookies across requests and sets no request timeout: the
/// fetch loop is serial, and an unresponsive server stalls the run rather
/// than abandoning a half-finished tile.
pub struct PortalSession {
    client: Client,
    verbose: u8,
}

impl PortalSession {
    /// Build the session and authenticate once with a form POST.
    pub fn connect(auth: &PortalAuth, verbose: u8) -> Result<Self> {
        let session = Self::anonymous(verbose)?;

        if verbose > 0 {
            eprintln!("[session] logging in to {}", auth.login_url);
        }
        let _ = session
            .client
            .post(&auth.login_url)
            .form(&[
                ("user", auth.username.as_str()),
                ("password", auth.password.as_str()),
            ])
            .send()
            .with_context(|| format!("POST {}", auth.login_url))?
            .error_for_status()
            .with_context(|| format!("login to {} failed", auth.login_url))?;

        Ok(session)
    }

    /// Build the session without logging in; the tile endpoints carry their
    /// credential in the quad-word path segment instead of a cookie.
    pub fn anonymous(verbose: u8) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gispull/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .timeout(None::<Duration>)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, verbose })
    }

    /// GET a JSON document, raising on HTTP errors and on the portal's login
    /// marker (the portal answers unauthenticated API requests with its
    /// login page and a 200).
    pub fn fetch_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned error status"))?;

        let body = response
            .text()
            .with_context(|| format!("reading body of {url}"))?;
        if body.contains(LOGIN_MARKER) {
            bail!("not logged in: {url} answered with the portal login page");
        }

        serde_json::from_str(&body).with_context(|| format!("{url} did not return valid JSON"))
    }

    /// Stream `url` to a file named `file_name` inside `out_dir`.
    ///
    /// The body lands in a temp file and is renamed into place once the copy
    /// finishes, so an aborted run never leaves a half-written file under
    /// the final name. A taken name gets `_1`, `_2`, ... inserted before the
    /// extension. Returns the final path and the bytes written.
    pub fn download(&self, url: &str, out_dir: &Path, file_name: &str) -> Result<(PathBuf, u64)> {
        let target = collision_free_path(&out_dir.join(file_name));

        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned error status"))?;

        let mut staged = StagedFile::open(&target)?;
        let written = match response.content_length() {
            Some(total) => copy_with_progress(&mut response, &mut staged, total, self.verbose)?,
            // No declared length: nothing to size a bar with, copy silently.
            None => std::io::copy(&mut response, &mut staged)
                .with_context(|| format!("writing {}", target.display()))?,
        };
        staged.finalize()?;

        Ok((target, written))
    }
}

/// Chunked copy that advances a byte progress bar sized by Content-Length.
fn copy_with_progress(
    reader: &mut impl Read,
    writer: &mut impl Write,
    total: u64,
    verbose: u8,
) -> Result<u64> {
    let bar = progress::byte_bar(total);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut buf).context("reading response body")?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).context("writing chunk")?;
        written += n as u64;
        bar.set_position(written.min(total));
        if verbose > 1 {
            eprintln!(
                "[fetch] {written} of {total} bytes ({:.1}%)",
                100.0 * progress::fraction(written, total)
            );
        }
    }

    bar.finish_and_clear();
    Ok(written)
}

/// Write-then-rename wrapper so downloads only appear under their final name
/// once complete.
struct StagedFile {
    target: PathBuf,
    tmp: Option<NamedTempFile>,
}

impl StagedFile {
    fn open(target: &Path) -> Result<Self> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        let tmp = NamedTempFile::new_in(target.parent().unwrap_or(Path::new(".")))
            .context("create temp file")?;

        Ok(Self { target: target.to_path_buf(), tmp: Some(tmp) })
    }

    fn finalize(mut self) -> Result<()> {
        let tmp = self.tmp.take().context("download already finalized")?;
        tmp.as_file().sync_all().ok(); // best-effort fsync
        tmp.persist(&self.target)
            .with_context(|| format!("rename to {}", self.target.display()))?;
        Ok(())
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tmp.as_mut().expect("staged file already finalized").write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.tmp.as_mut().expect("staged file already finalized").flush()
    }
}
