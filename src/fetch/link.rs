use std::fs::File;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use polars::io::SerReader;
use polars::prelude::CsvReader;

/// One fully resolved download: where it comes from and what it is saved as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub file_name: String,
}

/// Inclusive tile-coordinate bounding box at a fixed zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBounds {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl TileBounds {
    pub fn new(min_x: u32, max_x: u32, min_y: u32, max_y: u32) -> Result<Self> {
        ensure!(min_x <= max_x, "min_x ({min_x}) must not exceed max_x ({max_x})");
        ensure!(min_y <= max_y, "min_y ({min_y}) must not exceed max_y ({max_y})");
        Ok(Self { min_x, max_x, min_y, max_y })
    }

    /// Number of tiles in the box.
    pub fn count(&self) -> u64 {
        (self.max_x - self.min_x + 1) as u64 * (self.max_y - self.min_y + 1) as u64
    }

    /// Iterate every (x, y) pair, x-major: all rows of the leftmost column
    /// first, then the next column, and so on.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32)> {
        let TileBounds { min_x, max_x, min_y, max_y } = *self;
        (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| (x, y)))
    }
}

/// URL builder for a quad-word tile service. Tiles live at
/// `{portal}/{quad_word}/{product}/{layer}/{service}/{zoom}/{x}/{y}` and are
/// saved under names reconstructed from those same path segments.
#[derive(Debug, Clone)]
pub struct TileService {
    base: String,
    extension: String,
}

impl TileService {
    /// Assemble the fixed URL prefix for one layer of the tile pyramid.
    pub fn new(
        portal: &str,
        quad_word: &str,
        product: &str,
        layer: &str,
        service: &str,
        zoom: u32,
        extension: &str,
    ) -> Self {
        let portal = portal.trim_end_matches('/');
        Self {
            base: format!("{portal}/{quad_word}/{product}/{layer}/{service}/{zoom}"),
            extension: extension.to_string(),
        }
    }

    /// URL of one tile.
    pub fn tile_url(&self, x: u32, y: u32) -> String {
        format!("{}/{}/{}", self.base, x, y)
    }

    /// Expand a bounding box into one link per tile, in enumeration order.
    pub fn expand(&self, bounds: &TileBounds) -> Result<Vec<Link>> {
        bounds
            .tiles()
            .map(|(x, y)| {
                let url = self.tile_url(x, y);
                let file_name = tile_file_name(&url, &self.extension)?;
                Ok(Link { url, file_name })
            })
            .collect()
    }
}

/// Reconstruct `{layer}_x{x}_y{y}_z{z}.{extension}` from a tile URL's path
/// segments: y is the last segment, x the second to last, z the third to
/// last, and the layer name the fifth to last.
pub fn tile_file_name(url: &str, extension: &str) -> Result<String> {
    let segments: Vec<&str> = url
        .trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    ensure!(segments.len() >= 5, "tile URL has too few path segments: {url}");

    let y = segments[segments.len() - 1];
    let x = segments[segments.len() - 2];
    let z = segments[segments.len() - 3];
    let layer = segments[segments.len() - 5];

    for (token, value) in [("x", x), ("y", y), ("z", z)] {
        ensure!(
            !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
            "non-numeric {token} segment {value:?} in tile URL {url}"
        );
    }

    Ok(format!("{layer}_x{x}_y{y}_z{z}.{extension}"))
}

/// Read one link per row from a delimited text file with a header row.
///
/// Every row needs a URL and an extension; the output name comes from
/// `name_column` when one is given, otherwise from the URL's basename with
/// the declared extension swapped in.
pub fn links_from_csv(
    path: &Path,
    url_column: &str,
    extension_column: &str,
    name_column: Option<&str>,
) -> Result<Vec<Link>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open CSV file: {}", path.display()))?;
    let df = CsvReader::new(file)
        .finish()
        .with_context(|| format!("failed to read CSV from {}", path.display()))?;

    let urls = df
        .column(url_column)
        .with_context(|| format!("missing column {url_column:?} in {}", path.display()))?
        .str()
        .with_context(|| format!("column {url_column:?} must hold strings"))?;
    let extensions = df
        .column(extension_column)
        .with_context(|| format!("missing column {extension_column:?} in {}", path.display()))?
        .str()
        .with_context(|| format!("column {extension_column:?} must hold strings"))?;
    let names = match name_column {
        Some(column) => Some(
            df.column(column)
                .with_context(|| format!("missing column {column:?} in {}", path.display()))?
                .str()
                .with_context(|| format!("column {column:?} must hold strings"))?,
        ),
        None => None,
    };

    let mut links = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let url = urls
            .get(row)
            .with_context(|| format!("row {row}: empty {url_column:?} value"))?;
        let extension = extensions
            .get(row)
            .with_context(|| format!("row {row}: empty {extension_column:?} value"))?
            .trim_start_matches('.');

        let stem = match names {
            Some(names) => names
                .get(row)
                .with_context(|| format!("row {row}: empty name value"))?
                .to_string(),
            None => url_basename_stem(url)?,
        };

        links.push(Link {
            url: url.to_string(),
            file_name: format!("{stem}.{extension}"),
        });
    }

    Ok(links)
}

/// Last path segment of a URL, without its extension or any query string.
fn url_basename_stem(url: &str) -> Result<String> {
    let base = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let base = base.split(['?', '#']).next().unwrap_or(base);
    ensure!(!base.is_empty(), "cannot derive a file name from URL {url:?}");

    Ok(match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    })
}
