#![doc = "Bulk tile, imagery, and heatmap downloader for authenticated GIS portals"]
mod boundary;
mod common;
mod fetch;
mod geometry;
mod progress;

pub mod cli;
pub mod commands;

#[doc(inline)]
pub use fetch::{
    fetch_links, links_from_csv, tile_file_name, FailedLink, FetchOptions, FetchReport, Link,
    PortalAuth, PortalSession, TileBounds, TileService,
};

#[doc(inline)]
pub use geometry::{clip_to_boundary, reproject, write_shapefile, Feature, FeatureSet};

#[doc(inline)]
pub use boundary::{fetch_boundary, BoundaryQuery};

#[doc(inline)]
pub use common::fs::{
    collision_free_path, ensure_dir_exists, extract_all, extract_zip_flat,
    find_files_with_extension,
};

#[doc(inline)]
pub use progress::{fraction, human_duration, Eta};
