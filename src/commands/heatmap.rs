use anyhow::{bail, Context, Result};

use crate::boundary::{fetch_boundary, BoundaryQuery};
use crate::cli::{Cli, HeatmapArgs};
use crate::common::fs::ensure_dir_exists;
use crate::fetch::{PortalAuth, PortalSession};
use crate::geometry::{clip_to_boundary, reproject, write_shapefile, FeatureSet};

/// The portal serves heatmap coordinates in WGS84.
const SOURCE_EPSG: u32 = 4326;

pub fn run(cli: &Cli, args: &HeatmapArgs) -> Result<()> {
    let portal = args.portal.trim_end_matches('/');
    let api_url = if args.layer == "all" {
        format!("{portal}/heatmap/api")
    } else {
        format!("{portal}/heatmap/api/{}", args.layer)
    };

    let auth = PortalAuth {
        login_url: format!("{portal}/login"),
        username: args.user.clone(),
        password: read_password(args)?,
    };

    println!("Logging in...");
    let session = PortalSession::connect(&auth, cli.verbose)?;

    println!("Downloading data...");
    let query = [
        ("zoom", args.zoom.to_string()),
        ("minzoom", args.minzoom.to_string()),
    ];
    let raw = session.fetch_json(&api_url, &query)?;
    let features = FeatureSet::from_feature_collection(&raw, SOURCE_EPSG)?;
    if cli.verbose > 0 {
        eprintln!("[heatmap] {} features fetched", features.len());
    }

    println!("Fetching the {} boundary...", args.region);
    let boundary_query = BoundaryQuery {
        conn: args.boundary_db.clone(),
        table: args.boundary_table.clone(),
        geometry_column: args.geometry_column.clone(),
        name_column: args.name_column.clone(),
        region: args.region.clone(),
        epsg: args.boundary_epsg,
    };
    let boundary = fetch_boundary(&boundary_query, cli.verbose)?;

    println!("Reprojecting and clipping...");
    let reprojected = reproject(&features, boundary_query.epsg)?;
    let clipped = clip_to_boundary(&reprojected, &boundary);
    if clipped.is_empty() {
        bail!("no heatmap features intersect the {} boundary", args.region);
    }
    if cli.verbose > 0 {
        eprintln!(
            "[heatmap] {} of {} features intersect the boundary",
            clipped.len(),
            features.len()
        );
    }

    ensure_dir_exists(&args.out_dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let shapefile_path = args
        .out_dir
        .join(format!("{}_{}-{}_{stamp}.shp", args.layer, args.zoom, args.minzoom));

    println!("Saving to {}...", shapefile_path.display());
    write_shapefile(&clipped, &shapefile_path)?;

    Ok(())
}

/// Password from the configured environment variable, or a no-echo prompt.
fn read_password(args: &HeatmapArgs) -> Result<String> {
    match &args.password_env {
        Some(var) => std::env::var(var)
            .with_context(|| format!("password environment variable {var} is not set")),
        None => rpassword::prompt_password(format!("Password for {}: ", args.user))
            .context("failed to read password from the terminal"),
    }
}
