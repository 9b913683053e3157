use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Portal download CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "gispull", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every tile in a bounding box, then extract the archives
    Tiles(TilesArgs),

    /// Fetch the links listed in a CSV, then extract the archives
    Links(LinksArgs),

    /// Export portal heatmap data to a clipped shapefile
    Heatmap(HeatmapArgs),
}

#[derive(Args, Debug)]
pub struct TilesArgs {
    /// Portal root, e.g. https://discover.example.gov/login/path
    #[arg(long, value_hint = ValueHint::Url)]
    pub portal: String,

    /// Access quad word embedded in the tile path
    #[arg(long)]
    pub quad_word: String,

    /// Product path segment between the quad word and the layer
    #[arg(long, default_value = "footprint")]
    pub product: String,

    /// Layer name, e.g. 30cm_hexagon
    #[arg(long)]
    pub layer: String,

    /// Service path segment between the layer and the zoom level
    #[arg(long, default_value = "hx")]
    pub service: String,

    /// Zoom level of the tile pyramid
    #[arg(long)]
    pub zoom: u32,

    /// Leftmost tile column
    #[arg(long)]
    pub min_x: u32,

    /// Rightmost tile column (inclusive)
    #[arg(long)]
    pub max_x: u32,

    /// Topmost tile row
    #[arg(long)]
    pub min_y: u32,

    /// Bottommost tile row (inclusive)
    #[arg(long)]
    pub max_y: u32,

    /// File extension the downloaded tiles are saved with
    #[arg(long, default_value = "zip")]
    pub extension: String,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

#[derive(Args, Debug)]
pub struct LinksArgs {
    /// CSV file with a header row listing one download per row
    #[arg(value_hint = ValueHint::FilePath)]
    pub csv: PathBuf,

    /// Column holding the download URL
    #[arg(long, default_value = "url")]
    pub url_column: String,

    /// Column holding the file extension
    #[arg(long, default_value = "extension")]
    pub extension_column: String,

    /// Optional column naming the output file (defaults to the URL basename)
    #[arg(long)]
    pub name_column: Option<String>,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Options shared by every fetch-and-extract run
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Directory the raw downloads land in
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Directory the archives are extracted into
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub unzip_dir: PathBuf,

    /// Skip the extraction pass
    #[arg(long)]
    pub skip_extract: bool,

    /// Record failed links and keep going instead of aborting on the first error
    #[arg(long)]
    pub keep_going: bool,

    /// Write a JSON fetch report to this path
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HeatmapArgs {
    /// Portal root, e.g. https://discover.example.gov
    #[arg(long, value_hint = ValueHint::Url)]
    pub portal: String,

    /// Heatmap layer, or "all" for the portal-wide endpoint
    #[arg(long, default_value = "all")]
    pub layer: String,

    /// Output scale of the exported grid
    #[arg(long, default_value_t = 15)]
    pub zoom: u32,

    /// Only report usage from this zoom level and deeper
    #[arg(long, default_value_t = 18)]
    pub minzoom: u32,

    /// Portal login user
    #[arg(long)]
    pub user: String,

    /// Environment variable holding the portal password (prompts when unset)
    #[arg(long)]
    pub password_env: Option<String>,

    /// Connection string for the boundary database
    #[arg(long)]
    pub boundary_db: String,

    /// Table holding the reference boundary
    #[arg(long, default_value = "boundaries.state_boundary")]
    pub boundary_table: String,

    /// Geometry column of the boundary table
    #[arg(long, default_value = "shape")]
    pub geometry_column: String,

    /// Name column the region filter matches against
    #[arg(long, default_value = "state")]
    pub name_column: String,

    /// Region name the boundary is filtered to
    #[arg(long)]
    pub region: String,

    /// EPSG code of the boundary geometries
    #[arg(long, default_value_t = 26912)]
    pub boundary_epsg: u32,

    /// Directory the shapefile is written into
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,
}
