mod link;
mod run;
mod session;

pub use link::{links_from_csv, tile_file_name, Link, TileBounds, TileService};
pub use run::{fetch_links, FailedLink, FetchOptions, FetchReport};
pub use session::{PortalAuth, PortalSession};
