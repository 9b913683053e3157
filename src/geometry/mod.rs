mod clip;
mod features;
mod proj;
mod shp;
pub(crate) mod wkb;

pub use clip::clip_to_boundary;
pub use features::{Feature, FeatureSet};
pub use proj::{proj4_for_epsg, reproject};
pub use shp::write_shapefile;
