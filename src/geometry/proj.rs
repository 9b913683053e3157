use anyhow::{bail, Context, Result};
use geo::{Coord, MapCoords};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use super::{Feature, FeatureSet};

/// Build a PROJ.4 definition for the EPSG codes portal data moves between:
/// geographic WGS84/NAD83, their UTM zones, and web mercator.
pub fn proj4_for_epsg(epsg: u32) -> Result<String> {
    Ok(match epsg {
        4326 => "+proj=longlat +datum=WGS84 +no_defs +type=crs".to_string(),
        4269 => "+proj=longlat +datum=NAD83 +no_defs +type=crs".to_string(),
        3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 \
                 +units=m +nadgrids=@null +no_defs +type=crs"
            .to_string(),
        26901..=26923 => format!(
            "+proj=utm +zone={} +datum=NAD83 +units=m +no_defs +type=crs",
            epsg - 26900
        ),
        32601..=32660 => format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs +type=crs",
            epsg - 32600
        ),
        32701..=32760 => format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs +type=crs",
            epsg - 32700
        ),
        other => bail!("unsupported EPSG code {other}"),
    })
}

/// Geographic systems carry degrees; projected ones carry meters.
fn is_geographic(epsg: u32) -> bool {
    matches!(epsg, 4326 | 4269)
}

/// Reproject every feature into `target_epsg`, returning a new set.
pub fn reproject(set: &FeatureSet, target_epsg: u32) -> Result<FeatureSet> {
    if set.epsg == target_epsg {
        return Ok(set.clone());
    }

    let from = {
        let definition = proj4_for_epsg(set.epsg)?;
        Proj::from_proj_string(&definition)
            .with_context(|| format!("failed to build source PROJ.4: {definition}"))?
    };
    let to = {
        let definition = proj4_for_epsg(target_epsg)?;
        Proj::from_proj_string(&definition)
            .with_context(|| format!("failed to build target PROJ.4: {definition}"))?
    };

    // proj4rs works in radians on the geographic side.
    let (radians_in, radians_out) = (is_geographic(set.epsg), is_geographic(target_epsg));

    let features = set
        .features
        .iter()
        .map(|feature| {
            let geometry = feature.geometry.try_map_coords(|coord: Coord<f64>| {
                let mut point = if radians_in {
                    (coord.x.to_radians(), coord.y.to_radians(), 0.0)
                } else {
                    (coord.x, coord.y, 0.0)
                };
                transform(&from, &to, &mut point).context("CRS transform failed")?;
                Ok::<_, anyhow::Error>(if radians_out {
                    Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
                } else {
                    Coord { x: point.0, y: point.1 }
                })
            })?;
            Ok(Feature { geometry, properties: feature.properties.clone() })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureSet { features, epsg: target_epsg })
}
