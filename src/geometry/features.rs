use anyhow::{bail, ensure, Context, Result};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde_json::{Map, Value};

/// One feature: a geometry plus its attribute map.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

/// An in-memory feature collection tagged with its coordinate system.
/// Never mutated after load; derived sets are new values.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
    pub epsg: u32,
}

impl FeatureSet {
    /// Parse a GeoJSON-style FeatureCollection. `epsg` declares the
    /// coordinate system the coordinates arrive in.
    pub fn from_feature_collection(value: &Value, epsg: u32) -> Result<Self> {
        let features = value
            .get("features")
            .and_then(Value::as_array)
            .context("feature collection has no \"features\" array")?;

        let features = features
            .iter()
            .enumerate()
            .map(|(i, feature)| parse_feature(feature).with_context(|| format!("feature {i}")))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { features, epsg })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn parse_feature(value: &Value) -> Result<Feature> {
    let geometry = value.get("geometry").context("feature has no geometry")?;
    let properties = value
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Ok(Feature { geometry: parse_geometry(geometry)?, properties })
}

fn parse_geometry(value: &Value) -> Result<Geometry<f64>> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .context("geometry has no type")?;
    let coords = value
        .get("coordinates")
        .context("geometry has no coordinates")?;

    match kind {
        "Point" => Ok(Geometry::Point(Point::from(parse_position(coords)?))),
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords)?)),
        "MultiPolygon" => {
            let polygons = coords
                .as_array()
                .context("MultiPolygon coordinates must be an array")?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon(polygons)))
        }
        other => bail!("unsupported geometry type {other:?}"),
    }
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value
        .as_array()
        .context("Polygon coordinates must be an array of rings")?;
    let mut rings = rings.iter().map(parse_ring).collect::<Result<Vec<_>>>()?;
    if rings.is_empty() {
        bail!("Polygon has no rings");
    }

    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

/// Parse a ring, closing it if the source left it open.
fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let positions = value.as_array().context("ring must be an array of positions")?;
    let mut coords = positions
        .iter()
        .map(parse_position)
        .collect::<Result<Vec<_>>>()?;
    if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
        coords.push(coords[0]);
    }
    Ok(LineString(coords))
}

fn parse_position(value: &Value) -> Result<Coord<f64>> {
    let pair = value.as_array().context("position must be an [x, y] array")?;
    ensure!(pair.len() >= 2, "position must hold at least x and y");
    let x = pair[0].as_f64().context("position x must be a number")?;
    let y = pair[1].as_f64().context("position y must be a number")?;
    Ok(Coord { x, y })
}
