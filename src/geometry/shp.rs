use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Geometry, MultiPolygon};
use serde_json::{Map, Value};
use shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Writer};

use super::FeatureSet;

/// DBF field names are capped at ten bytes.
const FIELD_NAME_LIMIT: usize = 10;
const NUMERIC_LENGTH: u8 = 20;
const NUMERIC_DECIMALS: u8 = 6;
const CHARACTER_LENGTH: u8 = 254;

/// Write a feature set to `path` as a shapefile, with one DBF column per
/// attribute key seen anywhere in the set.
///
/// A shapefile holds exactly one geometry kind, so the set must be all
/// polygonal or all points.
pub fn write_shapefile(set: &FeatureSet, path: &Path) -> Result<()> {
    if set.is_empty() {
        bail!("refusing to write an empty shapefile to {}", path.display());
    }

    let polygonal = set
        .features
        .iter()
        .all(|f| matches!(f.geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_)));
    let points = set.features.iter().all(|f| matches!(f.geometry, Geometry::Point(_)));
    if !polygonal && !points {
        bail!(
            "cannot write mixed or unsupported geometry kinds to {}",
            path.display()
        );
    }

    let fields = collect_fields(set);

    let mut builder = TableWriterBuilder::new();
    for field in &fields {
        let name = shapefile::dbase::FieldName::try_from(field.name.as_str())
            .map_err(|e| anyhow!("invalid DBF field name {:?}: {e:?}", field.name))?;
        builder = if field.numeric {
            builder.add_numeric_field(name, NUMERIC_LENGTH, NUMERIC_DECIMALS)
        } else {
            builder.add_character_field(name, CHARACTER_LENGTH)
        };
    }

    let mut writer = Writer::from_path(path, builder)
        .with_context(|| format!("failed to create shapefile {}", path.display()))?;

    for (i, feature) in set.features.iter().enumerate() {
        let record = feature_record(&fields, &feature.properties);
        match &feature.geometry {
            Geometry::Polygon(polygon) => writer
                .write_shape_and_record(&multipolygon_to_shp(&MultiPolygon(vec![polygon.clone()])), &record),
            Geometry::MultiPolygon(mp) => {
                writer.write_shape_and_record(&multipolygon_to_shp(mp), &record)
            }
            Geometry::Point(point) => {
                writer.write_shape_and_record(&Point::new(point.x(), point.y()), &record)
            }
            other => bail!("feature {i}: unsupported geometry {other:?}"),
        }
        .with_context(|| format!("failed to write feature {i} to {}", path.display()))?;
    }

    Ok(())
}

/// One DBF column: the (possibly truncated) field name, the attribute key it
/// carries, and whether every non-null occurrence was numeric.
struct DbfField {
    name: String,
    key: String,
    numeric: bool,
}

/// Union of attribute keys across the set, in first-seen order, truncated to
/// the DBF name limit with truncation collisions disambiguated.
fn collect_fields(set: &FeatureSet) -> Vec<DbfField> {
    let mut order: Vec<String> = Vec::new();
    let mut seen = BTreeSet::new();
    for feature in &set.features {
        for key in feature.properties.keys() {
            if seen.insert(key.clone()) {
                order.push(key.clone());
            }
        }
    }

    let mut names: BTreeSet<String> = BTreeSet::new();
    let mut fields = Vec::with_capacity(order.len());
    for key in order {
        let numeric = set
            .features
            .iter()
            .filter_map(|f| f.properties.get(&key))
            .filter(|v| !v.is_null())
            .all(|v| v.is_number());

        let mut name: String = key.chars().take(FIELD_NAME_LIMIT).collect();
        let mut n = 1u32;
        while !names.insert(name.clone()) {
            let suffix = format!("_{n}");
            name = key
                .chars()
                .take(FIELD_NAME_LIMIT - suffix.len())
                .collect::<String>()
                + &suffix;
            n += 1;
        }

        fields.push(DbfField { name, key, numeric });
    }
    fields
}

fn feature_record(fields: &[DbfField], properties: &Map<String, Value>) -> Record {
    let mut record = Record::default();
    for field in fields {
        let value = properties.get(&field.key);
        let field_value = if field.numeric {
            FieldValue::Numeric(value.and_then(Value::as_f64))
        } else {
            FieldValue::Character(value.and_then(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }))
        };
        record.insert(field.name.clone(), field_value);
    }
    record
}

/// Convert a MultiPolygon into shapefile rings: exteriors forced clockwise,
/// holes counter-clockwise, every ring closed.
fn multipolygon_to_shp(mp: &MultiPolygon<f64>) -> Polygon {
    fn close_ring(points: &mut Vec<Point>) {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if first.x != last.x || first.y != last.y {
                points.push(first);
            }
        }
    }

    fn signed_area(points: &[Point]) -> f64 {
        points
            .windows(2)
            .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
            .sum::<f64>()
            / 2.0
    }

    let mut rings: Vec<PolygonRing<Point>> = Vec::new();
    for polygon in &mp.0 {
        let mut exterior: Vec<Point> = polygon
            .exterior()
            .points()
            .map(|p| Point::new(p.x(), p.y()))
            .collect();
        close_ring(&mut exterior);
        if signed_area(&exterior) > 0.0 {
            exterior.reverse(); // shapefile exteriors are CW
        }
        rings.push(PolygonRing::Outer(exterior));

        for hole in polygon.interiors() {
            let mut points: Vec<Point> =
                hole.points().map(|p| Point::new(p.x(), p.y())).collect();
            close_ring(&mut points);
            if signed_area(&points) < 0.0 {
                points.reverse(); // holes are CCW
            }
            rings.push(PolygonRing::Inner(points));
        }
    }

    Polygon::with_rings(rings)
}
