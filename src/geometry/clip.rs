use geo::{BooleanOps, Geometry, Intersects, MultiPolygon};

use super::{Feature, FeatureSet};

/// Restrict a feature set to the part overlapping `boundary`.
///
/// Polygonal features are replaced by their intersection with the boundary
/// and dropped when nothing is left; point features survive iff they touch
/// the boundary. The boundary must be in the same coordinate system as the
/// features (reproject first).
pub fn clip_to_boundary(set: &FeatureSet, boundary: &MultiPolygon<f64>) -> FeatureSet {
    let features = set
        .features
        .iter()
        .filter_map(|feature| {
            let geometry = match &feature.geometry {
                Geometry::Polygon(polygon) => {
                    clipped(&MultiPolygon(vec![polygon.clone()]), boundary)?
                }
                Geometry::MultiPolygon(mp) => clipped(mp, boundary)?,
                Geometry::Point(point) => {
                    if !boundary.intersects(point) {
                        return None;
                    }
                    Geometry::Point(*point)
                }
                // Parsing only admits the kinds above.
                other => other.clone(),
            };
            Some(Feature { geometry, properties: feature.properties.clone() })
        })
        .collect();

    FeatureSet { features, epsg: set.epsg }
}

/// Intersection with the boundary as a geometry, or None when disjoint.
fn clipped(mp: &MultiPolygon<f64>, boundary: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    if !boundary.intersects(mp) {
        return None;
    }
    let intersection = boundary.intersection(mp);
    if intersection.0.is_empty() {
        return None;
    }
    Some(Geometry::MultiPolygon(intersection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Point};
    use serde_json::Map;

    fn feature(geometry: Geometry<f64>) -> Feature {
        Feature { geometry, properties: Map::new() }
    }

    fn unit_square(x0: f64, y0: f64, size: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    #[test]
    fn features_outside_the_boundary_are_dropped() {
        let boundary = MultiPolygon(vec![unit_square(0.0, 0.0, 10.0)]);
        let set = FeatureSet {
            features: vec![
                feature(Geometry::Polygon(unit_square(2.0, 2.0, 1.0))), // inside
                feature(Geometry::Polygon(unit_square(20.0, 20.0, 1.0))), // outside
                feature(Geometry::Point(Point::new(5.0, 5.0))),         // inside
                feature(Geometry::Point(Point::new(-5.0, 5.0))),        // outside
            ],
            epsg: 26912,
        };

        let clipped = clip_to_boundary(&set, &boundary);
        assert_eq!(clipped.len(), 2);
        assert_eq!(clipped.epsg, 26912);

        // Every survivor still intersects the boundary.
        for survivor in &clipped.features {
            let intersects = match &survivor.geometry {
                Geometry::MultiPolygon(mp) => boundary.intersects(mp),
                Geometry::Point(p) => boundary.intersects(p),
                other => panic!("unexpected geometry {other:?}"),
            };
            assert!(intersects);
        }
    }

    #[test]
    fn straddling_polygons_are_cut_down_to_the_overlap() {
        let boundary = MultiPolygon(vec![unit_square(0.0, 0.0, 10.0)]);
        // Half in, half out: [9, 11] x [0, 2].
        let straddler = unit_square(9.0, 0.0, 2.0);
        let set = FeatureSet {
            features: vec![feature(Geometry::Polygon(straddler))],
            epsg: 26912,
        };

        let clipped = clip_to_boundary(&set, &boundary);
        assert_eq!(clipped.len(), 1);

        let Geometry::MultiPolygon(mp) = &clipped.features[0].geometry else {
            panic!("expected a clipped multipolygon");
        };
        assert!((mp.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn properties_survive_the_clip() {
        let boundary = MultiPolygon(vec![unit_square(0.0, 0.0, 10.0)]);
        let mut properties = Map::new();
        properties.insert("count".to_string(), serde_json::json!(7));
        let set = FeatureSet {
            features: vec![Feature {
                geometry: Geometry::Polygon(unit_square(1.0, 1.0, 1.0)),
                properties,
            }],
            epsg: 26912,
        };

        let clipped = clip_to_boundary(&set, &boundary);
        assert_eq!(clipped.features[0].properties["count"], serde_json::json!(7));
    }

    #[test]
    fn clipping_an_empty_set_yields_an_empty_set() {
        let boundary = MultiPolygon(vec![unit_square(0.0, 0.0, 1.0)]);
        let set = FeatureSet { features: Vec::new(), epsg: 4326 };
        assert!(clip_to_boundary(&set, &boundary).is_empty());
    }
}
