//! Minimal WKB reading for boundary geometries.

use std::io::{Cursor, Read};

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};

/// WKB geometry type for Polygon
const WKB_POLYGON: u32 = 3;
/// WKB geometry type for MultiPolygon
const WKB_MULTIPOLYGON: u32 = 6;
/// WKB byte order: little endian
const WKB_LE: u8 = 1;
/// EWKB flag PostGIS sets when the geometry carries an SRID
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

/// Read a Polygon or MultiPolygon WKB value into a MultiPolygon.
pub(crate) fn read_multipolygon(bytes: &[u8]) -> Result<MultiPolygon<f64>> {
    let mut cursor = Cursor::new(bytes);
    read_geometry(&mut cursor)
}

fn read_geometry(cursor: &mut Cursor<&[u8]>) -> Result<MultiPolygon<f64>> {
    let le = match read_u8(cursor).context("[geometry::wkb] failed to read byte order")? {
        0 => false,
        WKB_LE => true,
        other => bail!("[geometry::wkb] invalid byte order marker {other}"),
    };

    let raw_type = read_u32(cursor, le).context("[geometry::wkb] failed to read geometry type")?;
    if raw_type & EWKB_SRID_FLAG != 0 {
        // The boundary query declares its CRS separately; skip the SRID.
        read_u32(cursor, le).context("[geometry::wkb] failed to read SRID")?;
    }

    match raw_type & 0xff {
        WKB_POLYGON => Ok(MultiPolygon(vec![read_polygon_body(cursor, le)?])),
        WKB_MULTIPOLYGON => {
            let count =
                read_u32(cursor, le).context("[geometry::wkb] failed to read polygon count")?;
            let mut polygons = Vec::with_capacity(count as usize);
            for _ in 0..count {
                // Each member repeats its own byte-order and type header.
                let member = read_geometry(cursor)?;
                polygons.extend(member.0);
            }
            Ok(MultiPolygon(polygons))
        }
        other => {
            bail!("[geometry::wkb] expected Polygon or MultiPolygon, got geometry type {other}")
        }
    }
}

fn read_polygon_body(cursor: &mut Cursor<&[u8]>, le: bool) -> Result<Polygon<f64>> {
    let num_rings = read_u32(cursor, le).context("[geometry::wkb] failed to read ring count")?;
    if num_rings == 0 {
        bail!("[geometry::wkb] polygon must have at least one ring");
    }

    let mut rings = Vec::with_capacity(num_rings as usize);
    for _ in 0..num_rings {
        let len = read_u32(cursor, le).context("[geometry::wkb] failed to read ring length")?;
        let mut coords = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let x = read_f64(cursor, le).context("[geometry::wkb] failed to read x coordinate")?;
            let y = read_f64(cursor, le).context("[geometry::wkb] failed to read y coordinate")?;
            coords.push(Coord { x, y });
        }
        rings.push(LineString::from(coords));
    }

    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    let mut buf = [0u8; 1];
    cursor.read_exact(&mut buf).context("truncated WKB")?;
    Ok(buf[0])
}

fn read_u32(cursor: &mut Cursor<&[u8]>, le: bool) -> Result<u32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf).context("truncated WKB")?;
    Ok(if le { u32::from_le_bytes(buf) } else { u32::from_be_bytes(buf) })
}

fn read_f64(cursor: &mut Cursor<&[u8]>, le: bool) -> Result<f64> {
    let mut buf = [0u8; 8];
    cursor.read_exact(&mut buf).context("truncated WKB")?;
    Ok(if le { f64::from_le_bytes(buf) } else { f64::from_be_bytes(buf) })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian WKB polygon with one ring over the given coordinates.
    fn le_polygon(ring: &[(f64, f64)]) -> Vec<u8> {
        let mut bytes = vec![WKB_LE];
        bytes.extend(WKB_POLYGON.to_le_bytes());
        bytes.extend(1u32.to_le_bytes()); // one ring
        bytes.extend((ring.len() as u32).to_le_bytes());
        for (x, y) in ring {
            bytes.extend(x.to_le_bytes());
            bytes.extend(y.to_le_bytes());
        }
        bytes
    }

    const SQUARE: [(f64, f64); 5] =
        [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];

    #[test]
    fn little_endian_polygons_parse() {
        let mp = read_multipolygon(&le_polygon(&SQUARE)).unwrap();
        assert_eq!(mp.0.len(), 1);

        let exterior = mp.0[0].exterior();
        assert_eq!(exterior.0.len(), 5);
        assert_eq!(exterior.0[1], Coord { x: 4.0, y: 0.0 });
    }

    #[test]
    fn big_endian_polygons_parse() {
        let mut bytes = vec![0u8]; // big-endian marker
        bytes.extend(WKB_POLYGON.to_be_bytes());
        bytes.extend(1u32.to_be_bytes());
        bytes.extend(3u32.to_be_bytes());
        for (x, y) in [(1.0, 2.0), (3.0, 4.0), (1.0, 2.0)] as [(f64, f64); 3] {
            bytes.extend(x.to_be_bytes());
            bytes.extend(y.to_be_bytes());
        }

        let mp = read_multipolygon(&bytes).unwrap();
        assert_eq!(mp.0[0].exterior().0[1], Coord { x: 3.0, y: 4.0 });
    }

    #[test]
    fn multipolygons_flatten_their_members() {
        let mut bytes = vec![WKB_LE];
        bytes.extend(WKB_MULTIPOLYGON.to_le_bytes());
        bytes.extend(2u32.to_le_bytes());
        bytes.extend(le_polygon(&SQUARE));
        bytes.extend(le_polygon(&[(10.0, 10.0), (11.0, 10.0), (10.0, 11.0), (10.0, 10.0)]));

        let mp = read_multipolygon(&bytes).unwrap();
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn ewkb_srid_headers_are_skipped() {
        let mut bytes = vec![WKB_LE];
        bytes.extend((WKB_POLYGON | EWKB_SRID_FLAG).to_le_bytes());
        bytes.extend(26912u32.to_le_bytes()); // SRID
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(3u32.to_le_bytes());
        for (x, y) in [(1.0, 1.0), (2.0, 1.0), (1.0, 1.0)] as [(f64, f64); 3] {
            bytes.extend(x.to_le_bytes());
            bytes.extend(y.to_le_bytes());
        }

        assert!(read_multipolygon(&bytes).is_ok());
    }

    #[test]
    fn non_polygonal_types_are_rejected() {
        let mut bytes = vec![WKB_LE];
        bytes.extend(1u32.to_le_bytes()); // WKB Point
        bytes.extend(1.0f64.to_le_bytes());
        bytes.extend(2.0f64.to_le_bytes());

        let err = read_multipolygon(&bytes).unwrap_err();
        assert!(format!("{err:#}").contains("geometry type 1"));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut bytes = le_polygon(&SQUARE);
        bytes.truncate(bytes.len() - 4);
        assert!(read_multipolygon(&bytes).is_err());
    }
}
