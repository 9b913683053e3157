use anyhow::{ensure, Context, Result};
use geo::MultiPolygon;
use postgres::{Client, NoTls};

use crate::geometry::wkb;

/// Where the reference boundary lives and how to find it.
#[derive(Debug, Clone)]
pub struct BoundaryQuery {
    /// postgres connection string, e.g. `host=... user=... dbname=...`
    pub conn: String,
    pub table: String,
    pub geometry_column: String,
    pub name_column: String,
    pub region: String,
    /// EPSG code the boundary geometries are stored in.
    pub epsg: u32,
}

/// Fetch the reference boundary for `query.region` as one MultiPolygon.
///
/// Read-only: a single SELECT pulling the geometry as WKB. Identifier parts
/// are validated before interpolation since the driver only parameterizes
/// values.
pub fn fetch_boundary(query: &BoundaryQuery, verbose: u8) -> Result<MultiPolygon<f64>> {
    for identifier in [&query.table, &query.geometry_column, &query.name_column] {
        ensure!(
            is_sql_identifier(identifier),
            "invalid SQL identifier {identifier:?}"
        );
    }

    let sql = format!(
        "SELECT ST_AsBinary({geom}) FROM {table} WHERE {name} = $1",
        geom = query.geometry_column,
        table = query.table,
        name = query.name_column,
    );
    if verbose > 0 {
        eprintln!(
            "[boundary] querying {} ({} = {:?})",
            query.table, query.name_column, query.region
        );
    }

    let mut client =
        Client::connect(&query.conn, NoTls).context("failed to connect to the boundary database")?;
    let rows = client
        .query(sql.as_str(), &[&query.region])
        .with_context(|| format!("boundary query against {} failed", query.table))?;
    ensure!(!rows.is_empty(), "no boundary row matched region {:?}", query.region);

    let mut polygons = Vec::new();
    for row in &rows {
        let bytes: Vec<u8> = row.get(0);
        let multipolygon = wkb::read_multipolygon(&bytes)
            .with_context(|| format!("decoding boundary geometry for {:?}", query.region))?;
        polygons.extend(multipolygon.0);
    }

    Ok(MultiPolygon(polygons))
}

/// Dotted identifiers of alphanumerics and underscores only.
fn is_sql_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
