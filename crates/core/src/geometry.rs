//! GeoJSON polygon parsing and coordinate reference handling.
//!
//! Stored geometry is always EPSG:3857. Incoming GeoJSON may declare its
//! reference system through the legacy `crs` member; anything other than
//! 3857 is reprojected by the store on insert.

use geo_types::{Coord, LineString, Polygon};
use serde_json::Value;

use crate::error::CoreError;

/// SRID of all stored geometry (Web Mercator).
pub const REFERENCE_SRID: i32 = 3857;

/// SRID of WGS 84 longitude/latitude.
pub const WGS84_SRID: i32 = 4326;

/// Largest SRID PostGIS accepts in `spatial_ref_sys`.
pub const MAX_SRID: i32 = 998_999;

/// Minimum number of positions in a closed linear ring.
const MIN_RING_POSITIONS: usize = 4;

/// Check that `srid` lies in the range PostGIS can reference.
///
/// Whether the system is actually registered is a storage question; see
/// `tessera_db::spatial::srid_is_known`.
pub fn validate_srid(srid: i32) -> Result<i32, CoreError> {
    if (1..=MAX_SRID).contains(&srid) {
        Ok(srid)
    } else {
        Err(CoreError::Validation(format!(
            "SRID {srid} is out of range, expected 1 to {MAX_SRID}"
        )))
    }
}

/// Parse a named CRS string into an SRID.
///
/// Accepts `EPSG:<n>`, `urn:ogc:def:crs:EPSG:[<version>]:<n>` and the
/// CRS84 aliases, which map to [`WGS84_SRID`].
pub fn parse_crs_name(name: &str) -> Result<i32, CoreError> {
    let invalid = || CoreError::Validation(format!("Unsupported coordinate reference system '{name}'"));

    if name.ends_with("CRS84") {
        return Ok(WGS84_SRID);
    }
    let code = if let Some(code) = name.strip_prefix("EPSG:") {
        code
    } else if let Some(rest) = name.strip_prefix("urn:ogc:def:crs:EPSG:") {
        rest.rsplit(':').next().ok_or_else(invalid)?
    } else {
        return Err(invalid());
    };
    let srid = code.parse::<i32>().map_err(|_| invalid())?;
    validate_srid(srid)
}

/// SRID declared by a GeoJSON object's `crs` member, or [`REFERENCE_SRID`]
/// when none is declared.
pub fn declared_srid(object: &Value) -> Result<i32, CoreError> {
    match object.get("crs") {
        None | Some(Value::Null) => Ok(REFERENCE_SRID),
        Some(crs) => {
            let name = crs
                .get("properties")
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    CoreError::Validation(
                        "crs must be of the form {\"type\": \"name\", \"properties\": {\"name\": ...}}"
                            .to_string(),
                    )
                })?;
            parse_crs_name(name)
        }
    }
}

/// Parse a GeoJSON `Polygon` geometry object.
///
/// Every ring must be closed, hold at least four positions, and contain
/// only finite coordinates.
pub fn polygon_from_geojson(geometry: &Value) -> Result<Polygon<f64>, CoreError> {
    let kind = geometry.get("type").and_then(Value::as_str);
    if kind != Some("Polygon") {
        return Err(CoreError::Validation(format!(
            "Geometry type must be 'Polygon', got {}",
            kind.map_or_else(|| "none".to_string(), |k| format!("'{k}'"))
        )));
    }

    let rings = geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::Validation("Polygon coordinates must be an array".to_string()))?;
    if rings.is_empty() {
        return Err(CoreError::Validation(
            "Polygon must have an exterior ring".to_string(),
        ));
    }

    let mut parsed = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| parse_ring(ring, i))
        .collect::<Result<Vec<_>, _>>()?;
    let exterior = parsed.remove(0);
    Ok(Polygon::new(exterior, parsed))
}

fn parse_ring(ring: &Value, index: usize) -> Result<LineString<f64>, CoreError> {
    let positions = ring.as_array().ok_or_else(|| {
        CoreError::Validation(format!("Ring {index} must be an array of positions"))
    })?;
    if positions.len() < MIN_RING_POSITIONS {
        return Err(CoreError::Validation(format!(
            "Ring {index} has {} positions, at least {MIN_RING_POSITIONS} are required",
            positions.len()
        )));
    }

    let coords = positions
        .iter()
        .map(|p| parse_position(p, index))
        .collect::<Result<Vec<_>, _>>()?;
    if coords.first() != coords.last() {
        return Err(CoreError::Validation(format!("Ring {index} is not closed")));
    }
    Ok(LineString::new(coords))
}

fn parse_position(position: &Value, ring: usize) -> Result<Coord<f64>, CoreError> {
    let invalid = || {
        CoreError::Validation(format!(
            "Ring {ring} contains an invalid position {position}"
        ))
    };
    let arr = position.as_array().ok_or_else(invalid)?;
    if arr.len() < 2 {
        return Err(invalid());
    }
    let x = arr[0].as_f64().filter(|v| v.is_finite()).ok_or_else(invalid)?;
    let y = arr[1].as_f64().filter(|v| v.is_finite()).ok_or_else(invalid)?;
    Ok(Coord { x, y })
}
