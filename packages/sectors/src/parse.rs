//! Sector layer response parsing.
//!
//! Accepts both `GeoJSON` (`f=geojson`: `properties` + standard geometry)
//! and Esri JSON (`f=json`: `attributes` + `{ "rings": [...] }`) feature
//! collections. Attribute normalization (absent or `null` values become
//! zero) happens here, at the boundary, via [`SectorAttributes`]'s
//! deserializer.

use catchment_demographics_models::{Polygon, Position, Sector, SectorAttributes};

use crate::SectorError;

/// Property names tried, in order, for the sector identifier.
const ID_FIELDS: &[&str] = &["id", "ID", "OBJECTID", "FID", "objectid"];

/// Property names tried, in order, for the display name.
const NAME_FIELDS: &[&str] = &["name", "NAME", "sector_name"];

/// Property names tried, in order, for the geographic code.
const NIS_CODE_FIELDS: &[&str] = &["nisCode", "nis_code", "NISCODE", "CD_SECTOR"];

/// Parses a feature collection into sectors.
///
/// Features without polygon geometry or with unreadable attributes are
/// dropped with a warning.
///
/// # Errors
///
/// Returns [`SectorError::Layer`] for an `ArcGIS` error envelope and
/// [`SectorError::Parse`] if there is no `features` array.
pub fn parse_feature_collection(json: &serde_json::Value) -> Result<Vec<Sector>, SectorError> {
    // ArcGIS error envelope: {"error": {"code": 400, "message": "..."}}
    if let Some(error) = json.get("error") {
        let code = error
            .get("code")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0);
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error");
        return Err(SectorError::Layer {
            message: format!("ArcGIS error {code}: {message}"),
        });
    }

    let features = json
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SectorError::Parse {
            message: "No features array in sector layer response".to_string(),
        })?;

    let sectors: Vec<Sector> = features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| parse_feature(feature, index))
        .collect();

    if sectors.len() < features.len() {
        log::warn!(
            "Dropped {} of {} sector features without usable geometry or attributes",
            features.len() - sectors.len(),
            features.len()
        );
    }

    Ok(sectors)
}

/// Parses a single feature. Returns `None` if it has no polygon geometry
/// or its attributes cannot be read.
#[must_use]
pub fn parse_feature(feature: &serde_json::Value, index: usize) -> Option<Sector> {
    let empty = serde_json::Map::new();
    let properties = feature
        .get("properties")
        .or_else(|| feature.get("attributes"))
        .and_then(serde_json::Value::as_object)
        .unwrap_or(&empty);

    let geometry = feature.get("geometry").and_then(parse_geometry);
    let Some(geometry) = geometry else {
        log::debug!("Sector feature {index} has no polygon geometry");
        return None;
    };

    let attributes: SectorAttributes =
        match serde_json::from_value(serde_json::Value::Object(properties.clone())) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("Sector feature {index} has unreadable attributes: {e}");
                return None;
            }
        };

    let id = first_field(properties, ID_FIELDS)
        .or_else(|| feature.get("id").and_then(value_to_string))
        .unwrap_or_else(|| index.to_string());

    Some(Sector {
        id,
        name: first_field(properties, NAME_FIELDS),
        nis_code: first_field(properties, NIS_CODE_FIELDS),
        attributes,
        geometry,
    })
}

/// Reads a `GeoJSON` `Polygon`/`MultiPolygon` or an Esri `rings` geometry.
/// For a `MultiPolygon` only the first polygon is kept.
#[must_use]
pub fn parse_geometry(geometry: &serde_json::Value) -> Option<Polygon> {
    if let Some(rings) = geometry.get("rings") {
        return rings_from_json(rings);
    }

    let geometry: geojson::Geometry = serde_json::from_value(geometry.clone()).ok()?;
    let rings = match geometry.value {
        geojson::Value::Polygon(rings) => rings,
        geojson::Value::MultiPolygon(polygons) => polygons.into_iter().next()?,
        _ => return None,
    };

    let rings: Vec<Vec<Position>> = rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .filter_map(|p| (p.len() >= 2).then(|| [p[0], p[1]]))
                .collect::<Vec<_>>()
        })
        .filter(|ring| !ring.is_empty())
        .collect();

    (!rings.is_empty()).then(|| Polygon::new(rings))
}

fn rings_from_json(rings: &serde_json::Value) -> Option<Polygon> {
    let rings: Vec<Vec<Position>> = rings
        .as_array()?
        .iter()
        .filter_map(serde_json::Value::as_array)
        .map(|ring| {
            ring.iter()
                .filter_map(|p| {
                    let p = p.as_array()?;
                    Some([p.first()?.as_f64()?, p.get(1)?.as_f64()?])
                })
                .collect::<Vec<_>>()
        })
        .filter(|ring| !ring.is_empty())
        .collect();

    (!rings.is_empty()).then(|| Polygon::new(rings))
}

fn first_field(
    properties: &serde_json::Map<String, serde_json::Value>,
    names: &[&str],
) -> Option<String> {
    names
        .iter()
        .find_map(|name| properties.get(*name).and_then(value_to_string))
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
