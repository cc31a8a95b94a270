//! Catchment polygons per travel-time break.

use std::path::Path;

use async_trait::async_trait;
use catchment_demographics_models::ServiceArea;
use catchment_sectors::parse::parse_geometry;

use crate::RoutingError;

/// Property names tried, in order, for a feature's break value.
const BREAK_FIELDS: &[&str] = &["ToBreak", "break", "minutes"];

/// Breaks closer than this are the same break.
const BREAK_TOLERANCE: f64 = 1e-9;

/// Supplies the catchment polygon for a break (the routing collaborator).
#[async_trait]
pub trait ServiceAreaSource: Send + Sync {
    /// Returns the service area reachable within `minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the break cannot be served.
    async fn service_area(&self, minutes: f64) -> Result<ServiceArea, RoutingError>;
}

/// Service areas precomputed by a routing engine and saved as a `GeoJSON`
/// `FeatureCollection`, one feature per break.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonServiceAreas {
    areas: Vec<ServiceArea>,
}

impl GeoJsonServiceAreas {
    /// Reads service areas from a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Unavailable`] if the file cannot be read or
    /// holds no usable service area.
    pub fn load(path: &Path) -> Result<Self, RoutingError> {
        let text = std::fs::read_to_string(path).map_err(|e| RoutingError::Unavailable {
            message: format!("{}: {e}", path.display()),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| RoutingError::Unavailable {
                message: format!("{}: {e}", path.display()),
            })?;

        let areas = Self::from_json(&json)?;
        log::info!(
            "Loaded {} service areas from {}",
            areas.areas.len(),
            path.display()
        );
        Ok(areas)
    }

    /// Parses a `FeatureCollection`. Features without a polygon or a numeric
    /// break are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Unavailable`] if no feature is usable.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, RoutingError> {
        let features = json
            .get("features")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| RoutingError::Unavailable {
                message: "No features array in service areas".to_string(),
            })?;

        let areas: Vec<ServiceArea> = features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                let area = parse_service_area(feature);
                if area.is_none() {
                    log::warn!("Service area feature {index} has no break value or polygon");
                }
                area
            })
            .collect();

        if areas.is_empty() {
            return Err(RoutingError::Unavailable {
                message: "No usable service areas".to_string(),
            });
        }

        Ok(Self { areas })
    }

    #[must_use]
    pub const fn from_areas(areas: Vec<ServiceArea>) -> Self {
        Self { areas }
    }

    /// Available breaks in ascending order, duplicates removed.
    #[must_use]
    pub fn breaks(&self) -> Vec<f64> {
        let mut breaks: Vec<f64> = self.areas.iter().map(|a| a.minutes).collect();
        breaks.sort_by(f64::total_cmp);
        breaks.dedup_by(|a, b| (*a - *b).abs() < BREAK_TOLERANCE);
        breaks
    }
}

#[async_trait]
impl ServiceAreaSource for GeoJsonServiceAreas {
    async fn service_area(&self, minutes: f64) -> Result<ServiceArea, RoutingError> {
        self.areas
            .iter()
            .find(|a| (a.minutes - minutes).abs() < BREAK_TOLERANCE)
            .cloned()
            .ok_or(RoutingError::MissingBreak { minutes })
    }
}

fn parse_service_area(feature: &serde_json::Value) -> Option<ServiceArea> {
    let properties = feature.get("properties")?;
    let minutes = BREAK_FIELDS.iter().find_map(|name| {
        let value = properties.get(*name)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    })?;
    let polygon = feature.get("geometry").and_then(parse_geometry)?;

    Some(ServiceArea { minutes, polygon })
}
