//! `ArcGIS` `FeatureServer` / `MapServer` sector layer.
//!
//! Sends the catchment ring as an Esri polygon to the layer's `query`
//! endpoint with `spatialRel=esriSpatialRelIntersects` and asks for
//! `GeoJSON` output. The request is POSTed as a form since catchment rings
//! easily exceed URL length limits.

use std::time::Duration;

use async_trait::async_trait;
use catchment_demographics_models::{Polygon, Sector};
use serde::{Deserialize, Serialize};

use crate::{FetchOptions, SectorError, SectorProvider, parse, retry};

/// Default result cap per query.
pub const DEFAULT_MAX_RECORDS: u32 = 2000;

/// Default overall timeout in seconds for one catchment query.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Share of the overall timeout granted to a single HTTP attempt, so a
/// timed-out attempt still leaves room for a retry.
const REQUEST_TIMEOUT_DIVISOR: u32 = 3;

/// The `[sector_layer]` settings, deserialized from TOML.
///
/// `url` is optional so that the timeout and fallback settings also apply
/// when sectors come from a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorLayerConfig {
    /// Query URL (up to and including `.../query`).
    pub url: Option<String>,
    /// Maximum sectors returned for one catchment.
    pub max_records: u32,
    /// Overall timeout for one catchment query, retries included.
    pub timeout_secs: u64,
    /// Substitute mock sectors when the layer fails or returns nothing.
    pub mock_on_failure: bool,
}

impl Default for SectorLayerConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_records: DEFAULT_MAX_RECORDS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            mock_on_failure: true,
        }
    }
}

impl SectorLayerConfig {
    /// Creates a config for `url` with default limits.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Overall timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout of a single HTTP attempt: a third of [`Self::timeout`], at
    /// least one second.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        (self.timeout() / REQUEST_TIMEOUT_DIVISOR).max(Duration::from_secs(1))
    }

    /// How [`fetch_intersecting_sectors`](crate::fetch_intersecting_sectors)
    /// bounds and recovers queries against this layer.
    #[must_use]
    pub const fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.timeout(),
            mock_on_failure: self.mock_on_failure,
        }
    }
}

/// An `ArcGIS` feature layer of demographic sectors.
pub struct ArcGisSectorLayer {
    client: reqwest::Client,
    url: String,
    max_records: u32,
}

impl ArcGisSectorLayer {
    /// Builds a layer client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::Layer`] if no URL is configured, or
    /// [`SectorError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SectorLayerConfig) -> Result<Self, SectorError> {
        let url = config.url.clone().ok_or_else(|| SectorError::Layer {
            message: "no sector layer URL configured".to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            url,
            max_records: config.max_records,
        })
    }
}

#[async_trait]
impl SectorProvider for ArcGisSectorLayer {
    fn name(&self) -> &str {
        "arcgis"
    }

    async fn fetch_intersecting(&self, catchment: &Polygon) -> Result<Vec<Sector>, SectorError> {
        let params = query_params(catchment, self.max_records)?;

        let json = retry::send_json(|| self.client.post(&self.url).form(&params)).await?;

        // ArcGIS sets exceededTransferLimit=true when more pages exist
        let exceeded = json
            .get("exceededTransferLimit")
            .or_else(|| json.pointer("/properties/exceededTransferLimit"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if exceeded {
            log::warn!("Sector layer truncated results at {} records", self.max_records);
        }

        parse::parse_feature_collection(&json)
    }
}

/// Builds the form parameters for a spatial intersection query.
///
/// # Errors
///
/// Returns [`SectorError::Parse`] if the catchment has no outer ring.
pub fn query_params(
    catchment: &Polygon,
    max_records: u32,
) -> Result<Vec<(&'static str, String)>, SectorError> {
    let ring = catchment.outer_ring().ok_or_else(|| SectorError::Parse {
        message: "Catchment polygon has no outer ring".to_string(),
    })?;

    let geometry = serde_json::json!({
        "rings": [ring],
        "spatialReference": { "wkid": 4326 },
    });

    Ok(vec![
        ("where", "1=1".to_string()),
        ("geometry", geometry.to_string()),
        ("geometryType", "esriGeometryPolygon".to_string()),
        ("spatialRel", "esriSpatialRelIntersects".to_string()),
        ("inSR", "4326".to_string()),
        ("outSR", "4326".to_string()),
        ("outFields", "*".to_string()),
        ("returnGeometry", "true".to_string()),
        ("resultRecordCount", max_records.to_string()),
        ("f", "geojson".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canned_server::CannedServer;

    #[test]
    fn query_carries_esri_polygon() {
        let catchment = Polygon::rectangle(4.30, 50.84, 4.40, 50.90);
        let params = query_params(&catchment, 2000).unwrap();

        let geometry = &params.iter().find(|(k, _)| *k == "geometry").unwrap().1;
        let geometry: serde_json::Value = serde_json::from_str(geometry).unwrap();
        assert_eq!(geometry["spatialReference"]["wkid"], 4326);
        assert_eq!(geometry["rings"][0].as_array().unwrap().len(), 5);

        assert!(params.contains(&("resultRecordCount", "2000".to_string())));
        assert!(params.contains(&("spatialRel", "esriSpatialRelIntersects".to_string())));
        assert!(params.contains(&("f", "geojson".to_string())));
    }

    #[test]
    fn empty_catchment_cannot_be_queried() {
        assert!(query_params(&Polygon::default(), 2000).is_err());
    }

    #[test]
    fn config_defaults_apply() {
        let config: SectorLayerConfig =
            toml::from_str(r#"url = "https://example.com/FeatureServer/0/query""#).unwrap();
        assert_eq!(config.max_records, DEFAULT_MAX_RECORDS);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.mock_on_failure);

        let empty: SectorLayerConfig = toml::from_str("").unwrap();
        assert_eq!(empty, SectorLayerConfig::default());
    }

    #[test]
    fn mock_setting_reaches_fetch_options() {
        let config: SectorLayerConfig = toml::from_str(
            r#"
            url = "https://example.com/query"
            timeout_secs = 12
            mock_on_failure = false
            "#,
        )
        .unwrap();

        let options = config.fetch_options();
        assert!(!options.mock_on_failure);
        assert_eq!(options.timeout, Duration::from_secs(12));
    }

    #[test]
    fn single_attempt_leaves_room_for_retries() {
        let config = SectorLayerConfig::new("https://example.com/query");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.request_timeout() < config.fetch_options().timeout);

        let tiny = SectorLayerConfig {
            timeout_secs: 1,
            ..config
        };
        assert_eq!(tiny.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn layer_requires_a_url() {
        assert!(matches!(
            ArcGisSectorLayer::new(&SectorLayerConfig::default()),
            Err(SectorError::Layer { .. })
        ));
    }

    #[tokio::test]
    async fn posts_query_and_parses_sectors() {
        let server = CannedServer::start(vec![(
            200,
            r#"{
                "type": "FeatureCollection",
                "exceededTransferLimit": true,
                "features": [{
                    "type": "Feature",
                    "properties": { "OBJECTID": 9, "male": 10, "female": 12 },
                    "geometry": { "type": "Polygon", "coordinates": [[[4.32, 50.85], [4.33, 50.85], [4.33, 50.86], [4.32, 50.85]]] }
                }]
            }"#,
        )])
        .await;
        let layer = ArcGisSectorLayer::new(&SectorLayerConfig::new(server.url())).unwrap();

        let sectors = layer
            .fetch_intersecting(&Polygon::rectangle(4.30, 50.84, 4.40, 50.90))
            .await
            .unwrap();

        assert_eq!(sectors.len(), 1);
        assert_eq!(sectors[0].id, "9");
        assert_eq!(server.hits(), 1);
        let request = &server.requests()[0];
        assert!(request.starts_with("POST /query"));
        assert!(request.contains("spatialRel=esriSpatialRelIntersects"));
        assert!(request.contains("f=geojson"));
    }

    #[tokio::test]
    async fn error_envelope_is_a_layer_error() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"error": {"code": 400, "message": "Invalid query parameters"}}"#,
        )])
        .await;
        let layer = ArcGisSectorLayer::new(&SectorLayerConfig::new(server.url())).unwrap();

        let err = layer
            .fetch_intersecting(&Polygon::rectangle(4.30, 50.84, 4.40, 50.90))
            .await
            .unwrap_err();

        assert!(matches!(&err, SectorError::Layer { message } if message.contains("Invalid query")));
        assert_eq!(server.hits(), 1);
    }
}
