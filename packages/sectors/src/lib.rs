#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Demographic sector layer access.
//!
//! A [`SectorProvider`] answers "which sectors intersect this catchment?".
//! Two providers ship here: [`arcgis::ArcGisSectorLayer`] queries an
//! `ArcGIS` feature layer over HTTP, and [`file::GeoJsonFileSectorLayer`]
//! serves a local `GeoJSON` file.
//!
//! [`fetch_intersecting_sectors`] wraps any provider with a timeout and,
//! when the layer fails or returns nothing, substitutes synthesized
//! sectors from [`mock`] so the catchment calculation keeps going.

pub mod arcgis;
#[cfg(test)]
mod canned_server;
pub mod file;
pub mod mock;
pub mod parse;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use catchment_demographics_models::{CalculationMethod, Polygon, Sector};
use rand::Rng;
use thiserror::Error;

/// Default bound on a single sector query, retries included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching sectors.
#[derive(Debug, Error)]
pub enum SectorError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The query did not finish in time.
    #[error("Sector query timed out after {0:?}")]
    Timeout(Duration),

    /// The layer answered with an error status or error envelope.
    #[error("Sector layer error: {message}")]
    Layer {
        /// Description of what went wrong.
        message: String,
    },

    /// The response could not be interpreted as sectors.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The layer returned no sectors for the catchment.
    #[error("Sector layer returned no features")]
    Empty,
}

/// A source of demographic sectors.
#[async_trait]
pub trait SectorProvider: Send + Sync {
    /// Short label for log messages.
    fn name(&self) -> &str;

    /// Returns every sector whose geometry intersects `catchment`.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError`] if the layer cannot be queried or its
    /// response cannot be parsed.
    async fn fetch_intersecting(&self, catchment: &Polygon) -> Result<Vec<Sector>, SectorError>;
}

/// How [`fetch_intersecting_sectors`] bounds and recovers a query.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Upper bound on the provider call.
    pub timeout: Duration,
    /// Substitute synthesized sectors when the layer yields nothing.
    pub mock_on_failure: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            mock_on_failure: true,
        }
    }
}

/// Sectors for one catchment and where they came from.
#[derive(Debug, Clone)]
pub struct SectorFetch {
    pub sectors: Vec<Sector>,
    /// [`CalculationMethod::LayerBasedIntersection`] or
    /// [`CalculationMethod::Mock`].
    pub method: CalculationMethod,
}

/// Fetches the sectors intersecting `catchment`, bounded by
/// `options.timeout`.
///
/// Any failure (timeout, HTTP error, malformed response, zero features)
/// is logged and replaced by mock sectors when `options.mock_on_failure`
/// is set, in which case this never fails.
///
/// # Errors
///
/// Returns the underlying [`SectorError`] only when mocking is disabled,
/// signalling that the caller should fall back to a data-free estimate.
pub async fn fetch_intersecting_sectors<P, R>(
    provider: &P,
    catchment: &Polygon,
    options: FetchOptions,
    rng: &mut R,
) -> Result<SectorFetch, SectorError>
where
    P: SectorProvider + ?Sized,
    R: Rng + ?Sized,
{
    let result = match tokio::time::timeout(options.timeout, provider.fetch_intersecting(catchment))
        .await
    {
        Ok(Ok(sectors)) if sectors.is_empty() => Err(SectorError::Empty),
        Ok(result) => result,
        Err(_) => Err(SectorError::Timeout(options.timeout)),
    };

    match result {
        Ok(sectors) => {
            log::debug!(
                "{}: {} sectors intersect catchment",
                provider.name(),
                sectors.len()
            );
            Ok(SectorFetch {
                sectors,
                method: CalculationMethod::LayerBasedIntersection,
            })
        }
        Err(e) if options.mock_on_failure => {
            log::warn!(
                "{}: sector layer unavailable ({e}), using mock sectors",
                provider.name()
            );
            Ok(SectorFetch {
                sectors: mock::synthesize_mock_sectors(catchment, rng),
                method: CalculationMethod::Mock,
            })
        }
        Err(e) => {
            log::warn!("{}: sector layer unavailable ({e})", provider.name());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catchment_demographics_models::SectorAttributes;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha8Rng;

    enum Behaviour {
        Sectors(Vec<Sector>),
        Fail,
        Hang,
    }

    struct FakeLayer(Behaviour);

    #[async_trait]
    impl SectorProvider for FakeLayer {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_intersecting(&self, _: &Polygon) -> Result<Vec<Sector>, SectorError> {
            match &self.0 {
                Behaviour::Sectors(s) => Ok(s.clone()),
                Behaviour::Fail => Err(SectorError::Layer {
                    message: "HTTP 503".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec![])
                }
            }
        }
    }

    fn catchment() -> Polygon {
        Polygon::rectangle(4.30, 50.84, 4.40, 50.90)
    }

    fn sector() -> Sector {
        Sector {
            id: "21004A00-".to_string(),
            name: Some("Centre".to_string()),
            nis_code: Some("21004".to_string()),
            attributes: SectorAttributes {
                male: 100.0,
                female: 120.0,
                ..SectorAttributes::default()
            },
            geometry: Polygon::rectangle(4.32, 50.85, 4.33, 50.86),
        }
    }

    #[tokio::test]
    async fn returns_layer_sectors() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = FakeLayer(Behaviour::Sectors(vec![sector()]));

        let fetch = fetch_intersecting_sectors(&layer, &catchment(), FetchOptions::default(), &mut rng)
            .await
            .unwrap();

        assert_eq!(fetch.method, CalculationMethod::LayerBasedIntersection);
        assert_eq!(fetch.sectors, vec![sector()]);
    }

    #[tokio::test]
    async fn empty_layer_falls_back_to_mock() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = FakeLayer(Behaviour::Sectors(vec![]));

        let fetch = fetch_intersecting_sectors(&layer, &catchment(), FetchOptions::default(), &mut rng)
            .await
            .unwrap();

        assert_eq!(fetch.method, CalculationMethod::Mock);
        assert!((5..=12).contains(&fetch.sectors.len()));
    }

    #[tokio::test]
    async fn failing_layer_falls_back_to_mock() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = FakeLayer(Behaviour::Fail);

        let fetch = fetch_intersecting_sectors(&layer, &catchment(), FetchOptions::default(), &mut rng)
            .await
            .unwrap();

        assert_eq!(fetch.method, CalculationMethod::Mock);
        assert!(!fetch.sectors.is_empty());
    }

    #[tokio::test]
    async fn failure_surfaces_when_mock_disabled() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = FakeLayer(Behaviour::Fail);
        let options = FetchOptions {
            mock_on_failure: false,
            ..FetchOptions::default()
        };

        let result = fetch_intersecting_sectors(&layer, &catchment(), options, &mut rng).await;
        assert!(matches!(result, Err(SectorError::Layer { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_layer_times_out() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = FakeLayer(Behaviour::Hang);
        let options = FetchOptions {
            timeout: Duration::from_secs(5),
            mock_on_failure: false,
        };

        let result = fetch_intersecting_sectors(&layer, &catchment(), options, &mut rng).await;
        assert!(matches!(result, Err(SectorError::Timeout(_))));
    }
}
