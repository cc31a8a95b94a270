//! Per-break catchment computation and multi-break orchestration.
//!
//! Breaks are independent: each one owns its accumulator and its RNG
//! stream, so they run concurrently and a failing break never affects its
//! siblings.

use catchment_demographics_models::{CalculationMethod, CatchmentResult, ServiceArea};
use catchment_sectors::{FetchOptions, SectorProvider, fetch_intersecting_sectors};
use rand::{Rng, SeedableRng as _};
use rand_chacha::ChaCha8Rng;

use crate::{
    CatchmentError,
    aggregate::{AggregationOptions, aggregate_sectors},
    fallback::estimate_default_demographics,
    service_area::ServiceAreaSource,
    summarize::{NumberFormat, finalize},
};

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub fetch: FetchOptions,
    pub aggregation: AggregationOptions,
    pub format: NumberFormat,
    /// Seed for mock sectors and fallback estimates. Random when `None`.
    pub seed: Option<u64>,
}

/// Computes the demographics of one break.
///
/// Never fails: when the sector layer is unusable the result comes from
/// mock sectors or, with mocking disabled, from the fallback estimate, and
/// `calculation_method` says which.
pub async fn compute_catchment<P, R>(
    area: &ServiceArea,
    provider: &P,
    options: &PipelineOptions,
    rng: &mut R,
) -> CatchmentResult
where
    P: SectorProvider + ?Sized,
    R: Rng + ?Sized,
{
    let fetch = match fetch_intersecting_sectors(provider, &area.polygon, options.fetch, rng).await
    {
        Ok(fetch) => fetch,
        Err(e) => {
            log::warn!(
                "{} minutes: no sectors ({e}), using fallback estimation",
                area.minutes
            );
            return CatchmentResult {
                record: estimate_default_demographics(area.minutes, rng, &options.format),
                calculation_method: CalculationMethod::FallbackEstimation,
                sector_count: 0,
                skipped_sectors: 0,
                diagnostics: None,
            };
        }
    };

    let aggregation = aggregate_sectors(
        area.minutes,
        &area.polygon,
        &fetch.sectors,
        &options.aggregation,
    );
    let record = finalize(&aggregation.accumulator, &options.format);

    log::info!(
        "{}: population {} from {} sectors ({:?}, {} skipped)",
        record.name,
        record.total_population,
        fetch.sectors.len(),
        fetch.method,
        aggregation.skipped_sectors
    );

    CatchmentResult {
        record,
        calculation_method: fetch.method,
        sector_count: fetch.sectors.len(),
        skipped_sectors: aggregation.skipped_sectors,
        diagnostics: aggregation.diagnostics,
    }
}

/// Computes every break concurrently. Results keep the order of `breaks`.
///
/// Each break gets its own `ChaCha8Rng` stream derived from the seed, so a
/// seeded run is reproducible regardless of completion order.
pub async fn compute_catchments<S, P>(
    routing: &S,
    provider: &P,
    breaks: &[f64],
    options: &PipelineOptions,
) -> Vec<Result<CatchmentResult, CatchmentError>>
where
    S: ServiceAreaSource + ?Sized,
    P: SectorProvider + ?Sized,
{
    let seed = options.seed.unwrap_or_else(rand::random);
    log::debug!("Computing {} breaks with seed {seed}", breaks.len());

    let tasks = breaks.iter().enumerate().map(|(index, &minutes)| async move {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(index as u64);

        let area = routing.service_area(minutes).await.map_err(|e| {
            log::error!("{minutes} minutes: {e}");
            CatchmentError::from(e)
        })?;

        Ok::<_, CatchmentError>(compute_catchment(&area, provider, options, &mut rng).await)
    });

    futures::future::join_all(tasks).await
}
