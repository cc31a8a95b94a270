//! Sector aggregation: one exclusively-owned accumulator folded over the
//! candidate sectors of a catchment.

use catchment_demographics_models::{
    CatchmentAccumulator, Polygon, Sector, SectorAttributes, SectorContribution,
};
use catchment_spatial::{CoverageMode, compute_bounding_box, measure_coverage};
use serde::{Deserialize, Serialize};

/// Coverage percentage at or above which a sector counts in full.
///
/// Kept below 100 to absorb noise from the area approximation.
pub const FULL_COVERAGE_THRESHOLD: f64 = 99.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationOptions {
    pub coverage_mode: CoverageMode,
    pub full_coverage_threshold: f64,
    /// Record every contributing sector in [`Aggregation::diagnostics`].
    #[serde(skip)]
    pub collect_diagnostics: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            coverage_mode: CoverageMode::default(),
            full_coverage_threshold: FULL_COVERAGE_THRESHOLD,
            collect_diagnostics: false,
        }
    }
}

/// Outcome of folding a catchment's sectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub accumulator: CatchmentAccumulator,
    /// Sectors dropped because their geometry could not be measured.
    pub skipped_sectors: usize,
    pub diagnostics: Option<Vec<SectorContribution>>,
}

impl Aggregation {
    fn new(minutes: f64, collect_diagnostics: bool) -> Self {
        Self {
            accumulator: CatchmentAccumulator::new(minutes),
            skipped_sectors: 0,
            diagnostics: collect_diagnostics.then(Vec::new),
        }
    }
}

/// What a sector adds to the accumulator at `coverage_percentage`.
///
/// Below `threshold` every attribute is scaled by `coverage_percentage / 100`;
/// at or above it the raw attributes are returned unchanged. The flag is
/// `true` on the unscaled path.
#[must_use]
pub fn sector_contribution(
    attributes: &SectorAttributes,
    coverage_percentage: f64,
    threshold: f64,
) -> (SectorAttributes, bool) {
    if coverage_percentage < threshold {
        (attributes.scaled(coverage_percentage / 100.0), false)
    } else {
        (*attributes, true)
    }
}

/// Folds `sectors` into a single accumulator for the `minutes` break.
///
/// Sectors whose bounding box misses the catchment contribute nothing.
/// Sectors with unmeasurable geometry are logged, counted and skipped.
#[must_use]
pub fn aggregate_sectors(
    minutes: f64,
    catchment: &Polygon,
    sectors: &[Sector],
    options: &AggregationOptions,
) -> Aggregation {
    let catchment_box = compute_bounding_box(catchment);

    sectors.iter().fold(
        Aggregation::new(minutes, options.collect_diagnostics),
        |mut aggregation, sector| {
            match measure_coverage(
                &sector.geometry,
                catchment,
                catchment_box.as_ref(),
                options.coverage_mode,
            ) {
                Ok(None) => {
                    log::debug!("Sector {} does not overlap the catchment", sector.id);
                }
                Ok(Some(coverage)) => {
                    let (contribution, full_coverage) = sector_contribution(
                        &sector.attributes,
                        coverage.percentage,
                        options.full_coverage_threshold,
                    );
                    log::debug!(
                        "Sector {}: {:.2}% covered{}",
                        sector.id,
                        coverage.percentage,
                        if full_coverage { " (full)" } else { "" }
                    );
                    aggregation.accumulator.add(&contribution);
                    if let Some(diagnostics) = &mut aggregation.diagnostics {
                        diagnostics.push(SectorContribution {
                            sector_id: sector.id.clone(),
                            coverage_percentage: coverage.percentage,
                            full_coverage,
                            contribution,
                        });
                    }
                }
                Err(e) => {
                    log::warn!("Skipping sector {}: {e}", sector.id);
                    aggregation.skipped_sectors += 1;
                }
            }
            aggregation
        },
    )
}
