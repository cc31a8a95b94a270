//! How much of a sector lies inside a catchment.

use catchment_demographics_models::{BoundingBox, Polygon};
use serde::{Deserialize, Serialize};

use crate::{
    GeometryError, bounding_boxes_intersect, compute_bounding_box, estimate_overlap_factor, exact,
    ring_area_km2,
};

/// Strategy for estimating the sector/catchment intersection area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    /// Scale the sector's own area by the bounding-box overlap ratio.
    #[default]
    BoundingBox,
    /// Clip the sector against the catchment polygon.
    Exact,
}

/// Result of measuring one sector against one catchment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    /// Bounding-box overlap ratio in `[0, 1]`.
    pub overlap_factor: f64,
    /// Unscaled sector area in km².
    pub sector_area_km2: f64,
    /// Estimated area of the sector inside the catchment in km².
    pub intersection_area_km2: f64,
    /// Coverage in `[0, 100]`.
    pub percentage: f64,
}

/// `intersection / total * 100`, clamped to `[0, 100]`.
///
/// A zero or non-finite total yields `0.0`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn coverage_percentage(intersection_area_km2: f64, total_area_km2: f64) -> f64 {
    if total_area_km2 == 0.0 || !total_area_km2.is_finite() {
        return 0.0;
    }

    let percentage = (intersection_area_km2 / total_area_km2) * 100.0;
    if percentage.is_nan() {
        return 0.0;
    }
    percentage.clamp(0.0, 100.0)
}

/// Measures how much of `sector` falls inside `catchment`.
///
/// `catchment_box` is passed in so callers iterating many sectors compute
/// it once. Returns `Ok(None)` when the bounding boxes do not touch.
///
/// # Errors
///
/// Returns [`GeometryError`] if the sector has no outer ring, contains
/// non-finite coordinates, or cannot be clipped.
pub fn measure_coverage(
    sector: &Polygon,
    catchment: &Polygon,
    catchment_box: Option<&BoundingBox>,
    mode: CoverageMode,
) -> Result<Option<Coverage>, GeometryError> {
    let ring = sector.outer_ring().ok_or(GeometryError::EmptyGeometry)?;
    if let Some(index) = ring
        .iter()
        .position(|[x, y]| !x.is_finite() || !y.is_finite())
    {
        return Err(GeometryError::NonFiniteCoordinate { index });
    }

    let sector_box = compute_bounding_box(sector);
    if !bounding_boxes_intersect(sector_box.as_ref(), catchment_box) {
        return Ok(None);
    }
    let (Some(sector_box), Some(catchment_box)) = (sector_box, catchment_box) else {
        return Ok(None);
    };

    let overlap_factor = estimate_overlap_factor(&sector_box, catchment_box);

    let (sector_area_km2, intersection_area_km2) = match mode {
        // The intersection is the sector's own ring annotated with the
        // overlap factor, i.e. its unscaled area times that factor.
        CoverageMode::BoundingBox => {
            let area = ring_area_km2(ring);
            (area, (area * overlap_factor).max(0.0))
        }
        CoverageMode::Exact => {
            let areas = exact::clipped_areas_km2(ring, catchment)?;
            (areas.sector_km2, areas.inside_km2)
        }
    };

    let percentage = coverage_percentage(intersection_area_km2, sector_area_km2);

    log::trace!(
        "coverage: overlap={overlap_factor:.4} sector={sector_area_km2:.4}km² \
         intersection={intersection_area_km2:.4}km² -> {percentage:.3}%"
    );

    Ok(Some(Coverage {
        overlap_factor,
        sector_area_km2,
        intersection_area_km2,
        percentage,
    }))
}
