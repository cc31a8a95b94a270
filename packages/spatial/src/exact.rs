//! Exact sector/catchment clipping.
//!
//! Opt-in alternative to the bounding-box estimate. Produces different
//! numbers than the default mode, so reports built on the default must
//! not switch silently.

use catchment_demographics_models::{Polygon, Position};
use geo::{Area as _, BooleanOps as _, BoundingRect as _};

use crate::{GeometryError, KM_PER_DEGREE, ring_polygon};

/// Sector area and the part of it inside the catchment, both in km².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedAreas {
    pub sector_km2: f64,
    pub inside_km2: f64,
}

/// Clips the sector's outer ring against the catchment's outer ring.
///
/// Both areas go through the same boolean-op resolution, so a
/// self-intersecting sector ring is measured consistently.
///
/// # Errors
///
/// Returns [`GeometryError`] if the catchment has no outer ring or either
/// area is not a finite number.
pub fn clipped_areas_km2(
    sector: &[Position],
    catchment: &Polygon,
) -> Result<ClippedAreas, GeometryError> {
    let sector = ring_polygon(sector);
    let catchment = ring_polygon(catchment.outer_ring().ok_or(GeometryError::EmptyGeometry)?);

    let resolved = sector
        .bounding_rect()
        .map_or(0.0, |rect| sector.intersection(&rect.to_polygon()).unsigned_area());
    let inside = sector.intersection(&catchment).unsigned_area();

    let areas = ClippedAreas {
        sector_km2: resolved * KM_PER_DEGREE * KM_PER_DEGREE,
        inside_km2: inside * KM_PER_DEGREE * KM_PER_DEGREE,
    };

    if !areas.sector_km2.is_finite() || !areas.inside_km2.is_finite() {
        return Err(GeometryError::Clipping {
            message: format!(
                "clipped areas are {} / {}",
                areas.sector_km2, areas.inside_km2
            ),
        });
    }

    Ok(areas)
}
