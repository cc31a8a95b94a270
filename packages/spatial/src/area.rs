//! Planar area in approximate square kilometres.

use catchment_demographics_models::{Polygon, Position};
use geo::Area as _;

use crate::ring_polygon;

/// Kilometres per degree used to convert squared degrees to km².
///
/// Fixed value; downstream reports are tuned against it.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Unsigned planar area of a ring in km²: the shoelace area in squared
/// degrees times [`KM_PER_DEGREE`] squared. The ring need not be closed.
///
/// Fewer than 3 points, or a non-finite result, yields `0.0`.
#[must_use]
pub fn ring_area_km2(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let area = ring_polygon(ring).unsigned_area() * KM_PER_DEGREE * KM_PER_DEGREE;
    if area.is_finite() { area } else { 0.0 }
}

/// Area of the outer ring in km², scaled by the polygon's
/// `overlap_factor` when it carries one. Never negative.
#[must_use]
pub fn planar_area_km2(polygon: &Polygon) -> f64 {
    let area = polygon.outer_ring().map_or(0.0, ring_area_km2);

    polygon
        .overlap_factor
        .map_or(area, |factor| area * factor)
        .max(0.0)
}
