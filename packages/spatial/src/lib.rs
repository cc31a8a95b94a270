#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar geometry helpers for catchment coverage.
//!
//! Everything here works directly on WGS84 degrees. Areas use the
//! shoelace formula scaled by a fixed 111 km per degree, which is a
//! latitude-local approximation rather than a projection. Sector/catchment
//! intersection is estimated from bounding-box overlap by default; exact
//! polygon clipping is available as [`CoverageMode::Exact`].

pub mod area;
pub mod bbox;
pub mod coverage;
pub mod exact;

pub use area::{KM_PER_DEGREE, planar_area_km2, ring_area_km2};
pub use bbox::{bounding_boxes_intersect, compute_bounding_box, estimate_overlap_factor};
pub use coverage::{Coverage, CoverageMode, coverage_percentage, measure_coverage};

use catchment_demographics_models::Position;
use geo::LineString;
use thiserror::Error;

/// Errors raised when a polygon cannot be measured.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The polygon has no outer ring or the ring is empty.
    #[error("Polygon has no outer ring")]
    EmptyGeometry,

    /// A vertex is `NaN` or infinite.
    #[error("Non-finite coordinate at vertex {index}")]
    NonFiniteCoordinate {
        /// Position of the offending vertex in the outer ring.
        index: usize,
    },

    /// Polygon clipping produced an unusable result.
    #[error("Clipping error: {message}")]
    Clipping {
        /// Description of what went wrong.
        message: String,
    },
}

/// A ring of `[lng, lat]` positions as a `geo` line string.
pub(crate) fn line_string(ring: &[Position]) -> LineString<f64> {
    ring.iter().map(|&[x, y]| (x, y)).collect::<Vec<_>>().into()
}

/// A ring as a hole-free `geo` polygon. `geo` closes an open ring.
pub(crate) fn ring_polygon(ring: &[Position]) -> geo::Polygon<f64> {
    geo::Polygon::new(line_string(ring), vec![])
}
