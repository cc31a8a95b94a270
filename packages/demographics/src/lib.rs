#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Catchment demographic aggregation.
//!
//! For each travel-time break the pipeline fetches the sectors touching the
//! catchment, measures how much of each sector the catchment covers, folds
//! the (scaled) sector attributes into one accumulator and summarizes it as
//! a [`CatchmentRecord`](catchment_demographics_models::CatchmentRecord).

pub mod aggregate;
pub mod fallback;
pub mod pipeline;
pub mod service_area;
pub mod summarize;

use thiserror::Error;

pub use aggregate::{Aggregation, AggregationOptions, FULL_COVERAGE_THRESHOLD, aggregate_sectors};
pub use fallback::estimate_default_demographics;
pub use pipeline::{PipelineOptions, compute_catchment, compute_catchments};
pub use service_area::{GeoJsonServiceAreas, ServiceAreaSource};
pub use summarize::{NumberFormat, finalize};

/// Errors from the routing collaborator that supplies catchment polygons.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No polygon exists for the requested break.
    #[error("No service area for a {minutes} minute break")]
    MissingBreak {
        /// Requested break, in minutes.
        minutes: f64,
    },

    /// The routing source could not be reached or read.
    #[error("Routing unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },
}

/// A failure scoped to a single break; sibling breaks are unaffected.
#[derive(Debug, Error)]
pub enum CatchmentError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
}
