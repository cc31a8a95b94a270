//! Data-free estimate for a break, used when no sectors are available and
//! mocking is disabled.
//!
//! The result is a display placeholder driven by the break value and a
//! random draw; it is labelled
//! [`CalculationMethod::FallbackEstimation`](catchment_demographics_models::CalculationMethod::FallbackEstimation).

use catchment_demographics_models::{CatchmentAccumulator, CatchmentRecord, profile::DEFAULT_PROFILE};
use rand::Rng;

use crate::summarize::{NumberFormat, finalize};

/// Residents assumed per minute of travel time.
const RESIDENTS_PER_MINUTE: f64 = 35_000.0;

/// Upper bound (exclusive) of the random population added on top.
const POPULATION_JITTER: f64 = 15_000.0;

/// `floor(minutes * 35000 + U[0, 15000))`, clamped at zero.
#[must_use]
pub fn estimate_base_population<R: Rng + ?Sized>(minutes: f64, rng: &mut R) -> f64 {
    let jitter = rng.gen_range(0.0..POPULATION_JITTER);
    minutes.mul_add(RESIDENTS_PER_MINUTE, jitter).floor().max(0.0)
}

/// Estimates a record for `minutes` from the default demographic profile.
#[must_use]
pub fn estimate_default_demographics<R: Rng + ?Sized>(
    minutes: f64,
    rng: &mut R,
    format: &NumberFormat,
) -> CatchmentRecord {
    let population = estimate_base_population(minutes, rng);
    log::debug!("Fallback estimate for {minutes} minutes: {population} residents");

    let mut accumulator = CatchmentAccumulator::new(minutes);
    accumulator.add(&DEFAULT_PROFILE.attributes_for(population));

    finalize(&accumulator, format)
}
