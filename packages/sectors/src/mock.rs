//! Synthetic sectors used when the sector layer is unavailable.
//!
//! The numbers are placeholders so the pipeline stays live; results built
//! on them are labelled [`CalculationMethod::Mock`] and must not be read
//! as real data.
//!
//! [`CalculationMethod::Mock`]: catchment_demographics_models::CalculationMethod::Mock

use catchment_demographics_models::{Polygon, Sector, profile::DEFAULT_PROFILE};
use catchment_spatial::compute_bounding_box;
use rand::Rng;

/// Minimum and maximum number of synthesized sectors.
const SECTOR_COUNT: std::ops::RangeInclusive<usize> = 5..=12;

/// Base population range per synthesized sector.
const POPULATION: std::ops::RangeInclusive<u32> = 2_000..=10_000;

/// Sector size relative to the catchment's width and height.
const SECTOR_SIZE: f64 = 0.6;

/// Distance between grid columns/rows relative to the catchment size.
const GRID_STEP: f64 = 0.4;

/// Extent in degrees used when the catchment has no usable bounding box.
const DEFAULT_EXTENT_DEG: f64 = 0.05;

/// Generates 5 to 12 rectangular sectors laid out on a 3×3 grid around
/// the catchment's bounding-box center. Each sector spans 60% of the
/// catchment's width and height, so outer cells straddle the catchment
/// edge. Grid cells are reused (shifted slightly) past the ninth sector.
///
/// Never fails and never returns an empty list, even for a degenerate
/// catchment.
#[must_use]
pub fn synthesize_mock_sectors<R: Rng + ?Sized>(catchment: &Polygon, rng: &mut R) -> Vec<Sector> {
    let bbox = compute_bounding_box(catchment).filter(|b| {
        b.width().is_finite() && b.height().is_finite()
    });
    let ([cx, cy], width, height) = bbox.map_or(
        ([0.0, 0.0], DEFAULT_EXTENT_DEG, DEFAULT_EXTENT_DEG),
        |b| {
            (
                b.center(),
                positive_or_default(b.width()),
                positive_or_default(b.height()),
            )
        },
    );

    let count = rng.gen_range(SECTOR_COUNT);
    let half_w = width * SECTOR_SIZE / 2.0;
    let half_h = height * SECTOR_SIZE / 2.0;

    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let (col, row, layer) = ((i % 3) as f64, ((i / 3) % 3) as f64, (i / 9) as f64);

            let x = (col - 1.0).mul_add(width * GRID_STEP, layer * width * 0.1) + cx;
            let y = (row - 1.0).mul_add(height * GRID_STEP, layer * height * 0.1) + cy;

            let population = f64::from(rng.gen_range(POPULATION));

            Sector {
                id: format!("mock-{i}"),
                name: Some(format!("Mock sector {}", i + 1)),
                nis_code: None,
                attributes: DEFAULT_PROFILE.attributes_for(population),
                geometry: Polygon::rectangle(x - half_w, y - half_h, x + half_w, y + half_h),
            }
        })
        .collect()
}

fn positive_or_default(extent: f64) -> f64 {
    if extent > 0.0 { extent } else { DEFAULT_EXTENT_DEG }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catchment_spatial::{bounding_boxes_intersect, planar_area_km2};
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn produces_between_five_and_twelve_sectors() {
        let catchment = Polygon::rectangle(4.30, 50.84, 4.40, 50.90);
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sectors = synthesize_mock_sectors(&catchment, &mut rng);
            assert!(SECTOR_COUNT.contains(&sectors.len()), "seed {seed}");
        }
    }

    #[test]
    fn sectors_overlap_the_catchment() {
        let catchment = Polygon::rectangle(4.30, 50.84, 4.40, 50.90);
        let catchment_box = compute_bounding_box(&catchment);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for sector in synthesize_mock_sectors(&catchment, &mut rng) {
            let sector_box = compute_bounding_box(&sector.geometry);
            assert!(bounding_boxes_intersect(
                sector_box.as_ref(),
                catchment_box.as_ref()
            ));
            assert!(planar_area_km2(&sector.geometry) > 0.0);
        }
    }

    #[test]
    fn attributes_follow_the_default_profile() {
        let catchment = Polygon::rectangle(4.30, 50.84, 4.40, 50.90);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for sector in synthesize_mock_sectors(&catchment, &mut rng) {
            let a = sector.attributes;
            assert!((2_000.0..=10_000.0).contains(&a.p_t));
            assert!((a.male - (a.p_t * 0.49).round()).abs() < f64::EPSILON);
            assert!((a.pp_euro - a.p_t * 20_635.0).abs() < 1e-6);
        }
    }

    #[test]
    fn same_seed_same_sectors() {
        let catchment = Polygon::rectangle(4.30, 50.84, 4.40, 50.90);
        let a = synthesize_mock_sectors(&catchment, &mut ChaCha8Rng::seed_from_u64(11));
        let b = synthesize_mock_sectors(&catchment, &mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_catchment_still_yields_sectors() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let sectors = synthesize_mock_sectors(&Polygon::default(), &mut rng);
        assert!(!sectors.is_empty());
        assert!(sectors.iter().all(|s| planar_area_km2(&s.geometry) > 0.0));
    }
}
