//! Bounding boxes and the bounding-box overlap estimate.

use catchment_demographics_models::{BoundingBox, Polygon};
use geo::BoundingRect as _;

use crate::line_string;

/// Computes the bounding box of a polygon's outer ring.
///
/// Returns `None` when the polygon has no outer ring or the ring is empty.
#[must_use]
pub fn compute_bounding_box(polygon: &Polygon) -> Option<BoundingBox> {
    let rect = line_string(polygon.outer_ring()?).bounding_rect()?;

    Some(BoundingBox {
        min_x: rect.min().x,
        min_y: rect.min().y,
        max_x: rect.max().x,
        max_y: rect.max().y,
    })
}

/// Axis-aligned overlap test. Touching edges count as intersecting; a
/// missing box never intersects anything.
#[must_use]
pub fn bounding_boxes_intersect(a: Option<&BoundingBox>, b: Option<&BoundingBox>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };

    !(a.max_x < b.min_x || a.min_x > b.max_x || a.max_y < b.min_y || a.min_y > b.max_y)
}

/// Estimates the fraction of the sector that lies inside the catchment as
/// `intersection_area / sector_area` of the two bounding boxes.
///
/// Returns `0.0` for a degenerate intersection or a zero-area sector box.
/// The result is clamped to `[0, 1]`.
#[must_use]
pub fn estimate_overlap_factor(sector_box: &BoundingBox, catchment_box: &BoundingBox) -> f64 {
    let min_x = sector_box.min_x.max(catchment_box.min_x);
    let min_y = sector_box.min_y.max(catchment_box.min_y);
    let max_x = sector_box.max_x.min(catchment_box.max_x);
    let max_y = sector_box.max_y.min(catchment_box.max_y);

    if min_x >= max_x || min_y >= max_y {
        return 0.0;
    }

    let sector_area = sector_box.area();
    if sector_area <= 0.0 || !sector_area.is_finite() {
        return 0.0;
    }

    let intersection_area = (max_x - min_x) * (max_y - min_y);
    (intersection_area / sector_area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[test]
    fn bounding_box_tracks_outer_ring_only() {
        let polygon = Polygon::new(vec![
            vec![[4.30, 50.84], [4.40, 50.84], [4.40, 50.90], [4.30, 50.90]],
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
        ]);

        let bbox = compute_bounding_box(&polygon).unwrap();
        assert!((bbox.min_x - 4.30).abs() < 1e-12);
        assert!((bbox.max_x - 4.40).abs() < 1e-12);
        assert!((bbox.min_y - 50.84).abs() < 1e-12);
        assert!((bbox.max_y - 50.90).abs() < 1e-12);
    }

    #[test]
    fn bounding_box_of_empty_polygon_is_none() {
        assert!(compute_bounding_box(&Polygon::default()).is_none());
        assert!(compute_bounding_box(&Polygon::new(vec![vec![]])).is_none());
    }

    #[test]
    fn touching_boxes_intersect() {
        let a = bbox(0.0, 0.0, 1.0, 1.0);
        let b = bbox(1.0, 0.0, 2.0, 1.0);
        assert!(bounding_boxes_intersect(Some(&a), Some(&b)));
    }

    #[test]
    fn separated_boxes_do_not_intersect() {
        let a = bbox(0.0, 0.0, 1.0, 1.0);
        assert!(!bounding_boxes_intersect(Some(&a), Some(&bbox(1.5, 0.0, 2.0, 1.0))));
        assert!(!bounding_boxes_intersect(Some(&a), Some(&bbox(-2.0, 0.0, -1.0, 1.0))));
        assert!(!bounding_boxes_intersect(Some(&a), Some(&bbox(0.0, 2.0, 1.0, 3.0))));
        assert!(!bounding_boxes_intersect(Some(&a), Some(&bbox(0.0, -3.0, 1.0, -2.0))));
    }

    #[test]
    fn missing_box_never_intersects() {
        let a = bbox(0.0, 0.0, 1.0, 1.0);
        assert!(!bounding_boxes_intersect(None, Some(&a)));
        assert!(!bounding_boxes_intersect(Some(&a), None));
    }

    #[test]
    fn overlap_factor_is_fraction_of_sector_box() {
        let sector = bbox(0.0, 0.0, 2.0, 2.0);
        let catchment = bbox(1.0, 0.0, 5.0, 5.0);
        assert!((estimate_overlap_factor(&sector, &catchment) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn overlap_factor_of_contained_sector_is_one() {
        let sector = bbox(1.0, 1.0, 2.0, 2.0);
        let catchment = bbox(0.0, 0.0, 5.0, 5.0);
        assert!((estimate_overlap_factor(&sector, &catchment) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overlap_factor_of_zero_area_sector_is_zero() {
        let sector = bbox(1.0, 1.0, 1.0, 3.0);
        let catchment = bbox(0.0, 0.0, 5.0, 5.0);
        let factor = estimate_overlap_factor(&sector, &catchment);
        assert!(factor.is_finite());
        assert!(factor.abs() < f64::EPSILON);
    }

    #[test]
    fn overlap_factor_of_edge_contact_is_zero() {
        let sector = bbox(0.0, 0.0, 1.0, 1.0);
        let catchment = bbox(1.0, 0.0, 2.0, 1.0);
        assert!(estimate_overlap_factor(&sector, &catchment).abs() < f64::EPSILON);
    }
}
