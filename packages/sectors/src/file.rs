//! Sector layer backed by a local `GeoJSON` file.
//!
//! Loads every sector once and answers intersection queries with a
//! bounding-box prefilter, which is how the remote layer behaves from the
//! caller's point of view. Useful offline and for reproducible runs.

use std::path::Path;

use async_trait::async_trait;
use catchment_demographics_models::{BoundingBox, Polygon, Sector};
use catchment_spatial::{bounding_boxes_intersect, compute_bounding_box};

use crate::{SectorError, SectorProvider, parse};

/// Sectors loaded from a `GeoJSON` `FeatureCollection`.
pub struct GeoJsonFileSectorLayer {
    label: String,
    sectors: Vec<(Option<BoundingBox>, Sector)>,
}

impl GeoJsonFileSectorLayer {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError`] if the file cannot be read or is not a
    /// feature collection.
    pub fn load(path: &Path) -> Result<Self, SectorError> {
        let body = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&body)?;
        let sectors = parse::parse_feature_collection(&json)?;
        let layer = Self::from_sectors(path.display().to_string(), sectors);
        log::info!("Loaded {} sectors from {}", layer.len(), layer.label);
        Ok(layer)
    }

    /// Wraps already-parsed sectors.
    #[must_use]
    pub fn from_sectors(label: impl Into<String>, sectors: Vec<Sector>) -> Self {
        Self {
            label: label.into(),
            sectors: sectors
                .into_iter()
                .map(|s| (compute_bounding_box(&s.geometry), s))
                .collect(),
        }
    }

    /// Number of loaded sectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Whether the file contained no usable sectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

#[async_trait]
impl SectorProvider for GeoJsonFileSectorLayer {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch_intersecting(&self, catchment: &Polygon) -> Result<Vec<Sector>, SectorError> {
        let catchment_box = compute_bounding_box(catchment);

        Ok(self
            .sectors
            .iter()
            .filter(|(bbox, _)| bounding_boxes_intersect(bbox.as_ref(), catchment_box.as_ref()))
            .map(|(_, sector)| sector.clone())
            .collect())
    }
}
