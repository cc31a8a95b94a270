#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Catchment, sector, and demographic record types.
//!
//! These types describe a single travel-time break end to end: the
//! catchment polygon returned by the routing service, the demographic
//! sectors it overlaps, the running totals built while aggregating those
//! sectors, and the published per-break record. They carry no I/O and no
//! aggregation policy.

pub mod profile;

use serde::{Deserialize, Deserializer, Serialize};

/// A `[longitude, latitude]` pair in WGS84 degrees.
pub type Position = [f64; 2];

/// A polygon as an ordered list of rings. Only the first (outer) ring is
/// used for area and coverage; holes are carried but ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polygon {
    /// Rings of `[lng, lat]` vertices. The first ring is the outer ring.
    pub rings: Vec<Vec<Position>>,
    /// Fraction of the polygon's area that actually lies inside the
    /// catchment. Set on intersection views; `None` on source polygons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_factor: Option<f64>,
}

impl Polygon {
    /// Creates a polygon from its rings.
    #[must_use]
    pub const fn new(rings: Vec<Vec<Position>>) -> Self {
        Self {
            rings,
            overlap_factor: None,
        }
    }

    /// Creates a single-ring polygon.
    #[must_use]
    pub fn from_outer_ring(ring: Vec<Position>) -> Self {
        Self::new(vec![ring])
    }

    /// Creates a closed axis-aligned rectangle.
    #[must_use]
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::from_outer_ring(vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ])
    }

    /// Returns the outer ring, if there is a non-empty one.
    #[must_use]
    pub fn outer_ring(&self) -> Option<&[Position]> {
        self.rings
            .first()
            .map(Vec::as_slice)
            .filter(|ring| !ring.is_empty())
    }

    /// Returns a view of this polygon with the same rings, annotated with
    /// the given overlap factor.
    #[must_use]
    pub fn with_overlap_factor(&self, overlap_factor: f64) -> Self {
        Self {
            rings: self.rings.clone(),
            overlap_factor: Some(overlap_factor),
        }
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Minimum longitude.
    pub min_x: f64,
    /// Minimum latitude.
    pub min_y: f64,
    /// Maximum longitude.
    pub max_x: f64,
    /// Maximum latitude.
    pub max_y: f64,
}

impl BoundingBox {
    /// Width in degrees of longitude.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in degrees of latitude.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area in squared degrees.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center point as `[lng, lat]`.
    #[must_use]
    pub fn center(&self) -> Position {
        [
            f64::midpoint(self.min_x, self.max_x),
            f64::midpoint(self.min_y, self.max_y),
        ]
    }
}

/// Demographic counts attached to a sector.
///
/// Field names are the external sector-layer contract and are read
/// verbatim. Absent, `null`, or unparseable values become `0.0` at
/// deserialization time so the aggregation code never sees a missing
/// value. The fields are independent quantities: `male + female` need
/// not equal `p_t`, and the age bands need not sum to either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorAttributes {
    /// Male residents.
    #[serde(default, deserialize_with = "lenient_number")]
    pub male: f64,
    /// Female residents.
    #[serde(default, deserialize_with = "lenient_number")]
    pub female: f64,
    /// Total population as published by the layer.
    #[serde(default, deserialize_with = "lenient_number")]
    pub p_t: f64,
    /// Residents aged 0-14.
    #[serde(default, deserialize_with = "lenient_number")]
    pub age_t0014: f64,
    /// Residents aged 15-29.
    #[serde(default, deserialize_with = "lenient_number")]
    pub age_t1529: f64,
    /// Residents aged 30-44.
    #[serde(default, deserialize_with = "lenient_number")]
    pub age_t3044: f64,
    /// Residents aged 45-59.
    #[serde(default, deserialize_with = "lenient_number")]
    pub age_t4559: f64,
    /// Residents aged 60 and over.
    #[serde(default, deserialize_with = "lenient_number")]
    pub age_t60pl: f64,
    /// Household count.
    #[serde(default, deserialize_with = "lenient_number")]
    pub hh_t: f64,
    /// Average household size.
    #[serde(default, deserialize_with = "lenient_number")]
    pub hh_size: f64,
    /// Purchasing power per resident.
    #[serde(default, deserialize_with = "lenient_number")]
    pub pp_prm: f64,
    /// Purchasing power in millions of currency units.
    #[serde(default, deserialize_with = "lenient_number")]
    pub pp_mio: f64,
    /// Purchasing power in currency units.
    #[serde(default, deserialize_with = "lenient_number")]
    pub pp_euro: f64,
    /// Purchasing power index.
    #[serde(default, deserialize_with = "lenient_number")]
    pub pp_ci: f64,
}

impl SectorAttributes {
    /// Returns every attribute multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            male: self.male * factor,
            female: self.female * factor,
            p_t: self.p_t * factor,
            age_t0014: self.age_t0014 * factor,
            age_t1529: self.age_t1529 * factor,
            age_t3044: self.age_t3044 * factor,
            age_t4559: self.age_t4559 * factor,
            age_t60pl: self.age_t60pl * factor,
            hh_t: self.hh_t * factor,
            hh_size: self.hh_size * factor,
            pp_prm: self.pp_prm * factor,
            pp_mio: self.pp_mio * factor,
            pp_euro: self.pp_euro * factor,
            pp_ci: self.pp_ci * factor,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Reads a number that may be missing, `null`, a numeric string, or
/// garbage. Anything that is not a finite number becomes `0.0`.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawNumber>::deserialize(deserializer)? {
        Some(RawNumber::Number(n)) => n,
        Some(RawNumber::Text(s)) => parse_localized_number(&s).unwrap_or(0.0),
        Some(RawNumber::Other(_)) | None => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

/// Parses a numeric string written with either `,` or `.` as the decimal
/// mark and any of `,` `.` or whitespace as thousands grouping.
///
/// With both marks present the last one is the decimal mark. A lone comma
/// followed by exactly three digits is grouping (`"1,234"` is 1234), any
/// other lone comma is decimal (`"2,5"` is 2.5). Repeated marks are always
/// grouping.
fn parse_localized_number(text: &str) -> Option<f64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let last_comma = compact.rfind(',');
    let last_dot = compact.rfind('.');
    let commas = compact.matches(',').count();
    let dots = compact.matches('.').count();

    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (Some(comma), None) => {
            let decimals = compact.len() - comma - 1;
            if commas == 1 && decimals != 3 {
                compact.replace(',', ".")
            } else {
                compact.replace(',', "")
            }
        }
        (None, Some(_)) if dots > 1 => compact.replace('.', ""),
        _ => compact,
    };

    normalized.parse().ok()
}

/// A demographic reporting unit from the sector layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    /// Layer identifier (stringified if the layer uses numeric ids).
    pub id: String,
    /// Display name, if the layer provides one.
    pub name: Option<String>,
    /// Free-form geographic code.
    pub nis_code: Option<String>,
    /// Demographic counts.
    #[serde(flatten)]
    pub attributes: SectorAttributes,
    /// Sector outline.
    pub geometry: Polygon,
}

/// One travel-time break: the catchment reachable within `minutes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    /// Break value in minutes.
    pub minutes: f64,
    /// Catchment outline.
    pub polygon: Polygon,
}

/// Running totals for one travel-time break.
///
/// Values are real-valued since partially covered sectors contribute
/// fractional counts. Only ever added to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentAccumulator {
    /// Break value in minutes.
    pub number: f64,
    pub total_male: f64,
    pub total_female: f64,
    pub total_age_0014: f64,
    pub total_age_1529: f64,
    pub total_age_3044: f64,
    pub total_age_4559: f64,
    pub total_age_60pl: f64,
    pub total_pp_prm: f64,
    pub total_pp_mio: f64,
    pub total_pp_euro: f64,
    pub total_pp_ci: f64,
    pub total_hh_t: f64,
    pub total_hh_size: f64,
    pub total_p_t: f64,
}

impl CatchmentAccumulator {
    /// Creates an empty accumulator for the given break.
    #[must_use]
    pub fn new(number: f64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Adds a sector contribution as-is.
    pub fn add(&mut self, contribution: &SectorAttributes) {
        self.total_male += contribution.male;
        self.total_female += contribution.female;
        self.total_age_0014 += contribution.age_t0014;
        self.total_age_1529 += contribution.age_t1529;
        self.total_age_3044 += contribution.age_t3044;
        self.total_age_4559 += contribution.age_t4559;
        self.total_age_60pl += contribution.age_t60pl;
        self.total_pp_prm += contribution.pp_prm;
        self.total_pp_mio += contribution.pp_mio;
        self.total_pp_euro += contribution.pp_euro;
        self.total_pp_ci += contribution.pp_ci;
        self.total_hh_t += contribution.hh_t;
        self.total_hh_size += contribution.hh_size;
        self.total_p_t += contribution.p_t;
    }
}

/// The published demographic summary for one break.
///
/// Percentage and ratio fields are `None` when their denominator is zero
/// (an empty catchment), so they serialize as `null` rather than `NaN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentRecord {
    /// `"<break> minutes"`.
    pub name: String,
    /// `round(male + female)`.
    pub total_population: i64,
    pub pourcent_man: Option<i64>,
    pub pourcent_women: Option<i64>,
    #[serde(rename = "pourcentAge0014")]
    pub pourcent_age_0014: Option<i64>,
    #[serde(rename = "pourcentAge1529")]
    pub pourcent_age_1529: Option<i64>,
    #[serde(rename = "pourcentAge3044")]
    pub pourcent_age_3044: Option<i64>,
    #[serde(rename = "pourcentAge4559")]
    pub pourcent_age_4559: Option<i64>,
    #[serde(rename = "pourcentAge60PL")]
    pub pourcent_age_60pl: Option<i64>,
    #[serde(rename = "totalHouseHolds")]
    pub total_households: i64,
    /// Average persons per household, one decimal, formatted.
    pub households_member: Option<String>,
    /// Purchasing power in millions, rounded and grouped.
    #[serde(rename = "totalMIO")]
    pub total_mio: String,
    /// Purchasing power per resident, rounded and grouped.
    pub purchase_power_person: Option<String>,
}

/// How a break's figures were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculationMethod {
    /// Real sectors from the sector layer, intersected with the catchment.
    LayerBasedIntersection,
    /// Synthesized sectors; the layer was unavailable or returned nothing.
    Mock,
    /// Data-free estimate from the break value alone.
    FallbackEstimation,
}

/// How much one sector added to a break, for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorContribution {
    pub sector_id: String,
    /// Coverage in `[0, 100]`.
    pub coverage_percentage: f64,
    /// Whether the sector was added unscaled.
    pub full_coverage: bool,
    /// The amounts actually added to the accumulator.
    pub contribution: SectorAttributes,
}

/// Everything computed for one break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentResult {
    #[serde(flatten)]
    pub record: CatchmentRecord,
    pub calculation_method: CalculationMethod,
    /// Sectors considered (including skipped and non-overlapping ones).
    pub sector_count: usize,
    /// Sectors dropped because their geometry could not be measured.
    pub skipped_sectors: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<SectorContribution>>,
}
