//! Fixed demographic ratios used when no real sector data is available.

use crate::SectorAttributes;

/// Ratios for turning a bare population figure into a full set of sector
/// attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemographicProfile {
    pub male_share: f64,
    pub female_share: f64,
    /// Shares for the 0-14, 15-29, 30-44, 45-59 and 60+ bands.
    pub age_shares: [f64; 5],
    pub persons_per_household: f64,
    /// Currency units per resident.
    pub purchasing_power_per_person: f64,
    /// Purchasing power index reported for synthetic sectors.
    pub purchasing_power_index: f64,
}

/// Profile used by mock sectors and the fallback estimator.
pub const DEFAULT_PROFILE: DemographicProfile = DemographicProfile {
    male_share: 0.49,
    female_share: 0.51,
    age_shares: [0.17, 0.18, 0.20, 0.21, 0.24],
    persons_per_household: 2.3,
    purchasing_power_per_person: 20_635.0,
    purchasing_power_index: 100.0,
};

impl DemographicProfile {
    /// Splits `population` according to this profile.
    #[must_use]
    pub fn attributes_for(&self, population: f64) -> SectorAttributes {
        let [a0014, a1529, a3044, a4559, a60pl] = self.age_shares;
        let pp_euro = population * self.purchasing_power_per_person;

        SectorAttributes {
            male: (population * self.male_share).round(),
            female: (population * self.female_share).round(),
            p_t: population,
            age_t0014: (population * a0014).round(),
            age_t1529: (population * a1529).round(),
            age_t3044: (population * a3044).round(),
            age_t4559: (population * a4559).round(),
            age_t60pl: (population * a60pl).round(),
            hh_t: (population / self.persons_per_household).round(),
            hh_size: self.persons_per_household,
            pp_prm: self.purchasing_power_per_person,
            pp_mio: pp_euro / 1_000_000.0,
            pp_euro,
            pp_ci: self.purchasing_power_index,
        }
    }
}
