//! Turns a break's accumulator into the published [`CatchmentRecord`].

use catchment_demographics_models::{CatchmentAccumulator, CatchmentRecord};
use serde::{Deserialize, Serialize};

/// Separators used for display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    pub thousands_separator: String,
    pub decimal_separator: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
        }
    }
}

impl NumberFormat {
    /// Rounds half away from zero and groups thousands.
    #[must_use]
    pub fn integer(&self, value: f64) -> String {
        self.group(round_to_i64(value))
    }

    /// Rounds to one decimal, dropping a trailing `.0`.
    #[must_use]
    pub fn one_decimal(&self, value: f64) -> String {
        let tenths = round_to_i64(value * 10.0);
        let sign = if tenths < 0 { "-" } else { "" };
        let whole = self.group((tenths / 10).abs());
        match (tenths % 10).abs() {
            0 => format!("{sign}{whole}"),
            fraction => format!("{sign}{whole}{}{fraction}", self.decimal_separator),
        }
    }

    fn group(&self, value: i64) -> String {
        let digits = value.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

        for (i, digit) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push_str(&self.thousands_separator);
            }
            grouped.push(digit);
        }

        if value < 0 {
            format!("-{grouped}")
        } else {
            grouped
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_i64(value: f64) -> i64 {
    // f64::round is half away from zero; NaN casts to 0
    value.round() as i64
}

/// Summarizes a break.
///
/// Population is `round(male + female)`. Percentages use that rounded
/// population as denominator and are `None` when it is not positive;
/// the household size is `None` when there are no households.
#[must_use]
pub fn finalize(accumulator: &CatchmentAccumulator, format: &NumberFormat) -> CatchmentRecord {
    let total_population = round_to_i64(accumulator.total_male + accumulator.total_female);

    #[allow(clippy::cast_precision_loss)]
    let population = total_population as f64;
    let has_population = total_population > 0;

    let percent = |part: f64| has_population.then(|| round_to_i64(part / population * 100.0));

    let households_member = (accumulator.total_hh_t > 0.0)
        .then(|| format.one_decimal(population / accumulator.total_hh_t));

    let purchase_power_person = has_population
        .then(|| format.integer(accumulator.total_pp_mio * 1_000_000.0 / population));

    CatchmentRecord {
        name: format!("{} minutes", accumulator.number),
        total_population,
        pourcent_man: percent(accumulator.total_male),
        pourcent_women: percent(accumulator.total_female),
        pourcent_age_0014: percent(accumulator.total_age_0014),
        pourcent_age_1529: percent(accumulator.total_age_1529),
        pourcent_age_3044: percent(accumulator.total_age_3044),
        pourcent_age_4559: percent(accumulator.total_age_4559),
        pourcent_age_60pl: percent(accumulator.total_age_60pl),
        total_households: round_to_i64(accumulator.total_hh_t),
        households_member,
        total_mio: format.integer(accumulator.total_pp_mio),
        purchase_power_person,
    }
}
