//! Composite weights
//!
//! Weights come from reference data and are validated once into an immutable
//! [`WeightTable`]. A run never sees a partially populated table: a missing,
//! duplicated or inconsistent definition for any of the six measures is a
//! configuration error.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CridError, Result};
use crate::models::measure::{ComponentFamily, MEASURE_COUNT, MeasureCode};

/// One row of the weight reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDefinition {
    #[serde(deserialize_with = "code_from_string_or_number")]
    pub measure_code: String,
    #[serde(alias = "crid_weight")]
    pub weight: f64,
    #[serde(alias = "crid_component")]
    pub component_family: ComponentFamily,
    #[serde(alias = "used_in_crid", default = "default_used")]
    pub used_in_composite: bool,
}

const fn default_used() -> bool {
    true
}

/// Reference tables store measure codes as either text or integers
fn code_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(text) => text.trim().to_string(),
        Code::Number(number) => number.to_string(),
    })
}

impl WeightDefinition {
    /// Active definition for a recognized measure
    #[must_use]
    pub fn new(code: MeasureCode, weight: f64) -> Self {
        Self {
            measure_code: code.as_str().to_string(),
            weight,
            component_family: code.family(),
            used_in_composite: true,
        }
    }
}

/// Validated weights for the six composite measures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightTable {
    weights: [f64; MEASURE_COUNT],
}

impl WeightTable {
    /// Validate reference rows into a weight table
    ///
    /// Only rows with `used_in_composite` participate. Active rows for codes
    /// outside the recognized universe are ignored with a warning.
    pub fn from_definitions(definitions: &[WeightDefinition]) -> Result<Self> {
        let mut slots: [Option<f64>; MEASURE_COUNT] = [None; MEASURE_COUNT];

        for definition in definitions.iter().filter(|d| d.used_in_composite) {
            let Some(code) = MeasureCode::parse(&definition.measure_code) else {
                warn!(
                    "Ignoring weight for unrecognized measure code '{}'",
                    definition.measure_code
                );
                continue;
            };

            if definition.component_family != code.family() {
                return Err(CridError::config(format!(
                    "weight for measure {code} declares family {} but the measure belongs to {}",
                    definition.component_family,
                    code.family()
                )));
            }

            if !definition.weight.is_finite() {
                return Err(CridError::config(format!(
                    "weight for measure {code} is not a finite number"
                )));
            }

            let slot = &mut slots[code.index()];
            if slot.is_some() {
                return Err(CridError::config(format!(
                    "duplicate active weight definition for measure {code}"
                )));
            }
            *slot = Some(definition.weight);
        }

        let missing: Vec<&str> = MeasureCode::ALL
            .iter()
            .filter(|code| slots[code.index()].is_none())
            .map(|code| code.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(CridError::config(format!(
                "missing active weight definition for measure(s): {}",
                missing.join(", ")
            )));
        }

        let mut weights = [0.0; MEASURE_COUNT];
        for (weight, slot) in weights.iter_mut().zip(slots) {
            *weight = slot.unwrap_or_default();
        }

        for code in MeasureCode::ALL {
            debug!("Weight {code} ({}): {}", code.family(), weights[code.index()]);
        }

        Ok(Self { weights })
    }

    /// Weight of a measure
    #[must_use]
    pub const fn weight(&self, code: MeasureCode) -> f64 {
        self.weights[code.index()]
    }

    /// Weighted sum over the measures of one family
    ///
    /// `values` is indexed like [`MeasureCode::ALL`]; returns `None` if any
    /// value of the family is missing.
    #[must_use]
    pub fn weighted_sum(
        &self,
        family: ComponentFamily,
        values: &[Option<f64>; MEASURE_COUNT],
    ) -> Option<f64> {
        MeasureCode::ALL
            .iter()
            .filter(|code| code.family() == family)
            .try_fold(0.0, |acc, code| {
                values[code.index()].map(|v| acc + self.weight(*code) * v)
            })
    }

    /// Definitions equivalent to this table, in code order
    #[must_use]
    pub fn definitions(&self) -> Vec<WeightDefinition> {
        MeasureCode::ALL
            .iter()
            .map(|code| WeightDefinition::new(*code, self.weight(*code)))
            .collect()
    }
}
