//! # ABA Material Configs
//!
//! Named, persisted mix tables. The persistence service stores the table as an
//! opaque JSON string (`configData`); this module owns that string's format.
//!
//! ## configData shapes
//!
//! ```text
//! current:  { "materials": [MaterialDistribution...], "formulaParameters": {...} }
//! legacy:   [MaterialDistribution...]
//! ```
//!
//! Both are decoded once, at the load boundary, into [`ConfigData`]. New saves
//! always write the current shape.
//!
//! ## Example
//!
//! ```rust
//! use mix_core::config::{ConfigData, FormulaParameters};
//! use mix_core::calculations::MaterialDistribution;
//!
//! let data = ConfigData::current(
//!     vec![MaterialDistribution::new("HDPE", 75.0, 100.0)],
//!     FormulaParameters { a_total_weight: 155.0, b_total_weight: 515.0 },
//! )?;
//! let raw = data.encode()?;
//! assert_eq!(ConfigData::decode(&raw)?, data);
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calculations::distribution::{recompute, MaterialDistribution, MixTable};
use crate::errors::{CalcError, CalcResult};

/// Reference weights stored alongside a mix table.
///
/// These are display figures only; the percentage math never reads them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaParameters {
    /// Reference weight for screw A
    pub a_total_weight: f64,
    /// Reference weight for screw B
    pub b_total_weight: f64,
}

impl FormulaParameters {
    pub fn validate(&self) -> CalcResult<()> {
        for (field, value) in [("a_total_weight", self.a_total_weight), ("b_total_weight", self.b_total_weight)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CalcError::invalid_input(
                    field,
                    value.to_string(),
                    "Reference weight must be a non-negative finite number",
                ));
            }
        }
        Ok(())
    }
}

/// Decoded `configData`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigData {
    /// Bare array of rows, saved before formula parameters existed
    Legacy { materials: Vec<MaterialDistribution> },
    /// Rows plus formula parameters
    Current {
        materials: Vec<MaterialDistribution>,
        formula_parameters: FormulaParameters,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentShape<'a> {
    materials: &'a [MaterialDistribution],
    formula_parameters: &'a FormulaParameters,
}

impl ConfigData {
    /// Current-shape data with derived row fields recomputed.
    ///
    /// Rejects anything JSON cannot carry back (non-finite weights or totals),
    /// so encoded data always decodes.
    pub fn current(
        mut materials: Vec<MaterialDistribution>,
        formula_parameters: FormulaParameters,
    ) -> CalcResult<Self> {
        formula_parameters.validate()?;
        recompute(&mut materials)?;
        Ok(ConfigData::Current {
            materials,
            formula_parameters,
        })
    }

    /// Decode a raw `configData` string in either shape.
    ///
    /// Rows are validated and their derived fields recomputed, so rows from
    /// older clients that only stored weights come back complete.
    ///
    /// # Errors
    ///
    /// * `SerializationError` - malformed JSON or an unrecognized shape
    /// * `InvalidInput` - a row carries a negative weight
    pub fn decode(raw: &str) -> CalcResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CalcError::serialization(format!("configData is not valid JSON: {}", e)))?;

        match value {
            Value::Array(_) => {
                let materials: Vec<MaterialDistribution> = serde_json::from_value(value)
                    .map_err(|e| CalcError::serialization(format!("Invalid legacy configData: {}", e)))?;
                Ok(ConfigData::Legacy {
                    materials: normalize(materials)?,
                })
            }
            Value::Object(mut map) => {
                let materials = map
                    .remove("materials")
                    .ok_or_else(|| CalcError::serialization("configData object has no 'materials' field"))?;
                let materials: Vec<MaterialDistribution> = serde_json::from_value(materials)
                    .map_err(|e| CalcError::serialization(format!("Invalid configData materials: {}", e)))?;
                let materials = normalize(materials)?;

                match map.remove("formulaParameters") {
                    Some(Value::Null) | None => Ok(ConfigData::Legacy { materials }),
                    Some(params) => {
                        let formula_parameters: FormulaParameters = serde_json::from_value(params).map_err(|e| {
                            CalcError::serialization(format!("Invalid configData formulaParameters: {}", e))
                        })?;
                        Ok(ConfigData::Current {
                            materials,
                            formula_parameters,
                        })
                    }
                }
            }
            other => Err(CalcError::serialization(format!(
                "Unrecognized configData shape: expected array or object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Encode to the string stored in `configData`.
    ///
    /// Legacy data keeps its bare-array shape so re-encoding is lossless.
    pub fn encode(&self) -> CalcResult<String> {
        let raw = match self {
            ConfigData::Legacy { materials } => serde_json::to_string(materials)?,
            ConfigData::Current {
                materials,
                formula_parameters,
            } => serde_json::to_string(&CurrentShape {
                materials,
                formula_parameters,
            })?,
        };
        Ok(raw)
    }

    pub fn materials(&self) -> &[MaterialDistribution] {
        match self {
            ConfigData::Legacy { materials } | ConfigData::Current { materials, .. } => materials,
        }
    }

    /// Formula parameters, if the data carried any
    pub fn formula_parameters(&self) -> Option<FormulaParameters> {
        match self {
            ConfigData::Legacy { .. } => None,
            ConfigData::Current { formula_parameters, .. } => Some(*formula_parameters),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ConfigData::Legacy { .. })
    }

    /// Split into rows and parameters, using `fallback` for legacy data.
    pub fn into_parts(self, fallback: FormulaParameters) -> (Vec<MaterialDistribution>, FormulaParameters) {
        match self {
            ConfigData::Legacy { materials } => (materials, fallback),
            ConfigData::Current {
                materials,
                formula_parameters,
            } => (materials, formula_parameters),
        }
    }
}

fn normalize(materials: Vec<MaterialDistribution>) -> CalcResult<Vec<MaterialDistribution>> {
    Ok(MixTable::from_rows(materials)?.into_rows())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A persisted ABA material config, as returned by the persistence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbaMaterialConfig {
    pub id: i64,

    /// Display label
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// User id of the creator
    pub created_by: i64,

    /// At most one config is the default; the service enforces this
    #[serde(default)]
    pub is_default: bool,

    /// Serialized [`ConfigData`]
    pub config_data: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AbaMaterialConfig {
    /// Decode this config's `configData`.
    pub fn data(&self) -> CalcResult<ConfigData> {
        ConfigData::decode(&self.config_data)
    }
}

/// Body of a create request for an ABA material config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAbaMaterialConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_by: i64,
    #[serde(default)]
    pub is_default: bool,
    pub config_data: String,
}
