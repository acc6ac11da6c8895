//! # ABA Formulas
//!
//! The percentage form of a mix: a single A:B ratio plus, for every material,
//! its share of the screw A column and of the screw B column. Formulas carry no
//! absolute weights; they are turned into a kilogram table for a concrete batch
//! with [`AbaFormula::to_distribution`].
//!
//! The kilogram table ([`MaterialDistribution`]) is the canonical
//! representation. A formula is derived from it with
//! [`AbaFormula::from_distribution`], and converting back at the same batch
//! quantity reproduces the original weights.
//!
//! ## Example
//!
//! ```rust
//! use mix_core::formula::{AbaFormula, FormulaMaterial, ratio_from_parts};
//!
//! let formula = AbaFormula {
//!     id: None,
//!     name: "Film 1:4".to_string(),
//!     description: None,
//!     a_to_b: ratio_from_parts(1.0, 4.0)?,
//!     materials: vec![
//!         FormulaMaterial::new("HDPE", 60.0, 20.0),
//!         FormulaMaterial::new("Filler", 40.0, 80.0),
//!     ],
//! };
//!
//! let rows = formula.to_distribution(500.0)?;
//! assert_eq!(rows[0].a_kg, 60.0);  // 100 kg on screw A × 60%
//! assert_eq!(rows[1].b_kg, 320.0); // 400 kg on screw B × 80%
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::calculations::distribution::{recompute, MaterialDistribution};
use crate::errors::{CalcError, CalcResult};

/// Tolerance when checking that a screw column sums to 100%
pub const PERCENT_SUM_TOLERANCE: f64 = 0.01;

/// One material line of a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaMaterial {
    pub material: String,
    /// Share of the screw A column
    pub screw_a_percentage: f64,
    /// Share of the screw B column
    pub screw_b_percentage: f64,
}

impl FormulaMaterial {
    pub fn new(material: impl Into<String>, screw_a_percentage: f64, screw_b_percentage: f64) -> Self {
        FormulaMaterial {
            material: material.into(),
            screw_a_percentage,
            screw_b_percentage,
        }
    }
}

/// A named, reusable A/B split expressed in percentages.
///
/// ## JSON Example
///
/// ```json
/// {
///   "id": 3,
///   "name": "HDPE standard",
///   "description": "Default film mix",
///   "aToB": 0.333,
///   "materials": [
///     { "material": "HDPE", "screwAPercentage": 60.0, "screwBPercentage": 20.0 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbaFormula {
    /// Assigned by the persistence service; absent before the first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Screw A weight divided by screw B weight
    pub a_to_b: f64,

    pub materials: Vec<FormulaMaterial>,
}

/// Turn independently entered A and B "parts" into a single A:B ratio.
///
/// `ratio_from_parts(1.0, 3.0)` is `1/3`: one part on screw A for every three
/// parts on screw B.
pub fn ratio_from_parts(a_parts: f64, b_parts: f64) -> CalcResult<f64> {
    if !a_parts.is_finite() || a_parts <= 0.0 {
        return Err(CalcError::invalid_input("a_parts", a_parts.to_string(), "A parts must be positive"));
    }
    if !b_parts.is_finite() || b_parts <= 0.0 {
        return Err(CalcError::invalid_input("b_parts", b_parts.to_string(), "B parts must be positive"));
    }
    Ok(a_parts / b_parts)
}

impl AbaFormula {
    /// Validate the formula before it is saved or used.
    pub fn validate(&self) -> CalcResult<()> {
        if self.name.trim().is_empty() {
            return Err(CalcError::missing_field("name"));
        }
        if !self.a_to_b.is_finite() || self.a_to_b <= 0.0 {
            return Err(CalcError::invalid_input(
                "a_to_b",
                self.a_to_b.to_string(),
                "A:B ratio must be positive",
            ));
        }
        if self.materials.is_empty() {
            return Err(CalcError::missing_field("materials"));
        }
        for m in &self.materials {
            check_percentage("screw_a_percentage", m.screw_a_percentage)?;
            check_percentage("screw_b_percentage", m.screw_b_percentage)?;
        }
        check_column_sum("screw_a_percentage", self.materials.iter().map(|m| m.screw_a_percentage).sum())?;
        check_column_sum("screw_b_percentage", self.materials.iter().map(|m| m.screw_b_percentage).sum())?;
        Ok(())
    }

    /// Derive a formula from a kilogram table.
    ///
    /// Both screws must carry weight: a percentage column cannot sum to 100
    /// when the screw is empty.
    pub fn from_distribution(
        name: impl Into<String>,
        description: Option<String>,
        rows: &[MaterialDistribution],
    ) -> CalcResult<Self> {
        let mut rows = rows.to_vec();
        let totals = recompute(&mut rows)?;

        if totals.total_a_kg <= 0.0 || totals.total_b_kg <= 0.0 {
            return Err(CalcError::calculation_failed(
                "Formula conversion",
                "Both screws need a non-zero total to express the mix as percentages",
            ));
        }

        let formula = AbaFormula {
            id: None,
            name: name.into(),
            description,
            a_to_b: totals.total_a_kg / totals.total_b_kg,
            materials: rows
                .into_iter()
                .map(|r| FormulaMaterial::new(r.material, r.a_percentage, r.b_percentage))
                .collect(),
        };
        formula.validate()?;
        Ok(formula)
    }

    /// Expand the formula into a kilogram table for a batch of `quantity_kg`.
    pub fn to_distribution(&self, quantity_kg: f64) -> CalcResult<Vec<MaterialDistribution>> {
        self.validate()?;
        if !quantity_kg.is_finite() || quantity_kg <= 0.0 {
            return Err(CalcError::invalid_input(
                "quantity_kg",
                quantity_kg.to_string(),
                "Quantity must be positive",
            ));
        }

        let total_a_kg = quantity_kg * self.a_to_b / (1.0 + self.a_to_b);
        let total_b_kg = quantity_kg - total_a_kg;

        let mut rows: Vec<MaterialDistribution> = self
            .materials
            .iter()
            .map(|m| {
                MaterialDistribution::new(
                    m.material.clone(),
                    total_a_kg * m.screw_a_percentage / 100.0,
                    total_b_kg * m.screw_b_percentage / 100.0,
                )
            })
            .collect();
        recompute(&mut rows)?;
        Ok(rows)
    }
}

fn check_percentage(field: &str, value: f64) -> CalcResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(CalcError::invalid_input(field, value.to_string(), "Percentage must be between 0 and 100"));
    }
    Ok(())
}

fn check_column_sum(field: &str, sum: f64) -> CalcResult<()> {
    if (sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
        return Err(CalcError::invalid_input(
            field,
            format!("{:.2}", sum),
            "Percentages for each screw must sum to 100",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_rows() -> Vec<MaterialDistribution> {
        vec![
            MaterialDistribution::new("HDPE", 75.0, 100.0),
            MaterialDistribution::new("LLDPE", 50.0, 50.0),
            MaterialDistribution::new("Filler", 25.0, 350.0),
            MaterialDistribution::new("MasterBatch", 5.0, 15.0),
        ]
    }

    #[test]
    fn test_ratio_from_parts() {
        assert!((ratio_from_parts(1.0, 3.0).unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(ratio_from_parts(2.5, 2.5).unwrap(), 1.0);
        assert!(ratio_from_parts(1.0, 0.0).is_err());
        assert!(ratio_from_parts(-1.0, 2.0).is_err());
    }

    #[test]
    fn test_from_distribution() {
        let formula = AbaFormula::from_distribution("Reference", None, &reference_rows()).unwrap();
        assert!((formula.a_to_b - 155.0 / 515.0).abs() < 1e-12);
        assert_eq!(formula.materials.len(), 4);
        assert!((formula.materials[0].screw_a_percentage - 75.0 / 155.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_conversion_roundtrip() {
        let rows = reference_rows();
        let formula = AbaFormula::from_distribution("Reference", None, &rows).unwrap();
        let back = formula.to_distribution(670.0).unwrap();

        for (converted, original) in back.iter().zip(&rows) {
            assert_eq!(converted.material, original.material);
            assert!((converted.a_kg - original.a_kg).abs() < 1e-9);
            assert!((converted.b_kg - original.b_kg).abs() < 1e-9);
        }
    }

    #[test]
    fn test_to_distribution_scales_with_quantity() {
        let formula = AbaFormula::from_distribution("Reference", None, &reference_rows()).unwrap();
        let rows = formula.to_distribution(1340.0).unwrap();
        let total: f64 = rows.iter().map(|r| r.total_kg).sum();
        assert!((total - 1340.0).abs() < 1e-9);
        assert!((rows[0].a_kg - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_screw_cannot_convert() {
        let rows = vec![MaterialDistribution::new("HDPE", 0.0, 10.0)];
        let err = AbaFormula::from_distribution("Only B", None, &rows).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_FAILED");
    }

    #[test]
    fn test_validation() {
        let mut formula = AbaFormula::from_distribution("Reference", None, &reference_rows()).unwrap();
        assert!(formula.validate().is_ok());

        formula.materials[0].screw_a_percentage += 5.0;
        assert_eq!(formula.validate().unwrap_err().error_code(), "INVALID_INPUT");

        let mut blank = AbaFormula::from_distribution("Reference", None, &reference_rows()).unwrap();
        blank.name = "  ".to_string();
        assert_eq!(blank.validate().unwrap_err().error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_json_field_names() {
        let formula = AbaFormula {
            id: None,
            name: "Simple".to_string(),
            description: None,
            a_to_b: 1.0,
            materials: vec![FormulaMaterial::new("HDPE", 100.0, 100.0)],
        };
        let json = serde_json::to_string(&formula).unwrap();
        assert!(json.contains("\"aToB\":1.0"));
        assert!(json.contains("\"screwAPercentage\":100.0"));
        assert!(!json.contains("\"id\""));
    }
}
