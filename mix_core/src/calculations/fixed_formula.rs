//! # Fixed-Formula Calculator
//!
//! Job-order driven mix: given a batch quantity and the job's raw material,
//! apply a built-in recipe and split each component between the two screws.
//!
//! ## Recipes
//!
//! | Component   | Share of batch | Screw A / B |
//! |-------------|----------------|-------------|
//! | HDPE        | 15.8 %         | 75 / 25     |
//! | LLDPE       | 15.8 %         | 75 / 25     |
//! | Filler      | 67 %           | 17 / 83     |
//! | Masterbatch | 1.5 %          | 27 / 73     |
//!
//! The HDPE recipe is used when the raw material label contains "HDPE"
//! (case-insensitive). Any other raw material gets the generic recipe, where
//! the job's raw material takes a single doubled slot (31.6 %, 75/25) in place
//! of the HDPE + LLDPE pair. The generic recipe is an approximation, not a
//! validated formula.
//!
//! ## Rounding
//!
//! Component amounts and screw A weights are rounded to whole kilograms; the
//! screw B weight is the remainder, so `a_kg + b_kg` always equals the rounded
//! component amount. Percentages are derived from the rounded weights.
//!
//! ## Example
//!
//! ```rust
//! use mix_core::calculations::fixed_formula::{calculate, FixedFormulaInput, FormulaKind};
//!
//! let result = calculate(&FixedFormulaInput {
//!     quantity_kg: 1000.0,
//!     raw_material: "HDPE 5502".to_string(),
//! })?;
//! assert_eq!(result.kind, FormulaKind::Hdpe);
//! assert_eq!(result.rows[0].total_kg, 158.0);
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```

use serde::{Deserialize, Serialize};

use super::distribution::{recompute, MaterialDistribution, MixTotals};
use crate::errors::{CalcError, CalcResult};

/// Keyword that selects the HDPE recipe
pub const HDPE_KEYWORD: &str = "HDPE";

/// Which built-in recipe was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaKind {
    Hdpe,
    Generic,
}

impl FormulaKind {
    /// Pick the recipe for a raw material label.
    pub fn for_raw_material(raw_material: &str) -> Self {
        if raw_material.to_ascii_uppercase().contains(HDPE_KEYWORD) {
            FormulaKind::Hdpe
        } else {
            FormulaKind::Generic
        }
    }

    fn components(&self) -> &'static [Component] {
        match self {
            FormulaKind::Hdpe => &HDPE_RECIPE,
            FormulaKind::Generic => &GENERIC_RECIPE,
        }
    }
}

/// One recipe line. `material: None` stands for the job's own raw material.
struct Component {
    material: Option<&'static str>,
    share_percent: f64,
    screw_a_percent: f64,
}

const HDPE_RECIPE: [Component; 4] = [
    Component { material: Some("HDPE"), share_percent: 15.8, screw_a_percent: 75.0 },
    Component { material: Some("LLDPE"), share_percent: 15.8, screw_a_percent: 75.0 },
    Component { material: Some("Filler"), share_percent: 67.0, screw_a_percent: 17.0 },
    Component { material: Some("Masterbatch"), share_percent: 1.5, screw_a_percent: 27.0 },
];

const GENERIC_RECIPE: [Component; 3] = [
    Component { material: None, share_percent: 31.6, screw_a_percent: 75.0 },
    Component { material: Some("Filler"), share_percent: 67.0, screw_a_percent: 17.0 },
    Component { material: Some("Masterbatch"), share_percent: 1.5, screw_a_percent: 27.0 },
];

/// Input for the fixed-formula calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedFormulaInput {
    /// Batch quantity in kilograms
    pub quantity_kg: f64,

    /// Raw material label from the job order (e.g. "HDPE 5502")
    pub raw_material: String,
}

impl FixedFormulaInput {
    /// Validate input parameters.
    pub fn validate(&self) -> CalcResult<()> {
        if !self.quantity_kg.is_finite() || self.quantity_kg <= 0.0 {
            return Err(CalcError::invalid_input(
                "quantity_kg",
                self.quantity_kg.to_string(),
                "Quantity must be positive",
            ));
        }
        if self.raw_material.trim().is_empty() {
            return Err(CalcError::missing_field("raw_material"));
        }
        Ok(())
    }
}

/// Result of the fixed-formula calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedFormulaResult {
    pub kind: FormulaKind,
    pub quantity_kg: f64,
    /// Rounded per-component split, with derived percentages
    pub rows: Vec<MaterialDistribution>,
    pub totals: MixTotals,
}

/// Apply the built-in recipe for `input.raw_material` to `input.quantity_kg`.
pub fn calculate(input: &FixedFormulaInput) -> CalcResult<FixedFormulaResult> {
    input.validate()?;

    let kind = FormulaKind::for_raw_material(&input.raw_material);
    let raw_material = input.raw_material.trim();

    let mut rows: Vec<MaterialDistribution> = kind
        .components()
        .iter()
        .map(|c| {
            let amount = (input.quantity_kg * c.share_percent / 100.0).round();
            let a_kg = (amount * c.screw_a_percent / 100.0).round();
            let b_kg = amount - a_kg;
            MaterialDistribution::new(c.material.unwrap_or(raw_material), a_kg, b_kg)
        })
        .collect();

    let totals = recompute(&mut rows)?;

    Ok(FixedFormulaResult {
        kind,
        quantity_kg: input.quantity_kg,
        rows,
        totals,
    })
}
