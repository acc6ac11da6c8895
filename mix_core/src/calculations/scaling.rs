//! # Quantity Scaling
//!
//! Scales a mix table to a target batch quantity. Only absolute kilograms
//! change; the per-screw percentages are ratios and carry over unchanged.
//!
//! The scale factor is `target / Σ total_kg`. An empty base (Σ total_kg = 0)
//! has no defined factor and is reported as [`CalcError::CalculationFailed`]
//! instead of producing NaN/Infinity.
//!
//! ## Example
//!
//! ```rust
//! use mix_core::calculations::distribution::MixTable;
//! use mix_core::calculations::scaling::scale_to_quantity;
//!
//! let mut table = MixTable::new();
//! table.add_row("HDPE", 30.0, 10.0)?;
//! table.add_row("Filler", 10.0, 50.0)?;
//!
//! let scaled = scale_to_quantity(table.rows(), 1000.0)?;
//! assert_eq!(scaled.scale_factor, 10.0);
//! assert_eq!(scaled.rows[0].scaled_a_kg, 300.0);
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```

use serde::{Deserialize, Serialize};

use super::distribution::{percentage_of, recompute, MaterialDistribution};
use crate::errors::{CalcError, CalcResult};

/// One row of the scaled view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledRow {
    pub material: String,
    pub scaled_a_kg: f64,
    pub scaled_b_kg: f64,
    pub scaled_total_kg: f64,
    /// Share of the screw A column (unchanged by scaling)
    pub a_percentage: f64,
    /// Share of the screw B column (unchanged by scaling)
    pub b_percentage: f64,
    /// scaled_total_kg as a share of the target quantity ("A+B %" column)
    pub total_percentage: f64,
}

/// A mix table scaled to a target quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledMix {
    pub target_quantity_kg: f64,
    /// Σ total_kg of the unscaled table
    pub base_quantity_kg: f64,
    pub scale_factor: f64,
    pub rows: Vec<ScaledRow>,
    pub total_a_kg: f64,
    pub total_b_kg: f64,
    /// Screw A share of the whole mix
    pub a_percentage: f64,
    /// Screw B share of the whole mix
    pub b_percentage: f64,
}

/// Scale `rows` so their combined weight equals `target_quantity_kg`.
///
/// `rows` are expected to have current derived fields (see
/// [`MixTable`](super::distribution::MixTable)); the base quantity is read from
/// `total_kg`.
///
/// # Errors
///
/// * `InvalidInput` - target is not a positive finite number
/// * `CalculationFailed` - the unscaled table weighs nothing, or the scaled
///   weights leave the representable range
pub fn scale_to_quantity(rows: &[MaterialDistribution], target_quantity_kg: f64) -> CalcResult<ScaledMix> {
    if !target_quantity_kg.is_finite() || target_quantity_kg <= 0.0 {
        return Err(CalcError::invalid_input(
            "target_quantity_kg",
            target_quantity_kg.to_string(),
            "Target quantity must be a positive number",
        ));
    }

    let base_quantity_kg = base_quantity(rows)?;
    let scale_factor = target_quantity_kg / base_quantity_kg;
    apply_factor(rows, target_quantity_kg, base_quantity_kg, scale_factor)
}

/// Scale `rows` by an explicit factor. The target becomes `base × factor`.
///
/// # Errors
///
/// * `InvalidInput` - factor is not a positive finite number
/// * `CalculationFailed` - the unscaled table weighs nothing, or the scaled
///   weights leave the representable range
pub fn scale_by_factor(rows: &[MaterialDistribution], factor: f64) -> CalcResult<ScaledMix> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(CalcError::invalid_input(
            "scale_factor",
            factor.to_string(),
            "Scale factor must be a positive number",
        ));
    }
    let base_quantity_kg = base_quantity(rows)?;
    apply_factor(rows, base_quantity_kg * factor, base_quantity_kg, factor)
}

fn base_quantity(rows: &[MaterialDistribution]) -> CalcResult<f64> {
    let base_quantity_kg: f64 = rows.iter().map(|r| r.total_kg).sum();
    if !base_quantity_kg.is_finite() {
        return Err(out_of_range());
    }
    if base_quantity_kg <= 0.0 {
        return Err(CalcError::calculation_failed(
            "Quantity scaling",
            "Mix table has no weight to scale from",
        ));
    }
    Ok(base_quantity_kg)
}

fn out_of_range() -> CalcError {
    CalcError::calculation_failed("Quantity scaling", "Scaled weights exceed the representable range")
}

fn apply_factor(
    rows: &[MaterialDistribution],
    target_quantity_kg: f64,
    base_quantity_kg: f64,
    scale_factor: f64,
) -> CalcResult<ScaledMix> {
    if !scale_factor.is_finite() || !target_quantity_kg.is_finite() {
        return Err(out_of_range());
    }

    let scaled_rows: Vec<ScaledRow> = rows
        .iter()
        .map(|row| {
            let scaled_total_kg = row.total_kg * scale_factor;
            ScaledRow {
                material: row.material.clone(),
                scaled_a_kg: row.a_kg * scale_factor,
                scaled_b_kg: row.b_kg * scale_factor,
                scaled_total_kg,
                a_percentage: row.a_percentage,
                b_percentage: row.b_percentage,
                total_percentage: percentage_of(scaled_total_kg, target_quantity_kg),
            }
        })
        .collect();

    let total_a_kg: f64 = scaled_rows.iter().map(|r| r.scaled_a_kg).sum();
    let total_b_kg: f64 = scaled_rows.iter().map(|r| r.scaled_b_kg).sum();
    // row values are bounded by the totals
    if !(total_a_kg + total_b_kg).is_finite() || scaled_rows.iter().any(|r| !r.scaled_total_kg.is_finite()) {
        return Err(out_of_range());
    }
    let a_percentage = percentage_of(total_a_kg, total_a_kg + total_b_kg);

    Ok(ScaledMix {
        target_quantity_kg,
        base_quantity_kg,
        scale_factor,
        rows: scaled_rows,
        total_a_kg,
        total_b_kg,
        a_percentage,
        b_percentage: 100.0 - a_percentage,
    })
}

impl ScaledMix {
    /// Convert the scaled view back into editable rows at the new quantity.
    pub fn to_rows(&self) -> CalcResult<Vec<MaterialDistribution>> {
        let mut rows: Vec<MaterialDistribution> = self
            .rows
            .iter()
            .map(|r| MaterialDistribution::new(r.material.clone(), r.scaled_a_kg, r.scaled_b_kg))
            .collect();
        recompute(&mut rows)?;
        Ok(rows)
    }
}
