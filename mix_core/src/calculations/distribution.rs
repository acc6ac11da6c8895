//! # Distribution Recompute
//!
//! Table-driven mix calculator. Each row holds the kilograms of one material
//! fed to screw A and screw B; everything else in the row is derived.
//!
//! ## Derived values
//!
//! - `total_kg = a_kg + b_kg`
//! - `a_percentage = a_kg / Σ a_kg × 100` (share of the screw A column, 0 if the column is empty)
//! - `b_percentage = b_kg / Σ b_kg × 100`
//! - grand split: `Σ a_kg / (Σ a_kg + Σ b_kg) × 100` and its complement
//!
//! ## Example
//!
//! ```rust
//! use mix_core::calculations::distribution::MixTable;
//!
//! let mut table = MixTable::new();
//! table.add_row("HDPE", 75.0, 100.0)?;
//! table.add_row("Filler", 25.0, 350.0)?;
//!
//! assert_eq!(table.rows()[0].total_kg, 175.0);
//! assert_eq!(table.rows()[0].a_percentage, 75.0);
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// One row of a mix table.
///
/// Derived fields default to zero when absent so that rows saved by older
/// clients still deserialize; call [`recompute`] (or load through
/// [`MixTable::from_rows`]) before trusting them.
///
/// ## JSON Example
///
/// ```json
/// {
///   "material": "HDPE",
///   "aKg": 75.0,
///   "bKg": 100.0,
///   "totalKg": 175.0,
///   "aPercentage": 48.39,
///   "bPercentage": 19.42
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDistribution {
    /// Material label (not required to be unique)
    pub material: String,

    /// Weight fed to screw A
    pub a_kg: f64,

    /// Weight fed to screw B
    pub b_kg: f64,

    /// a_kg + b_kg
    #[serde(default)]
    pub total_kg: f64,

    /// Share of the screw A column total
    #[serde(default)]
    pub a_percentage: f64,

    /// Share of the screw B column total
    #[serde(default)]
    pub b_percentage: f64,
}

impl MaterialDistribution {
    /// Create a row with derived fields computed for the row in isolation.
    ///
    /// Column percentages need the whole table; they are filled in by [`recompute`].
    pub fn new(material: impl Into<String>, a_kg: f64, b_kg: f64) -> Self {
        MaterialDistribution {
            material: material.into(),
            a_kg,
            b_kg,
            total_kg: a_kg + b_kg,
            a_percentage: 0.0,
            b_percentage: 0.0,
        }
    }

    /// Validate the editable weights.
    pub fn validate(&self) -> CalcResult<()> {
        validate_weight("a_kg", self.a_kg)?;
        validate_weight("b_kg", self.b_kg)?;
        let total_kg = self.a_kg + self.b_kg;
        if !total_kg.is_finite() {
            return Err(CalcError::invalid_input(
                "total_kg",
                total_kg.to_string(),
                "Row weight exceeds the representable range",
            ));
        }
        Ok(())
    }
}

fn validate_weight(field: &str, value: f64) -> CalcResult<()> {
    if !value.is_finite() {
        return Err(CalcError::invalid_input(field, value.to_string(), "Weight must be a finite number"));
    }
    if value < 0.0 {
        return Err(CalcError::invalid_input(field, value.to_string(), "Weight cannot be negative"));
    }
    Ok(())
}

/// `part / whole × 100`, or 0 when the whole is empty.
pub(crate) fn percentage_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Aggregates over a whole mix table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixTotals {
    /// Σ a_kg
    pub total_a_kg: f64,
    /// Σ b_kg
    pub total_b_kg: f64,
    /// Σ total_kg
    pub total_kg: f64,
    /// Screw A share of the whole mix
    pub a_percentage: f64,
    /// Screw B share of the whole mix
    pub b_percentage: f64,
}

/// Recompute every derived field of `rows` in place and return the table totals.
///
/// Zero rows (or all-zero rows) produce zero aggregates, never NaN. Rows are
/// left untouched when an error is returned.
///
/// # Errors
///
/// * `InvalidInput` - a row has a negative or non-finite weight
/// * `CalculationFailed` - the column totals overflow
pub fn recompute(rows: &mut [MaterialDistribution]) -> CalcResult<MixTotals> {
    let (total_a_kg, total_b_kg) = column_sums(rows)?;

    for row in rows.iter_mut() {
        row.total_kg = row.a_kg + row.b_kg;
        row.a_percentage = percentage_of(row.a_kg, total_a_kg);
        row.b_percentage = percentage_of(row.b_kg, total_b_kg);
    }

    let total_kg = total_a_kg + total_b_kg;
    let a_percentage = percentage_of(total_a_kg, total_kg);
    let b_percentage = if total_kg > 0.0 { 100.0 - a_percentage } else { 0.0 };

    Ok(MixTotals {
        total_a_kg,
        total_b_kg,
        total_kg,
        a_percentage,
        b_percentage,
    })
}

/// Validated (Σ a_kg, Σ b_kg). Both columns are non-negative, so a finite
/// grand total bounds every row total and column sum.
fn column_sums(rows: &[MaterialDistribution]) -> CalcResult<(f64, f64)> {
    for row in rows {
        row.validate()?;
    }
    let total_a_kg: f64 = rows.iter().map(|r| r.a_kg).sum();
    let total_b_kg: f64 = rows.iter().map(|r| r.b_kg).sum();
    if !(total_a_kg + total_b_kg).is_finite() {
        return Err(CalcError::calculation_failed(
            "Distribution recompute",
            "Mix totals exceed the representable range",
        ));
    }
    Ok((total_a_kg, total_b_kg))
}

/// Editable mix table that keeps its derived values current.
///
/// Every mutator validates its input and re-runs [`recompute`], so the
/// invariants hold after any successful edit. A rejected edit leaves the
/// table unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixTable {
    rows: Vec<MaterialDistribution>,
    totals: MixTotals,
}

impl MixTable {
    /// Create an empty table.
    pub fn new() -> Self {
        MixTable::default()
    }

    /// Build a table from existing rows, recomputing all derived fields.
    pub fn from_rows(rows: Vec<MaterialDistribution>) -> CalcResult<Self> {
        let mut table = MixTable::new();
        table.commit(rows)?;
        Ok(table)
    }

    /// Current rows
    pub fn rows(&self) -> &[MaterialDistribution] {
        &self.rows
    }

    /// Current aggregates
    pub fn totals(&self) -> MixTotals {
        self.totals
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. Returns its index.
    pub fn add_row(&mut self, material: impl Into<String>, a_kg: f64, b_kg: f64) -> CalcResult<usize> {
        let mut rows = self.rows.clone();
        rows.push(MaterialDistribution::new(material, a_kg, b_kg));
        self.commit(rows)?;
        Ok(self.rows.len() - 1)
    }

    /// Remove the row at `index`.
    pub fn remove_row(&mut self, index: usize) -> CalcResult<MaterialDistribution> {
        self.check_index(index)?;
        let mut rows = self.rows.clone();
        let removed = rows.remove(index);
        self.commit(rows)?;
        Ok(removed)
    }

    /// Set the screw A weight of one row.
    pub fn set_a_kg(&mut self, index: usize, a_kg: f64) -> CalcResult<()> {
        self.check_index(index)?;
        validate_weight("a_kg", a_kg)?;
        let mut rows = self.rows.clone();
        rows[index].a_kg = a_kg;
        self.commit(rows)
    }

    /// Set the screw B weight of one row.
    pub fn set_b_kg(&mut self, index: usize, b_kg: f64) -> CalcResult<()> {
        self.check_index(index)?;
        validate_weight("b_kg", b_kg)?;
        let mut rows = self.rows.clone();
        rows[index].b_kg = b_kg;
        self.commit(rows)
    }

    /// Rename the material of one row. Weights are untouched.
    pub fn set_material(&mut self, index: usize, material: impl Into<String>) -> CalcResult<()> {
        self.check_index(index)?;
        self.rows[index].material = material.into();
        Ok(())
    }

    /// Consume the table and return its rows.
    pub fn into_rows(self) -> Vec<MaterialDistribution> {
        self.rows
    }

    /// Recompute `rows` and replace the table contents only if that succeeds.
    fn commit(&mut self, mut rows: Vec<MaterialDistribution>) -> CalcResult<()> {
        self.totals = recompute(&mut rows)?;
        self.rows = rows;
        Ok(())
    }

    fn check_index(&self, index: usize) -> CalcResult<()> {
        if index >= self.rows.len() {
            return Err(CalcError::invalid_input(
                "row",
                index.to_string(),
                format!("Table has {} rows", self.rows.len()),
            ));
        }
        Ok(())
    }
}
