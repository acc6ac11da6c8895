//! # Mix Calculations
//!
//! Pure, synchronous calculations over in-memory mix tables. Each calculation
//! follows the same pattern:
//!
//! - `*Input` or a slice of [`MaterialDistribution`] rows in
//! - a JSON-serializable result out
//! - `CalcError` for invalid input or undefined math, never NaN
//!
//! ## Available Calculations
//!
//! - [`distribution`] - Per-row totals and per-screw percentages
//! - [`scaling`] - Scale a table to a target batch quantity
//! - [`fixed_formula`] - Built-in recipes driven by a job order's raw material

pub mod distribution;
pub mod fixed_formula;
pub mod scaling;

// Re-export commonly used types
pub use distribution::{recompute, MaterialDistribution, MixTable, MixTotals};
pub use fixed_formula::{FixedFormulaInput, FixedFormulaResult, FormulaKind};
pub use scaling::{scale_by_factor, scale_to_quantity, ScaledMix, ScaledRow};
