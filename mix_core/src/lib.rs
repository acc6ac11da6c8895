//! # mix_core - ABA Material-Mix Engine
//!
//! `mix_core` computes how a raw-material batch is split between the two
//! screws (A and B) of an ABA extrusion line, and manages named mix configs
//! and formulas stored by the ERP's persistence service.
//!
//! ## Design Philosophy
//!
//! - **Pure calculations**: mix math takes values and returns values, no I/O
//! - **JSON-First**: domain types serialize in the service's camelCase format
//! - **Rich Errors**: structured [`CalcError`] values, never NaN in results
//! - **Explicit context**: the acting user and target ids are parameters
//!
//! ## Quick Start
//!
//! ```rust
//! use mix_core::calculations::{scale_to_quantity, MixTable};
//!
//! let mut table = MixTable::new();
//! table.add_row("HDPE", 75.0, 100.0)?;
//! table.add_row("Filler", 25.0, 350.0)?;
//!
//! let scaled = scale_to_quantity(table.rows(), 1100.0)?;
//! assert_eq!(scaled.scale_factor, 2.0);
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - Distribution recompute, quantity scaling, fixed recipes
//! - [`formula`] - Percentage-based ABA formulas and conversions
//! - [`config`] - Persisted material configs and the `configData` codec
//! - [`persistence`] - Save / load / default operations over a [`store::MixStore`]
//! - [`store`] - REST and in-memory persistence clients
//! - [`report`] - Printable HTML view of a scaled mix
//! - [`file_io`] - Config export/import with atomic saves
//! - [`settings`] - Layered client settings
//! - [`seed`] - Demo data
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod config;
pub mod errors;
pub mod file_io;
pub mod formula;
pub mod persistence;
pub mod report;
pub mod seed;
pub mod settings;
pub mod store;

// Re-export commonly used types at crate root for convenience
pub use calculations::{MaterialDistribution, MixTable, ScaledMix};
pub use config::{AbaMaterialConfig, ConfigData, FormulaParameters};
pub use errors::{CalcError, CalcResult};
pub use formula::AbaFormula;
pub use settings::Settings;
pub use store::{InMemoryStore, MixStore, RestStore};
