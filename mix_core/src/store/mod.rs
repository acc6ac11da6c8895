//! # Persistence Service Client
//!
//! The persistence service owns ABA material configs, ABA formulas, and the
//! raw material catalogue. [`MixStore`] is the seam to it:
//!
//! - [`rest::RestStore`] talks to the real service over HTTP/JSON
//! - [`memory::InMemoryStore`] keeps everything in process, for tests and demos
//!
//! Every call is a single attempt. There is no retry, request coalescing, or
//! optimistic locking; concurrent writers are arbitrated by the service.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AbaMaterialConfig, NewAbaMaterialConfig};
use crate::errors::CalcResult;
use crate::formula::AbaFormula;

pub use memory::InMemoryStore;
pub use rest::RestStore;

/// Raw material catalogue entry, used to populate material pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMaterial {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Operations the persistence service exposes to the mix calculator.
#[async_trait]
pub trait MixStore: Send + Sync {
    async fn list_configs(&self) -> CalcResult<Vec<AbaMaterialConfig>>;

    async fn get_config(&self, id: i64) -> CalcResult<AbaMaterialConfig>;

    /// The config currently flagged as default, if any.
    async fn get_default_config(&self) -> CalcResult<Option<AbaMaterialConfig>>;

    async fn create_config(&self, config: &NewAbaMaterialConfig) -> CalcResult<AbaMaterialConfig>;

    /// Flag `id` as the default. The service clears any previous default.
    async fn set_default_config(&self, id: i64) -> CalcResult<()>;

    async fn list_formulas(&self) -> CalcResult<Vec<AbaFormula>>;

    async fn create_formula(&self, formula: &AbaFormula) -> CalcResult<AbaFormula>;

    async fn update_formula(&self, id: i64, formula: &AbaFormula) -> CalcResult<AbaFormula>;

    async fn delete_formula(&self, id: i64) -> CalcResult<()>;

    async fn list_raw_materials(&self) -> CalcResult<Vec<RawMaterial>>;
}
