//! # Formula Persistence
//!
//! Save, load, and default-selection for ABA material configs, plus validated
//! CRUD for ABA formulas. All operations take the acting user and the target
//! id as explicit arguments; nothing reads session state.
//!
//! Validation (blank name, missing user, bad weights) happens before any call
//! to the store, so invalid requests never reach the persistence service.
//!
//! ## Example
//!
//! ```rust
//! use mix_core::calculations::MaterialDistribution;
//! use mix_core::config::FormulaParameters;
//! use mix_core::persistence::{load_config, save_config, SaveConfigRequest};
//! use mix_core::store::InMemoryStore;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = InMemoryStore::new();
//! let request = SaveConfigRequest {
//!     name: "Standard film".to_string(),
//!     description: None,
//!     materials: vec![MaterialDistribution::new("HDPE", 75.0, 100.0)],
//!     formula_parameters: FormulaParameters::default(),
//!     make_default: false,
//! };
//!
//! let saved = save_config(&store, &request, Some(1)).await?;
//! let loaded = load_config(&store, saved.id, FormulaParameters::default()).await?;
//! assert_eq!(loaded.materials[0].total_kg, 175.0);
//! # Ok::<(), mix_core::errors::CalcError>(())
//! # }).unwrap();
//! ```

use tracing::{info, warn};

use crate::calculations::distribution::MaterialDistribution;
use crate::config::{AbaMaterialConfig, ConfigData, FormulaParameters, NewAbaMaterialConfig};
use crate::errors::{CalcError, CalcResult};
use crate::formula::AbaFormula;
use crate::store::MixStore;

/// Everything needed to save the current mix table as a named config.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveConfigRequest {
    pub name: String,
    pub description: Option<String>,
    pub materials: Vec<MaterialDistribution>,
    pub formula_parameters: FormulaParameters,
    /// Mark the new config as default once it has been saved
    pub make_default: bool,
}

impl SaveConfigRequest {
    /// Validate and build the create request for `user_id`.
    pub fn to_new_config(&self, user_id: Option<i64>) -> CalcResult<NewAbaMaterialConfig> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CalcError::missing_field("name"));
        }
        let created_by = user_id.ok_or_else(|| CalcError::unauthenticated("save config"))?;
        let data = ConfigData::current(self.materials.clone(), self.formula_parameters)?;
        Ok(NewAbaMaterialConfig {
            name: name.to_string(),
            description: self
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            created_by,
            is_default: false,
            config_data: data.encode()?,
        })
    }
}

/// A config decoded for use in the calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub materials: Vec<MaterialDistribution>,
    pub formula_parameters: FormulaParameters,
    /// The stored data used the bare-array shape
    pub legacy: bool,
}

impl LoadedConfig {
    fn from_config(config: AbaMaterialConfig, fallback: FormulaParameters) -> CalcResult<Self> {
        let data = config.data()?;
        let legacy = data.is_legacy();
        let (materials, formula_parameters) = data.into_parts(fallback);
        Ok(LoadedConfig {
            id: config.id,
            name: config.name,
            description: config.description,
            is_default: config.is_default,
            materials,
            formula_parameters,
            legacy,
        })
    }
}

/// Save the mix table as a new named config owned by `user_id`.
///
/// When `request.make_default` is set, the new config is marked default as a
/// second step that only runs after the save succeeded. The save is not undone
/// if that second step fails.
pub async fn save_config<S: MixStore + ?Sized>(
    store: &S,
    request: &SaveConfigRequest,
    user_id: Option<i64>,
) -> CalcResult<AbaMaterialConfig> {
    let new_config = request.to_new_config(user_id)?;
    let mut saved = store.create_config(&new_config).await.map_err(|e| {
        warn!(name = %new_config.name, error = %e, "saving ABA material config failed");
        e
    })?;
    info!(id = saved.id, name = %saved.name, "saved ABA material config");

    if request.make_default {
        set_default(store, saved.id).await?;
        saved.is_default = true;
    }
    Ok(saved)
}

/// Fetch config `id` and decode it in either stored shape.
///
/// `fallback` supplies formula parameters for legacy configs.
pub async fn load_config<S: MixStore + ?Sized>(
    store: &S,
    id: i64,
    fallback: FormulaParameters,
) -> CalcResult<LoadedConfig> {
    let config = store.get_config(id).await?;
    let loaded = LoadedConfig::from_config(config, fallback).map_err(|e| {
        warn!(id, error = %e, "ABA material config could not be decoded");
        e
    })?;
    info!(id, legacy = loaded.legacy, rows = loaded.materials.len(), "loaded ABA material config");
    Ok(loaded)
}

/// Fetch and decode the default config, if one is set.
pub async fn load_default_config<S: MixStore + ?Sized>(
    store: &S,
    fallback: FormulaParameters,
) -> CalcResult<Option<LoadedConfig>> {
    match store.get_default_config().await? {
        Some(config) => Ok(Some(LoadedConfig::from_config(config, fallback)?)),
        None => Ok(None),
    }
}

/// Mark config `id` as default. Clearing the previous default is the store's job.
pub async fn set_default<S: MixStore + ?Sized>(store: &S, id: i64) -> CalcResult<()> {
    store.set_default_config(id).await.map_err(|e| {
        warn!(id, error = %e, "setting default ABA material config failed");
        e
    })?;
    info!(id, "default ABA material config set");
    Ok(())
}

/// Validate and create a formula.
pub async fn create_formula<S: MixStore + ?Sized>(store: &S, formula: &AbaFormula) -> CalcResult<AbaFormula> {
    formula.validate()?;
    let created = store.create_formula(formula).await?;
    info!(id = ?created.id, name = %created.name, "created ABA formula");
    Ok(created)
}

/// Validate and replace formula `id`.
pub async fn update_formula<S: MixStore + ?Sized>(
    store: &S,
    id: i64,
    formula: &AbaFormula,
) -> CalcResult<AbaFormula> {
    formula.validate()?;
    let updated = store.update_formula(id, formula).await?;
    info!(id, name = %updated.name, "updated ABA formula");
    Ok(updated)
}

pub async fn delete_formula<S: MixStore + ?Sized>(store: &S, id: i64) -> CalcResult<()> {
    store.delete_formula(id).await?;
    info!(id, "deleted ABA formula");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NewAbaMaterialConfig;
    use crate::store::{InMemoryStore, RawMaterial};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reference_request() -> SaveConfigRequest {
        SaveConfigRequest {
            name: "Reference".to_string(),
            description: Some("  670 kg film mix ".to_string()),
            materials: vec![
                MaterialDistribution::new("HDPE", 75.0, 100.0),
                MaterialDistribution::new("LLDPE", 50.0, 50.0),
                MaterialDistribution::new("Filler", 25.0, 350.0),
                MaterialDistribution::new("MasterBatch", 5.0, 15.0),
            ],
            formula_parameters: FormulaParameters {
                a_total_weight: 155.0,
                b_total_weight: 515.0,
            },
            make_default: false,
        }
    }

    /// Store that fails every create and counts set-default calls.
    #[derive(Default)]
    struct FailingStore {
        set_default_calls: AtomicUsize,
    }

    #[async_trait]
    impl MixStore for FailingStore {
        async fn list_configs(&self) -> CalcResult<Vec<AbaMaterialConfig>> {
            Ok(Vec::new())
        }
        async fn get_config(&self, id: i64) -> CalcResult<AbaMaterialConfig> {
            Err(CalcError::not_found("ABA material config", id))
        }
        async fn get_default_config(&self) -> CalcResult<Option<AbaMaterialConfig>> {
            Ok(None)
        }
        async fn create_config(&self, _config: &NewAbaMaterialConfig) -> CalcResult<AbaMaterialConfig> {
            Err(CalcError::transport("create config", Some(500), "database offline"))
        }
        async fn set_default_config(&self, _id: i64) -> CalcResult<()> {
            self.set_default_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn list_formulas(&self) -> CalcResult<Vec<AbaFormula>> {
            Ok(Vec::new())
        }
        async fn create_formula(&self, _formula: &AbaFormula) -> CalcResult<AbaFormula> {
            Err(CalcError::transport("create formula", Some(500), "database offline"))
        }
        async fn update_formula(&self, id: i64, _formula: &AbaFormula) -> CalcResult<AbaFormula> {
            Err(CalcError::not_found("ABA formula", id))
        }
        async fn delete_formula(&self, id: i64) -> CalcResult<()> {
            Err(CalcError::not_found("ABA formula", id))
        }
        async fn list_raw_materials(&self) -> CalcResult<Vec<RawMaterial>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let store = InMemoryStore::new();
        let request = reference_request();
        let saved = save_config(&store, &request, Some(7)).await.unwrap();
        assert_eq!(saved.created_by, 7);
        assert_eq!(saved.description.as_deref(), Some("670 kg film mix"));
        assert!(!saved.is_default);

        let loaded = load_config(&store, saved.id, FormulaParameters::default()).await.unwrap();
        assert!(!loaded.legacy);
        assert_eq!(loaded.formula_parameters, request.formula_parameters);
        assert_eq!(loaded.materials.len(), 4);
        for (row, original) in loaded.materials.iter().zip(&request.materials) {
            assert_eq!(row.material, original.material);
            assert_eq!(row.a_kg, original.a_kg);
            assert_eq!(row.b_kg, original.b_kg);
        }
    }

    #[tokio::test]
    async fn test_validation_happens_before_store() {
        let store = FailingStore::default();
        let mut request = reference_request();
        request.name = "   ".to_string();
        let err = save_config(&store, &request, Some(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");

        let err = save_config(&store, &reference_request(), None).await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");

        let mut negative = reference_request();
        negative.materials[0].a_kg = -3.0;
        let err = save_config(&store, &negative, Some(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_unrepresentable_values_are_not_saved() {
        let store = FailingStore::default();

        let mut infinite_reference = reference_request();
        infinite_reference.formula_parameters.a_total_weight = f64::INFINITY;
        let err = save_config(&store, &infinite_reference, Some(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let mut overflowing_row = reference_request();
        overflowing_row.materials = vec![MaterialDistribution::new("HDPE", 1e308, 1e308)];
        let err = save_config(&store, &overflowing_row, Some(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let mut overflowing_column = reference_request();
        overflowing_column.materials = vec![
            MaterialDistribution::new("HDPE", 1e308, 0.0),
            MaterialDistribution::new("LLDPE", 1e308, 0.0),
        ];
        let err = save_config(&store, &overflowing_column, Some(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_FAILED");
    }

    #[tokio::test]
    async fn test_every_accepted_save_loads_back() {
        let store = InMemoryStore::new();
        let mut request = reference_request();
        request.materials.push(MaterialDistribution::new("Heavy", 1e300, 1e300));
        request.formula_parameters.b_total_weight = f64::MAX;

        let saved = save_config(&store, &request, Some(1)).await.unwrap();
        let loaded = load_config(&store, saved.id, FormulaParameters::default()).await.unwrap();
        assert_eq!(loaded.formula_parameters, request.formula_parameters);
        assert_eq!(loaded.materials[4].a_kg, 1e300);
    }

    #[tokio::test]
    async fn test_failed_save_skips_set_default() {
        let store = FailingStore::default();
        let mut request = reference_request();
        request.make_default = true;
        let err = save_config(&store, &request, Some(1)).await.unwrap_err();
        assert_eq!(err.error_code(), "TRANSPORT_ERROR");
        assert_eq!(store.set_default_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_and_default() {
        let store = InMemoryStore::new();
        let first = save_config(&store, &reference_request(), Some(1)).await.unwrap();
        set_default(&store, first.id).await.unwrap();

        let mut request = reference_request();
        request.name = "Second".to_string();
        request.make_default = true;
        let second = save_config(&store, &request, Some(1)).await.unwrap();
        assert!(second.is_default);

        let default = load_default_config(&store, FormulaParameters::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(default.id, second.id);
        assert!(!store.get_config(first.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_legacy_config_load() {
        let store = InMemoryStore::new();
        let created = store
            .create_config(&NewAbaMaterialConfig {
                name: "Old".to_string(),
                description: None,
                created_by: 1,
                is_default: false,
                config_data: r#"[{"material":"HDPE","aKg":20,"bKg":60}]"#.to_string(),
            })
            .await
            .unwrap();

        let fallback = FormulaParameters {
            a_total_weight: 20.0,
            b_total_weight: 60.0,
        };
        let loaded = load_config(&store, created.id, fallback).await.unwrap();
        assert!(loaded.legacy);
        assert_eq!(loaded.formula_parameters, fallback);
        assert_eq!(loaded.materials[0].total_kg, 80.0);
    }

    #[tokio::test]
    async fn test_malformed_config_is_load_failure() {
        let store = InMemoryStore::new();
        let created = store
            .create_config(&NewAbaMaterialConfig {
                name: "Broken".to_string(),
                description: None,
                created_by: 1,
                is_default: false,
                config_data: "{materials: oops".to_string(),
            })
            .await
            .unwrap();
        let err = load_config(&store, created.id, FormulaParameters::default()).await.unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[tokio::test]
    async fn test_no_default_config() {
        let store = InMemoryStore::new();
        assert!(load_default_config(&store, FormulaParameters::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_invalid_formula_not_sent() {
        let store = FailingStore::default();
        let formula = AbaFormula {
            id: None,
            name: "Bad".to_string(),
            description: None,
            a_to_b: 1.0,
            materials: vec![],
        };
        let err = create_formula(&store, &formula).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
        let err = update_formula(&store, 3, &formula).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }
}
