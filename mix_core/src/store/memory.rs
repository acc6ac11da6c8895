//! In-process [`MixStore`] with the same observable behaviour as the service:
//! ids are assigned on create, and setting a default clears the previous one.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{MixStore, RawMaterial};
use crate::config::{AbaMaterialConfig, NewAbaMaterialConfig};
use crate::errors::{CalcError, CalcResult};
use crate::formula::AbaFormula;

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    configs: Vec<AbaMaterialConfig>,
    formulas: Vec<AbaFormula>,
    raw_materials: Vec<RawMaterial>,
}

impl State {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Store pre-populated with a raw material catalogue.
    pub fn with_raw_materials(raw_materials: Vec<RawMaterial>) -> Self {
        let store = InMemoryStore::new();
        if let Ok(mut state) = store.state.lock() {
            state.raw_materials = raw_materials;
        }
        store
    }

    fn lock(&self) -> CalcResult<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| CalcError::Internal {
            message: "in-memory store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl MixStore for InMemoryStore {
    async fn list_configs(&self) -> CalcResult<Vec<AbaMaterialConfig>> {
        Ok(self.lock()?.configs.clone())
    }

    async fn get_config(&self, id: i64) -> CalcResult<AbaMaterialConfig> {
        self.lock()?
            .configs
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CalcError::not_found("ABA material config", id))
    }

    async fn get_default_config(&self) -> CalcResult<Option<AbaMaterialConfig>> {
        Ok(self.lock()?.configs.iter().find(|c| c.is_default).cloned())
    }

    async fn create_config(&self, config: &NewAbaMaterialConfig) -> CalcResult<AbaMaterialConfig> {
        let mut state = self.lock()?;
        let id = state.assign_id();
        if config.is_default {
            for existing in state.configs.iter_mut() {
                existing.is_default = false;
            }
        }
        let created = AbaMaterialConfig {
            id,
            name: config.name.clone(),
            description: config.description.clone(),
            created_by: config.created_by,
            is_default: config.is_default,
            config_data: config.config_data.clone(),
            created_at: Some(Utc::now()),
        };
        state.configs.push(created.clone());
        Ok(created)
    }

    async fn set_default_config(&self, id: i64) -> CalcResult<()> {
        let mut state = self.lock()?;
        if !state.configs.iter().any(|c| c.id == id) {
            return Err(CalcError::not_found("ABA material config", id));
        }
        for config in state.configs.iter_mut() {
            config.is_default = config.id == id;
        }
        Ok(())
    }

    async fn list_formulas(&self) -> CalcResult<Vec<AbaFormula>> {
        Ok(self.lock()?.formulas.clone())
    }

    async fn create_formula(&self, formula: &AbaFormula) -> CalcResult<AbaFormula> {
        let mut state = self.lock()?;
        let mut created = formula.clone();
        created.id = Some(state.assign_id());
        state.formulas.push(created.clone());
        Ok(created)
    }

    async fn update_formula(&self, id: i64, formula: &AbaFormula) -> CalcResult<AbaFormula> {
        let mut state = self.lock()?;
        let slot = state
            .formulas
            .iter_mut()
            .find(|f| f.id == Some(id))
            .ok_or_else(|| CalcError::not_found("ABA formula", id))?;
        *slot = AbaFormula {
            id: Some(id),
            ..formula.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_formula(&self, id: i64) -> CalcResult<()> {
        let mut state = self.lock()?;
        let before = state.formulas.len();
        state.formulas.retain(|f| f.id != Some(id));
        if state.formulas.len() == before {
            return Err(CalcError::not_found("ABA formula", id));
        }
        Ok(())
    }

    async fn list_raw_materials(&self) -> CalcResult<Vec<RawMaterial>> {
        Ok(self.lock()?.raw_materials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaMaterial;

    fn new_config(name: &str, is_default: bool) -> NewAbaMaterialConfig {
        NewAbaMaterialConfig {
            name: name.to_string(),
            description: None,
            created_by: 1,
            is_default,
            config_data: "[]".to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_default_is_exclusive() {
        let store = InMemoryStore::new();
        let first = store.create_config(&new_config("first", true)).await.unwrap();
        let second = store.create_config(&new_config("second", false)).await.unwrap();

        store.set_default_config(second.id).await.unwrap();
        let defaults: Vec<_> = store
            .list_configs()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second.id);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_config(9).await.unwrap_err().error_code(), "NOT_FOUND");
        assert_eq!(store.set_default_config(9).await.unwrap_err().error_code(), "NOT_FOUND");
        assert_eq!(store.delete_formula(9).await.unwrap_err().error_code(), "NOT_FOUND");
        assert!(store.get_default_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_formula_crud() {
        let store = InMemoryStore::new();
        let formula = AbaFormula {
            id: None,
            name: "Film".to_string(),
            description: None,
            a_to_b: 0.5,
            materials: vec![FormulaMaterial::new("HDPE", 100.0, 100.0)],
        };
        let created = store.create_formula(&formula).await.unwrap();
        let id = created.id.unwrap();

        let renamed = AbaFormula {
            name: "Film v2".to_string(),
            ..formula.clone()
        };
        let updated = store.update_formula(id, &renamed).await.unwrap();
        assert_eq!(updated.id, Some(id));
        assert_eq!(store.list_formulas().await.unwrap()[0].name, "Film v2");

        store.delete_formula(id).await.unwrap();
        assert!(store.list_formulas().await.unwrap().is_empty());
    }
}
