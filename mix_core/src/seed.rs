//! Demo data for a fresh persistence service: one reference config (marked
//! default) and one HDPE formula derived from the built-in recipe.

use tracing::info;

use crate::calculations::distribution::MaterialDistribution;
use crate::calculations::fixed_formula::{self, FixedFormulaInput};
use crate::config::{AbaMaterialConfig, FormulaParameters};
use crate::errors::CalcResult;
use crate::formula::AbaFormula;
use crate::persistence::{create_formula, save_config, SaveConfigRequest};
use crate::store::MixStore;

/// Name of the seeded reference config
pub const DEMO_CONFIG_NAME: &str = "Reference film mix (670 kg)";

/// Name of the seeded HDPE formula
pub const DEMO_FORMULA_NAME: &str = "HDPE standard";

/// What [`seed_demo`] created
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub config: AbaMaterialConfig,
    pub formula: AbaFormula,
}

/// Rows of the reference mix: 155 kg on screw A, 515 kg on screw B.
pub fn demo_materials() -> Vec<MaterialDistribution> {
    vec![
        MaterialDistribution::new("HDPE", 75.0, 100.0),
        MaterialDistribution::new("LLDPE", 50.0, 50.0),
        MaterialDistribution::new("Filler", 25.0, 350.0),
        MaterialDistribution::new("MasterBatch", 5.0, 15.0),
    ]
}

/// Create the demo config (as default) and formula as user `user_id`.
pub async fn seed_demo<S: MixStore + ?Sized>(store: &S, user_id: Option<i64>) -> CalcResult<SeedReport> {
    let request = SaveConfigRequest {
        name: DEMO_CONFIG_NAME.to_string(),
        description: Some("Seeded demo data".to_string()),
        materials: demo_materials(),
        formula_parameters: FormulaParameters {
            a_total_weight: 155.0,
            b_total_weight: 515.0,
        },
        make_default: true,
    };
    let config = save_config(store, &request, user_id).await?;

    let recipe = fixed_formula::calculate(&FixedFormulaInput {
        quantity_kg: 1000.0,
        raw_material: "HDPE".to_string(),
    })?;
    let formula = AbaFormula::from_distribution(
        DEMO_FORMULA_NAME,
        Some("Built-in HDPE recipe at 1000 kg".to_string()),
        &recipe.rows,
    )?;
    let formula = create_formula(store, &formula).await?;

    info!(config_id = config.id, formula_id = ?formula.id, "seeded demo data");
    Ok(SeedReport { config, formula })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_seed_demo() {
        let store = InMemoryStore::new();
        let report = seed_demo(&store, Some(1)).await.unwrap();

        let default = store.get_default_config().await.unwrap().unwrap();
        assert_eq!(default.id, report.config.id);
        assert_eq!(default.name, DEMO_CONFIG_NAME);

        let formulas = store.list_formulas().await.unwrap();
        assert_eq!(formulas.len(), 1);
        // 356 kg on A, 645 kg on B
        assert!((formulas[0].a_to_b - 356.0 / 645.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_seed_requires_user() {
        let store = InMemoryStore::new();
        let err = seed_demo(&store, None).await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
        assert!(store.list_configs().await.unwrap().is_empty());
    }
}
