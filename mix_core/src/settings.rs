//! # Client Settings
//!
//! Layered configuration for the persistence client and calculator defaults:
//! built-in defaults, then an optional `abamix.toml`, then `ABAMIX_*`
//! environment variables. Command-line flags are applied last by the CLI.
//!
//! ## File Format
//!
//! ```toml
//! api_base_url = "http://erp.local:5000"
//! timeout_secs = 15
//! user_id = 4
//!
//! [formula_parameters]
//! a_total_weight = 155.0
//! b_total_weight = 515.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::FormulaParameters;
use crate::errors::{CalcError, CalcResult};

/// Default settings file name, looked up in the working directory
pub const SETTINGS_FILE: &str = "abamix.toml";

pub const ENV_API_URL: &str = "ABAMIX_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "ABAMIX_TIMEOUT_SECS";
pub const ENV_USER_ID: &str = "ABAMIX_USER_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the persistence service
    pub api_base_url: String,

    /// Transport timeout per request
    pub timeout_secs: u64,

    /// Authenticated user recorded as `createdBy` on saves
    pub user_id: Option<i64>,

    /// Formula parameters used when a loaded config has none (legacy data)
    #[serde(with = "toml_formula_parameters")]
    pub formula_parameters: FormulaParameters,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_base_url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
            user_id: None,
            formula_parameters: FormulaParameters::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (if it exists) and the process environment.
    pub fn load(path: &Path) -> CalcResult<Self> {
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| CalcError::file_error("read settings", path.display().to_string(), e.to_string()))?;
            Settings::from_toml(&contents)?
        } else {
            Settings::default()
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse settings from TOML, filling unspecified fields with defaults.
    pub fn from_toml(contents: &str) -> CalcResult<Self> {
        toml::from_str(contents).map_err(|e| CalcError::serialization(format!("Invalid settings file: {}", e)))
    }

    /// Apply `ABAMIX_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CalcResult<()> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| CalcError::invalid_input(ENV_TIMEOUT_SECS, raw.clone(), "Expected whole seconds"))?;
        }
        if let Some(raw) = lookup(ENV_USER_ID) {
            self.user_id = Some(
                raw.trim()
                    .parse()
                    .map_err(|_| CalcError::invalid_input(ENV_USER_ID, raw.clone(), "Expected a numeric user id"))?,
            );
        }
        Ok(())
    }
}

/// TOML keys are snake_case while the wire format of [`FormulaParameters`] is camelCase.
mod toml_formula_parameters {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::config::FormulaParameters;

    #[derive(Serialize, Deserialize, Default)]
    #[serde(default)]
    struct Table {
        a_total_weight: f64,
        b_total_weight: f64,
    }

    pub fn serialize<S: Serializer>(params: &FormulaParameters, serializer: S) -> Result<S::Ok, S::Error> {
        Table {
            a_total_weight: params.a_total_weight,
            b_total_weight: params.b_total_weight,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FormulaParameters, D::Error> {
        let table = Table::deserialize(deserializer)?;
        Ok(FormulaParameters {
            a_total_weight: table.a_total_weight,
            b_total_weight: table.b_total_weight,
        })
    }
}
