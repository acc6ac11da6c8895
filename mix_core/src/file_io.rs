//! # Config Export / Import
//!
//! Stores a single ABA material config on disk, e.g. to move a mix between
//! ERP instances or keep an offline copy.
//!
//! - **Atomic saves**: write to `.tmp`, sync, rename over the target
//! - **Version validation**: files carry a schema version checked on import
//!
//! ## File Format
//!
//! Exports are `.abamix` files containing JSON:
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "exportedAt": "2024-03-01T08:30:00Z",
//!   "config": { "name": "...", "configData": "..." }
//! }
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use mix_core::file_io::{export_config, import_config, ConfigFile};
//! use mix_core::config::NewAbaMaterialConfig;
//! use std::path::Path;
//!
//! let config = NewAbaMaterialConfig {
//!     name: "Standard film".to_string(),
//!     description: None,
//!     created_by: 1,
//!     is_default: false,
//!     config_data: "[]".to_string(),
//! };
//! let path = Path::new("standard.abamix");
//! export_config(&ConfigFile::new(config), path)?;
//! let file = import_config(path)?;
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::NewAbaMaterialConfig;
use crate::errors::{CalcError, CalcResult};

/// Current schema version for .abamix files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// File extension for exported configs
pub const EXPORT_EXTENSION: &str = "abamix";

/// Exported config envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Schema version (for migration compatibility)
    pub version: String,

    pub exported_at: DateTime<Utc>,

    /// The config, ready to be re-created on a persistence service
    pub config: NewAbaMaterialConfig,
}

impl ConfigFile {
    /// Wrap `config` with the current schema version and timestamp.
    pub fn new(config: NewAbaMaterialConfig) -> Self {
        ConfigFile {
            version: SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            config,
        }
    }
}

/// Write `file` to `path` atomically.
///
/// 1. Serialize to JSON
/// 2. Write to `<path>.tmp` and fsync
/// 3. Rename over `path`
pub fn export_config(file: &ConfigFile, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(file)?;

    let tmp_path = path.with_extension(format!("{}.tmp", EXPORT_EXTENSION));

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    info!(path = %path.display(), name = %file.config.name, "exported ABA material config");
    Ok(())
}

/// Read an exported config and check its schema version.
///
/// The embedded `configData` is decoded as well, so a file that imports
/// successfully can also be loaded into the calculator.
///
/// # Errors
///
/// * `FileError` - I/O error
/// * `SerializationError` - invalid JSON or invalid `configData`
/// * `VersionMismatch` - the file was written by an incompatible version
pub fn import_config(path: &Path) -> CalcResult<ConfigFile> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CalcError::file_error("read", path.display().to_string(), e.to_string()))?;

    let file: ConfigFile = serde_json::from_str(&contents)
        .map_err(|e| CalcError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    validate_version(&file.version)?;
    crate::config::ConfigData::decode(&file.config.config_data)?;

    Ok(file)
}

/// Check that a file version is compatible with [`SCHEMA_VERSION`].
///
/// The major version must match. While the schema is 0.x, a file with a newer
/// minor version is rejected as well.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file = Version::parse(file_version).map_err(|_| mismatch())?;
    let current = Version::parse(SCHEMA_VERSION).map_err(|e| CalcError::Internal {
        message: format!("invalid SCHEMA_VERSION: {}", e),
    })?;

    if file.major != current.major {
        return Err(mismatch());
    }
    if current.major == 0 && file.minor > current.minor {
        return Err(mismatch());
    }
    Ok(())
}
