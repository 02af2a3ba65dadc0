//! Engine configuration.
//!
//! Configuration is an explicit immutable value handed to constructors. Scoring
//! weights and thresholds have no fallback: a file that omits any of them is
//! rejected before a run starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SNAPEDA_KEY_ENV: &str = "BOMGUARD_SNAPEDA_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Points awarded per health category. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthWeights {
    pub datasheet_local: f64,
    pub datasheet_url: f64,
    pub footprint_project_manual: f64,
    pub footprint_api_verified: f64,
    pub footprint_inventory: f64,
    pub footprint_standard_lib: f64,
    pub footprint_inventory_api: f64,
    pub footprint_inventory_suggestion: f64,
    pub footprint_api_review: f64,
    pub footprint_suggestion: f64,
    pub symbol_project_lib: f64,
    pub symbol_standard_lib: f64,
    pub mpn_exists: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            datasheet_local: 1.0,
            datasheet_url: 0.5,
            footprint_project_manual: 2.0,
            footprint_api_verified: 1.8,
            footprint_inventory: 1.5,
            footprint_standard_lib: 1.0,
            footprint_inventory_api: 0.8,
            footprint_inventory_suggestion: 0.3,
            footprint_api_review: 0.2,
            footprint_suggestion: 0.1,
            symbol_project_lib: 1.0,
            symbol_standard_lib: 0.5,
            mpn_exists: 0.5,
        }
    }
}

impl HealthWeights {
    fn named(&self) -> [(&'static str, f64); 13] {
        [
            ("datasheet_local", self.datasheet_local),
            ("datasheet_url", self.datasheet_url),
            ("footprint_project_manual", self.footprint_project_manual),
            ("footprint_api_verified", self.footprint_api_verified),
            ("footprint_inventory", self.footprint_inventory),
            ("footprint_standard_lib", self.footprint_standard_lib),
            ("footprint_inventory_api", self.footprint_inventory_api),
            ("footprint_inventory_suggestion", self.footprint_inventory_suggestion),
            ("footprint_api_review", self.footprint_api_review),
            ("footprint_suggestion", self.footprint_suggestion),
            ("symbol_project_lib", self.symbol_project_lib),
            ("symbol_standard_lib", self.symbol_standard_lib),
            ("mpn_exists", self.mpn_exists),
        ]
    }

    /// Best weight any footprint state can earn.
    pub fn max_footprint(&self) -> f64 {
        [
            self.footprint_project_manual,
            self.footprint_api_verified,
            self.footprint_inventory,
            self.footprint_standard_lib,
            self.footprint_inventory_api,
            self.footprint_inventory_suggestion,
            self.footprint_api_review,
            self.footprint_suggestion,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthThresholds {
    pub needs_review_below: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            needs_review_below: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRules {
    #[serde(default = "default_rules_version")]
    pub version: String,
    pub points: HealthWeights,
    pub thresholds: HealthThresholds,
}

fn default_rules_version() -> String {
    "1.0".to_string()
}

impl Default for HealthRules {
    fn default() -> Self {
        Self {
            version: default_rules_version(),
            points: HealthWeights::default(),
            thresholds: HealthThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// Downloads land in `<review_dir>/<mpn>/` until a human accepts them.
    pub review_dir: PathBuf,
    /// Library used to build symbol references from bare values.
    pub symbol_library: String,
    pub capability_timeout_secs: u64,
    pub concurrency: usize,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            review_dir: PathBuf::from("libs/review"),
            symbol_library: "Device".to_string(),
            capability_timeout_secs: 30,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub id_prefix: String,
    pub id_width: usize,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            id_prefix: "INV".to_string(),
            id_width: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub snapeda_api_key: Option<String>,
    pub snapeda_url: Option<String>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub project_dir: PathBuf,
    pub footprint_dirs: Vec<PathBuf>,
    pub symbol_dirs: Vec<PathBuf>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("libs"),
            footprint_dirs: Vec::new(),
            symbol_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub health: HealthRules,
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    #[serde(default)]
    pub inventory: InventorySettings,
    #[serde(default)]
    pub services: ServiceSettings,
    #[serde(default)]
    pub libraries: LibrarySettings,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file, then apply environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&content)?;
        config.apply_env();
        tracing::info!("Loaded config from {:?} (rules {})", path, config.health.version);
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(SNAPEDA_KEY_ENV) {
            if !key.trim().is_empty() {
                self.services.snapeda_api_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, weight) in self.health.points.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(
                    format!("health.points.{name}"),
                    format!("must be a non-negative number, got {weight}"),
                ));
            }
        }
        if !self.health.thresholds.needs_review_below.is_finite() {
            return Err(invalid("health.thresholds.needs_review_below", "must be finite"));
        }
        if self.acquisition.capability_timeout_secs == 0 {
            return Err(invalid("acquisition.capability_timeout_secs", "must be at least 1"));
        }
        if self.acquisition.concurrency == 0 {
            return Err(invalid("acquisition.concurrency", "must be at least 1"));
        }
        if self.inventory.id_prefix.is_empty() {
            return Err(invalid("inventory.id_prefix", "cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}
