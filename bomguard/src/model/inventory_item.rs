//! Physical parts held in the local inventory.

use serde::{Deserialize, Serialize};

use super::{non_blank, validate_relative_path, ValidationError};

/// How an inventory record's footprint was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintSource {
    Manual,
    #[serde(alias = "api-verified")]
    ApiVerified,
    #[serde(alias = "kit-ingest-verified")]
    KitIngestVerified,
    #[default]
    Unknown,
}

impl FootprintSource {
    /// Provenances that may mark a footprint as verified.
    pub fn is_trusted(&self) -> bool {
        matches!(self, FootprintSource::Manual | FootprintSource::KitIngestVerified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FootprintSource::Manual => "manual",
            FootprintSource::ApiVerified => "api_verified",
            FootprintSource::KitIngestVerified => "kit_ingest_verified",
            FootprintSource::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountingType {
    Smd,
    #[serde(alias = "tht")]
    ThroughHole,
    #[default]
    Unknown,
}

/// Confidence tag left by image-based identification at ingest time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisConfidence {
    /// Entered by hand, never analysed.
    #[default]
    NotAnalyzed,
    High,
    Medium,
    Low,
}

impl AnalysisConfidence {
    pub fn is_ai_identified(&self) -> bool {
        !matches!(self, AnalysisConfidence::NotAnalyzed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub part_id: String,
    pub description: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    /// KiCad footprint in `Library:Name` form.
    pub footprint: String,
    #[serde(default)]
    pub footprint_source: FootprintSource,
    #[serde(default)]
    pub mpn: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub datasheet_local: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub mounting: MountingType,
    #[serde(default)]
    pub analysis_confidence: AnalysisConfidence,
}

impl InventoryItem {
    pub fn new(
        part_id: impl Into<String>,
        description: impl Into<String>,
        footprint: impl Into<String>,
    ) -> Self {
        Self {
            part_id: part_id.into(),
            description: description.into(),
            value: None,
            package: None,
            footprint: footprint.into(),
            footprint_source: FootprintSource::Unknown,
            mpn: None,
            quantity: 0,
            storage_location: None,
            datasheet_local: None,
            image_path: None,
            mounting: MountingType::Unknown,
            analysis_confidence: AnalysisConfidence::NotAnalyzed,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_mpn(mut self, mpn: impl Into<String>) -> Self {
        self.mpn = Some(mpn.into());
        self
    }

    pub fn with_source(mut self, source: FootprintSource) -> Self {
        self.footprint_source = source;
        self
    }

    pub fn mpn(&self) -> Option<&str> {
        non_blank(self.mpn.as_deref())
    }

    pub fn value(&self) -> Option<&str> {
        non_blank(self.value.as_deref())
    }

    pub fn package(&self) -> Option<&str> {
        non_blank(self.package.as_deref())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.part_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("part_id"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }
        let footprint = self.footprint.trim();
        if footprint.is_empty() {
            return Err(ValidationError::EmptyField("footprint"));
        }
        match footprint.split_once(':') {
            Some((lib, name)) if !lib.is_empty() && !name.is_empty() => {}
            _ => return Err(ValidationError::FootprintFormat(footprint.to_string())),
        }
        if let Some(path) = self.datasheet_local.as_deref() {
            validate_relative_path("datasheet_local", path)?;
        }
        if let Some(path) = self.image_path.as_deref() {
            validate_relative_path("image_path", path)?;
        }
        Ok(())
    }
}
