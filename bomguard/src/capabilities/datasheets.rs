//! Datasheets kept under the project's `docs/datasheets/` directory.

use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use super::snapeda::sanitize_file_name;
use super::{CapabilityError, DatasheetStore};
use crate::model::Component;

pub const DATASHEET_DIR: &str = "docs/datasheets";
const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Filesystem datasheet store.
///
/// Files are named after the MPN, or `<ref>_<value>` when there is none.
/// Extracted text is read from a `.txt` sidecar next to the PDF; producing
/// that sidecar is left to an external extraction tool.
pub struct FsDatasheetStore {
    project_root: PathBuf,
    client: Client,
    offline: bool,
}

impl FsDatasheetStore {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            project_root: project_root.into(),
            client,
            offline: false,
        }
    }

    /// Disable downloads; local lookups still work.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Project-relative path where this component's datasheet is stored.
    pub fn default_relative_path(component: &Component) -> String {
        let stem = match component.mpn() {
            Some(mpn) => sanitize_file_name(mpn),
            None => sanitize_file_name(&format!("{}_{}", component.reference.trim(), component.value.trim())),
        };
        format!("{DATASHEET_DIR}/{stem}.pdf")
    }

    fn absolute(&self, relative: &str) -> PathBuf {
        self.project_root.join(relative)
    }
}

#[async_trait]
impl DatasheetStore for FsDatasheetStore {
    fn local_path(&self, component: &Component) -> Option<String> {
        if let Some(existing) = component.datasheet_local.as_deref() {
            if self.absolute(existing).is_file() {
                return Some(existing.to_string());
            }
        }
        let default = Self::default_relative_path(component);
        self.absolute(&default).is_file().then_some(default)
    }

    async fn download(&self, component: &Component) -> Result<bool, CapabilityError> {
        let Some(url) = component.datasheet_url() else {
            return Ok(false);
        };
        if self.offline {
            return Err(CapabilityError::Unavailable("datasheet download".to_string()));
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(CapabilityError::ApiError {
                status,
                message: format!("datasheet download from {url}"),
            });
        }
        let bytes = response.bytes().await?;

        let target = self.absolute(&Self::default_relative_path(component));
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;
        tracing::info!("Downloaded datasheet for {} to {:?}", component.reference, target);
        Ok(true)
    }

    async fn extract_text(&self, component: &Component) -> Result<Option<String>, CapabilityError> {
        let Some(relative) = self.local_path(component) else {
            return Ok(None);
        };
        let sidecar = self.absolute(&relative).with_extension("txt");
        if !sidecar.is_file() {
            tracing::debug!("No extracted text for {} at {:?}", component.reference, sidecar);
            return Ok(None);
        }
        let text = tokio::fs::read_to_string(&sidecar).await?;
        Ok((!text.trim().is_empty()).then_some(text))
    }
}
