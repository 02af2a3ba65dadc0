//! SnapEDA-style part lookup: search by MPN, download KiCad assets.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{CapabilityError, PartCandidate, PartLookupCapability};
use crate::library::AssetKind;

pub const DEFAULT_SNAPEDA_URL: &str = "https://api.snapeda.com/v1";
const API_KEY_HEADER: &str = "X-SnapEDA-Key";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct SnapEdaClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: serde_json::Value,
    #[serde(default)]
    mpn: Option<String>,
    #[serde(default)]
    has_kicad_footprint: bool,
}

impl SnapEdaClient {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_SNAPEDA_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn key(&self) -> Result<&str, CapabilityError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| CapabilityError::Unavailable("SnapEDA API key".to_string()))
    }
}

fn hit_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Filename from `Content-Disposition: attachment; filename="x.kicad_mod"`.
pub(crate) fn disposition_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let raw = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');
    let name = sanitize_file_name(raw);
    (!name.is_empty()).then_some(name)
}

/// Keep a single safe path segment.
pub(crate) fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[async_trait]
impl PartLookupCapability for SnapEdaClient {
    fn name(&self) -> &str {
        "snapeda"
    }

    async fn search_by_identifier(&self, mpn: &str) -> Result<Vec<PartCandidate>, CapabilityError> {
        let key = self.key()?;
        let url = format!("{}/parts/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", mpn)])
            .header(API_KEY_HEADER, key)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CapabilityError::ApiError { status, message });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::ParseError(e.to_string()))?;

        let candidates: Vec<PartCandidate> = body
            .results
            .into_iter()
            .map(|hit| {
                let download_ref = hit_id(&hit.id);
                PartCandidate {
                    identifier: hit.mpn.unwrap_or_else(|| mpn.to_string()),
                    has_downloadable_asset: hit.has_kicad_footprint && download_ref.is_some(),
                    download_ref,
                }
            })
            .collect();
        tracing::debug!("SnapEDA returned {} candidates for {}", candidates.len(), mpn);
        Ok(candidates)
    }

    async fn download(
        &self,
        candidate: &PartCandidate,
        kind: AssetKind,
        destination: &Path,
    ) -> Result<PathBuf, CapabilityError> {
        let key = self.key()?;
        let id = candidate.download_ref.as_deref().ok_or_else(|| {
            CapabilityError::Unavailable(format!("download for {}", candidate.identifier))
        })?;
        let url = format!("{}/parts/{}/download", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .query(&[("format", "kicad"), ("type", kind.as_str())])
            .header(API_KEY_HEADER, key)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CapabilityError::ApiError { status, message });
        }

        let file_name = disposition_filename(response.headers()).unwrap_or_else(|| {
            sanitize_file_name(&format!(
                "{}_{}.{}",
                candidate.identifier,
                kind.as_str(),
                kind.file_extension()
            ))
        });
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(destination).await?;
        let path = destination.join(file_name);
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!("Downloaded {} for {} to {:?}", kind.as_str(), candidate.identifier, path);
        Ok(path)
    }
}
