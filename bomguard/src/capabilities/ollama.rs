//! Ollama client for local footprint suggestions and datasheet checks.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::prompts::{build_footprint_prompt, build_package_prompt, build_pin_count_prompt};
use super::{CapabilityError, DocumentCapability, FootprintQuery, SuggestionCapability};
use crate::model::{Component, ConsistencyResult, ConsistencyVerdict};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:8b";
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaModelList {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct VerdictJson {
    #[serde(rename = "match")]
    matched: Option<bool>,
    #[serde(default)]
    notes: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the server is reachable and has the configured model pulled.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        let Ok(response) = self.client.get(&url).send().await else {
            return false;
        };
        if !response.status().is_success() {
            return false;
        }
        match response.json::<OllamaModelList>().await {
            Ok(list) => list
                .models
                .iter()
                .any(|m| m.name.starts_with(&self.model) || self.model.starts_with(&m.name)),
            Err(_) => false,
        }
    }

    pub async fn generate(&self, prompt: String) -> Result<String, CapabilityError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: 0.2,
                num_predict: 400,
            },
        };

        tracing::debug!("Sending request to Ollama: {}", self.model);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CapabilityError::ApiError { status, message });
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::ParseError(e.to_string()))?;
        Ok(body.response)
    }
}

/// Pull a `Library:Name` token out of a free-form answer.
pub(crate) fn parse_footprint_answer(text: &str) -> Option<String> {
    let cleaned = text.trim().trim_matches('`').trim();
    if cleaned.eq_ignore_ascii_case("none") {
        return None;
    }
    cleaned
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | ',' | '.')))
        .find(|token| match token.split_once(':') {
            Some((lib, name)) => !lib.is_empty() && !name.is_empty() && !name.contains(':'),
            None => false,
        })
        .map(str::to_string)
}

/// Read the first JSON object in a response as a consistency verdict.
pub(crate) fn parse_verdict(text: &str) -> Result<ConsistencyResult, CapabilityError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(CapabilityError::ParseError("no JSON object in response".to_string()));
    };
    if end < start {
        return Err(CapabilityError::ParseError("no JSON object in response".to_string()));
    }
    let verdict: VerdictJson = serde_json::from_str(&text[start..=end])
        .map_err(|e| CapabilityError::ParseError(e.to_string()))?;
    Ok(ConsistencyResult {
        verdict: match verdict.matched {
            Some(true) => ConsistencyVerdict::Match,
            Some(false) => ConsistencyVerdict::Mismatch,
            None => ConsistencyVerdict::Unknown,
        },
        notes: verdict.notes,
    })
}

#[async_trait]
impl SuggestionCapability for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn suggest_footprint(&self, query: &FootprintQuery) -> Result<Option<String>, CapabilityError> {
        let answer = self.generate(build_footprint_prompt(query)).await?;
        let parsed = parse_footprint_answer(&answer);
        if parsed.is_none() {
            tracing::debug!("Ollama gave no usable footprint: {}", answer.trim());
        }
        Ok(parsed)
    }
}

#[async_trait]
impl DocumentCapability for OllamaClient {
    async fn check_pin_count_consistency(
        &self,
        text: &str,
        component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError> {
        if component.footprint().is_none() {
            return Ok(ConsistencyResult::unknown("Skipped (no footprint assigned)."));
        }
        let answer = self.generate(build_pin_count_prompt(text, component)).await?;
        parse_verdict(&answer)
    }

    async fn check_package_consistency(
        &self,
        text: &str,
        component: &Component,
    ) -> Result<ConsistencyResult, CapabilityError> {
        if component.package().is_none() {
            return Ok(ConsistencyResult::unknown("Skipped (no package on the BOM)."));
        }
        let answer = self.generate(build_package_prompt(text, component)).await?;
        parse_verdict(&answer)
    }
}
