use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::catalog::CatalogFetcher;
use crate::error::{Result, ScoutError};
use crate::model::{param_size_from, parse_quantization, ModelVariant};

const OLLAMA_LIBRARY_URL: &str = "https://ollama.com/api/tags";

/// Bound on the whole request; hitting it counts as a failed fetch.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct OllamaLibraryClient {
    http: Client,
    url: String,
}

impl OllamaLibraryClient {
    pub fn new() -> Result<Self> {
        Self::with_url(OLLAMA_LIBRARY_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            url: url.into(),
        })
    }

    /// Fetch the raw `/api/tags` document.
    pub async fn tags(&self) -> Result<Value> {
        let resp = self
            .http
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ScoutError::Api { status, body });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CatalogFetcher for OllamaLibraryClient {
    async fn fetch(&self) -> Result<Vec<ModelVariant>> {
        let data = self.tags().await?;
        let variants = parse_tags(&data);
        if variants.is_empty() {
            return Err(ScoutError::EmptyCatalog);
        }
        tracing::debug!(count = variants.len(), "fetched live catalog");
        Ok(variants)
    }
}

/// Parse an `/api/tags` document (`{"models": [...]}` or a bare array) into
/// variants, filling gaps the library leaves blank.
pub fn parse_tags(data: &Value) -> Vec<ModelVariant> {
    let items = data
        .get("models")
        .and_then(|v| v.as_array())
        .or_else(|| data.as_array());
    items
        .map(|arr| arr.iter().filter_map(parse_variant).collect())
        .unwrap_or_default()
}

/// Parse one model record. Records without a name are skipped.
pub fn parse_variant(item: &Value) -> Option<ModelVariant> {
    let raw_name = item.get("name")?.as_str()?.trim();
    if raw_name.is_empty() {
        return None;
    }
    let (base, tag) = raw_name.split_once(':').unwrap_or((raw_name, "latest"));

    let details = item.get("details");
    let detail_str = |key: &str| {
        details
            .and_then(|d| d.get(key))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let quantization = detail_str("quantization_level").unwrap_or_else(|| parse_quantization(tag));
    let size_bytes = item
        .get("size")
        .and_then(|v| v.as_u64())
        .filter(|s| *s > 0);

    let mut variant = ModelVariant::new(base, tag, &quantization, size_bytes);
    variant.param_size = detail_str("parameter_size").or_else(|| param_size_from(base, tag));
    variant.description = item
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    Some(variant)
}
