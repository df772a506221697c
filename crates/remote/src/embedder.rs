use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use invoice_dedup_core::{DedupError, Embedder, Result};

use crate::http::{decode_json, send_error};

const SERVICE: &str = "embedding";

#[derive(Clone)]
enum Auth {
    Bearer(String),
    ApiKey(String),
}

/// Blocking client for OpenAI-compatible `/embeddings` endpoints,
/// including Azure OpenAI deployments.
#[derive(Clone)]
pub struct HttpEmbedder {
    http: Client,
    url: String,
    auth: Auth,
    model: Option<String>,
    dimensions: Option<usize>,
    name: &'static str,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn openai(
        base_url: &str,
        api_key: String,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        require_key(&api_key)?;
        if model.trim().is_empty() {
            return Err(DedupError::Config("missing embedding model name".into()));
        }
        Ok(Self {
            http: build_client(timeout)?,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            auth: Auth::Bearer(api_key.trim().to_string()),
            model: Some(model),
            dimensions,
            name: "openai",
        })
    }

    pub fn azure(
        endpoint: &str,
        api_key: String,
        deployment: &str,
        api_version: &str,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        require_key(&api_key)?;
        if deployment.trim().is_empty() {
            return Err(DedupError::Config(
                "azure embeddings need a deployment name".into(),
            ));
        }
        Ok(Self {
            http: build_client(timeout)?,
            url: format!(
                "{}/openai/deployments/{}/embeddings?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                api_version
            ),
            auth: Auth::ApiKey(api_key.trim().to_string()),
            model: None,
            dimensions,
            name: "azure",
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        self.name
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text,
            model: self.model.as_deref(),
            dimensions: self.dimensions,
        };
        let builder = self.http.post(&self.url).json(&request);
        let builder = match &self.auth {
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::ApiKey(key) => builder.header("api-key", key),
        };
        let response = builder.send().map_err(|err| send_error(SERVICE, err))?;
        let value = decode_json(SERVICE, response)?;
        let parsed: EmbeddingResponse = serde_json::from_value(value)
            .map_err(|err| DedupError::Fatal(format!("unexpected embedding payload: {err}")))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| DedupError::Fatal("embedding response contained no vectors".into()))
    }
}

fn require_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(DedupError::Config("missing embedding service key".into()));
    }
    Ok(())
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| DedupError::Config(format!("failed to build embedding client: {err}")))
}
