//! OpenAI-compatible remote backend
//!
//! Speaks the `/embeddings`, `/rerank`, and `/completions` routes of any
//! OpenAI-compatible host: hosted APIs as well as local llama.cpp or Ollama
//! servers.

use crate::config::BackendConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{Embedder, Generator, Scorer, TokenStream, TOKEN_CHANNEL_CAPACITY};

/// Stop sequences for the chat-template prompt framing
const STOP_SEQUENCES: &[&str] = &["</s>", "<|user|>"];

const DEFAULT_API_BASE: &str = "http://localhost:8080/v1";

/// Remote backend client implementing all three capabilities
pub struct RemoteBackend {
    client: reqwest::Client,
    // Streams can outlive a total request timeout; this client only bounds
    // connection setup.
    stream_client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    embedding_model: String,
    embedding_dimension: usize,
    rerank_model: String,
    generation_model: String,
    max_generation_tokens: u32,
    max_retries: u32,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct RerankRequest {
    model: String,
    query: String,
    documents: Vec<String>,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Deserialize)]
struct RerankItem {
    index: usize,
    relevance_score: f32,
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    stream: bool,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionChunk {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

impl RemoteBackend {
    /// Create a new remote backend client
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            stream_client,
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key: config.api_key.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimension: config.embedding_dimension,
            rerank_model: config.rerank_model.clone(),
            generation_model: config.generation_model.clone(),
            max_generation_tokens: config.max_generation_tokens,
            max_retries: config.max_retries,
            batch_size: config.batch_size.max(1),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    /// Make an embedding request with retry
    async fn embed_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            match self.embed_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Embedding request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Embedding {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.api_base);

        let request = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.embedding_model.clone(),
        };

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: EmbeddingResponse =
            response.json().await.map_err(|e| AppError::Embedding {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }

    /// Make a rerank request with retry
    async fn score_with_retry(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            match self.score_request(query, texts).await {
                Ok(scores) => return Ok(scores),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Rerank request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Rerank {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn score_request(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let url = format!("{}/rerank", self.api_base);

        let request = RerankRequest {
            model: self.rerank_model.clone(),
            query: query.to_string(),
            documents: texts.to_vec(),
        };

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Rerank {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Rerank {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: RerankResponse = response.json().await.map_err(|e| AppError::Rerank {
            message: format!("Failed to parse response: {}", e),
        })?;

        // Responses come ranked by score; restore input order
        let mut scores = vec![0.0_f32; texts.len()];
        for item in result.results {
            if item.index < scores.len() {
                scores[item.index] = item.relevance_score;
            }
        }
        Ok(scores)
    }
}

#[async_trait]
impl Embedder for RemoteBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_with_retry(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding {
                message: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        // Hosted APIs cap the number of inputs per request
        for chunk in texts.chunks(self.batch_size) {
            let embeddings = self.embed_with_retry(chunk).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }
}

#[async_trait]
impl Scorer for RemoteBackend {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.score_with_retry(query, texts).await
    }

    fn model_name(&self) -> &str {
        &self.rerank_model
    }
}

#[async_trait]
impl Generator for RemoteBackend {
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream> {
        let url = format!("{}/completions", self.api_base);

        let request = CompletionRequest {
            model: self.generation_model.clone(),
            prompt: prompt.to_string(),
            max_tokens: self.max_generation_tokens,
            stream: true,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        };

        let response = self
            .authorize(self.stream_client.post(&url))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Generation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let (tx, rx) = mpsc::channel(TOKEN_CHANNEL_CAPACITY);
        tokio::spawn(forward_sse_tokens(response, tx));
        Ok(rx)
    }

    fn model_name(&self) -> &str {
        &self.generation_model
    }
}

/// Accumulates raw SSE body bytes and yields complete lines. Network
/// chunks can split a multibyte character, so decoding happens only at
/// line boundaries, after the bytes are reassembled.
struct SseLineBuffer {
    bytes: Vec<u8>,
}

impl SseLineBuffer {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.bytes.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.bytes.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }
}

/// Read the SSE body and forward completion tokens. Exits early when the
/// receiver is dropped or the body stream fails.
async fn forward_sse_tokens(response: reqwest::Response, tx: mpsc::Sender<Result<String>>) {
    let mut body = response.bytes_stream();
    let mut buffer = SseLineBuffer::new();

    while let Some(part) = body.next().await {
        let bytes = match part {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx
                    .send(Err(AppError::Generation {
                        message: format!("Stream interrupted: {}", e),
                    }))
                    .await;
                return;
            }
        };

        for line in buffer.push(&bytes) {
            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            if payload == "[DONE]" {
                return;
            }

            match serde_json::from_str::<CompletionChunk>(payload) {
                Ok(chunk) => {
                    for choice in chunk.choices {
                        if choice.text.is_empty() {
                            continue;
                        }
                        if tx.send(Ok(choice.text)).await.is_err() {
                            // Receiver dropped: consumer cancelled
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed stream chunk");
                }
            }
        }
    }
}
