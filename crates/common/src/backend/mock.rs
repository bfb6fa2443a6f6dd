//! Mock backend implementations for testing

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Embedder, Generator, Scorer, TokenStream, TOKEN_CHANNEL_CAPACITY};

/// Mock embedder producing random vectors
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Ok((0..self.dimension).map(|_| rng.gen::<f32>()).collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for _ in texts {
            embeddings.push(self.embed("").await?);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Mock scorer: relevance = fraction of query words present in the text.
/// Deterministic, so rerank ordering tests can rely on it.
pub struct MockScorer {
    fail: bool,
}

impl MockScorer {
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// A scorer whose every call fails, for fallback-path tests
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scorer for MockScorer {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if self.fail {
            return Err(AppError::Rerank {
                message: "mock scorer configured to fail".to_string(),
            });
        }

        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.to_string())
            .collect();

        Ok(texts
            .iter()
            .map(|text| {
                if query_words.is_empty() {
                    return 0.0;
                }
                let lower = text.to_lowercase();
                let hits = query_words.iter().filter(|w| lower.contains(*w)).count();
                hits as f32 / query_words.len() as f32
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "mock-rerank"
    }
}

/// Mock generator streaming scripted tokens
pub struct MockGenerator {
    tokens: Vec<String>,
    fail_after: Option<usize>,
}

impl MockGenerator {
    /// Stream a canned answer followed by a small graph payload
    pub fn answering() -> Self {
        Self::with_tokens(vec![
            "The ".to_string(),
            "context ".to_string(),
            "addresses ".to_string(),
            "the ".to_string(),
            "question.".to_string(),
            "\n".to_string(),
            r#"{"graph_data": [{"source": "microgravity", "target": "bone density", "relationship": "decreases"}]}"#.to_string(),
        ])
    }

    pub fn with_tokens(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            fail_after: None,
        }
    }

    /// Stream `n` tokens, then fail mid-generation
    pub fn failing_after(tokens: Vec<String>, n: usize) -> Self {
        Self {
            tokens,
            fail_after: Some(n),
        }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate_stream(&self, _prompt: &str) -> Result<TokenStream> {
        let (tx, rx) = mpsc::channel(TOKEN_CHANNEL_CAPACITY);
        let tokens = self.tokens.clone();
        let fail_after = self.fail_after;

        tokio::spawn(async move {
            for (i, token) in tokens.into_iter().enumerate() {
                if fail_after == Some(i) {
                    let _ = tx
                        .send(Err(AppError::Generation {
                            message: "mock generator configured to fail".to_string(),
                        }))
                        .await;
                    return;
                }
                if tx.send(Ok(token)).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    fn model_name(&self) -> &str {
        "mock-generation"
    }
}
