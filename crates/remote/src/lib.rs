//! Clients for the external recognition and embedding services.

mod config;
mod embedder;
mod http;
mod recognizer;

pub use config::{
    EmbeddingProvider, EmbeddingServiceConfig, RecognizerBackend, RecognizerServiceConfig,
    EMBED_KEY_ENV, OCR_KEY_ENV,
};
pub use embedder::HttpEmbedder;
pub use recognizer::{parse_analyze_result, AzureRecognizer, FixtureRecognizer};
