//! Text-embedding model service.
//!
//! Owns the lazily-loaded embedding backend, performs input validation, and
//! reports a non-blocking description for the health endpoint.

use once_cell::sync::OnceCell;
use serde::Serialize;

use super::backend::{self, EmbeddingBackend, EmbeddingLoader};
use super::{LoadPhase, ModelSlot};
use crate::config::RuntimeConfig;
use crate::error::ServiceError;

/// Non-blocking view of the service state, reported by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Model identifier this service was constructed with.
    pub identifier: String,
    /// Whether the model handle is loaded.
    pub ready: bool,
    /// Embedding vector length, known once the model has loaded.
    pub dimension: Option<u32>,
}

pub struct EmbeddingService {
    model_name: String,
    // Availability is decided once at construction and immutable afterwards.
    loader: Option<EmbeddingLoader>,
    slot: ModelSlot<Box<dyn EmbeddingBackend>>,
    dimension: OnceCell<usize>,
}

impl EmbeddingService {
    /// Construct with the capability probe over compiled-in backends.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let loader = backend::probe_embedding(config);
        if loader.is_none() {
            tracing::warn!("No embedding backend compiled in; embedding endpoints will fail");
        }
        Self::with_loader(config.embedding_model.clone(), loader)
    }

    /// Construct with an explicit loader (or none), bypassing the probe.
    pub fn with_loader(model_name: impl Into<String>, loader: Option<EmbeddingLoader>) -> Self {
        EmbeddingService {
            model_name: model_name.into(),
            loader,
            slot: ModelSlot::new(),
            dimension: OnceCell::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.loader.is_some()
    }

    fn load_backend(&self) -> Result<Box<dyn EmbeddingBackend>, ServiceError> {
        let loader = self.loader.as_ref().ok_or_else(|| {
            ServiceError::ServiceUnavailable("No embedding backend available".to_string())
        })?;
        tracing::info!(model = %self.model_name, "Loading embedding model (first use)");
        let backend = loader()?;
        let _ = self.dimension.set(backend.dimension());
        Ok(backend)
    }

    /// Idempotent lazy load. Safe under concurrent invocation: exactly one
    /// acquisition happens, concurrent callers block until it resolves.
    pub fn ensure_ready(&self) -> Result<(), ServiceError> {
        self.slot.ensure_ready(|| self.load_backend())
    }

    /// Generate one embedding vector per input text.
    pub fn encode_batch(
        &self,
        texts: &[String],
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Err(ServiceError::InvalidInput("No texts provided".to_string()));
        }
        self.slot
            .with_backend(|| self.load_backend(), |b| b.encode(texts, normalize))
    }

    /// Generate an embedding vector for a single text.
    pub fn encode_single(&self, text: &str, normalize: bool) -> Result<Vec<f32>, ServiceError> {
        if text.is_empty() {
            return Err(ServiceError::InvalidInput("No text provided".to_string()));
        }
        let input = [text.to_string()];
        let mut rows = self.encode_batch(&input, normalize)?;
        rows.pop()
            .ok_or_else(|| ServiceError::EncodingFailed("backend returned no vector".to_string()))
    }

    /// Current state without forcing a load. Never blocks on a load in
    /// progress.
    pub fn describe(&self) -> ModelInfo {
        ModelInfo {
            identifier: self.model_name.clone(),
            ready: self.slot.phase() == LoadPhase::Ready,
            dimension: self.dimension.get().map(|d| *d as u32),
        }
    }
}
