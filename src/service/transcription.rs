//! Audio-transcription model service.
//!
//! The backend is selected once at construction by the ranked capability
//! probe; when no candidate is usable the service stays unavailable for the
//! process lifetime. The model size tier is likewise fixed at construction.

use std::path::Path;

use super::backend::{self, SpeechBackend, SpeechBackendKind, SpeechLoader};
use super::{LoadPhase, ModelSlot};
use crate::config::RuntimeConfig;
use crate::error::ServiceError;

pub struct TranscriptionService {
    model_size: String,
    // Probe result, fixed for the process lifetime.
    selected: Option<(SpeechBackendKind, SpeechLoader)>,
    slot: ModelSlot<Box<dyn SpeechBackend>>,
}

impl TranscriptionService {
    /// Construct with the ranked capability probe.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let selected = backend::probe_speech(config);
        match &selected {
            Some((kind, _)) => {
                tracing::info!(backend = kind.as_str(), size = %config.whisper_size, "Transcription backend selected")
            }
            None => tracing::warn!("No transcription backend available"),
        }
        Self::with_loader(config.whisper_size.clone(), selected)
    }

    /// Construct with an explicit probe result, bypassing the probe.
    pub fn with_loader(
        model_size: impl Into<String>,
        selected: Option<(SpeechBackendKind, SpeechLoader)>,
    ) -> Self {
        TranscriptionService {
            model_size: model_size.into(),
            selected,
            slot: ModelSlot::new(),
        }
    }

    /// Pure read of the immutable availability flag.
    pub fn is_available(&self) -> bool {
        self.selected.is_some()
    }

    /// The backend the probe selected, if any.
    pub fn backend_kind(&self) -> Option<SpeechBackendKind> {
        self.selected.as_ref().map(|(kind, _)| *kind)
    }

    /// Model size tier this service was constructed with.
    pub fn model_size(&self) -> &str {
        &self.model_size
    }

    /// Whether the model handle is loaded. Never blocks.
    pub fn is_ready(&self) -> bool {
        self.slot.phase() == LoadPhase::Ready
    }

    fn load_backend(&self) -> Result<Box<dyn SpeechBackend>, ServiceError> {
        let (kind, loader) = self.selected.as_ref().ok_or_else(|| {
            ServiceError::ServiceUnavailable("No transcription backend available".to_string())
        })?;
        tracing::info!(backend = kind.as_str(), size = %self.model_size, "Loading transcription model (first use)");
        loader()
    }

    /// Idempotent lazy load with the same single-flight guarantee as the
    /// embedding service.
    pub fn ensure_ready(&self) -> Result<(), ServiceError> {
        if !self.is_available() {
            return Err(ServiceError::ServiceUnavailable(
                "No transcription backend available".to_string(),
            ));
        }
        self.slot.ensure_ready(|| self.load_backend())
    }

    /// Transcribe the audio file at `path`.
    ///
    /// Joins the backend's recognized segments with single spaces and trims
    /// the result.
    pub fn transcribe(&self, path: &Path, language: &str) -> Result<String, ServiceError> {
        if !self.is_available() {
            return Err(ServiceError::ServiceUnavailable(
                "No transcription backend available".to_string(),
            ));
        }
        let segments = self
            .slot
            .with_backend(|| self.load_backend(), |b| b.transcribe(path, language))?;
        Ok(segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string())
    }

    /// Release the loaded model, returning the handle to `Unloaded`. Safe to
    /// call when never loaded.
    pub fn unload(&self) {
        self.slot.unload();
    }
}
