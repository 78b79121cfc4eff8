//! Engine-agnostic backend traits and the construction-time capability probe.
//!
//! Services depend on the [`EmbeddingBackend`] and [`SpeechBackend`] traits
//! instead of concrete engines, so inference code stays decoupled from the
//! lifecycle and HTTP layers. Concrete engines are feature-gated:
//!
//! | Feature     | Module        | Embedding | Speech |
//! |-------------|---------------|-----------|--------|
//! | `fastembed` | [`fastembed`] |     ✓     |        |
//! | `whisper`   | [`whisper`]   |           |   ✓    |
//! | (always)    | [`whisper_cli`] |         |   ✓    |
//!
//! The speech probe ranks candidates lightest-first — the in-process
//! whisper.cpp context, then the external `whisper-cli` subprocess — and
//! selects exactly one at service construction. The selection is fixed for
//! the process lifetime; there is no re-probe.

#[cfg(feature = "fastembed")]
pub mod fastembed;
#[cfg(feature = "whisper")]
pub mod whisper;
pub mod whisper_cli;

use std::path::Path;

use crate::config::RuntimeConfig;
use crate::error::ServiceError;

/// Backend-agnostic sentence-embedding engine.
///
/// Implementations must be `Send`; the owning service serializes calls
/// behind its slot mutex, so `Sync` is not required and `&mut self` allows
/// stateful engines.
pub trait EmbeddingBackend: Send {
    /// Fixed output vector length of this model.
    fn dimension(&self) -> usize;

    /// Encode a batch of texts into one vector per input, L2-normalized when
    /// `normalize` is set.
    fn encode(&mut self, texts: &[String], normalize: bool)
        -> Result<Vec<Vec<f32>>, ServiceError>;
}

/// One recognized span of speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    /// Text content for this segment, as produced by the engine.
    pub text: String,
}

/// Backend-agnostic speech-to-text engine operating on an audio file on disk.
pub trait SpeechBackend: Send {
    /// Transcribe the audio file at `path` in the given language.
    fn transcribe(
        &mut self,
        path: &Path,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, ServiceError>;
}

/// Closed enumeration of speech engines, in probe rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechBackendKind {
    /// In-process whisper.cpp via `whisper-rs` (`whisper` feature).
    WhisperCpp,
    /// External `whisper-cli` subprocess.
    WhisperCli,
}

impl SpeechBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SpeechBackendKind::WhisperCpp => "whisper-cpp",
            SpeechBackendKind::WhisperCli => "whisper-cli",
        }
    }
}

/// Deferred constructor for an embedding engine.
pub type EmbeddingLoader =
    Box<dyn Fn() -> Result<Box<dyn EmbeddingBackend>, ServiceError> + Send + Sync>;

/// Deferred constructor for a speech engine.
pub type SpeechLoader =
    Box<dyn Fn() -> Result<Box<dyn SpeechBackend>, ServiceError> + Send + Sync>;

/// Probe for a compiled-in embedding engine.
///
/// Returns `None` when the build carries none; the service then reports
/// itself unavailable for the process lifetime.
pub fn probe_embedding(config: &RuntimeConfig) -> Option<EmbeddingLoader> {
    #[cfg(feature = "fastembed")]
    {
        let model = config.embedding_model.clone();
        return Some(Box::new(move || fastembed::load(&model)));
    }
    #[cfg(not(feature = "fastembed"))]
    {
        let _ = config;
        None
    }
}

/// Probe the ranked speech-engine candidates and select the first usable one.
pub fn probe_speech(config: &RuntimeConfig) -> Option<(SpeechBackendKind, SpeechLoader)> {
    let model = config.whisper_model.clone().filter(|p| p.is_file());

    // Both engines need a whisper GGML model file on disk.
    let model = match model {
        Some(m) => m,
        None => {
            tracing::debug!("No whisper model file configured; transcription unavailable");
            return None;
        }
    };

    #[cfg(feature = "whisper")]
    {
        let model = model.clone();
        return Some((
            SpeechBackendKind::WhisperCpp,
            Box::new(move || whisper::load(&model)) as SpeechLoader,
        ));
    }

    #[cfg(not(feature = "whisper"))]
    if let Some(binary) = whisper_cli::locate(config.whisper_cli.as_deref()) {
        let loader: SpeechLoader =
            Box::new(move || Ok(Box::new(whisper_cli::WhisperCliBackend::new(
                binary.clone(),
                model.clone(),
            )) as Box<dyn SpeechBackend>));
        return Some((SpeechBackendKind::WhisperCli, loader));
    }

    #[cfg(not(feature = "whisper"))]
    None
}
