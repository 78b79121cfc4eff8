//! In-process speech backend — whisper.cpp via `whisper-rs`.
//!
//! Preferred candidate in the capability probe. Accepts 16 kHz mono WAV
//! input; resampling is the caller's concern, not this server's.

use std::path::Path;
use std::sync::Arc;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{SpeechBackend, TranscriptSegment};
use crate::error::ServiceError;

const EXPECTED_SAMPLE_RATE: u32 = 16_000;

pub struct WhisperCppBackend {
    context: Arc<WhisperContext>,
}

/// Load a whisper GGML model from disk.
pub fn load(model_path: &Path) -> Result<Box<dyn SpeechBackend>, ServiceError> {
    let model_path_str = model_path.to_str().ok_or_else(|| {
        ServiceError::TranscriptionFailed("invalid whisper model path".to_string())
    })?;

    tracing::info!(path = %model_path.display(), "Loading whisper model");
    let context =
        WhisperContext::new_with_params(model_path_str, WhisperContextParameters::default())
            .map_err(|e| {
                ServiceError::ServiceUnavailable(format!("failed to load whisper model: {e}"))
            })?;
    tracing::info!("Whisper model loaded");

    Ok(Box::new(WhisperCppBackend {
        context: Arc::new(context),
    }))
}

/// Read a WAV file into 16 kHz mono PCM f32 samples.
fn read_wav_samples(path: &Path) -> Result<Vec<f32>, ServiceError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| ServiceError::TranscriptionFailed(format!("could not read WAV: {e}")))?;
    let spec = reader.spec();
    if spec.channels != 1 || spec.sample_rate != EXPECTED_SAMPLE_RATE {
        return Err(ServiceError::TranscriptionFailed(format!(
            "expected {EXPECTED_SAMPLE_RATE} Hz mono WAV, got {} Hz {} channel(s)",
            spec.sample_rate, spec.channels
        )));
    }

    let samples: Result<Vec<f32>, _> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect()
        }
    };
    samples.map_err(|e| ServiceError::TranscriptionFailed(format!("corrupt WAV data: {e}")))
}

impl SpeechBackend for WhisperCppBackend {
    fn transcribe(
        &mut self,
        path: &Path,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, ServiceError> {
        let audio = read_wav_samples(path)?;
        if audio.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.context.create_state().map_err(|e| {
            ServiceError::TranscriptionFailed(format!("failed to create state: {e}"))
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        let lang = if language == "auto" {
            None
        } else {
            Some(language)
        };
        params.set_language(lang);
        params.set_no_timestamps(true);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);

        state
            .full(params, &audio)
            .map_err(|e| ServiceError::TranscriptionFailed(format!("{e}")))?;

        let num_segments = state.full_n_segments();
        let mut segments = Vec::with_capacity(num_segments as usize);
        for i in 0..num_segments {
            if let Some(segment) = state.get_segment(i) {
                if let Ok(text) = segment.to_str() {
                    segments.push(TranscriptSegment {
                        text: text.trim().to_string(),
                    });
                }
            }
        }

        tracing::debug!(segments = segments.len(), "Transcription complete");
        Ok(segments)
    }
}
