//! Speech backend that shells out to a `whisper-cli` executable.
//!
//! Fallback candidate in the capability probe: heavier per call than the
//! in-process context, but requires nothing beyond a binary on `PATH` and a
//! model file. Output is collected through `-otxt` into a scratch directory
//! that is removed when the call returns.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{SpeechBackend, TranscriptSegment};
use crate::error::ServiceError;

const BINARY_NAME: &str = "whisper-cli";

/// Locate the `whisper-cli` binary: an explicit override first, then `PATH`.
pub fn locate(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.is_file().then(|| path.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(BINARY_NAME))
        .find(|candidate| candidate.is_file())
}

pub struct WhisperCliBackend {
    binary: PathBuf,
    model: PathBuf,
}

impl WhisperCliBackend {
    pub fn new(binary: PathBuf, model: PathBuf) -> Self {
        WhisperCliBackend { binary, model }
    }
}

impl SpeechBackend for WhisperCliBackend {
    fn transcribe(
        &mut self,
        path: &Path,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, ServiceError> {
        let scratch = tempfile::tempdir().map_err(|e| {
            ServiceError::TranscriptionFailed(format!("could not create scratch dir: {e}"))
        })?;
        let out_base = scratch.path().join("transcript");

        tracing::debug!(binary = %self.binary.display(), audio = %path.display(), "Invoking whisper-cli");
        let output = Command::new(&self.binary)
            .arg("-m")
            .arg(&self.model)
            .arg("-l")
            .arg(language)
            .arg("-f")
            .arg(path)
            .arg("-otxt")
            .arg("-of")
            .arg(&out_base)
            .arg("--no-prints")
            .output()
            .map_err(|e| {
                ServiceError::TranscriptionFailed(format!("failed to spawn whisper-cli: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::TranscriptionFailed(format!(
                "whisper-cli exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let transcript = fs::read_to_string(out_base.with_extension("txt")).map_err(|e| {
            ServiceError::TranscriptionFailed(format!("transcription output file not found: {e}"))
        })?;

        // One segment per non-empty output line.
        Ok(transcript
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TranscriptSegment {
                text: line.to_string(),
            })
            .collect())
    }
}
