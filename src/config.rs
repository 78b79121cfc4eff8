//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the server runtime and the
//! model services.
//!
//! ## Environment Variables
//!
//! ### `INFERD_STACK_SIZE`
//!
//! Stack size for coroutine handlers, in decimal (`65536`) or hexadecimal
//! (`0x10000`). Default: `0x10000` (64 KB). Model inference runs on the
//! handling coroutine's stack, so the default leaves more headroom than a
//! plain JSON API would need.
//!
//! ### `INFERD_EMBEDDING_MODEL`
//!
//! Identifier of the sentence-embedding model. Default: `all-MiniLM-L6-v2`.
//!
//! ### `INFERD_WHISPER_SIZE`
//!
//! Quality/footprint tier of the speech model (`tiny`, `base`, `small`, ...).
//! Fixed at service construction. Default: `base`.
//!
//! ### `INFERD_WHISPER_MODEL`
//!
//! Path to a whisper GGML model file. Required for both speech backends; the
//! capability probe reports transcription as unavailable when the file is
//! absent.
//!
//! ### `INFERD_WHISPER_CLI`
//!
//! Path to a `whisper-cli` executable, overriding the `PATH` lookup used by
//! the subprocess fallback backend.

use std::env;
use std::path::PathBuf;

/// Default coroutine stack size in bytes (64 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
///
/// Load this once at startup with [`RuntimeConfig::from_env()`] and pass it
/// into the service constructors.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes.
    pub stack_size: usize,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Speech model tier (construction-time parameter, immutable afterwards).
    pub whisper_size: String,
    /// Path to a whisper GGML model file, if configured.
    pub whisper_model: Option<PathBuf>,
    /// Explicit path to a `whisper-cli` binary, if configured.
    pub whisper_cli: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let stack_size = match env::var("INFERD_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(DEFAULT_STACK_SIZE)
                } else {
                    val.parse().unwrap_or(DEFAULT_STACK_SIZE)
                }
            }
            Err(_) => DEFAULT_STACK_SIZE,
        };
        RuntimeConfig {
            stack_size,
            embedding_model: env::var("INFERD_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string()),
            whisper_size: env::var("INFERD_WHISPER_SIZE").unwrap_or_else(|_| "base".to_string()),
            whisper_model: env::var_os("INFERD_WHISPER_MODEL").map(PathBuf::from),
            whisper_cli: env::var_os("INFERD_WHISPER_CLI").map(PathBuf::from),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            whisper_size: "base".to_string(),
            whisper_model: None,
            whisper_cli: None,
        }
    }
}
