//! # inferd
//!
//! **inferd** is a small local inference server exposing text embedding and
//! audio transcription over HTTP, built on the `may` coroutine runtime and
//! `may_minihttp`.
//!
//! ## Overview
//!
//! Models are loaded lazily on first use and held for the lifetime of the
//! process. Concurrent first requests are collapsed into a single load, and a
//! load failure is terminal: subsequent requests are answered with `503`
//! rather than retried. The health endpoint reports readiness without ever
//! blocking on a load in progress.
//!
//! ## Architecture
//!
//! - **[`server`]** - HTTP service built on `may_minihttp`: request parsing,
//!   static route matching, JSON response and error serialization
//! - **[`service`]** - model lifecycle (single-flight lazy load) and the
//!   embedding/transcription services built on top of it
//! - **[`multipart`]** - lenient `multipart/form-data` parser for file uploads
//! - **[`memory`]** - process and system memory sampling for per-request
//!   usage reporting
//! - **[`config`]** - environment-driven runtime configuration
//! - **[`error`]** - the service error taxonomy and its HTTP status mapping
//!
//! ## Endpoints
//!
//! | Method | Path            | Purpose                          |
//! |--------|-----------------|----------------------------------|
//! | GET    | `/health`       | readiness and memory report      |
//! | POST   | `/embed`        | batch text embedding             |
//! | POST   | `/embed_single` | single text embedding            |
//! | POST   | `/transcribe`   | multipart audio transcription    |
//!
//! Transcription and embedding backends are feature-gated (`fastembed`,
//! `whisper`); a build without them still serves every route, reporting the
//! missing capability through `/health` and `503` responses.

pub mod cli;
pub mod config;
pub mod error;
pub mod memory;
pub mod multipart;
pub mod server;
pub mod service;

pub use config::RuntimeConfig;
pub use error::ServiceError;
pub use memory::{MemorySampler, MemorySnapshot};
pub use server::{AppService, HttpServer, ServerHandle};
pub use service::{EmbeddingService, TranscriptionService};
