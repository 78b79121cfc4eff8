//! Route handlers: validation, body decoding, service invocation, and
//! response payload assembly.
//!
//! Each handler returns `Result<Value, ServiceError>`; the routing layer maps
//! errors to status codes and serializes both arms, so nothing here touches
//! the socket.

use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::request::ParsedRequest;
use super::service::AppService;
use crate::error::ServiceError;
use crate::memory::MemorySnapshot;
use crate::multipart;

/// `memory` object reported alongside every model operation.
fn memory_json(before: &MemorySnapshot, after: &MemorySnapshot) -> Value {
    json!({
        "process_memory_mb": after.process_mb(),
        "memory_delta_mb": after.delta_mb(before),
        "system_memory_percent": crate::memory::round2(after.system_percent),
    })
}

fn require_content_length(req: &ParsedRequest) -> Result<usize, ServiceError> {
    req.content_length.ok_or_else(|| {
        ServiceError::MalformedRequest("Content-Length header required".to_string())
    })
}

fn decode_json<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(body)
        .map_err(|e| ServiceError::MalformedRequest(format!("Invalid JSON body: {e}")))
}

/// `GET /health` — aggregate readiness and a current memory snapshot.
///
/// Reports state without forcing a model load and never blocks on a load in
/// progress.
pub fn health(svc: &AppService, _req: &ParsedRequest) -> Result<Value, ServiceError> {
    let info = svc.embedding.describe();
    let mem = svc.memory.sample();
    Ok(json!({
        "status": "healthy",
        "model": info.identifier,
        "dimensions": info.dimension,
        "transcription_available": svc.transcription.is_available(),
        "memory": {
            "process_memory_mb": mem.process_mb(),
            "system_memory_percent": crate::memory::round2(mem.system_percent),
        },
    }))
}

#[derive(Deserialize)]
struct EmbedBatchBody {
    #[serde(default)]
    texts: Vec<String>,
}

/// `POST /embed` — batch embeddings.
pub fn embed_batch(svc: &AppService, req: &ParsedRequest) -> Result<Value, ServiceError> {
    require_content_length(req)?;
    let payload: EmbedBatchBody = decode_json(&req.body)?;

    let before = svc.memory.sample();
    let embeddings = svc.embedding.encode_batch(&payload.texts, true)?;
    let after = svc.memory.sample();

    info!(count = embeddings.len(), "Generated embeddings");
    Ok(json!({
        "embeddings": embeddings,
        "dimensions": embeddings.first().map_or(0, Vec::len),
        "count": embeddings.len(),
        "memory": memory_json(&before, &after),
    }))
}

#[derive(Deserialize)]
struct EmbedSingleBody {
    #[serde(default)]
    text: String,
}

/// `POST /embed_single` — one embedding.
pub fn embed_single(svc: &AppService, req: &ParsedRequest) -> Result<Value, ServiceError> {
    require_content_length(req)?;
    let payload: EmbedSingleBody = decode_json(&req.body)?;

    let before = svc.memory.sample();
    let embedding = svc.embedding.encode_single(&payload.text, true)?;
    let after = svc.memory.sample();

    info!("Generated embedding");
    Ok(json!({
        "embedding": embedding,
        "dimensions": embedding.len(),
        "memory": memory_json(&before, &after),
    }))
}

/// `POST /transcribe` — multipart upload of an `audio` file.
///
/// The uploaded bytes are staged in a named temp file scoped to this call;
/// the file is removed on every exit path when the handle drops.
pub fn transcribe(svc: &AppService, req: &ParsedRequest) -> Result<Value, ServiceError> {
    if !svc.transcription.is_available() {
        return Err(ServiceError::ServiceUnavailable(
            "No transcription backend available".to_string(),
        ));
    }

    let content_type = req.header("content-type").unwrap_or("");
    if !content_type.starts_with("multipart/form-data") {
        return Err(ServiceError::MalformedRequest(
            "Content-Type must be multipart/form-data".to_string(),
        ));
    }
    let content_length = require_content_length(req)?;
    if content_length == 0 {
        return Err(ServiceError::MalformedRequest(
            "No content provided".to_string(),
        ));
    }

    let form = multipart::parse_form(&req.body, content_type)?;
    let field = form.get("audio").ok_or_else(|| {
        ServiceError::InvalidInput("No 'audio' file provided in form data".to_string())
    })?;
    let filename = field
        .filename
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("No file uploaded".to_string()))?;

    let suffix = Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut staged = tempfile::Builder::new()
        .prefix("inferd-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| {
            ServiceError::TranscriptionFailed(format!("could not stage upload: {e}"))
        })?;
    staged
        .write_all(&field.data)
        .and_then(|_| staged.flush())
        .map_err(|e| ServiceError::TranscriptionFailed(format!("could not stage upload: {e}")))?;

    info!(filename, bytes = field.data.len(), "Processing audio upload");
    let before = svc.memory.sample();
    let transcription = svc.transcription.transcribe(staged.path(), "en")?;
    let after = svc.memory.sample();

    info!(chars = transcription.len(), "Transcription complete");
    Ok(json!({
        "transcription": transcription,
        "filename": filename,
        "memory": memory_json(&before, &after),
    }))
}
