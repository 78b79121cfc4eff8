//! The HTTP service: static routing table and the error-mapping boundary.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use may_minihttp::{HttpService, Request, Response};
use tracing::{info, warn};

use super::handlers;
use super::request::parse_request;
use super::response::{write_json_response, write_service_error};
use crate::error::ServiceError;
use crate::memory::MemorySampler;
use crate::service::{EmbeddingService, TranscriptionService};

/// Shared application state, injected once at construction — the services are
/// process-lifetime singletons by convention, never globals.
#[derive(Clone)]
pub struct AppService {
    pub embedding: Arc<EmbeddingService>,
    pub transcription: Arc<TranscriptionService>,
    pub memory: Arc<MemorySampler>,
}

impl AppService {
    pub fn new(
        embedding: Arc<EmbeddingService>,
        transcription: Arc<TranscriptionService>,
        memory: Arc<MemorySampler>,
    ) -> Self {
        AppService {
            embedding,
            transcription,
            memory,
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        let start = Instant::now();

        // Static routing table: method + exact path, no wildcards.
        let result = match (parsed.method.as_str(), parsed.path.as_str()) {
            ("GET", "/health") => handlers::health(self, &parsed),
            ("POST", "/embed") => handlers::embed_batch(self, &parsed),
            ("POST", "/embed_single") => handlers::embed_single(self, &parsed),
            ("POST", "/transcribe") => handlers::transcribe(self, &parsed),
            _ => Err(ServiceError::NotFound),
        };

        // Error-mapping boundary: every service fault becomes a structured
        // JSON response; nothing propagates far enough to drop the connection.
        match result {
            Ok(body) => {
                info!(
                    method = %parsed.method,
                    path = %parsed.path,
                    status = 200,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Request handled"
                );
                write_json_response(res, 200, &body);
            }
            Err(err) => {
                warn!(
                    method = %parsed.method,
                    path = %parsed.path,
                    status = err.status(),
                    error = %err,
                    "Request failed"
                );
                write_service_error(res, &err);
            }
        }
        Ok(())
    }
}
