#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use inferd::error::ServiceError;
use inferd::memory::MemorySampler;
use inferd::server::{AppService, HttpServer, ServerHandle};
use inferd::service::backend::{
    EmbeddingBackend, SpeechBackend, SpeechBackendKind, SpeechLoader, TranscriptSegment,
};
use inferd::service::{EmbeddingService, TranscriptionService};

/// Ensures May coroutines are configured only once per test binary.
static MAY_INIT: Once = Once::new();

pub fn setup_may_runtime() {
    MAY_INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
    });
}

/// Embedding engine producing fixed-value vectors, for exercising the HTTP
/// layer without a real model.
pub struct FixedEmbedding {
    pub dimension: usize,
}

impl EmbeddingBackend for FixedEmbedding {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(
        &mut self,
        texts: &[String],
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, ServiceError> {
        let value = if normalize { 1.0 } else { 2.0 };
        Ok(texts.iter().map(|_| vec![value; self.dimension]).collect())
    }
}

/// Speech engine returning scripted segments and recording every path it was
/// handed, so tests can assert on upload staging and cleanup.
pub struct ScriptedSpeech {
    pub segments: Vec<String>,
    pub seen_paths: Arc<Mutex<Vec<PathBuf>>>,
    pub fail_with: Option<String>,
}

impl SpeechBackend for ScriptedSpeech {
    fn transcribe(
        &mut self,
        path: &Path,
        _language: &str,
    ) -> Result<Vec<TranscriptSegment>, ServiceError> {
        self.seen_paths.lock().unwrap().push(path.to_path_buf());
        if let Some(msg) = &self.fail_with {
            return Err(ServiceError::TranscriptionFailed(msg.clone()));
        }
        Ok(self
            .segments
            .iter()
            .map(|s| TranscriptSegment { text: s.clone() })
            .collect())
    }
}

pub fn fixed_embedding_service(dimension: usize, loads: Arc<AtomicUsize>) -> EmbeddingService {
    EmbeddingService::with_loader(
        "all-MiniLM-L6-v2",
        Some(Box::new(move || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FixedEmbedding { dimension }) as Box<dyn EmbeddingBackend>)
        })),
    )
}

pub fn scripted_speech_service(
    segments: Vec<&str>,
    seen_paths: Arc<Mutex<Vec<PathBuf>>>,
    fail_with: Option<String>,
) -> TranscriptionService {
    let segments: Vec<String> = segments.into_iter().map(String::from).collect();
    let loader: SpeechLoader = Box::new(move || {
        Ok(Box::new(ScriptedSpeech {
            segments: segments.clone(),
            seen_paths: seen_paths.clone(),
            fail_with: fail_with.clone(),
        }) as Box<dyn SpeechBackend>)
    });
    TranscriptionService::with_loader("base", Some((SpeechBackendKind::WhisperCpp, loader)))
}

/// Start the full service on a random port and wait until it accepts
/// connections.
pub fn start_service(
    embedding: EmbeddingService,
    transcription: TranscriptionService,
) -> (ServerHandle, SocketAddr) {
    setup_may_runtime();
    let service = AppService::new(
        Arc::new(embedding),
        Arc::new(transcription),
        Arc::new(MemorySampler::new()),
    );
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let handle = HttpServer(service).start(addr).unwrap();
    handle.wait_ready().unwrap();
    (handle, addr)
}

pub fn send_request(addr: &SocketAddr, req: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut buf = Vec::new();
    loop {
        let mut tmp = [0u8; 1024];
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("read error: {:?}", e),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

pub fn parse_response(resp: &str) -> (u16, serde_json::Value) {
    let mut parts = resp.splitn(2, "\r\n\r\n");
    let headers = parts.next().unwrap_or("");
    let body = parts.next().unwrap_or("");
    let mut status = 0;
    for line in headers.lines() {
        if line.starts_with("HTTP/1.1") {
            status = line
                .split_whitespace()
                .nth(1)
                .unwrap_or("0")
                .parse()
                .unwrap();
        }
    }
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    (status, json)
}

/// Send a JSON POST and return the parsed status and body.
pub fn post_json(addr: &SocketAddr, path: &str, body: &str) -> (u16, serde_json::Value) {
    let req = format!(
        "POST {} HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body
    );
    let resp = send_request(addr, req.as_bytes());
    parse_response(&resp)
}

pub fn get(addr: &SocketAddr, path: &str) -> (u16, serde_json::Value) {
    let req = format!("GET {} HTTP/1.1\r\nHost: test\r\n\r\n", path);
    let resp = send_request(addr, req.as_bytes());
    parse_response(&resp)
}

/// Build a single-file `multipart/form-data` body with the given boundary.
pub fn multipart_body(boundary: &str, name: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Send a multipart POST to `/transcribe` and return the parsed response.
pub fn post_multipart(
    addr: &SocketAddr,
    boundary: &str,
    body: &[u8],
) -> (u16, serde_json::Value) {
    let mut req = format!(
        "POST /transcribe HTTP/1.1\r\nHost: test\r\nContent-Type: multipart/form-data; boundary={}\r\nContent-Length: {}\r\n\r\n",
        boundary,
        body.len()
    )
    .into_bytes();
    req.extend_from_slice(body);
    let resp = send_request(addr, &req);
    parse_response(&resp)
}
