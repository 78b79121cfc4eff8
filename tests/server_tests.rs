//! End-to-end tests for the JSON endpoints over a live server.
//!
//! Each test starts the full service on a random port with mock backends and
//! speaks HTTP/1.1 over a raw `TcpStream`, so request parsing, routing, and
//! the error-mapping boundary are all exercised for real.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use inferd::service::TranscriptionService;

mod common;
use common::{fixed_embedding_service, get, post_json, scripted_speech_service, start_service};

#[test]
fn test_health_reports_model_and_availability() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(4, loads.clone()),
        TranscriptionService::with_loader("base", None),
    );

    let (status, body) = get(&addr, "/health");
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "all-MiniLM-L6-v2");
    assert_eq!(body["transcription_available"], false);
    // Health never forces a model load, so dimensions are unknown here.
    assert!(body["dimensions"].is_null());
    assert!(body["memory"]["process_memory_mb"].is_number());
    assert!(body["memory"]["system_memory_percent"].is_number());
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    handle.stop();
}

#[test]
fn test_health_reports_dimensions_after_load() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(4, loads),
        TranscriptionService::with_loader("base", None),
    );

    let (status, _) = post_json(&addr, "/embed_single", r#"{"text": "warm up"}"#);
    assert_eq!(status, 200);

    let (status, body) = get(&addr, "/health");
    assert_eq!(status, 200);
    assert_eq!(body["dimensions"], 4);

    handle.stop();
}

#[test]
fn test_unknown_route_returns_404() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(4, loads),
        TranscriptionService::with_loader("base", None),
    );

    let (status, body) = get(&addr, "/does/not/exist");
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Endpoint not found");

    // Known path, wrong method.
    let (status, body) = post_json(&addr, "/health", "{}");
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Endpoint not found");

    handle.stop();
}

#[test]
fn test_embed_batch_returns_vectors_and_memory() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(3, loads),
        TranscriptionService::with_loader("base", None),
    );

    let (status, body) = post_json(&addr, "/embed", r#"{"texts": ["one", "two"]}"#);
    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);
    assert_eq!(body["dimensions"], 3);
    assert_eq!(body["embeddings"].as_array().unwrap().len(), 2);
    assert_eq!(body["embeddings"][0].as_array().unwrap().len(), 3);
    assert!(body["memory"]["process_memory_mb"].is_number());
    assert!(body["memory"]["memory_delta_mb"].is_number());
    assert!(body["memory"]["system_memory_percent"].is_number());

    handle.stop();
}

#[test]
fn test_embed_batch_rejects_empty_texts() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(3, loads.clone()),
        TranscriptionService::with_loader("base", None),
    );

    let (status, body) = post_json(&addr, "/embed", r#"{"texts": []}"#);
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No texts provided");

    // Missing field decodes to the empty default and is rejected the same way.
    let (status, body) = post_json(&addr, "/embed", "{}");
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No texts provided");

    // Validation happens before the model is touched.
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    handle.stop();
}

#[test]
fn test_embed_single_returns_one_vector() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(5, loads),
        TranscriptionService::with_loader("base", None),
    );

    let (status, body) = post_json(&addr, "/embed_single", r#"{"text": "hello"}"#);
    assert_eq!(status, 200);
    assert_eq!(body["dimensions"], 5);
    assert_eq!(body["embedding"].as_array().unwrap().len(), 5);

    handle.stop();
}

#[test]
fn test_embed_single_rejects_empty_text() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(5, loads),
        TranscriptionService::with_loader("base", None),
    );

    let (status, body) = post_json(&addr, "/embed_single", r#"{"text": ""}"#);
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No text provided");

    let (status, body) = post_json(&addr, "/embed_single", "{}");
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No text provided");

    handle.stop();
}

#[test]
fn test_malformed_json_body_returns_400() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(3, loads),
        TranscriptionService::with_loader("base", None),
    );

    let (status, body) = post_json(&addr, "/embed", "{not json");
    assert_eq!(status, 400);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.starts_with("Invalid JSON body"), "got: {msg}");

    handle.stop();
}

#[test]
fn test_embedding_unavailable_returns_503() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (handle, addr) = start_service(
        inferd::service::EmbeddingService::with_loader("none", None),
        scripted_speech_service(vec!["hi"], seen, None),
    );

    let (status, body) = post_json(&addr, "/embed", r#"{"texts": ["x"]}"#);
    assert_eq!(status, 503);
    assert_eq!(body["error"], "No embedding backend available");

    handle.stop();
}

#[test]
fn test_failed_load_is_terminal_across_requests() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in_loader = attempts.clone();
    let embedding = inferd::service::EmbeddingService::with_loader(
        "broken",
        Some(Box::new(move || {
            attempts_in_loader.fetch_add(1, Ordering::SeqCst);
            Err(inferd::error::ServiceError::ServiceUnavailable(
                "model file corrupt".to_string(),
            ))
        })),
    );
    let (handle, addr) = start_service(embedding, TranscriptionService::with_loader("base", None));

    let (status, body) = post_json(&addr, "/embed_single", r#"{"text": "x"}"#);
    assert_eq!(status, 503);
    assert_eq!(body["error"], "model file corrupt");

    // Same failure, no second load attempt.
    let (status, body) = post_json(&addr, "/embed_single", r#"{"text": "x"}"#);
    assert_eq!(status, 503);
    assert_eq!(body["error"], "model file corrupt");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    // The process stays up and health keeps answering.
    let (status, _) = get(&addr, "/health");
    assert_eq!(status, 200);

    handle.stop();
}

#[test]
fn test_concurrent_embed_requests_load_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let (handle, addr) = start_service(
        fixed_embedding_service(3, loads.clone()),
        TranscriptionService::with_loader("base", None),
    );

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let addr = addr;
            std::thread::spawn(move || post_json(&addr, "/embed_single", r#"{"text": "go"}"#))
        })
        .collect();
    for t in threads {
        let (status, body) = t.join().unwrap();
        assert_eq!(status, 200);
        assert_eq!(body["dimensions"], 3);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    handle.stop();
}
