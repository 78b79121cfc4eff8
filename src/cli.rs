//! Command-line interface for the `inferd` binary.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use crate::config::RuntimeConfig;
use crate::memory::MemorySampler;
use crate::server::{AppService, HttpServer};
use crate::service::{EmbeddingService, TranscriptionService};

#[derive(Parser)]
#[command(name = "inferd")]
#[command(about = "Local embedding and transcription server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long, default_value = "0.0.0.0:9876")]
        addr: String,

        /// Skip the eager model warm-up at startup
        #[arg(long, default_value_t = false)]
        no_warmup: bool,
    },
}

pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { addr, no_warmup } => serve(&addr, !no_warmup),
    }
}

/// Construct the process-lifetime services, optionally warm them up, and run
/// the server until a shutdown signal arrives.
pub fn serve(addr: &str, warmup: bool) -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env();
    may::config().set_stack_size(config.stack_size);

    let embedding = Arc::new(EmbeddingService::from_config(&config));
    let transcription = Arc::new(TranscriptionService::from_config(&config));
    let memory = Arc::new(MemorySampler::new());

    if warmup {
        // Warm-up failures are logged, not fatal: a failed load is terminal
        // for that service and surfaces on first use.
        if embedding.is_available() {
            if let Err(e) = embedding.ensure_ready() {
                error!(error = %e, "embedding model warm-up failed");
            }
        }
        if transcription.is_available() {
            if let Err(e) = transcription.ensure_ready() {
                error!(error = %e, "transcription model warm-up failed");
            }
        }
    }

    let service = AppService::new(embedding, transcription.clone(), memory.clone());
    let handle = HttpServer(service).start(addr)?;
    handle.wait_ready()?;

    let initial = memory.sample();
    info!(addr, "inferd listening");
    info!("  GET  /health        - health check");
    info!("  POST /embed_single  - single text embedding");
    info!("  POST /embed         - batch text embeddings");
    info!("  POST /transcribe    - audio transcription (multipart field 'audio')");
    if !transcription.is_available() {
        warn!("transcription backend unavailable; /transcribe will return 503");
    }
    info!(process_memory_mb = initial.process_mb(), "initial memory usage");

    wait_for_shutdown(handle)?;

    let final_mem = memory.sample();
    info!(process_memory_mb = final_mem.process_mb(), "final memory usage");
    info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server coroutine panicked"))
}
