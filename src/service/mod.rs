//! Model services: lazily-initialized, expensive model handles shared across
//! concurrent requests.
//!
//! Both services own a [`ModelSlot`], the single-flight lazy-load state
//! machine mandated for the `Unloaded → Loading → Ready` transition: the
//! first caller performs the (potentially multi-second) acquisition while
//! holding the slot mutex, concurrent callers block on the same mutex and
//! then observe `Ready` or the recorded failure. A load failure is terminal
//! for the process lifetime — it is reported on every subsequent call, never
//! retried.
//!
//! Inference itself also runs under the slot mutex. Neither a whisper.cpp
//! context nor a subprocess runner is assumed reentrant, so inference is
//! serialized per service; for a single-machine, low-traffic server one lock
//! keeps the state machine and the single-flight guard in one place.

pub mod backend;
pub mod embedding;
pub mod transcription;

pub use embedding::{EmbeddingService, ModelInfo};
pub use transcription::TranscriptionService;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use crate::error::ServiceError;

/// Observable lifecycle phase of a model slot.
///
/// Readable without touching the slot mutex, so `/health` never blocks on a
/// load in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

enum SlotState<B> {
    Unloaded,
    Ready(B),
    Failed(String),
}

/// Lazily-loaded model handle with a single-flight acquisition guard.
pub(crate) struct ModelSlot<B> {
    state: Mutex<SlotState<B>>,
    phase: AtomicU8,
}

impl<B> ModelSlot<B> {
    pub fn new() -> Self {
        ModelSlot {
            state: Mutex::new(SlotState::Unloaded),
            phase: AtomicU8::new(LoadPhase::Unloaded as u8),
        }
    }

    /// Current phase, without blocking.
    pub fn phase(&self) -> LoadPhase {
        match self.phase.load(Ordering::Acquire) {
            x if x == LoadPhase::Loading as u8 => LoadPhase::Loading,
            x if x == LoadPhase::Ready as u8 => LoadPhase::Ready,
            x if x == LoadPhase::Failed as u8 => LoadPhase::Failed,
            _ => LoadPhase::Unloaded,
        }
    }

    fn set_phase(&self, phase: LoadPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Run `op` against the loaded backend, acquiring it first if needed.
    ///
    /// The mutex is held across both the acquisition and `op`, which gives
    /// exactly-one-load semantics under concurrent first requests and
    /// serialized inference afterwards.
    pub fn with_backend<T>(
        &self,
        load: impl FnOnce() -> Result<B, ServiceError>,
        op: impl FnOnce(&mut B) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut guard = self.state.lock().unwrap();

        if matches!(*guard, SlotState::Unloaded) {
            self.set_phase(LoadPhase::Loading);
            *guard = match load() {
                Ok(backend) => {
                    self.set_phase(LoadPhase::Ready);
                    SlotState::Ready(backend)
                }
                Err(err) => {
                    self.set_phase(LoadPhase::Failed);
                    SlotState::Failed(err.to_string())
                }
            };
        }

        match &mut *guard {
            SlotState::Ready(backend) => op(backend),
            SlotState::Failed(reason) => Err(ServiceError::ServiceUnavailable(reason.clone())),
            SlotState::Unloaded => unreachable!("slot loaded above"),
        }
    }

    /// Idempotent load-to-ready transition.
    pub fn ensure_ready(
        &self,
        load: impl FnOnce() -> Result<B, ServiceError>,
    ) -> Result<(), ServiceError> {
        self.with_backend(load, |_| Ok(()))
    }

    /// Drop the backend and return to `Unloaded`. No-op when never loaded.
    ///
    /// A prior terminal failure is kept: the probe-once design does not allow
    /// unload to re-arm a failed acquisition.
    pub fn unload(&self) {
        let mut guard = self.state.lock().unwrap();
        if matches!(*guard, SlotState::Ready(_)) {
            *guard = SlotState::Unloaded;
            self.set_phase(LoadPhase::Unloaded);
        }
    }
}
