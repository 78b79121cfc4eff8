//! Process and system memory sampling.
//!
//! Handlers sample once immediately before and once immediately after a model
//! operation and report the delta next to the absolute post-operation value.
//! When the OS facility cannot be read the sampler degrades to an all-zero
//! snapshot — callers treat that as "unknown", never as zero usage, and never
//! fail on it.

use sysinfo::{ProcessesToUpdate, System};

const MB: f64 = 1024.0 * 1024.0;

/// Round to two decimals, matching the wire format of the `memory` object.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Immutable memory snapshot, produced fresh on each [`MemorySampler::sample`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemorySnapshot {
    /// Resident set size of this process in bytes.
    pub process_bytes: u64,
    /// System memory in use, in bytes.
    pub system_used_bytes: u64,
    /// Total system memory in bytes.
    pub system_total_bytes: u64,
    /// System memory usage percentage.
    pub system_percent: f64,
}

impl MemorySnapshot {
    /// Process memory in MB, rounded to two decimals.
    pub fn process_mb(&self) -> f64 {
        round2(self.process_bytes as f64 / MB)
    }

    /// Signed process-memory delta against an earlier snapshot, in MB.
    pub fn delta_mb(&self, before: &MemorySnapshot) -> f64 {
        round2((self.process_bytes as f64 - before.process_bytes as f64) / MB)
    }

    /// True when the OS facility was unavailable and every field is zero.
    pub fn is_unknown(&self) -> bool {
        *self == MemorySnapshot::default()
    }
}

/// Samples process and system memory via `sysinfo`.
///
/// Stateless by design: each call refreshes a fresh [`System`] so snapshots
/// never observe stale readings from a previous request.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemorySampler;

impl MemorySampler {
    pub fn new() -> Self {
        MemorySampler
    }

    /// Take a snapshot of current process and system memory.
    pub fn sample(&self) -> MemorySnapshot {
        let Ok(pid) = sysinfo::get_current_pid() else {
            return MemorySnapshot::default();
        };

        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let total = sys.total_memory();
        let Some(process) = sys.process(pid) else {
            return MemorySnapshot::default();
        };
        if total == 0 {
            return MemorySnapshot::default();
        }

        let used = sys.used_memory();
        MemorySnapshot {
            process_bytes: process.memory(),
            system_used_bytes: used,
            system_total_bytes: total,
            system_percent: used as f64 / total as f64 * 100.0,
        }
    }
}
