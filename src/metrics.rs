use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Run-wide counters, in the style of the teacher's atomics-based
/// `Metrics`. Single-threaded here, but `Arc<AtomicU64>` is kept so a
/// snapshot can be handed out without borrowing the orchestrator.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub slices_processed: Arc<AtomicU64>,
    pub objects_written: Arc<AtomicU64>,
    pub writes_rejected: Arc<AtomicU64>,
    pub reads_enqueued: Arc<AtomicU64>,
    pub reads_completed: Arc<AtomicU64>,
    pub reads_aborted_by_delete: Arc<AtomicU64>,
    pub head_jumps: Arc<AtomicU64>,
    pub head_passes: Arc<AtomicU64>,
    pub head_reads: Arc<AtomicU64>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            slices_processed: Arc::new(AtomicU64::new(0)),
            objects_written: Arc::new(AtomicU64::new(0)),
            writes_rejected: Arc::new(AtomicU64::new(0)),
            reads_enqueued: Arc::new(AtomicU64::new(0)),
            reads_completed: Arc::new(AtomicU64::new(0)),
            reads_aborted_by_delete: Arc::new(AtomicU64::new(0)),
            head_jumps: Arc::new(AtomicU64::new(0)),
            head_passes: Arc::new(AtomicU64::new(0)),
            head_reads: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_slice(&self) {
        self.slices_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self, accepted: bool) {
        if accepted {
            self.objects_written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.writes_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_read_enqueued(&self) {
        self.reads_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_completed(&self) {
        self.reads_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_aborted(&self) {
        self.reads_aborted_by_delete.fetch_add(1, Ordering::Relaxed);
    }

    /// Tally one disk's emitted action line against the jump/pass/read
    /// counters, for a coarse sense of head-motion mix across a run.
    pub fn record_action_line(&self, line: &str) {
        if let Some(rest) = line.strip_prefix("j ") {
            let _ = rest;
            self.head_jumps.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let passes = line.chars().filter(|&c| c == 'p').count() as u64;
        let reads = line.chars().filter(|&c| c == 'r').count() as u64;
        self.head_passes.fetch_add(passes, Ordering::Relaxed);
        self.head_reads.fetch_add(reads, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            slices_processed: self.slices_processed.load(Ordering::Relaxed),
            objects_written: self.objects_written.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            reads_enqueued: self.reads_enqueued.load(Ordering::Relaxed),
            reads_completed: self.reads_completed.load(Ordering::Relaxed),
            reads_aborted_by_delete: self.reads_aborted_by_delete.load(Ordering::Relaxed),
            head_jumps: self.head_jumps.load(Ordering::Relaxed),
            head_passes: self.head_passes.load(Ordering::Relaxed),
            head_reads: self.head_reads.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of metrics, cheap to log or print at exit.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub slices_processed: u64,
    pub objects_written: u64,
    pub writes_rejected: u64,
    pub reads_enqueued: u64,
    pub reads_completed: u64,
    pub reads_aborted_by_delete: u64,
    pub head_jumps: u64,
    pub head_passes: u64,
    pub head_reads: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Run summary:\n  slices:    {}\n  writes:    {} ok, {} rejected\n  reads:     {} enqueued, {} completed, {} aborted\n  head ops:  {} jumps, {} passes, {} reads\n",
            self.slices_processed,
            self.objects_written,
            self.writes_rejected,
            self.reads_enqueued,
            self.reads_completed,
            self.reads_aborted_by_delete,
            self.head_jumps,
            self.head_passes,
            self.head_reads,
        )
    }
}
