//! Collector telemetry and heap analysis.
//!
//! Allocation and survival counters are bucketed by [`ObjectKind`]; every
//! completed collection appends one [`CycleRecord`].

use std::fmt::{self, Write as _};
use std::time::{Duration, Instant};

use serde::Serialize;

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// The four composite kinds that live in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    List = 0,
    Map = 1,
    Closure = 2,
    Environment = 3,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::List,
        ObjectKind::Map,
        ObjectKind::Closure,
        ObjectKind::Environment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::List => "List",
            ObjectKind::Map => "Map",
            ObjectKind::Closure => "Closure",
            ObjectKind::Environment => "Environment",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Running totals for one kind.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct KindCounters {
    pub allocated: usize,
    pub allocated_bytes: usize,
    /// Objects of this kind found marked, summed over every collection.
    pub survived: usize,
    pub survived_bytes: usize,
}

/// One completed collection.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub index: usize,
    pub elapsed: Duration,
    pub live_before: usize,
    pub live_after: usize,
    pub collected: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub roots: usize,
    pub peak_worklist: usize,
    pub threshold_before: usize,
    pub threshold_after: usize,
}

// ---------------------------------------------------------------------------
// Heap snapshot
// ---------------------------------------------------------------------------

/// Live count and byte estimate for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindBreakdown {
    pub kind: ObjectKind,
    pub count: usize,
    pub bytes: usize,
}

/// Point-in-time summary of registry state.
#[derive(Debug, Clone, Serialize)]
pub struct HeapSnapshot {
    /// Registry slots ever created.
    pub capacity: usize,
    pub live_count: usize,
    pub free_list_len: usize,
    /// Slots whose object died but which have not been reaped by a collection.
    pub pending_reap: usize,
    pub total_live_bytes: usize,
    pub kind_breakdown: Vec<KindBreakdown>,
}

impl fmt::Display for HeapSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== registry ==")?;
        writeln!(
            f,
            "slots {} | live {} | free {} | unreaped {} | {} bytes",
            self.capacity,
            self.live_count,
            self.free_list_len,
            self.pending_reap,
            self.total_live_bytes
        )?;
        for row in &self.kind_breakdown {
            writeln!(f, "  {:<12}{:>8}{:>12}", row.kind, row.count, row.bytes)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GcTelemetry
// ---------------------------------------------------------------------------

/// In-progress cycle bookkeeping, present between `begin_cycle` and
/// `end_cycle`.
#[derive(Debug)]
struct OpenCycle {
    started: Instant,
    threshold: usize,
    bytes: usize,
    roots: usize,
    peak_worklist: usize,
}

#[derive(Debug, Default)]
pub struct GcTelemetry {
    counters: [KindCounters; 4],
    history: Vec<CycleRecord>,
    open: Option<OpenCycle>,
}

impl GcTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_alloc(&mut self, kind: ObjectKind, bytes: usize) {
        let counters = &mut self.counters[kind as usize];
        counters.allocated += 1;
        counters.allocated_bytes += bytes;
    }

    pub fn record_survival(&mut self, kind: ObjectKind, bytes: usize) {
        let counters = &mut self.counters[kind as usize];
        counters.survived += 1;
        counters.survived_bytes += bytes;
    }

    pub fn begin_cycle(&mut self, threshold: usize, bytes_before: usize) {
        self.open = Some(OpenCycle {
            started: Instant::now(),
            threshold,
            bytes: bytes_before,
            roots: 0,
            peak_worklist: 0,
        });
    }

    pub fn set_roots_scanned(&mut self, roots: usize) {
        if let Some(open) = self.open.as_mut() {
            open.roots = roots;
        }
    }

    pub fn update_peak_mark_stack(&mut self, depth: usize) {
        if let Some(open) = self.open.as_mut() {
            open.peak_worklist = open.peak_worklist.max(depth);
        }
    }

    /// Forgets the in-progress cycle without recording it.
    pub fn abandon_cycle(&mut self) {
        self.open = None;
    }

    pub fn end_cycle(
        &mut self,
        live_before: usize,
        live_after: usize,
        bytes_after: usize,
        threshold_after: usize,
    ) {
        let Some(open) = self.open.take() else {
            return;
        };
        self.history.push(CycleRecord {
            index: self.history.len(),
            elapsed: open.started.elapsed(),
            live_before,
            live_after,
            collected: live_before.saturating_sub(live_after),
            bytes_before: open.bytes,
            bytes_after,
            roots: open.roots,
            peak_worklist: open.peak_worklist,
            threshold_before: open.threshold,
            threshold_after,
        });
    }

    pub fn counters(&self, kind: ObjectKind) -> KindCounters {
        self.counters[kind as usize]
    }

    pub fn history(&self) -> &[CycleRecord] {
        &self.history
    }

    pub fn allocations(&self) -> usize {
        self.counters.iter().map(|c| c.allocated).sum()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.counters.iter().map(|c| c.allocated_bytes).sum()
    }

    /// Per-kind allocation and survival table.
    pub fn report_allocation_stats(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== allocations ==");
        let _ = writeln!(out, "  {:<12}{:>8}{:>10}", "kind", "allocs", "survived");
        for kind in ObjectKind::ALL {
            let c = self.counters(kind);
            let _ = writeln!(out, "  {:<12}{:>8}{:>10}", kind, c.allocated, c.survived);
        }
        let _ = writeln!(
            out,
            "  {:<12}{:>8}  ({} bytes)",
            "total",
            self.allocations(),
            self.allocated_bytes()
        );
        out
    }

    /// One line per completed collection.
    pub fn report_cycles(&self) -> String {
        let mut out = String::from("== collections ==\n");
        if self.history.is_empty() {
            out.push_str("  none\n");
            return out;
        }
        for c in &self.history {
            let _ = writeln!(
                out,
                "  #{} {}us live {} -> {} roots {} threshold {} -> {}",
                c.index,
                c.elapsed.as_micros(),
                c.live_before,
                c.live_after,
                c.roots,
                c.threshold_before,
                c.threshold_after
            );
        }
        out
    }

    pub fn report_full(&self, snapshot: &HeapSnapshot) -> String {
        let mut out = self.report_allocation_stats();
        out.push_str(&self.report_cycles());
        let _ = write!(out, "{}", snapshot);
        out
    }
}
