use std::{mem::size_of, rc::Rc};

use log::{debug, error, trace, warn};

use crate::runtime::{
    closure::Closure,
    config::GcConfig,
    environment::{Binding, Environment},
    error::RuntimeError,
    gc::{
        ObjectId,
        heap_entry::HeapEntry,
        heap_object::{Graveyard, LiveObject, TrackedObject},
        mark_bits::MarkBits,
        root_set::RootSet,
        telemetry::{GcTelemetry, HeapSnapshot, KindBreakdown, ObjectKind},
    },
    handle::{Handle, WeakHandle, slot_size},
    leak_detector::{LeakStats, Ledger},
    value::{List, Map, Value},
};

/// Collector state. A pass always runs to completion before returning to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcPhase {
    Idle,
    Marking,
    Sweeping,
}

/// Outcome of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectStats {
    pub live_before: usize,
    pub live_after: usize,
    pub collected: usize,
    pub marked: usize,
    pub roots_scanned: usize,
    /// Registry slots returned to the free list by this pass.
    pub slots_recycled: usize,
}

/// Registry of every live composite value plus a stop-the-world mark-and-sweep
/// pass over it.
///
/// Reference counting reclaims acyclic garbage on its own; the pass exists for
/// cycles built through mutable collections. It marks from an explicit
/// [`RootSet`], then empties every unmarked object so that reference counting
/// can finish destroying it.
pub struct GcHeap {
    entries: Vec<HeapEntry>,
    free_list: Vec<u32>,
    /// Slots whose generation ran out; never handed out again.
    retired_slots: usize,
    ledger: Rc<Ledger>,
    config: GcConfig,
    allocation_count: usize,
    gc_threshold: usize,
    phase: GcPhase,
    total_collections: usize,
    total_allocations: usize,
    telemetry: GcTelemetry,
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl GcHeap {
    /// Creates a heap with [`GcConfig::default`] settings.
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    pub fn with_config(config: GcConfig) -> Self {
        let config = config.normalized();
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            retired_slots: 0,
            ledger: Rc::new(Ledger::default()),
            gc_threshold: config.allocation_threshold,
            config,
            allocation_count: 0,
            phase: GcPhase::Idle,
            total_collections: 0,
            total_allocations: 0,
            telemetry: GcTelemetry::new(),
        }
    }

    /// Creates a heap with a custom allocation threshold.
    ///
    /// Unlike [`Self::set_threshold`], this does not clamp to the minimum.
    pub fn with_threshold(threshold: usize) -> Self {
        let mut heap = Self::new();
        heap.gc_threshold = threshold.clamp(1, heap.config.max_threshold);
        heap
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled
    }

    /// Sets the allocation threshold, clamped into the configured bounds.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold.clamp(self.config.min_threshold, self.config.max_threshold)
    }

    pub fn threshold(&self) -> usize {
        self.gc_threshold
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    /// Returns `true` when collection is enabled and either trigger fired.
    pub fn should_collect(&self) -> bool {
        self.config.enabled
            && (self.allocation_count >= self.gc_threshold
                || self.registry_size() >= self.config.registry_threshold)
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    pub fn alloc_list(&mut self, items: List) -> Result<Handle<List>, RuntimeError> {
        let size = slot_size::<List>() + items.capacity() * size_of::<Value>();
        self.register(ObjectKind::List, size, items, TrackedObject::List)
    }

    pub fn alloc_map(&mut self, entries: Map) -> Result<Handle<Map>, RuntimeError> {
        let size =
            slot_size::<Map>() + entries.capacity() * (size_of::<Rc<str>>() + size_of::<Value>());
        self.register(ObjectKind::Map, size, entries, TrackedObject::Map)
    }

    pub fn alloc_closure(&mut self, closure: Closure) -> Result<Handle<Closure>, RuntimeError> {
        let size = slot_size::<Closure>();
        self.register(ObjectKind::Closure, size, closure, TrackedObject::Closure)
    }

    pub fn alloc_environment(
        &mut self,
        env: Environment,
    ) -> Result<Handle<Environment>, RuntimeError> {
        let size = slot_size::<Environment>() + env.len() * (size_of::<Rc<str>>() + size_of::<Binding>());
        self.register(ObjectKind::Environment, size, env, TrackedObject::Environment)
    }

    fn register<T>(
        &mut self,
        kind: ObjectKind,
        size: usize,
        state: T,
        track: fn(WeakHandle<T>) -> TrackedObject,
    ) -> Result<Handle<T>, RuntimeError> {
        let used = self.ledger.live_bytes();
        let limit = self.config.max_memory_bytes;
        if used.saturating_add(size) > limit {
            return Err(RuntimeError::OutOfMemory { used, limit });
        }

        let id = self.reserve_id()?;
        let handle = Handle::new(id, kind, size, Rc::clone(&self.ledger), state);
        self.entries[id.index() as usize].object = Some(track(handle.downgrade()));

        self.ledger.record_alloc(kind, size);
        self.telemetry.record_alloc(kind, size);
        self.allocation_count += 1;
        self.total_allocations += 1;
        trace!("alloc {} {} ({} bytes)", kind, id, size);
        Ok(handle)
    }

    fn reserve_id(&mut self) -> Result<ObjectId, RuntimeError> {
        if self.free_list.is_empty() && self.should_reap() {
            let recycled = self.reap();
            trace!("reaped {} dead slots outside collection", recycled);
        }
        if let Some(index) = self.free_list.pop() {
            let generation = self.entries[index as usize].generation;
            return Ok(ObjectId::new(index, generation));
        }

        let index = self.entries.len();
        if index as u64 >= self.capacity() {
            error!("object registry exhausted at {} identities", index);
            return Err(RuntimeError::RegistryExhausted {
                capacity: self.capacity(),
            });
        }
        self.entries.push(HeapEntry::vacant());
        Ok(ObjectId::new(index as u32, 0))
    }

    /// Slots still occupied by objects that reference counting already
    /// destroyed.
    fn dead_slots(&self) -> usize {
        self.entries
            .len()
            .saturating_sub(self.free_list.len())
            .saturating_sub(self.retired_slots)
            .saturating_sub(self.ledger.live_objects())
    }

    /// Reaps once dead slots make up half the registry, so the scan is
    /// amortized over the allocations that created them, or when the identity
    /// space is full.
    fn should_reap(&self) -> bool {
        let dead = self.dead_slots();
        dead > 0
            && (dead * 2 >= self.entries.len() || self.entries.len() as u64 >= self.capacity())
    }

    fn capacity(&self) -> u64 {
        u64::from(self.config.max_objects)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Number of registered objects that are still alive.
    pub fn registry_size(&self) -> usize {
        self.ledger.live_objects()
    }

    /// Returns `true` while the object with this identity is alive.
    pub fn is_registered(&self, id: ObjectId) -> bool {
        self.entries
            .get(id.index() as usize)
            .is_some_and(|entry| entry.generation == id.generation() && entry.is_live())
    }

    pub fn live_bytes(&self) -> usize {
        self.ledger.live_bytes()
    }

    pub fn leak_stats(&self) -> LeakStats {
        self.ledger.snapshot()
    }

    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    pub fn telemetry(&self) -> &GcTelemetry {
        &self.telemetry
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    /// Runs a full stop-the-world mark-and-sweep pass.
    ///
    /// Every object not reachable from `roots` through owning edges is emptied
    /// and destroyed, including objects kept alive only by cycles among
    /// themselves. Fails with `CollectorBusy`, without sweeping anything, if a
    /// reachable object's access token is held.
    pub fn collect(&mut self, roots: &RootSet) -> Result<CollectStats, RuntimeError> {
        debug_assert_eq!(self.phase, GcPhase::Idle);
        let live_before = self.registry_size();
        let threshold_before = self.gc_threshold;
        self.telemetry
            .begin_cycle(threshold_before, self.ledger.live_bytes());
        self.telemetry.set_roots_scanned(roots.len());

        self.set_phase(GcPhase::Marking);
        let marks = match self.mark(roots) {
            Ok(marks) => marks,
            Err(err) => {
                self.set_phase(GcPhase::Idle);
                self.telemetry.abandon_cycle();
                warn!("collection skipped: {}", err);
                return Err(err);
            }
        };

        self.set_phase(GcPhase::Sweeping);
        self.sweep(&marks);
        let slots_recycled = self.reap();
        self.set_phase(GcPhase::Idle);

        let live_after = self.registry_size();
        let collected = live_before.saturating_sub(live_after);
        self.total_collections += 1;
        self.allocation_count = 0;
        self.adapt_threshold(collected, live_before);
        self.telemetry.end_cycle(
            live_before,
            live_after,
            self.ledger.live_bytes(),
            self.gc_threshold,
        );
        debug!(
            "collection {}: {} -> {} live ({} collected, {} roots), threshold {} -> {}",
            self.total_collections,
            live_before,
            live_after,
            collected,
            roots.len(),
            threshold_before,
            self.gc_threshold
        );

        Ok(CollectStats {
            live_before,
            live_after,
            collected,
            marked: marks.count(),
            roots_scanned: roots.len(),
            slots_recycled,
        })
    }

    fn set_phase(&mut self, phase: GcPhase) {
        trace!("gc phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn mark(&mut self, roots: &RootSet) -> Result<MarkBits, RuntimeError> {
        let mut marks = MarkBits::with_slots(self.entries.len());
        let mut worklist: Vec<ObjectId> = roots.ids().to_vec();

        while let Some(id) = worklist.pop() {
            let slot = id.index() as usize;
            let Some(entry) = self.entries.get(slot) else {
                continue;
            };
            if entry.generation != id.generation() {
                continue;
            }
            let Some(object) = entry.object.as_ref() else {
                continue;
            };
            // Mark first so cycles and shared nodes are visited once.
            if !marks.set(slot) {
                continue;
            }
            object
                .trace(&mut worklist)
                .map_err(|_| RuntimeError::CollectorBusy { id })?;
            self.telemetry.update_peak_mark_stack(worklist.len());
        }

        Ok(marks)
    }

    fn sweep(&mut self, marks: &MarkBits) {
        let mut condemned: Vec<LiveObject> = Vec::new();
        for (slot, entry) in self.entries.iter().enumerate() {
            let Some(object) = entry.object.as_ref() else {
                continue;
            };
            let Some(live) = object.upgrade() else {
                continue;
            };
            if marks.get(slot) {
                self.telemetry.record_survival(object.kind(), live.size());
            } else {
                condemned.push(live);
            }
        }

        let mut graveyard = Graveyard::default();
        for live in &condemned {
            if let Err(err) = live.release(&mut graveyard) {
                warn!("{} survives this collection: {}", live.id(), err);
            }
        }
        trace!(
            "sweeping {} unreachable objects ({} owning edges released)",
            condemned.len(),
            graveyard.len()
        );
        // Contents go first; the condemned objects follow once nothing else
        // refers to them.
        drop(graveyard);
        drop(condemned);
    }

    /// Frees the slots of destroyed objects, bumping their generation.
    ///
    /// A slot whose generation is exhausted is retired instead of reused.
    fn reap(&mut self) -> usize {
        let mut recycled = 0;
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if !entry.is_dead() {
                continue;
            }
            entry.object = None;
            if entry.generation == u32::MAX {
                self.retired_slots += 1;
                continue;
            }
            entry.generation += 1;
            self.free_list.push(slot as u32);
            recycled += 1;
        }
        recycled
    }

    fn adapt_threshold(&mut self, collected: usize, total_before: usize) {
        if !self.config.adaptive || total_before == 0 {
            return;
        }

        let ratio = collected as f64 / total_before as f64;
        if ratio < 0.25 {
            self.gc_threshold = self
                .gc_threshold
                .saturating_mul(2)
                .min(self.config.max_threshold);
        } else if ratio > 0.75 {
            self.gc_threshold = (self.gc_threshold / 2).max(self.config.min_threshold)
        }
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> HeapSnapshot {
        let mut breakdown = ObjectKind::ALL.map(|kind| KindBreakdown {
            kind,
            count: 0,
            bytes: 0,
        });
        let mut pending_reap = 0;
        for entry in &self.entries {
            let Some(object) = entry.object.as_ref() else {
                continue;
            };
            match object.upgrade() {
                Some(live) => {
                    let row = &mut breakdown[object.kind() as usize];
                    row.count += 1;
                    row.bytes += live.size();
                }
                None => pending_reap += 1,
            }
        }

        HeapSnapshot {
            capacity: self.entries.len(),
            live_count: breakdown.iter().map(|row| row.count).sum(),
            free_list_len: self.free_list.len(),
            pending_reap,
            total_live_bytes: self.ledger.live_bytes(),
            kind_breakdown: breakdown.to_vec(),
        }
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    pub fn telemetry_report(&self) -> String {
        self.telemetry.report_full(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::runtime::{
        closure::Closure,
        compiled_function::CompiledFunction,
        config::{GcConfig, MIN_GC_THRESHOLD},
        environment::{Environment, ParentLink},
        error::RuntimeError,
        gc::{GcHeap, RootSet},
        value::{Map, Value},
    };

    fn self_cycle(heap: &mut GcHeap) -> Value {
        let list = heap.alloc_list(vec![Value::Number(1.0)]).unwrap();
        list.borrow_mut().unwrap().push(Value::List(list.clone()));
        Value::List(list)
    }

    #[test]
    fn test_alloc_registers_object() {
        let mut heap = GcHeap::new();
        let list = heap.alloc_list(vec![Value::Number(1.0)]).unwrap();
        assert_eq!(heap.registry_size(), 1);
        assert!(heap.is_registered(list.id()));
        assert_eq!(heap.total_allocations(), 1);
        drop(list);
        assert_eq!(heap.registry_size(), 0);
    }

    #[test]
    fn test_acyclic_garbage_needs_no_collection() {
        let mut heap = GcHeap::new();
        let inner = heap.alloc_list(vec![]).unwrap();
        let outer = heap.alloc_list(vec![Value::List(inner)]).unwrap();
        assert_eq!(heap.registry_size(), 2);
        drop(outer);
        assert_eq!(heap.registry_size(), 0);
        assert_eq!(heap.total_collections(), 0);
    }

    #[test]
    fn test_collect_frees_unreachable_cycle() {
        let mut heap = GcHeap::new();
        for _ in 0..100 {
            drop(self_cycle(&mut heap));
        }
        assert_eq!(heap.registry_size(), 100);

        let stats = heap.collect(&RootSet::new()).unwrap();
        assert_eq!(stats.collected, 100);
        assert_eq!(heap.registry_size(), 0);
        assert_eq!(stats.slots_recycled, 100);
    }

    #[test]
    fn test_collect_preserves_reachable() {
        let mut heap = GcHeap::new();
        let kept = self_cycle(&mut heap);
        for _ in 0..50 {
            drop(self_cycle(&mut heap));
        }
        assert_eq!(heap.registry_size(), 51);

        let mut roots = RootSet::new();
        roots.add_value(&kept);
        heap.collect(&roots).unwrap();
        assert_eq!(heap.registry_size(), 1);

        let Value::List(list) = &kept else {
            panic!("expected list")
        };
        assert_eq!(list.borrow().unwrap().len(), 2);
        list.borrow_mut().unwrap().clear();
    }

    #[test]
    fn test_collect_traces_nested_values() {
        let mut heap = GcHeap::new();
        let inner = self_cycle(&mut heap);
        let mut entries = Map::new();
        entries.insert("inner".into(), inner);
        let outer = heap.alloc_map(entries).unwrap();
        for _ in 0..10 {
            drop(self_cycle(&mut heap));
        }
        assert_eq!(heap.registry_size(), 12);

        let mut roots = RootSet::new();
        roots.add(&outer);
        let stats = heap.collect(&roots).unwrap();
        assert_eq!(heap.registry_size(), 2);
        assert_eq!(stats.marked, 2);

        outer.borrow_mut().unwrap().clear();
        assert_eq!(heap.registry_size(), 1);
        heap.collect(&RootSet::new()).unwrap();
        assert_eq!(heap.registry_size(), 0);
    }

    #[test]
    fn test_free_list_reuse_bumps_generation() {
        let mut heap = GcHeap::new();
        let first = self_cycle(&mut heap);
        let first_id = first.object_id().unwrap();
        drop(first);
        heap.collect(&RootSet::new()).unwrap();

        let second = heap.alloc_list(vec![]).unwrap();
        assert_eq!(second.id().index(), first_id.index());
        assert_eq!(second.id().generation(), first_id.generation() + 1);
        assert!(!heap.is_registered(first_id));
        assert!(heap.is_registered(second.id()));
    }

    #[test]
    fn test_reused_slot_never_aliases_a_dead_identity() {
        let mut heap = GcHeap::new();
        let first = heap.alloc_list(vec![]).unwrap();
        let first_id = first.id();
        let weak = first.downgrade();
        drop(first);

        let second = heap.alloc_list(vec![]).unwrap();
        assert_ne!(second.id(), first_id);
        assert!(!heap.is_registered(first_id));
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_dead_slots_are_reaped_without_collection() {
        let mut heap = GcHeap::new();
        heap.set_enabled(false);
        for _ in 0..100_000 {
            drop(heap.alloc_list(vec![]).unwrap());
        }
        let snapshot = heap.snapshot();
        assert_eq!(snapshot.live_count, 0);
        assert!(snapshot.capacity <= 2, "registry grew to {}", snapshot.capacity);
        assert_eq!(heap.total_collections(), 0);
    }

    #[test]
    fn test_registry_stays_bounded_around_live_objects() {
        let mut heap = GcHeap::new();
        let keep: Vec<_> = (0..100).map(|_| heap.alloc_list(vec![]).unwrap()).collect();
        for _ in 0..10_000 {
            drop(heap.alloc_list(vec![]).unwrap());
        }
        assert!(heap.snapshot().capacity <= 2 * keep.len() + 2);
        assert!(keep.iter().all(|list| heap.is_registered(list.id())));
    }

    #[test]
    fn test_closure_environment_cycle_through_list() {
        let mut heap = GcHeap::new();
        let env = heap.alloc_environment(Environment::new(None)).unwrap();
        let function = Rc::new(CompiledFunction::new(Some("f"), &[], 0));
        let closure = heap
            .alloc_closure(Closure::new(function, env.clone()))
            .unwrap();
        let holder = heap
            .alloc_list(vec![Value::Function(closure.clone())])
            .unwrap();
        env.define("holder", Value::List(holder)).unwrap();
        let weak_env = env.downgrade();
        drop(env);
        drop(closure);

        assert_eq!(heap.registry_size(), 3);
        heap.collect(&RootSet::new()).unwrap();
        assert_eq!(heap.registry_size(), 0);
        assert!(weak_env.is_dangling());
    }

    #[test]
    fn test_owning_parent_link_is_traced() {
        let mut heap = GcHeap::new();
        let parent = heap.alloc_environment(Environment::new(None)).unwrap();
        let cycle = self_cycle(&mut heap);
        parent.define("data", cycle).unwrap();
        let child = heap
            .alloc_environment(Environment::new(Some(ParentLink::Owning(parent.clone()))))
            .unwrap();
        drop(parent);

        let mut roots = RootSet::new();
        roots.add(&child);
        heap.collect(&roots).unwrap();
        assert_eq!(heap.registry_size(), 3);
        assert!(child.get("data").unwrap().is_some());

        drop(child);
        heap.collect(&RootSet::new()).unwrap();
        assert_eq!(heap.registry_size(), 0);
    }

    #[test]
    fn test_held_token_defers_collection() {
        let mut heap = GcHeap::new();
        let list = heap.alloc_list(vec![]).unwrap();
        let mut roots = RootSet::new();
        roots.add(&list);

        let guard = list.borrow_mut().unwrap();
        let err = heap.collect(&roots).unwrap_err();
        assert_eq!(err, RuntimeError::CollectorBusy { id: list.id() });
        assert_eq!(heap.total_collections(), 0);
        drop(guard);

        heap.collect(&roots).unwrap();
        assert_eq!(heap.total_collections(), 1);
    }

    #[test]
    fn test_should_collect_respects_threshold() {
        let mut heap = GcHeap::with_threshold(5);
        assert!(!heap.should_collect());
        let mut keep = Vec::new();
        for _ in 0..5 {
            keep.push(heap.alloc_list(vec![]).unwrap());
        }
        assert!(heap.should_collect());
    }

    #[test]
    fn test_should_collect_respects_enabled() {
        let mut heap = GcHeap::with_threshold(2);
        for _ in 0..5 {
            drop(heap.alloc_list(vec![]).unwrap());
        }
        assert!(heap.should_collect());

        heap.set_enabled(false);
        assert!(!heap.should_collect());
    }

    #[test]
    fn test_registry_threshold_triggers_collection() {
        let mut heap = GcHeap::with_config(GcConfig {
            registry_threshold: 3,
            ..GcConfig::default()
        });
        let mut keep = Vec::new();
        for _ in 0..2 {
            keep.push(heap.alloc_list(vec![]).unwrap());
        }
        assert!(!heap.should_collect());
        keep.push(heap.alloc_list(vec![]).unwrap());
        assert!(heap.should_collect());
    }

    #[test]
    fn test_adaptive_threshold_doubles_on_low_collection() {
        let mut heap = GcHeap::with_threshold(MIN_GC_THRESHOLD);
        let initial = heap.threshold();

        let mut roots = RootSet::new();
        let mut keep = Vec::new();
        for _ in 0..10 {
            let list = heap.alloc_list(vec![]).unwrap();
            roots.add(&list);
            keep.push(list);
        }

        heap.collect(&roots).unwrap();
        assert_eq!(heap.threshold(), initial * 2);
    }

    #[test]
    fn test_adaptive_threshold_halves_on_high_collection() {
        let mut heap = GcHeap::with_threshold(100_000);
        let initial = heap.threshold();
        for _ in 0..100 {
            drop(self_cycle(&mut heap));
        }

        heap.collect(&RootSet::new()).unwrap();
        assert_eq!(heap.threshold(), initial / 2);
    }

    #[test]
    fn test_threshold_setters_stay_within_bounds() {
        let mut heap = GcHeap::new();
        heap.set_threshold(usize::MAX);
        assert_eq!(heap.threshold(), heap.config().max_threshold);
        heap.set_threshold(0);
        assert_eq!(heap.threshold(), heap.config().min_threshold);
        assert_eq!(
            GcHeap::with_threshold(usize::MAX).threshold(),
            GcConfig::default().max_threshold
        );
    }

    #[test]
    fn test_low_yield_collection_at_max_threshold_does_not_overflow() {
        let mut heap = GcHeap::with_config(GcConfig {
            max_threshold: usize::MAX,
            allocation_threshold: usize::MAX,
            ..GcConfig::default()
        });
        heap.set_threshold(usize::MAX);
        let list = heap.alloc_list(vec![]).unwrap();
        let mut roots = RootSet::new();
        roots.add(&list);

        heap.collect(&roots).unwrap();
        assert_eq!(heap.threshold(), usize::MAX);
    }

    #[test]
    fn test_registry_exhaustion_is_fatal() {
        let mut heap = GcHeap::with_config(GcConfig {
            max_objects: 2,
            ..GcConfig::default()
        });
        let _a = heap.alloc_list(vec![]).unwrap();
        let _b = heap.alloc_list(vec![]).unwrap();
        let err = heap.alloc_list(vec![]).unwrap_err();
        assert_eq!(err, RuntimeError::RegistryExhausted { capacity: 2 });
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_exhausted_registry_reaps_dead_slots_first() {
        let mut heap = GcHeap::with_config(GcConfig {
            max_objects: 1,
            ..GcConfig::default()
        });
        drop(heap.alloc_list(vec![]).unwrap());
        let again = heap.alloc_list(vec![]).unwrap();
        assert_eq!(again.id().index(), 0);
        assert_eq!(again.id().generation(), 1);
    }

    #[test]
    fn test_memory_limit_rejects_allocation() {
        let mut heap = GcHeap::with_config(GcConfig {
            max_memory_bytes: 256,
            ..GcConfig::default()
        });
        let err = heap
            .alloc_list(Vec::with_capacity(1024))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::OutOfMemory { limit: 256, .. }));
        assert!(err.is_recoverable());
        assert_eq!(heap.registry_size(), 0);
    }

    #[test]
    fn test_released_bytes_are_returned() {
        let mut heap = GcHeap::new();
        let list = heap.alloc_list(Vec::with_capacity(16)).unwrap();
        assert!(heap.live_bytes() > 0);
        drop(list);
        assert_eq!(heap.live_bytes(), 0);
    }

    #[test]
    fn test_snapshot_counts_live_objects_by_kind() {
        let mut heap = GcHeap::new();
        let _list = heap.alloc_list(vec![]).unwrap();
        let _env = heap.alloc_environment(Environment::new(None)).unwrap();
        drop(heap.alloc_map(Map::new()).unwrap());

        let snapshot = heap.snapshot();
        assert_eq!(snapshot.capacity, 3);
        assert_eq!(snapshot.live_count, 2);
        assert_eq!(snapshot.pending_reap, 1);
        assert_eq!(snapshot.kind_breakdown[0].count, 1);
        assert_eq!(snapshot.kind_breakdown[1].count, 0);
        assert_eq!(snapshot.kind_breakdown[3].count, 1);

        let json = heap.snapshot_json().unwrap();
        assert!(json.contains("\"live_count\": 2"));
    }

    #[test]
    fn test_stress_cyclic_garbage() {
        let mut heap = GcHeap::with_threshold(1024);
        let mut live = self_cycle(&mut heap);

        for i in 1..20_000 {
            drop(self_cycle(&mut heap));

            if heap.should_collect() {
                let mut roots = RootSet::new();
                roots.add_value(&live);
                heap.collect(&roots).unwrap();
            }

            if i % 5_000 == 0 {
                live = self_cycle(&mut heap);
            }
        }

        let mut roots = RootSet::new();
        roots.add_value(&live);
        heap.collect(&roots).unwrap();
        assert_eq!(heap.registry_size(), 1);
        assert!(heap.total_collections() > 0);
    }
}
