//! Cycle collector for the reference-counted value graph.
//!
//! Reference counting stays the primary reclamation mechanism. Every composite
//! object is also entered into the [`GcHeap`] registry under a stable
//! [`ObjectId`], so that cycles formed through mutable collections can be
//! found and broken by a mark-and-sweep pass from an explicit [`RootSet`].

pub mod gc_heap;
pub mod heap_entry;
pub mod heap_object;
pub mod mark_bits;
pub mod object_id;
pub mod root_set;
pub mod telemetry;

pub use gc_heap::{CollectStats, GcHeap, GcPhase};
pub use object_id::ObjectId;
pub use root_set::RootSet;
