//! Process-global, monotonic worker-id allocator (C7). No recycling, no
//! persistence: ids are unique only within a process lifetime, which is
//! all MySQL `server_id` uniqueness actually requires (unique among
//! replicas attached to the same master at the same instant).
//!
//! Grounded on `original_source/tools/idgenerator/generator.go`, which uses
//! the same mutex-guarded counter starting at zero and incrementing before
//! handing the value out.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Encapsulated behind a trait so tests can substitute a deterministic
/// generator instead of the process-global counter (spec.md §9).
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> u32;
}

/// The process-wide generator. Cloning shares the same counter.
#[derive(Clone, Default)]
pub struct GlobalIdGenerator {
    counter: Arc<AtomicU32>,
}

impl GlobalIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl IdGenerator for GlobalIdGenerator {
    fn next_id(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// A deterministic generator for tests: yields a fixed sequence, then keeps
/// returning the last value (tests only ever ask for as many ids as they
/// seeded).
pub struct FixedIdGenerator {
    next: AtomicU32,
}

impl FixedIdGenerator {
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }
}

impl IdGenerator for FixedIdGenerator {
    fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
