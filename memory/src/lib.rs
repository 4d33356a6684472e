//! Storage for recorded commands.
//!
//! `Arena` places variable-length command payloads contiguously and is reset as a whole.
//! `ObjectPool` keeps command objects across command buffer reuse cycles.

#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

mod arena;
mod pool;

pub use crate::{
    arena::{Arena, ArenaStats, Span},
    pool::{ObjectPool, PoolCounts, Reuse, SyncObjectPool},
};
