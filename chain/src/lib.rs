//! This crate translates source pipeline barriers
//! into native fence waits and updates,
//! and tracks host-visible completion of submitted work.

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

mod barrier;
mod fence;
mod ring;
mod stage;
mod translate;

pub use crate::{
    barrier::{Barrier, BarrierScope, Dependency},
    fence::CompletionFence,
    ring::{FenceRing, FenceToken},
    stage::{map_stages, Mapped, Side, StageSet},
    translate::{BarrierTranslator, SyncStats},
};
