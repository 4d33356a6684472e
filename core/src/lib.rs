//! Crate that contains the vocabulary and interfaces shared by forge crates:
//! source-API handles and types, the native target interface and collaborator traits.

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

pub use crate::{config::*, device::*, handle::*, native::*, types::*};

#[doc(inline)]
pub use {hibitset, smallvec};

mod config;
mod device;
mod handle;
mod native;
mod slow;
pub mod types;

#[cfg(feature = "empty")]
pub mod empty;
