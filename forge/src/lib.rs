//! Forge's top level crate.
//! Reexports all others.

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

#[cfg(feature = "chain")]
#[doc(inline)]
pub use forge_chain as chain;

#[cfg(feature = "command")]
#[doc(inline)]
pub use forge_command as command;

#[cfg(feature = "memory")]
#[doc(inline)]
pub use forge_memory as memory;

#[doc(inline)]
pub use forge_core::*;
