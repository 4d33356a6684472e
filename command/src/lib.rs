//! Command recording and encoding.
//!
//! Command buffers allocated from a `CommandPool` record validated commands into
//! pooled command objects. Submitting a primary buffer walks its commands and translates
//! them into calls of a native command buffer, opening and closing native encoders,
//! binding only the state that changed and emulating what the native API lacks.

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

mod buffer;
mod command;
mod encoder;
mod error;
mod pool;
mod storage;

pub use crate::{
    buffer::{CommandBuffer, CommandRecorder, Inheritance, Lifecycle},
    command::{
        CommandKind, DispatchCommand, DrawCommand, DrawIndexedCommand, RenderPassBegin,
        RenderingAttachment, RenderingInfo, WHOLE_SIZE,
    },
    encoder::EncodeStats,
    error::{RecordError, StateError, SubmitError, ValidationError},
    pool::CommandPool,
    storage::VertexBuffer,
};
