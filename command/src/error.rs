//! Errors of recording, lifecycle transitions and submission.

use {
    crate::buffer::Lifecycle,
    forge_core::{PipelineBindPoint, QueryPoolId},
};

/// Command rejected by validation at record time.
#[derive(Clone, Debug, PartialEq, Eq, failure::Fail)]
pub enum ValidationError {
    /// Handle is not known to the device.
    #[fail(display = "Unknown {} handle {}", kind, handle)]
    UnknownHandle {
        /// Kind of the handle.
        kind: &'static str,
        /// Raw handle value.
        handle: u64,
    },

    /// Command must be recorded inside a render pass.
    #[fail(display = "{} requires an active render pass", _0)]
    OutsideRenderPass(&'static str),

    /// Command must be recorded outside of render passes.
    #[fail(display = "{} is not allowed inside a render pass", _0)]
    InsideRenderPass(&'static str),

    /// Render pass begun while another one is active.
    #[fail(display = "Render pass is already active")]
    NestedRenderPass,

    /// Render pass ended or advanced by a command of the other pass kind.
    #[fail(display = "Active render pass was begun differently")]
    PassKindMismatch,

    /// No sub-pass after the current one.
    #[fail(display = "Sub-pass {} is out of range of {} sub-passes", subpass, count)]
    SubpassOutOfRange {
        /// Requested sub-pass.
        subpass: u32,
        /// Number of sub-passes.
        count: u32,
    },

    /// Render pass ended before the last sub-pass.
    #[fail(display = "Render pass ended in sub-pass {} of {}", subpass, count)]
    NotLastSubpass {
        /// Current sub-pass.
        subpass: u32,
        /// Number of sub-passes.
        count: u32,
    },

    /// Commands of the sub-pass are provided differently.
    #[fail(display = "Sub-pass contents do not allow this command")]
    ContentsMismatch,

    /// Attachments do not match the render pass or pipeline.
    #[fail(display = "Attachment mismatch: {}", _0)]
    AttachmentMismatch(&'static str),

    /// Draw or dispatch without a bound pipeline.
    #[fail(display = "No {:?} pipeline bound", _0)]
    NoPipelineBound(PipelineBindPoint),

    /// Pipeline is bound to the wrong bind point.
    #[fail(display = "Pipeline does not belong to {:?} bind point", _0)]
    BindPointMismatch(PipelineBindPoint),

    /// Indexed draw without an index buffer.
    #[fail(display = "No index buffer bound")]
    NoIndexBuffer,

    /// Value exceeds its limit.
    #[fail(display = "{} {} exceeds limit {}", what, value, limit)]
    OutOfRange {
        /// Checked value.
        what: &'static str,
        /// Provided value.
        value: u64,
        /// Limit the value must not exceed.
        limit: u64,
    },

    /// Value is not properly aligned.
    #[fail(display = "{} {} is not a multiple of {}", what, value, alignment)]
    Unaligned {
        /// Checked value.
        what: &'static str,
        /// Provided value.
        value: u64,
        /// Required alignment.
        alignment: u64,
    },

    /// Number of dynamic offsets does not match the bound sets.
    #[fail(display = "Expected {} dynamic offsets, found {}", expected, found)]
    DynamicOffsetCount {
        /// Offsets consumed by the sets.
        expected: u32,
        /// Offsets provided.
        found: u32,
    },

    /// Command may only be recorded into primary buffers.
    #[fail(display = "{} requires a primary command buffer", _0)]
    NotPrimary(&'static str),

    /// Buffer can't be executed by the primary buffer.
    #[fail(display = "Invalid secondary buffer: {}", _0)]
    InvalidSecondary(&'static str),

    /// Query is already active.
    #[fail(display = "Query {} of pool {:?} is already active", query, pool)]
    QueryActive {
        /// Query pool.
        pool: QueryPoolId,
        /// Query index.
        query: u32,
    },

    /// Query is not active.
    #[fail(display = "Query {} of pool {:?} is not active", query, pool)]
    QueryNotActive {
        /// Query pool.
        pool: QueryPoolId,
        /// Query index.
        query: u32,
    },

    /// Instance range no longer fits once layered views are selected by instance index.
    #[fail(
        display = "Instances {}..+{} overflow with {} layered views",
        first, count, views
    )]
    InstanceOverflow {
        /// First instance.
        first: u32,
        /// Instance count.
        count: u32,
        /// Views rendered by one native pass.
        views: u32,
    },

    /// Argument is not valid for the command.
    #[fail(display = "Invalid argument: {}", _0)]
    InvalidArgument(&'static str),
}

/// Error of appending a command.
#[derive(Clone, Debug, PartialEq, Eq, failure::Fail)]
pub enum RecordError {
    /// Command failed validation and the buffer is now invalid.
    #[fail(display = "Command rejected: {}", _0)]
    Rejected(ValidationError),

    /// Buffer was invalidated by an earlier rejected command.
    #[fail(display = "Command buffer was invalidated: {}", _0)]
    Invalidated(ValidationError),

    /// Buffer is not in recording state.
    #[fail(display = "Command buffer is {:?}, not recording", _0)]
    NotRecording(Lifecycle),
}

/// Error of lifecycle transitions.
#[derive(Clone, Debug, PartialEq, Eq, failure::Fail)]
pub enum StateError {
    /// Transition is not allowed from the current state.
    #[fail(display = "Command buffer is {:?}, expected {:?}", found, expected)]
    InvalidState {
        /// State required by the transition.
        expected: Lifecycle,
        /// Current state.
        found: Lifecycle,
    },

    /// Recording ended with an active render pass.
    #[fail(display = "Render pass is still active")]
    UnclosedRenderPass,

    /// Buffer has executions in flight.
    #[fail(display = "Command buffer is in use")]
    InUse,

    /// Buffer was allocated from another pool.
    #[fail(display = "Command buffer belongs to another pool")]
    ForeignPool,

    /// Pool was created without individual reset support.
    #[fail(display = "Command pool does not allow individual reset")]
    NoIndividualReset,

    /// Secondary buffer continuing a render pass was begun without inheritance.
    #[fail(display = "Render pass continuation requires inheritance info")]
    MissingInheritance,
}

/// Error of submitting a command buffer.
#[derive(Clone, Debug, PartialEq, Eq, failure::Fail)]
pub enum SubmitError {
    /// Recording was invalidated by a rejected command.
    #[fail(display = "Command buffer is invalid: {}", _0)]
    Invalid(ValidationError),

    /// Buffer is not executable.
    #[fail(display = "Command buffer is {:?}, not executable", _0)]
    InvalidState(Lifecycle),

    /// Buffer is pending and does not allow simultaneous use.
    #[fail(display = "Command buffer is in use")]
    InUse,

    /// Executed secondary buffer was reset or re-recorded after it was recorded.
    #[fail(display = "Executed secondary buffer changed after recording")]
    StaleSecondary,

    /// Completion fence is signaled or awaits another submission.
    #[fail(display = "Completion fence is signaled or in use")]
    FenceInUse,

    /// Secondary buffers are executed by primary buffers, not submitted.
    #[fail(display = "Secondary buffers can't be submitted")]
    NotPrimary,
}
