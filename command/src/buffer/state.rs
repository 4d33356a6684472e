use {
    crate::{command::Recording, error::ValidationError},
    forge_core::{
        BufferId, BufferInfo, Device, EventId, EventInfo, Format, ImageId, ImageInfo,
        ImageViewId, ImageViewInfo, Level, Limits, PipelineId, PipelineLayoutId,
        PipelineLayoutInfo, QueryPoolId, QueryPoolInfo, RenderPassId, SubpassContents,
    },
    smallvec::SmallVec,
    std::sync::atomic::{AtomicU8, Ordering},
};

/// Lifecycle state of a command buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Freshly allocated or reset.
    Initial,
    /// Between `begin` and `end`.
    Recording,
    /// Recorded and ready for submission.
    Executable,
    /// Submitted and not completed.
    Pending,
    /// Recording failed or a one-time submission completed.
    Invalid,
}

impl Lifecycle {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Lifecycle::Initial,
            1 => Lifecycle::Recording,
            2 => Lifecycle::Executable,
            3 => Lifecycle::Pending,
            _ => Lifecycle::Invalid,
        }
    }

    fn into_raw(self) -> u8 {
        match self {
            Lifecycle::Initial => 0,
            Lifecycle::Recording => 1,
            Lifecycle::Executable => 2,
            Lifecycle::Pending => 3,
            Lifecycle::Invalid => 4,
        }
    }
}

/// Lifecycle state readable from completion handlers.
#[derive(Debug)]
pub(crate) struct AtomicLifecycle(AtomicU8);

impl Default for AtomicLifecycle {
    fn default() -> Self {
        AtomicLifecycle(AtomicU8::new(Lifecycle::Initial.into_raw()))
    }
}

impl AtomicLifecycle {
    pub(crate) fn get(&self) -> Lifecycle {
        Lifecycle::from_raw(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: Lifecycle) {
        self.0.store(state.into_raw(), Ordering::Release)
    }
}

/// How the active render pass was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PassOrigin {
    RenderPass,
    Rendering,
    Inherited,
}

/// Render pass state tracked while recording.
#[derive(Clone, Debug)]
pub(crate) struct PassScope {
    pub origin: PassOrigin,
    pub render_pass: Option<RenderPassId>,
    pub subpass: u32,
    pub subpass_count: u32,
    pub contents: SubpassContents,
    pub color_formats: SmallVec<[Format; 4]>,
    pub depth_format: Option<Format>,
    /// Views selected by instance index in one native pass.
    pub layered_views: u32,
}

/// State of the command stream used by record-time validation.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordState {
    pub level: Level,
    pub pass: Option<PassScope>,
    pub graphics_pipeline: Option<PipelineId>,
    pub compute_pipeline: Option<PipelineId>,
    pub index_buffer: bool,
    pub queries: SmallVec<[(QueryPoolId, u32); 2]>,
}

impl RecordState {
    pub(crate) fn new(level: Level, pass: Option<PassScope>) -> Self {
        RecordState {
            level,
            pass,
            ..RecordState::default()
        }
    }

    /// Check if `end` would leave a render pass open.
    pub(crate) fn has_open_pass(&self) -> bool {
        self.pass
            .as_ref()
            .map_or(false, |pass| pass.origin != PassOrigin::Inherited)
    }
}

/// Everything a command needs to validate and fill itself.
pub(crate) struct RecordContext<'a> {
    pub device: &'a dyn Device,
    pub recording: &'a mut Recording,
    pub state: &'a mut RecordState,
}

macro_rules! lookup {
    ($($name:ident($id:ty) -> $info:ty, $kind:expr;)*) => {
        $(
            pub(crate) fn $name(&self, id: $id) -> Result<$info, ValidationError> {
                self.device.$name(id).ok_or(ValidationError::UnknownHandle {
                    kind: $kind,
                    handle: id.raw(),
                })
            }
        )*
    };
}

impl RecordContext<'_> {
    lookup! {
        buffer(BufferId) -> BufferInfo, "buffer";
        image(ImageId) -> ImageInfo, "image";
        image_view(ImageViewId) -> ImageViewInfo, "image view";
        pipeline_layout(PipelineLayoutId) -> PipelineLayoutInfo, "pipeline layout";
        query_pool(QueryPoolId) -> QueryPoolInfo, "query pool";
        event(EventId) -> EventInfo, "event";
    }

    pub(crate) fn limits(&self) -> &Limits {
        self.device.limits()
    }

    /// Active render pass required by `op`.
    pub(crate) fn inside_pass(&self, op: &'static str) -> Result<&PassScope, ValidationError> {
        self.state
            .pass
            .as_ref()
            .ok_or(ValidationError::OutsideRenderPass(op))
    }

    pub(crate) fn outside_pass(&self, op: &'static str) -> Result<(), ValidationError> {
        match self.state.pass {
            Some(_) => Err(ValidationError::InsideRenderPass(op)),
            None => Ok(()),
        }
    }

    pub(crate) fn primary(&self, op: &'static str) -> Result<(), ValidationError> {
        match self.state.level {
            Level::Primary => Ok(()),
            Level::Secondary => Err(ValidationError::NotPrimary(op)),
        }
    }

    /// Inline commands are not allowed in sub-passes provided by secondary buffers.
    pub(crate) fn inline_in_pass(&self) -> Result<(), ValidationError> {
        match &self.state.pass {
            Some(pass)
                if pass.origin != PassOrigin::Inherited
                    && pass.contents == SubpassContents::SecondaryCommandBuffers =>
            {
                Err(ValidationError::ContentsMismatch)
            }
            _ => Ok(()),
        }
    }
}

/// Check that `offset..offset + size` lies within `limit`.
pub(crate) fn check_range(
    what: &'static str,
    offset: u64,
    size: u64,
    limit: u64,
) -> Result<(), ValidationError> {
    match offset.checked_add(size) {
        Some(end) if end <= limit => Ok(()),
        _ => Err(ValidationError::OutOfRange {
            what,
            value: offset.saturating_add(size),
            limit,
        }),
    }
}

pub(crate) fn check_aligned(
    what: &'static str,
    value: u64,
    alignment: u64,
) -> Result<(), ValidationError> {
    if value % alignment == 0 {
        Ok(())
    } else {
        Err(ValidationError::Unaligned {
            what,
            value,
            alignment,
        })
    }
}

pub(crate) fn check_limit(what: &'static str, value: u64, limit: u64) -> Result<(), ValidationError> {
    if value <= limit {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { what, value, limit })
    }
}
