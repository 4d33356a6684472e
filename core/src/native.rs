//! Interface of the native target API.
//!
//! The native API is encoder based: work is appended to one open encoder at a time,
//! hazards are tracked automatically inside an encoder, and ordering between
//! encoders is expressed with fences.

use {
    crate::{
        handle::*,
        types::{
            BufferImageCopy, ClearAttachment, ClearRect, Filter, ImageBlit, ImageCopy, IndexType,
            QueryResultFlags, Rect, Viewport,
        },
    },
    smallvec::SmallVec,
};

/// Shader stage that resources are bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindStage {
    /// Vertex function of render encoder.
    Vertex,
    /// Fragment function of render encoder.
    Fragment,
    /// Kernel function of compute encoder.
    Compute,
}

impl BindStage {
    /// Stages of render encoders.
    pub const GRAPHICS: [BindStage; 2] = [BindStage::Vertex, BindStage::Fragment];
}

/// Abstract stage that fences order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BarrierStage {
    /// Vertex processing of render encoders.
    Vertex,
    /// Fragment processing of render encoders.
    Fragment,
    /// Compute encoders.
    Compute,
    /// Blit encoders.
    Copy,
}

impl BarrierStage {
    /// All stages.
    pub const ALL: [BarrierStage; 4] = [
        BarrierStage::Vertex,
        BarrierStage::Fragment,
        BarrierStage::Compute,
        BarrierStage::Copy,
    ];

    /// Dense index of the stage.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Kind of native encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    /// Render encoder.
    Render,
    /// Compute encoder.
    Compute,
    /// Blit encoder.
    Blit,
}

impl EncoderKind {
    /// Fence stages covered by work of this encoder kind.
    pub fn barrier_stages(&self) -> &'static [BarrierStage] {
        match self {
            EncoderKind::Render => &[BarrierStage::Vertex, BarrierStage::Fragment],
            EncoderKind::Compute => &[BarrierStage::Compute],
            EncoderKind::Blit => &[BarrierStage::Copy],
        }
    }
}

/// Native load action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadAction {
    DontCare,
    Load,
    Clear,
}

/// Native store action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreAction {
    DontCare,
    Store,
    /// Resolve and discard multisampled contents.
    MultisampleResolve,
    /// Resolve and keep multisampled contents.
    StoreAndMultisampleResolve,
}

impl StoreAction {
    /// Action with native resolve added.
    pub fn with_resolve(self) -> Self {
        match self {
            StoreAction::Store | StoreAction::StoreAndMultisampleResolve => {
                StoreAction::StoreAndMultisampleResolve
            }
            StoreAction::DontCare | StoreAction::MultisampleResolve => {
                StoreAction::MultisampleResolve
            }
        }
    }
}

/// Texture slice targeted by an attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureTarget {
    /// Texture.
    pub texture: NativeTexture,
    /// Mip level.
    pub level: u32,
    /// First layer.
    pub layer: u32,
}

/// Color attachment of a native render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorAttachmentDescriptor {
    /// Render target.
    pub target: TextureTarget,
    /// Native resolve target.
    pub resolve: Option<TextureTarget>,
    pub load: LoadAction,
    pub store: StoreAction,
    pub clear: [f32; 4],
}

/// Depth or stencil attachment of a native render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthStencilAttachmentDescriptor {
    /// Render target.
    pub target: TextureTarget,
    pub load: LoadAction,
    pub store: StoreAction,
    /// Clear depth, or clear stencil as float.
    pub clear: f32,
}

/// Native render pass opened by a render encoder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPassDescriptor {
    /// Color attachments, `None` for unused slots.
    pub colors: SmallVec<[Option<ColorAttachmentDescriptor>; 4]>,
    pub depth: Option<DepthStencilAttachmentDescriptor>,
    pub stencil: Option<DepthStencilAttachmentDescriptor>,
    /// Layers rendered by layered rendering.
    pub render_target_array_length: u32,
    /// Render target width.
    pub width: u32,
    /// Render target height.
    pub height: u32,
    /// Buffer receiving occlusion results.
    pub visibility_buffer: Option<NativeBuffer>,
}

/// Occlusion counting mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisibilityMode {
    Disabled,
    /// Any sample passed.
    Boolean,
    /// Exact count of samples passed.
    Counting,
}

/// Primitive topology of native draw calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Point,
    Line,
    LineStrip,
    Triangle,
    TriangleStrip,
}

/// Native command buffer that encoders are opened on.
///
/// Calls that bind, draw or dispatch require a matching encoder to be open.
/// Fence, event and completion calls are valid at any point; fence calls apply to the
/// open encoder.
pub trait NativeCommandBuffer {
    /// Open render encoder.
    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor, label: &str);

    /// Open compute encoder.
    fn begin_compute_pass(&mut self, label: &str);

    /// Open blit encoder.
    fn begin_blit_pass(&mut self, label: &str);

    /// Close the open encoder.
    fn end_encoding(&mut self);

    /// Replace store action of a color attachment of the open render encoder.
    fn set_color_store_action(&mut self, index: u32, action: StoreAction);

    /// Replace store action of the depth attachment of the open render encoder.
    fn set_depth_store_action(&mut self, action: StoreAction);

    /// Replace store action of the stencil attachment of the open render encoder.
    fn set_stencil_store_action(&mut self, action: StoreAction);

    /// Bind render pipeline state.
    fn set_render_pipeline(&mut self, pipeline: NativePipeline);

    /// Bind compute pipeline state.
    fn set_compute_pipeline(&mut self, pipeline: NativePipeline);

    /// Bind buffer to the slot.
    fn set_buffer(&mut self, stage: BindStage, index: u32, buffer: NativeBuffer, offset: u64);

    /// Change offset of buffer already bound to the slot.
    fn set_buffer_offset(&mut self, stage: BindStage, index: u32, offset: u64);

    /// Bind inline bytes to the slot.
    fn set_bytes(&mut self, stage: BindStage, index: u32, bytes: &[u8]);

    /// Bind texture to the slot.
    fn set_texture(&mut self, stage: BindStage, index: u32, texture: NativeTexture);

    /// Bind sampler to the slot.
    fn set_sampler(&mut self, stage: BindStage, index: u32, sampler: NativeSampler);

    fn set_viewports(&mut self, viewports: &[Viewport]);

    fn set_scissor_rects(&mut self, rects: &[Rect]);

    fn set_depth_bias(&mut self, constant: f32, slope: f32, clamp: f32);

    fn set_blend_color(&mut self, color: [f32; 4]);

    fn set_stencil_reference(&mut self, front: u32, back: u32);

    /// Start or stop counting visible samples at `offset` of the visibility buffer.
    fn set_visibility_result_mode(&mut self, mode: VisibilityMode, offset: u64);

    fn draw_primitives(
        &mut self,
        primitive: PrimitiveType,
        first_vertex: u32,
        vertex_count: u32,
        instance_count: u32,
        first_instance: u32,
    );

    fn draw_indexed_primitives(
        &mut self,
        primitive: PrimitiveType,
        index_count: u32,
        index_type: IndexType,
        index_buffer: NativeBuffer,
        index_offset: u64,
        instance_count: u32,
        base_vertex: i32,
        first_instance: u32,
    );

    fn draw_primitives_indirect(
        &mut self,
        primitive: PrimitiveType,
        buffer: NativeBuffer,
        offset: u64,
    );

    fn draw_indexed_primitives_indirect(
        &mut self,
        primitive: PrimitiveType,
        index_type: IndexType,
        index_buffer: NativeBuffer,
        index_offset: u64,
        buffer: NativeBuffer,
        offset: u64,
    );

    fn dispatch_threadgroups(&mut self, groups: [u32; 3], threads_per_group: [u32; 3]);

    fn dispatch_threadgroups_indirect(
        &mut self,
        buffer: NativeBuffer,
        offset: u64,
        threads_per_group: [u32; 3],
    );

    fn copy_buffer(
        &mut self,
        src: NativeBuffer,
        src_offset: u64,
        dst: NativeBuffer,
        dst_offset: u64,
        size: u64,
    );

    fn copy_texture(&mut self, src: NativeTexture, dst: NativeTexture, region: &ImageCopy);

    fn copy_buffer_to_texture(
        &mut self,
        src: NativeBuffer,
        dst: NativeTexture,
        region: &BufferImageCopy,
    );

    fn copy_texture_to_buffer(
        &mut self,
        src: NativeTexture,
        dst: NativeBuffer,
        region: &BufferImageCopy,
    );

    /// Scaled copy between textures.
    fn blit_texture(
        &mut self,
        src: NativeTexture,
        dst: NativeTexture,
        region: &ImageBlit,
        filter: Filter,
    );

    /// Explicit multisample resolve of a region.
    fn resolve_texture(&mut self, src: NativeTexture, dst: NativeTexture, region: &ImageCopy);

    fn fill_buffer(&mut self, dst: NativeBuffer, offset: u64, size: u64, value: u32);

    fn update_buffer(&mut self, dst: NativeBuffer, offset: u64, data: &[u8]);

    /// Clear attachment regions of the open render encoder by drawing.
    fn clear_attachments(&mut self, attachments: &[ClearAttachment], rects: &[ClearRect]);

    /// Copy query results from the results buffer of a pool, converting to requested layout.
    fn copy_query_results(
        &mut self,
        results: NativeBuffer,
        first: u32,
        count: u32,
        dst: NativeBuffer,
        dst_offset: u64,
        stride: u64,
        flags: QueryResultFlags,
    );

    /// Make the stage of the open encoder wait for the fence.
    fn wait_for_fence(&mut self, fence: NativeFence, before: BarrierStage);

    /// Make the fence signal once the stage of the open encoder completes.
    fn update_fence(&mut self, fence: NativeFence, after: BarrierStage);

    /// Order memory accesses inside the open render encoder.
    fn memory_barrier(&mut self, after: BarrierStage, before: BarrierStage);

    /// Signal shared event with value. No encoder may be open.
    fn signal_event(&mut self, event: NativeEvent, value: u64);

    /// Wait for shared event to reach value. No encoder may be open.
    fn wait_event(&mut self, event: NativeEvent, value: u64);

    fn push_debug_group(&mut self, label: &str);

    fn pop_debug_group(&mut self);

    fn insert_debug_signpost(&mut self, label: &str);

    /// Register handler called once the command buffer completes execution.
    fn add_completed_handler(&mut self, handler: Box<dyn FnOnce() + Send>);
}
