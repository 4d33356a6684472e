//! Collaborators consumed by recording and encoding.
//!
//! Resource lifetime, shader translation, descriptor layouts and format tables are
//! managed elsewhere. The command engine only asks for native handles and capability
//! bits through the `Device` trait.

use {
    crate::{
        config::Config,
        handle::*,
        native::{BarrierStage, BindStage, PrimitiveType},
        types::*,
    },
    hibitset::BitSet,
    smallvec::SmallVec,
};

/// Buffer known to the resource collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferInfo {
    /// Native buffer.
    pub native: NativeBuffer,
    /// Size in bytes.
    pub size: u64,
}

/// Image known to the resource collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    /// Native texture.
    pub native: NativeTexture,
    /// Pixel format.
    pub format: Format,
    /// Extent of mip level 0.
    pub extent: Extent3D,
    /// Number of mip levels.
    pub levels: u32,
    /// Number of layers.
    pub layers: u32,
    /// Sample count.
    pub samples: u32,
}

/// Image view known to the resource collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageViewInfo {
    /// Native texture of the view.
    pub native: NativeTexture,
    /// Viewed image.
    pub image: ImageId,
    /// Pixel format.
    pub format: Format,
    /// Extent of the viewed mip level.
    pub extent: Extent2D,
    /// Viewed mip level.
    pub level: u32,
    /// First viewed layer.
    pub base_layer: u32,
    /// Number of viewed layers.
    pub layers: u32,
    /// Sample count.
    pub samples: u32,
}

/// Native slots a pipeline reads from one stage.
#[derive(Clone, Debug, Default)]
pub struct SlotUsage {
    /// Buffer slots.
    pub buffers: BitSet,
    /// Texture slots.
    pub textures: BitSet,
    /// Sampler slots.
    pub samplers: BitSet,
}

impl SlotUsage {
    /// Usage of every slot below given counts.
    pub fn all(buffers: u32, textures: u32, samplers: u32) -> Self {
        let fill = |count: u32| {
            let mut set = BitSet::new();
            for index in 0..count {
                set.add(index);
            }
            set
        };

        SlotUsage {
            buffers: fill(buffers),
            textures: fill(textures),
            samplers: fill(samplers),
        }
    }
}

/// State baked into a graphics pipeline that dynamic state commands may override.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticState {
    /// Viewports.
    pub viewports: SmallVec<[Viewport; 1]>,
    /// Scissor rectangles.
    pub scissors: SmallVec<[Rect; 1]>,
    /// Depth bias as constant factor, slope factor and clamp.
    pub depth_bias: Option<[f32; 3]>,
    /// Blend constants.
    pub blend_constants: [f32; 4],
    /// Front and back stencil reference.
    pub stencil_reference: [u32; 2],
}

/// Graphics pipeline produced by the pipeline collaborator.
#[derive(Clone, Debug)]
pub struct GraphicsPipelineInfo {
    /// Native render pipeline state.
    pub native: NativePipeline,
    /// Layout the pipeline was created with.
    pub layout: PipelineLayoutId,
    /// Topology of native draws.
    pub primitive: PrimitiveType,
    /// Slots used by vertex function.
    pub vertex: SlotUsage,
    /// Slots used by fragment function.
    pub fragment: SlotUsage,
    /// Buffer slot receiving push constants of vertex and fragment function.
    pub push_constant_slots: [Option<u32>; 2],
    /// Buffer slot of the vertex function receiving the rendered view range.
    pub view_range_slot: Option<u32>,
    /// State set by commands.
    pub dynamic: DynamicStates,
    /// Values of state not set by commands.
    pub static_state: StaticState,
    /// Color attachment formats the pipeline renders to.
    pub color_formats: SmallVec<[Format; 4]>,
    /// Depth-stencil format the pipeline renders to.
    pub depth_format: Option<Format>,
}

impl GraphicsPipelineInfo {
    /// Slot usage of the stage.
    pub fn usage(&self, stage: BindStage) -> Option<&SlotUsage> {
        match stage {
            BindStage::Vertex => Some(&self.vertex),
            BindStage::Fragment => Some(&self.fragment),
            BindStage::Compute => None,
        }
    }

    /// Push constant slot of the stage.
    pub fn push_constant_slot(&self, stage: BindStage) -> Option<u32> {
        match stage {
            BindStage::Vertex => self.push_constant_slots[0],
            BindStage::Fragment => self.push_constant_slots[1],
            BindStage::Compute => None,
        }
    }
}

/// Compute pipeline produced by the pipeline collaborator.
#[derive(Clone, Debug)]
pub struct ComputePipelineInfo {
    /// Native compute pipeline state.
    pub native: NativePipeline,
    /// Layout the pipeline was created with.
    pub layout: PipelineLayoutId,
    /// Slots used by the kernel.
    pub usage: SlotUsage,
    /// Buffer slot receiving push constants.
    pub push_constant_slot: Option<u32>,
    /// Threads per threadgroup.
    pub threadgroup_size: [u32; 3],
}

/// Pipeline layout produced by the descriptor collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineLayoutInfo {
    /// Number of descriptor sets.
    pub sets: u32,
    /// Size of push constant range in bytes.
    pub push_constant_size: u32,
}

/// Descriptor set produced by the descriptor collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorSetInfo {
    /// Number of dynamic offsets consumed when binding the set.
    pub dynamic_offsets: u32,
}

/// Native resource bound to a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotResource {
    /// Buffer at offset.
    Buffer {
        /// Native buffer.
        buffer: NativeBuffer,
        /// Offset in bytes.
        offset: u64,
    },
    /// Texture.
    Texture(NativeTexture),
    /// Sampler state.
    Sampler(NativeSampler),
}

/// Native slot binding produced by resolving descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotBinding {
    /// Stage of the slot.
    pub stage: BindStage,
    /// Slot index.
    pub index: u32,
    /// Bound resource.
    pub resource: SlotResource,
}

/// Query pool produced by the query collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryPoolInfo {
    /// Kind of queries.
    pub kind: QueryType,
    /// Number of queries.
    pub count: u32,
    /// Buffer query results are written to.
    pub results: Option<NativeBuffer>,
}

/// Event produced by the synchronization collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventInfo {
    /// Native shared event, `None` if event is emulated on host.
    pub native: Option<NativeEvent>,
}

/// Device limits relevant for command validation and emulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of viewports and scissors.
    pub max_viewports: u32,
    /// Maximum number of vertex buffer bindings.
    pub max_vertex_buffers: u32,
    /// Number of native buffer slots per stage.
    pub max_buffer_slots: u32,
    /// Maximum size of push constants in bytes.
    pub max_push_constants_size: u32,
    /// Maximum number of bound descriptor sets.
    pub max_bound_descriptor_sets: u32,
    /// Maximum size of inline buffer update in bytes.
    pub max_update_buffer_size: u64,
    /// Maximum number of workgroups per dispatch.
    pub max_compute_work_group_count: [u32; 3],
    /// Layered rendering is supported for multiview.
    pub layered_rendering: bool,
    /// Shared events are supported.
    pub native_events: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_viewports: 16,
            max_vertex_buffers: 31,
            max_buffer_slots: 31,
            max_push_constants_size: 4096,
            max_bound_descriptor_sets: 8,
            max_update_buffer_size: 65536,
            max_compute_work_group_count: [65535; 3],
            layered_rendering: true,
            native_events: true,
        }
    }
}

/// Collaborators of the command engine.
///
/// Lookups return `None` for unknown handles, which recording reports as validation errors.
/// Completion callbacks are invoked from native completion handlers on arbitrary threads.
pub trait Device: Send + Sync {
    /// Engine configuration.
    fn config(&self) -> &Config;

    /// Device limits.
    fn limits(&self) -> &Limits;

    /// Lookup buffer.
    fn buffer(&self, id: BufferId) -> Option<BufferInfo>;

    /// Lookup image.
    fn image(&self, id: ImageId) -> Option<ImageInfo>;

    /// Lookup image view.
    fn image_view(&self, id: ImageViewId) -> Option<ImageViewInfo>;

    /// Lookup graphics pipeline.
    fn graphics_pipeline(&self, id: PipelineId) -> Option<&GraphicsPipelineInfo>;

    /// Lookup compute pipeline.
    fn compute_pipeline(&self, id: PipelineId) -> Option<&ComputePipelineInfo>;

    /// Lookup pipeline layout.
    fn pipeline_layout(&self, id: PipelineLayoutId) -> Option<PipelineLayoutInfo>;

    /// Lookup descriptor set.
    fn descriptor_set(&self, id: DescriptorSetId) -> Option<DescriptorSetInfo>;

    /// Resolve descriptors of bound set into native slot bindings.
    fn descriptor_set_bindings(
        &self,
        layout: PipelineLayoutId,
        set_index: u32,
        set: DescriptorSetId,
        dynamic_offsets: &[u32],
        out: &mut dyn FnMut(SlotBinding),
    );

    /// Resolve push-descriptor writes into native slot bindings.
    fn push_descriptor_bindings(
        &self,
        layout: PipelineLayoutId,
        set_index: u32,
        writes: &[DescriptorWrite],
        out: &mut dyn FnMut(SlotBinding),
    );

    /// Lookup render pass.
    fn render_pass(&self, id: RenderPassId) -> Option<&RenderPassInfo>;

    /// Lookup framebuffer.
    fn framebuffer(&self, id: FramebufferId) -> Option<&FramebufferInfo>;

    /// Lookup query pool.
    fn query_pool(&self, id: QueryPoolId) -> Option<QueryPoolInfo>;

    /// Lookup event.
    fn event(&self, id: EventId) -> Option<EventInfo>;

    /// Native capabilities of a format.
    fn format_capabilities(&self, format: Format) -> FormatCapabilities;

    /// Native buffer slot of vertex buffer binding.
    fn vertex_buffer_slot(&self, binding: u32) -> u32 {
        self.limits().max_buffer_slots - 1 - binding
    }

    /// Native fence of a barrier ring slot.
    /// The same stage and slot must always yield the same fence.
    fn barrier_fence(&self, stage: BarrierStage, slot: u32) -> NativeFence {
        NativeFence(((stage.index() as u64) << 32) | slot as u64)
    }

    /// Queries finished executing and their results are available.
    fn mark_queries_available(&self, pool: QueryPoolId, queries: &[u32]);

    /// Queries were reset by executed commands.
    fn reset_queries(&self, pool: QueryPoolId, first: u32, count: u32);

    /// Timestamp query reached by executed commands.
    fn write_timestamp(&self, pool: QueryPoolId, query: u32);

    /// Emulated event status changed by executed commands.
    fn set_event_status(&self, event: EventId, signaled: bool);
}
