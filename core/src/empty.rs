//! Recording backend.
//!
//! `EmptyDevice` is an in-memory registry implementing every collaborator and
//! `Recorder` logs native calls instead of executing them.
//! Both are meant for tests and tools that inspect translated command streams.

use {
    crate::{
        config::Config,
        device::*,
        handle::*,
        native::*,
        types::*,
    },
    parking_lot::Mutex,
    smallvec::SmallVec,
    std::collections::HashMap,
};

/// Signal delivered to the device by completion handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSignal {
    /// `Device::mark_queries_available` was called.
    QueriesAvailable {
        /// Query pool.
        pool: QueryPoolId,
        /// Queries.
        queries: Vec<u32>,
    },
    /// `Device::reset_queries` was called.
    QueriesReset {
        /// Query pool.
        pool: QueryPoolId,
        /// First query.
        first: u32,
        /// Number of queries.
        count: u32,
    },
    /// `Device::write_timestamp` was called.
    Timestamp {
        /// Query pool.
        pool: QueryPoolId,
        /// Query.
        query: u32,
    },
    /// `Device::set_event_status` was called.
    EventStatus {
        /// Event.
        event: EventId,
        /// New status.
        signaled: bool,
    },
}

/// Registry of resources implementing `Device`.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct EmptyDevice {
    config: Config,
    limits: Limits,
    next: u64,
    buffers: HashMap<BufferId, BufferInfo>,
    images: HashMap<ImageId, ImageInfo>,
    views: HashMap<ImageViewId, ImageViewInfo>,
    samplers: HashMap<SamplerId, NativeSampler>,
    #[derivative(Debug = "ignore")]
    graphics: HashMap<PipelineId, GraphicsPipelineInfo>,
    #[derivative(Debug = "ignore")]
    compute: HashMap<PipelineId, ComputePipelineInfo>,
    layouts: HashMap<PipelineLayoutId, PipelineLayoutInfo>,
    sets: HashMap<DescriptorSetId, (DescriptorSetInfo, Vec<SlotBinding>)>,
    render_passes: HashMap<RenderPassId, RenderPassInfo>,
    framebuffers: HashMap<FramebufferId, FramebufferInfo>,
    query_pools: HashMap<QueryPoolId, QueryPoolInfo>,
    events: HashMap<EventId, EventInfo>,
    formats: HashMap<Format, FormatCapabilities>,
    signals: Mutex<Vec<DeviceSignal>>,
}

impl Default for EmptyDevice {
    fn default() -> Self {
        EmptyDevice::new(Config::default())
    }
}

impl EmptyDevice {
    /// Create empty registry.
    pub fn new(config: Config) -> Self {
        EmptyDevice {
            config,
            limits: Limits::default(),
            next: 1,
            buffers: HashMap::new(),
            images: HashMap::new(),
            views: HashMap::new(),
            samplers: HashMap::new(),
            graphics: HashMap::new(),
            compute: HashMap::new(),
            layouts: HashMap::new(),
            sets: HashMap::new(),
            render_passes: HashMap::new(),
            framebuffers: HashMap::new(),
            query_pools: HashMap::new(),
            events: HashMap::new(),
            formats: HashMap::new(),
            signals: Mutex::new(Vec::new()),
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Mutable access to limits.
    pub fn limits_mut(&mut self) -> &mut Limits {
        &mut self.limits
    }

    /// Register buffer.
    pub fn create_buffer(&mut self, size: u64) -> BufferId {
        let id = self.next();
        self.buffers.insert(
            BufferId(id),
            BufferInfo {
                native: NativeBuffer(id),
                size,
            },
        );
        BufferId(id)
    }

    /// Register image.
    pub fn create_image(&mut self, format: Format, extent: Extent3D, layers: u32, samples: u32) -> ImageId {
        let id = self.next();
        self.images.insert(
            ImageId(id),
            ImageInfo {
                native: NativeTexture(id),
                format,
                extent,
                levels: 1,
                layers,
                samples,
            },
        );
        ImageId(id)
    }

    /// Register view of the whole image.
    pub fn create_image_view(&mut self, image: ImageId) -> ImageViewId {
        let id = self.next();
        let info = self.images[&image];
        self.views.insert(
            ImageViewId(id),
            ImageViewInfo {
                native: NativeTexture(id),
                image,
                format: info.format,
                extent: Extent2D {
                    width: info.extent.width,
                    height: info.extent.height,
                },
                level: 0,
                base_layer: 0,
                layers: info.layers,
                samples: info.samples,
            },
        );
        ImageViewId(id)
    }

    /// Register 2D render target with a view and return both.
    pub fn create_render_target(
        &mut self,
        format: Format,
        width: u32,
        height: u32,
        samples: u32,
    ) -> (ImageId, ImageViewId) {
        let image = self.create_image(
            format,
            Extent3D {
                width,
                height,
                depth: 1,
            },
            1,
            samples,
        );
        (image, self.create_image_view(image))
    }

    /// Register sampler.
    pub fn create_sampler(&mut self) -> SamplerId {
        let id = self.next();
        self.samplers.insert(SamplerId(id), NativeSampler(id));
        SamplerId(id)
    }

    /// Register pipeline layout.
    pub fn create_pipeline_layout(&mut self, sets: u32, push_constant_size: u32) -> PipelineLayoutId {
        let id = PipelineLayoutId(self.next());
        self.layouts.insert(
            id,
            PipelineLayoutInfo {
                sets,
                push_constant_size,
            },
        );
        id
    }

    /// Register graphics pipeline.
    pub fn create_graphics_pipeline(&mut self, mut info: GraphicsPipelineInfo) -> PipelineId {
        let id = self.next();
        info.native = NativePipeline(id);
        self.graphics.insert(PipelineId(id), info);
        PipelineId(id)
    }

    /// Graphics pipeline description reading the first 8 slots of every kind in both stages
    /// and 4 vertex buffer bindings, receiving push constants at buffer slot 8 and view range
    /// at slot 9, with every state dynamic.
    pub fn graphics_pipeline_info(
        layout: PipelineLayoutId,
        color_formats: &[Format],
        depth_format: Option<Format>,
    ) -> GraphicsPipelineInfo {
        let mut vertex = SlotUsage::all(8, 8, 4);
        let limits = Limits::default();
        for binding in 0..4 {
            vertex.buffers.add(limits.max_buffer_slots - 1 - binding);
        }

        GraphicsPipelineInfo {
            native: NativePipeline(0),
            layout,
            primitive: PrimitiveType::Triangle,
            vertex,
            fragment: SlotUsage::all(8, 8, 4),
            push_constant_slots: [Some(8), Some(8)],
            view_range_slot: Some(9),
            dynamic: DynamicStates::all(),
            static_state: StaticState::default(),
            color_formats: color_formats.iter().cloned().collect(),
            depth_format,
        }
    }

    /// Register compute pipeline.
    pub fn create_compute_pipeline(&mut self, mut info: ComputePipelineInfo) -> PipelineId {
        let id = self.next();
        info.native = NativePipeline(id);
        self.compute.insert(PipelineId(id), info);
        PipelineId(id)
    }

    /// Compute pipeline description reading the first 8 slots of every kind,
    /// receiving push constants at buffer slot 8.
    pub fn compute_pipeline_info(layout: PipelineLayoutId) -> ComputePipelineInfo {
        ComputePipelineInfo {
            native: NativePipeline(0),
            layout,
            usage: SlotUsage::all(8, 8, 4),
            push_constant_slot: Some(8),
            threadgroup_size: [8, 8, 1],
        }
    }

    /// Register descriptor set resolving to `bindings`.
    /// Dynamic offsets are added to the first `dynamic_offsets` buffer bindings in order.
    pub fn create_descriptor_set(
        &mut self,
        dynamic_offsets: u32,
        bindings: Vec<SlotBinding>,
    ) -> DescriptorSetId {
        let id = DescriptorSetId(self.next());
        self.sets
            .insert(id, (DescriptorSetInfo { dynamic_offsets }, bindings));
        id
    }

    /// Register render pass.
    pub fn create_render_pass(&mut self, info: RenderPassInfo) -> RenderPassId {
        let id = RenderPassId(self.next());
        self.render_passes.insert(id, info);
        id
    }

    /// Register framebuffer.
    pub fn create_framebuffer(&mut self, info: FramebufferInfo) -> FramebufferId {
        let id = FramebufferId(self.next());
        self.framebuffers.insert(id, info);
        id
    }

    /// Register query pool with a results buffer.
    pub fn create_query_pool(&mut self, kind: QueryType, count: u32) -> QueryPoolId {
        let id = self.next();
        self.query_pools.insert(
            QueryPoolId(id),
            QueryPoolInfo {
                kind,
                count,
                results: Some(NativeBuffer(id)),
            },
        );
        QueryPoolId(id)
    }

    /// Register event, natively backed or emulated.
    pub fn create_event(&mut self, native: bool) -> EventId {
        let id = self.next();
        self.events.insert(
            EventId(id),
            EventInfo {
                native: if native { Some(NativeEvent(id)) } else { None },
            },
        );
        EventId(id)
    }

    /// Override capabilities of a format.
    /// Unlisted formats support everything.
    pub fn set_format_capabilities(&mut self, format: Format, capabilities: FormatCapabilities) {
        self.formats.insert(format, capabilities);
    }

    /// Signals delivered so far.
    pub fn signals(&self) -> Vec<DeviceSignal> {
        self.signals.lock().clone()
    }
}

impl Device for EmptyDevice {
    fn config(&self) -> &Config {
        &self.config
    }

    fn limits(&self) -> &Limits {
        &self.limits
    }

    fn buffer(&self, id: BufferId) -> Option<BufferInfo> {
        self.buffers.get(&id).cloned()
    }

    fn image(&self, id: ImageId) -> Option<ImageInfo> {
        self.images.get(&id).cloned()
    }

    fn image_view(&self, id: ImageViewId) -> Option<ImageViewInfo> {
        self.views.get(&id).cloned()
    }

    fn graphics_pipeline(&self, id: PipelineId) -> Option<&GraphicsPipelineInfo> {
        self.graphics.get(&id)
    }

    fn compute_pipeline(&self, id: PipelineId) -> Option<&ComputePipelineInfo> {
        self.compute.get(&id)
    }

    fn pipeline_layout(&self, id: PipelineLayoutId) -> Option<PipelineLayoutInfo> {
        self.layouts.get(&id).cloned()
    }

    fn descriptor_set(&self, id: DescriptorSetId) -> Option<DescriptorSetInfo> {
        self.sets.get(&id).map(|(info, _)| *info)
    }

    fn descriptor_set_bindings(
        &self,
        _layout: PipelineLayoutId,
        _set_index: u32,
        set: DescriptorSetId,
        dynamic_offsets: &[u32],
        out: &mut dyn FnMut(SlotBinding),
    ) {
        let mut dynamic = dynamic_offsets.iter();
        if let Some((_, bindings)) = self.sets.get(&set) {
            for binding in bindings {
                let mut binding = *binding;
                if let SlotResource::Buffer { ref mut offset, .. } = binding.resource {
                    if let Some(&extra) = dynamic.next() {
                        *offset += u64::from(extra);
                    }
                }
                out(binding);
            }
        }
    }

    fn push_descriptor_bindings(
        &self,
        _layout: PipelineLayoutId,
        _set_index: u32,
        writes: &[DescriptorWrite],
        out: &mut dyn FnMut(SlotBinding),
    ) {
        let stages = [BindStage::Vertex, BindStage::Fragment, BindStage::Compute];
        for write in writes {
            let index = write.binding + write.element;
            let mut resources: SmallVec<[SlotResource; 2]> = SmallVec::new();
            match write.resource {
                DescriptorResource::Buffer { buffer, offset, .. } => {
                    if let Some(info) = self.buffers.get(&buffer) {
                        resources.push(SlotResource::Buffer {
                            buffer: info.native,
                            offset,
                        });
                    }
                }
                DescriptorResource::Image { view, .. } => {
                    if let Some(info) = self.views.get(&view) {
                        resources.push(SlotResource::Texture(info.native));
                    }
                }
                DescriptorResource::Sampler(sampler) => {
                    if let Some(&native) = self.samplers.get(&sampler) {
                        resources.push(SlotResource::Sampler(native));
                    }
                }
                DescriptorResource::CombinedImageSampler { view, sampler, .. } => {
                    if let Some(info) = self.views.get(&view) {
                        resources.push(SlotResource::Texture(info.native));
                    }
                    if let Some(&native) = self.samplers.get(&sampler) {
                        resources.push(SlotResource::Sampler(native));
                    }
                }
            }

            for &stage in &stages {
                for &resource in &resources {
                    out(SlotBinding {
                        stage,
                        index,
                        resource,
                    });
                }
            }
        }
    }

    fn render_pass(&self, id: RenderPassId) -> Option<&RenderPassInfo> {
        self.render_passes.get(&id)
    }

    fn framebuffer(&self, id: FramebufferId) -> Option<&FramebufferInfo> {
        self.framebuffers.get(&id)
    }

    fn query_pool(&self, id: QueryPoolId) -> Option<QueryPoolInfo> {
        self.query_pools.get(&id).cloned()
    }

    fn event(&self, id: EventId) -> Option<EventInfo> {
        self.events.get(&id).cloned()
    }

    fn format_capabilities(&self, format: Format) -> FormatCapabilities {
        self.formats
            .get(&format)
            .cloned()
            .unwrap_or_else(FormatCapabilities::all)
    }

    fn mark_queries_available(&self, pool: QueryPoolId, queries: &[u32]) {
        self.signals.lock().push(DeviceSignal::QueriesAvailable {
            pool,
            queries: queries.to_vec(),
        });
    }

    fn reset_queries(&self, pool: QueryPoolId, first: u32, count: u32) {
        self.signals
            .lock()
            .push(DeviceSignal::QueriesReset { pool, first, count });
    }

    fn write_timestamp(&self, pool: QueryPoolId, query: u32) {
        self.signals
            .lock()
            .push(DeviceSignal::Timestamp { pool, query });
    }

    fn set_event_status(&self, event: EventId, signaled: bool) {
        self.signals
            .lock()
            .push(DeviceSignal::EventStatus { event, signaled });
    }
}

/// Native call logged by `Recorder`.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    BeginRenderPass(RenderPassDescriptor, String),
    BeginComputePass(String),
    BeginBlitPass(String),
    EndEncoding,
    SetColorStoreAction(u32, StoreAction),
    SetDepthStoreAction(StoreAction),
    SetStencilStoreAction(StoreAction),
    SetRenderPipeline(NativePipeline),
    SetComputePipeline(NativePipeline),
    SetBuffer {
        stage: BindStage,
        index: u32,
        buffer: NativeBuffer,
        offset: u64,
    },
    SetBufferOffset {
        stage: BindStage,
        index: u32,
        offset: u64,
    },
    SetBytes {
        stage: BindStage,
        index: u32,
        bytes: Vec<u8>,
    },
    SetTexture {
        stage: BindStage,
        index: u32,
        texture: NativeTexture,
    },
    SetSampler {
        stage: BindStage,
        index: u32,
        sampler: NativeSampler,
    },
    SetViewports(Vec<Viewport>),
    SetScissorRects(Vec<Rect>),
    SetDepthBias([f32; 3]),
    SetBlendColor([f32; 4]),
    SetStencilReference(u32, u32),
    SetVisibilityResultMode(VisibilityMode, u64),
    Draw {
        primitive: PrimitiveType,
        first_vertex: u32,
        vertex_count: u32,
        instance_count: u32,
        first_instance: u32,
    },
    DrawIndexed {
        primitive: PrimitiveType,
        index_count: u32,
        index_type: IndexType,
        index_buffer: NativeBuffer,
        index_offset: u64,
        instance_count: u32,
        base_vertex: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: NativeBuffer,
        offset: u64,
    },
    DrawIndexedIndirect {
        index_buffer: NativeBuffer,
        index_offset: u64,
        buffer: NativeBuffer,
        offset: u64,
    },
    Dispatch {
        groups: [u32; 3],
        threads: [u32; 3],
    },
    DispatchIndirect {
        buffer: NativeBuffer,
        offset: u64,
    },
    CopyBuffer {
        src: NativeBuffer,
        src_offset: u64,
        dst: NativeBuffer,
        dst_offset: u64,
        size: u64,
    },
    CopyTexture(NativeTexture, NativeTexture, ImageCopy),
    CopyBufferToTexture(NativeBuffer, NativeTexture, BufferImageCopy),
    CopyTextureToBuffer(NativeTexture, NativeBuffer, BufferImageCopy),
    BlitTexture(NativeTexture, NativeTexture, ImageBlit, Filter),
    ResolveTexture(NativeTexture, NativeTexture, ImageCopy),
    FillBuffer {
        dst: NativeBuffer,
        offset: u64,
        size: u64,
        value: u32,
    },
    UpdateBuffer {
        dst: NativeBuffer,
        offset: u64,
        data: Vec<u8>,
    },
    ClearAttachments(Vec<ClearAttachment>, Vec<ClearRect>),
    CopyQueryResults {
        first: u32,
        count: u32,
        dst: NativeBuffer,
        dst_offset: u64,
        stride: u64,
    },
    WaitForFence(NativeFence, BarrierStage),
    UpdateFence(NativeFence, BarrierStage),
    MemoryBarrier(BarrierStage, BarrierStage),
    SignalEvent(NativeEvent, u64),
    WaitEvent(NativeEvent, u64),
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugSignpost(String),
}

impl Call {
    /// Check if call binds a resource to a slot.
    pub fn is_bind(&self) -> bool {
        match self {
            Call::SetBuffer { .. }
            | Call::SetBufferOffset { .. }
            | Call::SetTexture { .. }
            | Call::SetSampler { .. } => true,
            _ => false,
        }
    }

    /// Check if call opens an encoder.
    pub fn is_begin(&self) -> bool {
        match self {
            Call::BeginRenderPass(..) | Call::BeginComputePass(_) | Call::BeginBlitPass(_) => true,
            _ => false,
        }
    }
}

/// Native command buffer logging calls.
///
/// Panics when a call is made without the encoder it requires.
#[derive(derivative::Derivative, Default)]
#[derivative(Debug)]
pub struct Recorder {
    /// Logged calls.
    pub calls: Vec<Call>,
    open: Option<EncoderKind>,
    #[derivative(Debug = "ignore")]
    handlers: Vec<Box<dyn FnOnce() + Send>>,
}

impl Recorder {
    /// Create empty recorder.
    pub fn new() -> Self {
        Recorder::default()
    }

    /// Kind of the open encoder.
    pub fn open(&self) -> Option<EncoderKind> {
        self.open
    }

    /// Simulate completion by running completion handlers.
    pub fn complete(&mut self) {
        for handler in self.handlers.drain(..) {
            handler();
        }
    }

    /// Number of logged calls matching the predicate.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Number of slot binding calls.
    pub fn binds(&self) -> usize {
        self.count(Call::is_bind)
    }

    /// Forget logged calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    fn begin(&mut self, kind: EncoderKind, call: Call) {
        assert!(
            self.open.is_none(),
            "Opening {:?} encoder while {:?} is open",
            kind,
            self.open
        );
        self.open = Some(kind);
        self.calls.push(call);
    }

    fn inside(&mut self, kind: EncoderKind, call: Call) {
        assert_eq!(self.open, Some(kind), "{:?} requires {:?} encoder", call, kind);
        self.calls.push(call);
    }

    fn inside_any(&mut self, call: Call) {
        assert!(self.open.is_some(), "{:?} requires open encoder", call);
        self.calls.push(call);
    }

    fn outside(&mut self, call: Call) {
        assert!(self.open.is_none(), "{:?} requires no open encoder", call);
        self.calls.push(call);
    }

    fn bind_kind(stage: BindStage) -> EncoderKind {
        match stage {
            BindStage::Vertex | BindStage::Fragment => EncoderKind::Render,
            BindStage::Compute => EncoderKind::Compute,
        }
    }
}

impl NativeCommandBuffer for Recorder {
    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor, label: &str) {
        self.begin(
            EncoderKind::Render,
            Call::BeginRenderPass(descriptor.clone(), label.to_owned()),
        );
    }

    fn begin_compute_pass(&mut self, label: &str) {
        self.begin(EncoderKind::Compute, Call::BeginComputePass(label.to_owned()));
    }

    fn begin_blit_pass(&mut self, label: &str) {
        self.begin(EncoderKind::Blit, Call::BeginBlitPass(label.to_owned()));
    }

    fn end_encoding(&mut self) {
        assert!(self.open.is_some(), "No encoder to end");
        self.open = None;
        self.calls.push(Call::EndEncoding);
    }

    fn set_color_store_action(&mut self, index: u32, action: StoreAction) {
        self.inside(EncoderKind::Render, Call::SetColorStoreAction(index, action));
    }

    fn set_depth_store_action(&mut self, action: StoreAction) {
        self.inside(EncoderKind::Render, Call::SetDepthStoreAction(action));
    }

    fn set_stencil_store_action(&mut self, action: StoreAction) {
        self.inside(EncoderKind::Render, Call::SetStencilStoreAction(action));
    }

    fn set_render_pipeline(&mut self, pipeline: NativePipeline) {
        self.inside(EncoderKind::Render, Call::SetRenderPipeline(pipeline));
    }

    fn set_compute_pipeline(&mut self, pipeline: NativePipeline) {
        self.inside(EncoderKind::Compute, Call::SetComputePipeline(pipeline));
    }

    fn set_buffer(&mut self, stage: BindStage, index: u32, buffer: NativeBuffer, offset: u64) {
        self.inside(
            Self::bind_kind(stage),
            Call::SetBuffer {
                stage,
                index,
                buffer,
                offset,
            },
        );
    }

    fn set_buffer_offset(&mut self, stage: BindStage, index: u32, offset: u64) {
        self.inside(
            Self::bind_kind(stage),
            Call::SetBufferOffset {
                stage,
                index,
                offset,
            },
        );
    }

    fn set_bytes(&mut self, stage: BindStage, index: u32, bytes: &[u8]) {
        self.inside(
            Self::bind_kind(stage),
            Call::SetBytes {
                stage,
                index,
                bytes: bytes.to_vec(),
            },
        );
    }

    fn set_texture(&mut self, stage: BindStage, index: u32, texture: NativeTexture) {
        self.inside(
            Self::bind_kind(stage),
            Call::SetTexture {
                stage,
                index,
                texture,
            },
        );
    }

    fn set_sampler(&mut self, stage: BindStage, index: u32, sampler: NativeSampler) {
        self.inside(
            Self::bind_kind(stage),
            Call::SetSampler {
                stage,
                index,
                sampler,
            },
        );
    }

    fn set_viewports(&mut self, viewports: &[Viewport]) {
        self.inside(EncoderKind::Render, Call::SetViewports(viewports.to_vec()));
    }

    fn set_scissor_rects(&mut self, rects: &[Rect]) {
        self.inside(EncoderKind::Render, Call::SetScissorRects(rects.to_vec()));
    }

    fn set_depth_bias(&mut self, constant: f32, slope: f32, clamp: f32) {
        self.inside(
            EncoderKind::Render,
            Call::SetDepthBias([constant, slope, clamp]),
        );
    }

    fn set_blend_color(&mut self, color: [f32; 4]) {
        self.inside(EncoderKind::Render, Call::SetBlendColor(color));
    }

    fn set_stencil_reference(&mut self, front: u32, back: u32) {
        self.inside(EncoderKind::Render, Call::SetStencilReference(front, back));
    }

    fn set_visibility_result_mode(&mut self, mode: VisibilityMode, offset: u64) {
        self.inside(
            EncoderKind::Render,
            Call::SetVisibilityResultMode(mode, offset),
        );
    }

    fn draw_primitives(
        &mut self,
        primitive: PrimitiveType,
        first_vertex: u32,
        vertex_count: u32,
        instance_count: u32,
        first_instance: u32,
    ) {
        self.inside(
            EncoderKind::Render,
            Call::Draw {
                primitive,
                first_vertex,
                vertex_count,
                instance_count,
                first_instance,
            },
        );
    }

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
    ) {
        self.inside(
            EncoderKind::Render,
            Call::DrawIndexed {
                primitive,
                index_count,
                index_type,
                index_buffer,
                index_offset,
                instance_count,
                base_vertex,
                first_instance,
            },
        );
    }

    fn draw_primitives_indirect(
        &mut self,
        _primitive: PrimitiveType,
        buffer: NativeBuffer,
        offset: u64,
    ) {
        self.inside(EncoderKind::Render, Call::DrawIndirect { buffer, offset });
    }

    fn draw_indexed_primitives_indirect(
        &mut self,
        _primitive: PrimitiveType,
        _index_type: IndexType,
        index_buffer: NativeBuffer,
        index_offset: u64,
        buffer: NativeBuffer,
        offset: u64,
    ) {
        self.inside(
            EncoderKind::Render,
            Call::DrawIndexedIndirect {
                index_buffer,
                index_offset,
                buffer,
                offset,
            },
        );
    }

    fn dispatch_threadgroups(&mut self, groups: [u32; 3], threads_per_group: [u32; 3]) {
        self.inside(
            EncoderKind::Compute,
            Call::Dispatch {
                groups,
                threads: threads_per_group,
            },
        );
    }

    fn dispatch_threadgroups_indirect(
        &mut self,
        buffer: NativeBuffer,
        offset: u64,
        _threads_per_group: [u32; 3],
    ) {
        self.inside(EncoderKind::Compute, Call::DispatchIndirect { buffer, offset });
    }

    fn copy_buffer(
        &mut self,
        src: NativeBuffer,
        src_offset: u64,
        dst: NativeBuffer,
        dst_offset: u64,
        size: u64,
    ) {
        self.inside(
            EncoderKind::Blit,
            Call::CopyBuffer {
                src,
                src_offset,
                dst,
                dst_offset,
                size,
            },
        );
    }

    fn copy_texture(&mut self, src: NativeTexture, dst: NativeTexture, region: &ImageCopy) {
        self.inside(EncoderKind::Blit, Call::CopyTexture(src, dst, *region));
    }

    fn copy_buffer_to_texture(
        &mut self,
        src: NativeBuffer,
        dst: NativeTexture,
        region: &BufferImageCopy,
    ) {
        self.inside(
            EncoderKind::Blit,
            Call::CopyBufferToTexture(src, dst, *region),
        );
    }

    fn copy_texture_to_buffer(
        &mut self,
        src: NativeTexture,
        dst: NativeBuffer,
        region: &BufferImageCopy,
    ) {
        self.inside(
            EncoderKind::Blit,
            Call::CopyTextureToBuffer(src, dst, *region),
        );
    }

    fn blit_texture(
        &mut self,
        src: NativeTexture,
        dst: NativeTexture,
        region: &ImageBlit,
        filter: Filter,
    ) {
        self.inside(
            EncoderKind::Blit,
            Call::BlitTexture(src, dst, *region, filter),
        );
    }

    fn resolve_texture(&mut self, src: NativeTexture, dst: NativeTexture, region: &ImageCopy) {
        self.inside(EncoderKind::Blit, Call::ResolveTexture(src, dst, *region));
    }

    fn fill_buffer(&mut self, dst: NativeBuffer, offset: u64, size: u64, value: u32) {
        self.inside(
            EncoderKind::Blit,
            Call::FillBuffer {
                dst,
                offset,
                size,
                value,
            },
        );
    }

    fn update_buffer(&mut self, dst: NativeBuffer, offset: u64, data: &[u8]) {
        self.inside(
            EncoderKind::Blit,
            Call::UpdateBuffer {
                dst,
                offset,
                data: data.to_vec(),
            },
        );
    }

    fn clear_attachments(&mut self, attachments: &[ClearAttachment], rects: &[ClearRect]) {
        self.inside(
            EncoderKind::Render,
            Call::ClearAttachments(attachments.to_vec(), rects.to_vec()),
        );
    }

    fn copy_query_results(
        &mut self,
        _results: NativeBuffer,
        first: u32,
        count: u32,
        dst: NativeBuffer,
        dst_offset: u64,
        stride: u64,
        _flags: QueryResultFlags,
    ) {
        self.inside(
            EncoderKind::Compute,
            Call::CopyQueryResults {
                first,
                count,
                dst,
                dst_offset,
                stride,
            },
        );
    }

    fn wait_for_fence(&mut self, fence: NativeFence, before: BarrierStage) {
        self.inside_any(Call::WaitForFence(fence, before));
    }

    fn update_fence(&mut self, fence: NativeFence, after: BarrierStage) {
        self.inside_any(Call::UpdateFence(fence, after));
    }

    fn memory_barrier(&mut self, after: BarrierStage, before: BarrierStage) {
        self.inside(EncoderKind::Render, Call::MemoryBarrier(after, before));
    }

    fn signal_event(&mut self, event: NativeEvent, value: u64) {
        self.outside(Call::SignalEvent(event, value));
    }

    fn wait_event(&mut self, event: NativeEvent, value: u64) {
        self.outside(Call::WaitEvent(event, value));
    }

    fn push_debug_group(&mut self, label: &str) {
        self.calls.push(Call::PushDebugGroup(label.to_owned()));
    }

    fn pop_debug_group(&mut self) {
        self.calls.push(Call::PopDebugGroup);
    }

    fn insert_debug_signpost(&mut self, label: &str) {
        self.calls.push(Call::InsertDebugSignpost(label.to_owned()));
    }

    fn add_completed_handler(&mut self, handler: Box<dyn FnOnce() + Send>) {
        self.handlers.push(handler);
    }
}
