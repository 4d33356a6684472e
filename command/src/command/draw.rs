use {
    crate::{
        buffer::state::{check_aligned, check_limit, check_range, RecordContext},
        encoder::{Encoder, IndexBinding},
        error::ValidationError,
        storage::{Storage, VertexBuffer},
    },
    forge_core::{
        BindStage, BufferId, IndexType, NativeBuffer, PipelineBindPoint, SlotBinding, SlotResource,
    },
    forge_memory::Span,
    smallvec::SmallVec,
    std::mem::size_of,
};

/// Draw command for [`draw_indirect`].
///
/// [`draw_indirect`]: ../struct.CommandRecorder.html#method.draw_indirect
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DrawCommand {
    /// Number of vertices to draw.
    pub vertex_count: u32,

    /// Number of instanced to draw.
    pub instance_count: u32,

    /// First vertex index.
    pub first_vertex: u32,

    /// First instance index.
    pub first_instance: u32,
}

/// Draw command for [`draw_indexed_indirect`].
///
/// [`draw_indexed_indirect`]: ../struct.CommandRecorder.html#method.draw_indexed_indirect
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DrawIndexedCommand {
    /// Number of indices to draw.
    pub index_count: u32,

    /// Number of instances to draw.
    pub instance_count: u32,

    /// First index.
    pub first_index: u32,

    /// Vertex offset that is added to index before indexing the vertex buffer.
    pub vertex_offset: i32,

    /// First instance index.
    pub first_instance: u32,
}

/// Draw command for dispatch.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DispatchCommand {
    /// Number of local workgroups to dispatch in the X dimension.
    pub x: u32,

    /// Number of local workgroups to dispatch in the Y dimension.
    pub y: u32,

    /// Number of local workgroups to dispatch in the Z dimension.
    pub z: u32,
}

/// Common checks of draw commands.
fn check_draw(ctx: &RecordContext<'_>) -> Result<(), ValidationError> {
    ctx.inside_pass("draw")?;
    ctx.inline_in_pass()?;
    match ctx.state.graphics_pipeline {
        Some(_) => Ok(()),
        None => Err(ValidationError::NoPipelineBound(PipelineBindPoint::Graphics)),
    }
}

/// Instance count and first instance of a draw rendering `views` layers at once.
fn layered_instances(count: u32, first: u32, views: u32) -> Option<(u32, u32)> {
    match (count.checked_mul(views), first.checked_mul(views)) {
        (Some(count), Some(first)) => Some((count, first)),
        _ => None,
    }
}

fn check_instances(
    ctx: &RecordContext<'_>,
    count: u32,
    first: u32,
) -> Result<(), ValidationError> {
    let views = ctx.state.pass.as_ref().map_or(1, |pass| pass.layered_views);
    match layered_instances(count, first, views) {
        Some(_) => Ok(()),
        None => Err(ValidationError::InstanceOverflow {
            first,
            count,
            views,
        }),
    }
}

fn check_indexed(ctx: &RecordContext<'_>) -> Result<(), ValidationError> {
    check_draw(ctx)?;
    if ctx.state.index_buffer {
        Ok(())
    } else {
        Err(ValidationError::NoIndexBuffer)
    }
}

fn check_dispatch(ctx: &RecordContext<'_>) -> Result<(), ValidationError> {
    ctx.outside_pass("dispatch")?;
    match ctx.state.compute_pipeline {
        Some(_) => Ok(()),
        None => Err(ValidationError::NoPipelineBound(PipelineBindPoint::Compute)),
    }
}

/// Check that `count` records of `size` bytes every `stride` bytes fit into the buffer.
fn check_indirect(
    ctx: &RecordContext<'_>,
    buffer: BufferId,
    offset: u64,
    count: u32,
    stride: u32,
    size: usize,
) -> Result<NativeBuffer, ValidationError> {
    let info = ctx.buffer(buffer)?;
    let size = size as u64;
    check_aligned("indirect offset", offset, 4)?;
    if count > 1 {
        check_aligned("indirect stride", u64::from(stride), 4)?;
        if u64::from(stride) < size {
            return Err(ValidationError::OutOfRange {
                what: "indirect stride",
                value: u64::from(stride),
                limit: size,
            });
        }
    }
    if count > 0 {
        let span = u64::from(count - 1) * u64::from(stride) + size;
        check_range("indirect commands", offset, span, info.size)?;
    }
    Ok(info.native)
}

#[derive(Debug, Default)]
pub(crate) struct BindVertexBuffers {
    first: u32,
    buffers: Span<VertexBuffer>,
}

impl BindVertexBuffers {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        first: u32,
        buffers: &[(BufferId, u64)],
    ) -> Result<(), ValidationError> {
        check_limit(
            "vertex buffer binding",
            u64::from(first) + buffers.len() as u64,
            u64::from(ctx.limits().max_vertex_buffers),
        )?;

        let mut resolved = SmallVec::<[VertexBuffer; 8]>::new();
        for &(buffer, offset) in buffers {
            let info = ctx.buffer(buffer)?;
            check_range("vertex buffer offset", offset, 0, info.size)?;
            resolved.push(VertexBuffer {
                buffer: info.native,
                offset,
            });
        }

        self.first = first;
        self.buffers = ctx.recording.storage.alloc(&resolved);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        let device = encoder.device;
        for (binding, vertex) in (self.first..).zip(storage.get(self.buffers)) {
            encoder.bind_slot(
                PipelineBindPoint::Graphics,
                SlotBinding {
                    stage: BindStage::Vertex,
                    index: device.vertex_buffer_slot(binding),
                    resource: SlotResource::Buffer {
                        buffer: vertex.buffer,
                        offset: vertex.offset,
                    },
                },
            );
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct BindIndexBuffer {
    buffer: NativeBuffer,
    offset: u64,
    index_type: IndexType,
}

impl BindIndexBuffer {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        buffer: BufferId,
        offset: u64,
        index_type: IndexType,
    ) -> Result<(), ValidationError> {
        let info = ctx.buffer(buffer)?;
        check_aligned("index buffer offset", offset, index_type.size())?;
        check_range("index buffer offset", offset, 0, info.size)?;

        self.buffer = info.native;
        self.offset = offset;
        self.index_type = index_type;
        ctx.state.index_buffer = true;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.graphics.index = Some(IndexBinding {
            buffer: self.buffer,
            offset: self.offset,
            index_type: self.index_type,
        });
    }
}

#[derive(Debug, Default)]
pub(crate) struct Draw {
    command: DrawCommand,
}

impl Draw {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        command: DrawCommand,
    ) -> Result<(), ValidationError> {
        check_draw(ctx)?;
        check_instances(ctx, command.instance_count, command.first_instance)?;
        self.command = command;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        let command = self.command;
        if command.vertex_count == 0 || command.instance_count == 0 {
            return;
        }
        if !encoder.graphics_encoder() {
            return;
        }
        let pipeline = match encoder.finalize_draw_state() {
            Some(pipeline) => pipeline,
            None => return,
        };

        // Layered views are selected by instance index.
        let views = encoder.layered_views();
        let (instance_count, first_instance) =
            match layered_instances(command.instance_count, command.first_instance, views) {
                Some(instances) => instances,
                None => {
                    log::error!("Draw instances overflow with {} layered views", views);
                    return;
                }
            };
        encoder.native.draw_primitives(
            pipeline.primitive,
            command.first_vertex,
            command.vertex_count,
            instance_count,
            first_instance,
        );
    }
}

#[derive(Debug, Default)]
pub(crate) struct DrawIndexed {
    command: DrawIndexedCommand,
}

impl DrawIndexed {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        command: DrawIndexedCommand,
    ) -> Result<(), ValidationError> {
        check_indexed(ctx)?;
        check_instances(ctx, command.instance_count, command.first_instance)?;
        self.command = command;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        let command = self.command;
        if command.index_count == 0 || command.instance_count == 0 {
            return;
        }
        let index = match encoder.graphics.index {
            Some(index) => index,
            None => {
                log::error!("Indexed draw without index buffer");
                return;
            }
        };
        if !encoder.graphics_encoder() {
            return;
        }
        let pipeline = match encoder.finalize_draw_state() {
            Some(pipeline) => pipeline,
            None => return,
        };

        let views = encoder.layered_views();
        let (instance_count, first_instance) =
            match layered_instances(command.instance_count, command.first_instance, views) {
                Some(instances) => instances,
                None => {
                    log::error!("Indexed draw instances overflow with {} layered views", views);
                    return;
                }
            };
        encoder.native.draw_indexed_primitives(
            pipeline.primitive,
            command.index_count,
            index.index_type,
            index.buffer,
            index.offset + u64::from(command.first_index) * index.index_type.size(),
            instance_count,
            command.vertex_offset,
            first_instance,
        );
    }
}

#[derive(Debug, Default)]
pub(crate) struct DrawIndirect {
    buffer: NativeBuffer,
    offset: u64,
    count: u32,
    stride: u32,
}

impl DrawIndirect {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        buffer: BufferId,
        offset: u64,
        count: u32,
        stride: u32,
    ) -> Result<(), ValidationError> {
        check_draw(ctx)?;
        self.buffer = check_indirect(ctx, buffer, offset, count, stride, size_of::<DrawCommand>())?;
        self.offset = offset;
        self.count = count;
        self.stride = stride;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        if self.count == 0 || !encoder.graphics_encoder() {
            return;
        }
        let pipeline = match encoder.finalize_draw_state() {
            Some(pipeline) => pipeline,
            None => return,
        };
        if encoder.layered_views() > 1 {
            encoder.fallback("layered multiview with indirect instance count");
        }

        for draw in 0..u64::from(self.count) {
            encoder.native.draw_primitives_indirect(
                pipeline.primitive,
                self.buffer,
                self.offset + draw * u64::from(self.stride),
            );
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct DrawIndexedIndirect {
    buffer: NativeBuffer,
    offset: u64,
    count: u32,
    stride: u32,
}

impl DrawIndexedIndirect {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        buffer: BufferId,
        offset: u64,
        count: u32,
        stride: u32,
    ) -> Result<(), ValidationError> {
        check_indexed(ctx)?;
        self.buffer = check_indirect(
            ctx,
            buffer,
            offset,
            count,
            stride,
            size_of::<DrawIndexedCommand>(),
        )?;
        self.offset = offset;
        self.count = count;
        self.stride = stride;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        let index = match encoder.graphics.index {
            Some(index) => index,
            None => {
                log::error!("Indexed draw without index buffer");
                return;
            }
        };
        if self.count == 0 || !encoder.graphics_encoder() {
            return;
        }
        let pipeline = match encoder.finalize_draw_state() {
            Some(pipeline) => pipeline,
            None => return,
        };
        if encoder.layered_views() > 1 {
            encoder.fallback("layered multiview with indirect instance count");
        }

        for draw in 0..u64::from(self.count) {
            encoder.native.draw_indexed_primitives_indirect(
                pipeline.primitive,
                index.index_type,
                index.buffer,
                index.offset,
                self.buffer,
                self.offset + draw * u64::from(self.stride),
            );
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Dispatch {
    command: DispatchCommand,
}

impl Dispatch {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        command: DispatchCommand,
    ) -> Result<(), ValidationError> {
        check_dispatch(ctx)?;
        let max = ctx.limits().max_compute_work_group_count;
        for (&count, &max) in [command.x, command.y, command.z].iter().zip(max.iter()) {
            check_limit("work group count", u64::from(count), u64::from(max))?;
        }
        self.command = command;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        let DispatchCommand { x, y, z } = self.command;
        if x == 0 || y == 0 || z == 0 {
            return;
        }
        encoder.compute_encoder();
        if let Some(pipeline) = encoder.finalize_dispatch_state() {
            encoder
                .native
                .dispatch_threadgroups([x, y, z], pipeline.threadgroup_size);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct DispatchIndirect {
    buffer: NativeBuffer,
    offset: u64,
}

impl DispatchIndirect {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        buffer: BufferId,
        offset: u64,
    ) -> Result<(), ValidationError> {
        check_dispatch(ctx)?;
        self.buffer = check_indirect(ctx, buffer, offset, 1, 0, size_of::<DispatchCommand>())?;
        self.offset = offset;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.compute_encoder();
        if let Some(pipeline) = encoder.finalize_dispatch_state() {
            encoder.native.dispatch_threadgroups_indirect(
                self.buffer,
                self.offset,
                pipeline.threadgroup_size,
            );
        }
    }
}
