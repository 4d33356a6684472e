use {
    super::{state::RecordContext, Body, CommandBuffer, Lifecycle},
    crate::{
        command::*,
        error::{RecordError, ValidationError},
        pool::CommandPool,
    },
    forge_chain::Barrier,
    forge_core::{
        BufferCopy, BufferId, BufferImageCopy, ClearAttachment, ClearRect, DescriptorSetId,
        DescriptorWrite, EventId, Filter, ImageBlit, ImageCopy, ImageId, ImageSubresourceRange,
        IndexType, PipelineBindPoint, PipelineId, PipelineLayoutId, PipelineStageFlags,
        QueryControlFlags, QueryPoolId, QueryResultFlags, Rect, ShaderStageFlags,
        StencilFaceFlags, SubpassContents, Viewport,
    },
    std::ops::Range,
};

/// Appends commands to a command buffer in recording state.
///
/// Every command is validated when recorded. The first rejected command invalidates
/// the buffer: it is not recorded and every following call fails with the same error
/// until the buffer is reset.
#[derive(Debug)]
pub struct CommandRecorder<'a> {
    buffer: &'a mut CommandBuffer,
    pool: &'a mut CommandPool,
}

impl<'a> CommandRecorder<'a> {
    pub(crate) fn new(buffer: &'a mut CommandBuffer, pool: &'a mut CommandPool) -> Self {
        CommandRecorder { buffer, pool }
    }

    /// Recorded buffer.
    pub fn buffer(&self) -> &CommandBuffer {
        self.buffer
    }

    fn record<T: Pooled>(
        &mut self,
        fill: impl FnOnce(&mut T, &mut RecordContext<'_>) -> Result<(), ValidationError>,
    ) -> Result<(), RecordError> {
        let buffer = &mut *self.buffer;
        let lifecycle = buffer.shared.lifecycle();
        if lifecycle != Lifecycle::Recording {
            return Err(RecordError::NotRecording(lifecycle));
        }
        if let Some(error) = &buffer.error {
            return Err(RecordError::Invalidated(error.clone()));
        }
        let recording = match &mut buffer.body {
            Body::Recording(recording) => recording,
            _ => return Err(RecordError::NotRecording(lifecycle)),
        };

        let pool = &mut *self.pool;
        let mut command = T::pool(&mut pool.commands).acquire();
        let result = fill(
            &mut command,
            &mut RecordContext {
                device: &*pool.device,
                recording: &mut *recording,
                state: &mut buffer.state,
            },
        );

        match result {
            Ok(()) => {
                recording.push(command.into_command());
                Ok(())
            }
            Err(error) => {
                T::pool(&mut pool.commands).release(command);
                log::warn!("Command rejected, buffer is invalid: {}", error);
                buffer.error = Some(error.clone());
                Err(RecordError::Rejected(error))
            }
        }
    }

    /// Bind pipeline to the bind point.
    pub fn bind_pipeline(
        &mut self,
        bind_point: PipelineBindPoint,
        pipeline: PipelineId,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut BindPipeline, ctx| {
            command.set_content(ctx, bind_point, pipeline)
        })
    }

    /// Bind descriptor sets starting from `first_set`.
    ///
    /// `dynamic_offsets` are consumed by dynamic descriptors of the sets in order.
    pub fn bind_descriptor_sets(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: &[DescriptorSetId],
        dynamic_offsets: &[u32],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut BindDescriptorSets, ctx| {
            command.set_content(ctx, bind_point, layout, first_set, sets, dynamic_offsets)
        })
    }

    /// Update descriptors of the set inline.
    pub fn push_descriptor_set(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        set: u32,
        writes: &[DescriptorWrite],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut PushDescriptorSet, ctx| {
            command.set_content(ctx, bind_point, layout, set, writes)
        })
    }

    /// Update push constants of the stages.
    /// `offset` and length of `data` must be multiples of 4.
    pub fn push_constants(
        &mut self,
        layout: PipelineLayoutId,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut PushConstants, ctx| {
            command.set_content(ctx, layout, stages, offset, data)
        })
    }

    /// Bind vertex buffers with offsets starting from `first_binding`.
    pub fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[(BufferId, u64)],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut BindVertexBuffers, ctx| {
            command.set_content(ctx, first_binding, buffers)
        })
    }

    /// Bind index buffer used by indexed draws.
    pub fn bind_index_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        index_type: IndexType,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut BindIndexBuffer, ctx| {
            command.set_content(ctx, buffer, offset, index_type)
        })
    }

    /// Set viewports starting from `first`.
    pub fn set_viewports(&mut self, first: u32, viewports: &[Viewport]) -> Result<(), RecordError> {
        self.record(|command: &mut SetViewport, ctx| command.set_content(ctx, first, viewports))
    }

    /// Set scissors starting from `first`.
    pub fn set_scissors(&mut self, first: u32, scissors: &[Rect]) -> Result<(), RecordError> {
        self.record(|command: &mut SetScissor, ctx| command.set_content(ctx, first, scissors))
    }

    /// Set line width. Only `1.0` is supported natively.
    pub fn set_line_width(&mut self, width: f32) -> Result<(), RecordError> {
        self.record(|command: &mut SetLineWidth, ctx| command.set_content(ctx, width))
    }

    /// Set depth bias.
    pub fn set_depth_bias(
        &mut self,
        constant_factor: f32,
        clamp: f32,
        slope_factor: f32,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut SetDepthBias, ctx| {
            command.set_content(ctx, constant_factor, clamp, slope_factor)
        })
    }

    /// Set blend constants.
    pub fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<(), RecordError> {
        self.record(|command: &mut SetBlendConstants, ctx| command.set_content(ctx, constants))
    }

    /// Set depth bounds. Bounds other than `0.0..1.0` are not supported natively.
    pub fn set_depth_bounds(&mut self, bounds: Range<f32>) -> Result<(), RecordError> {
        self.record(|command: &mut SetDepthBounds, ctx| {
            command.set_content(ctx, bounds.start, bounds.end)
        })
    }

    /// Set stencil compare mask.
    pub fn set_stencil_compare_mask(
        &mut self,
        faces: StencilFaceFlags,
        mask: u32,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut SetStencilCompareMask, ctx| {
            command.set_content(ctx, faces, mask)
        })
    }

    /// Set stencil write mask.
    pub fn set_stencil_write_mask(
        &mut self,
        faces: StencilFaceFlags,
        mask: u32,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut SetStencilWriteMask, ctx| {
            command.set_content(ctx, faces, mask)
        })
    }

    /// Set stencil reference.
    pub fn set_stencil_reference(
        &mut self,
        faces: StencilFaceFlags,
        reference: u32,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut SetStencilReference, ctx| {
            command.set_content(ctx, faces, reference)
        })
    }

    /// Draw.
    ///
    /// Requires an active render pass and a bound graphics pipeline.
    pub fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) -> Result<(), RecordError> {
        let command = DrawCommand {
            vertex_count: vertices.end.saturating_sub(vertices.start),
            instance_count: instances.end.saturating_sub(instances.start),
            first_vertex: vertices.start,
            first_instance: instances.start,
        };
        self.record(|draw: &mut Draw, ctx| draw.set_content(ctx, command))
    }

    /// Draw indexed, with `base_vertex` specifying an offset that is treated as
    /// vertex number 0.
    pub fn draw_indexed(
        &mut self,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) -> Result<(), RecordError> {
        let command = DrawIndexedCommand {
            index_count: indices.end.saturating_sub(indices.start),
            instance_count: instances.end.saturating_sub(instances.start),
            first_index: indices.start,
            vertex_offset: base_vertex,
            first_instance: instances.start,
        };
        self.record(|draw: &mut DrawIndexed, ctx| draw.set_content(ctx, command))
    }

    /// Draw indirect.
    /// `buffer` must contain `draw_count` of [`DrawCommand`] starting from `offset`
    /// with `stride` bytes between each.
    ///
    /// [`DrawCommand`]: struct.DrawCommand.html
    pub fn draw_indirect(
        &mut self,
        buffer: BufferId,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut DrawIndirect, ctx| {
            command.set_content(ctx, buffer, offset, draw_count, stride)
        })
    }

    /// Draw indirect with indices.
    /// `buffer` must contain `draw_count` of [`DrawIndexedCommand`] starting from `offset`
    /// with `stride` bytes between each.
    ///
    /// [`DrawIndexedCommand`]: struct.DrawIndexedCommand.html
    pub fn draw_indexed_indirect(
        &mut self,
        buffer: BufferId,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut DrawIndexedIndirect, ctx| {
            command.set_content(ctx, buffer, offset, draw_count, stride)
        })
    }

    /// Dispatch compute work groups.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), RecordError> {
        self.record(|command: &mut Dispatch, ctx| {
            command.set_content(ctx, DispatchCommand { x, y, z })
        })
    }

    /// Dispatch with work group counts read from [`DispatchCommand`] in `buffer`.
    ///
    /// [`DispatchCommand`]: struct.DispatchCommand.html
    pub fn dispatch_indirect(&mut self, buffer: BufferId, offset: u64) -> Result<(), RecordError> {
        self.record(|command: &mut DispatchIndirect, ctx| {
            command.set_content(ctx, buffer, offset)
        })
    }

    /// Copy regions between buffers.
    pub fn copy_buffer(
        &mut self,
        src: BufferId,
        dst: BufferId,
        regions: &[BufferCopy],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut CopyBuffer, ctx| command.set_content(ctx, src, dst, regions))
    }

    /// Copy regions between images with equal sample counts.
    pub fn copy_image(
        &mut self,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageCopy],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut CopyImage, ctx| command.set_content(ctx, src, dst, regions))
    }

    /// Copy scaled regions between single-sampled images.
    pub fn blit_image(
        &mut self,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageBlit],
        filter: Filter,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut BlitImage, ctx| {
            command.set_content(ctx, src, dst, regions, filter)
        })
    }

    /// Resolve multisampled image into single-sampled one.
    pub fn resolve_image(
        &mut self,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageCopy],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut ResolveImage, ctx| command.set_content(ctx, src, dst, regions))
    }

    /// Copy buffer regions into image.
    pub fn copy_buffer_to_image(
        &mut self,
        src: BufferId,
        dst: ImageId,
        regions: &[BufferImageCopy],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut CopyBufferToImage, ctx| {
            command.set_content(ctx, src, dst, regions)
        })
    }

    /// Copy image regions into buffer.
    pub fn copy_image_to_buffer(
        &mut self,
        src: ImageId,
        dst: BufferId,
        regions: &[BufferImageCopy],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut CopyImageToBuffer, ctx| {
            command.set_content(ctx, src, dst, regions)
        })
    }

    /// Fill buffer range with repeated `value`.
    /// [`WHOLE_SIZE`] fills up to the end of the buffer.
    ///
    /// [`WHOLE_SIZE`]: constant.WHOLE_SIZE.html
    pub fn fill_buffer(
        &mut self,
        dst: BufferId,
        offset: u64,
        size: u64,
        value: u32,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut FillBuffer, ctx| {
            command.set_content(ctx, dst, offset, size, value)
        })
    }

    /// Write `data` into buffer. The data is copied into the recording.
    pub fn update_buffer(
        &mut self,
        dst: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut UpdateBuffer, ctx| command.set_content(ctx, dst, offset, data))
    }

    /// Clear color image subresources outside of render passes.
    pub fn clear_color_image(
        &mut self,
        image: ImageId,
        color: [f32; 4],
        ranges: &[ImageSubresourceRange],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut ClearColorImage, ctx| {
            command.set_content(ctx, image, color, ranges)
        })
    }

    /// Clear depth-stencil image subresources outside of render passes.
    pub fn clear_depth_stencil_image(
        &mut self,
        image: ImageId,
        depth: f32,
        stencil: u32,
        ranges: &[ImageSubresourceRange],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut ClearDepthStencilImage, ctx| {
            command.set_content(ctx, image, depth, stencil, ranges)
        })
    }

    /// Clear regions of attachments of the current sub-pass.
    pub fn clear_attachments(
        &mut self,
        attachments: &[ClearAttachment],
        rects: &[ClearRect],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut ClearAttachments, ctx| {
            command.set_content(ctx, attachments, rects)
        })
    }

    /// Insert pipeline barrier.
    pub fn pipeline_barrier(
        &mut self,
        src_stages: PipelineStageFlags,
        dst_stages: PipelineStageFlags,
        barriers: &[Barrier],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut PipelineBarrier, ctx| {
            command.set_content(ctx, src_stages, dst_stages, barriers)
        })
    }

    /// Signal event once work of `stages` completes.
    pub fn set_event(&mut self, event: EventId, stages: PipelineStageFlags) -> Result<(), RecordError> {
        self.record(|command: &mut SetEvent, ctx| command.set_content(ctx, event, stages))
    }

    /// Unsignal event once work of `stages` completes.
    pub fn reset_event(
        &mut self,
        event: EventId,
        stages: PipelineStageFlags,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut ResetEvent, ctx| command.set_content(ctx, event, stages))
    }

    /// Wait for events before work of `dst_stages` starts.
    pub fn wait_events(
        &mut self,
        events: &[EventId],
        src_stages: PipelineStageFlags,
        dst_stages: PipelineStageFlags,
        barriers: &[Barrier],
    ) -> Result<(), RecordError> {
        self.record(|command: &mut WaitEvents, ctx| {
            command.set_content(ctx, events, src_stages, dst_stages, barriers)
        })
    }

    /// Begin occlusion query.
    pub fn begin_query(
        &mut self,
        pool: QueryPoolId,
        query: u32,
        flags: QueryControlFlags,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut BeginQuery, ctx| command.set_content(ctx, pool, query, flags))
    }

    /// End query begun with `begin_query`.
    pub fn end_query(&mut self, pool: QueryPoolId, query: u32) -> Result<(), RecordError> {
        self.record(|command: &mut EndQuery, ctx| command.set_content(ctx, pool, query))
    }

    /// Reset range of queries.
    pub fn reset_query_pool(
        &mut self,
        pool: QueryPoolId,
        queries: Range<u32>,
    ) -> Result<(), RecordError> {
        let count = queries.end.saturating_sub(queries.start);
        self.record(|command: &mut ResetQueryPool, ctx| {
            command.set_content(ctx, pool, queries.start, count)
        })
    }

    /// Write timestamp after work of `stage` completes.
    pub fn write_timestamp(
        &mut self,
        stage: PipelineStageFlags,
        pool: QueryPoolId,
        query: u32,
    ) -> Result<(), RecordError> {
        log::trace!("Timestamp after {:?}", stage);
        self.record(|command: &mut WriteTimestamp, ctx| command.set_content(ctx, pool, query))
    }

    /// Copy results of queries into buffer.
    pub fn copy_query_pool_results(
        &mut self,
        pool: QueryPoolId,
        queries: Range<u32>,
        dst: BufferId,
        dst_offset: u64,
        stride: u64,
        flags: QueryResultFlags,
    ) -> Result<(), RecordError> {
        let count = queries.end.saturating_sub(queries.start);
        self.record(|command: &mut CopyQueryPoolResults, ctx| {
            command.set_content(ctx, pool, queries.start, count, dst, dst_offset, stride, flags)
        })
    }

    /// Begin render pass.
    pub fn begin_render_pass(
        &mut self,
        begin: &RenderPassBegin<'_>,
        contents: SubpassContents,
    ) -> Result<(), RecordError> {
        self.record(|command: &mut BeginRenderPass, ctx| {
            command.set_content(ctx, begin, contents)
        })
    }

    /// Advance to the next sub-pass.
    pub fn next_subpass(&mut self, contents: SubpassContents) -> Result<(), RecordError> {
        self.record(|command: &mut NextSubpass, ctx| command.set_content(ctx, contents))
    }

    /// End render pass in its last sub-pass.
    pub fn end_render_pass(&mut self) -> Result<(), RecordError> {
        self.record(|command: &mut EndRenderPass, ctx| command.set_content(ctx))
    }

    /// Begin dynamic rendering.
    pub fn begin_rendering(&mut self, rendering: &RenderingInfo<'_>) -> Result<(), RecordError> {
        self.record(|command: &mut BeginRendering, ctx| command.set_content(ctx, rendering))
    }

    /// End dynamic rendering.
    pub fn end_rendering(&mut self) -> Result<(), RecordError> {
        self.record(|command: &mut EndRendering, ctx| command.set_content(ctx))
    }

    /// Execute secondary buffers.
    ///
    /// Secondary buffers are encoded inline when this buffer is submitted,
    /// so they must stay executable until then.
    pub fn execute_commands(&mut self, secondaries: &[&CommandBuffer]) -> Result<(), RecordError> {
        self.record(|command: &mut ExecuteCommands, ctx| command.set_content(ctx, secondaries))
    }

    /// Open debug label region.
    pub fn begin_debug_label(&mut self, label: &str) -> Result<(), RecordError> {
        self.record(|command: &mut BeginDebugLabel, ctx| command.set_content(ctx, label))
    }

    /// Close debug label region.
    pub fn end_debug_label(&mut self) -> Result<(), RecordError> {
        self.record(|command: &mut EndDebugLabel, ctx| command.set_content(ctx))
    }

    /// Insert debug label.
    pub fn insert_debug_label(&mut self, label: &str) -> Result<(), RecordError> {
        self.record(|command: &mut InsertDebugLabel, ctx| command.set_content(ctx, label))
    }
}
