use {
    crate::{
        buffer::state::{check_aligned, check_limit, check_range, RecordContext},
        encoder::Encoder,
        error::ValidationError,
        storage::Storage,
    },
    forge_chain::{Barrier, BarrierScope, Dependency},
    forge_core::{
        DescriptorSetId, DescriptorWrite, EventId, Format, NativeEvent, PipelineBindPoint,
        PipelineId, PipelineLayoutId, PipelineStageFlags, ShaderStageFlags, SlotBinding,
    },
    forge_memory::Span,
    smallvec::SmallVec,
};

/// Check that pipeline attachment formats match the active render pass.
fn check_formats(
    ctx: &RecordContext<'_>,
    color_formats: &[Format],
    depth_format: Option<Format>,
) -> Result<(), ValidationError> {
    let pass = match &ctx.state.pass {
        Some(pass) => pass,
        None => return Ok(()),
    };

    let colors_match = color_formats
        .iter()
        .zip(pass.color_formats.iter())
        .all(|(&pipeline, &pass)| {
            pipeline == pass || pipeline == Format::UNDEFINED || pass == Format::UNDEFINED
        });
    let depth_matches = match (depth_format, pass.depth_format) {
        (Some(pipeline), Some(pass)) => pipeline == pass,
        _ => true,
    };

    if colors_match && depth_matches {
        Ok(())
    } else {
        Err(ValidationError::AttachmentMismatch(
            "pipeline attachment formats differ from render pass",
        ))
    }
}

fn check_barriers(ctx: &RecordContext<'_>, barriers: &[Barrier]) -> Result<(), ValidationError> {
    for barrier in barriers {
        match &barrier.scope {
            BarrierScope::Global => {}
            BarrierScope::Buffer { buffer, range } => {
                let info = ctx.buffer(*buffer)?;
                if range.start > range.end {
                    return Err(ValidationError::InvalidArgument("inverted buffer barrier range"));
                }
                check_range("buffer barrier", range.start, range.end - range.start, info.size)?;
            }
            BarrierScope::Image { image, range, .. } => {
                let info = ctx.image(*image)?;
                check_range(
                    "image barrier levels",
                    u64::from(range.base_level),
                    u64::from(range.levels),
                    u64::from(info.levels),
                )?;
                check_range(
                    "image barrier layers",
                    u64::from(range.base_layer),
                    u64::from(range.layers),
                    u64::from(info.layers),
                )?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct BindPipeline {
    bind_point: PipelineBindPoint,
    pipeline: PipelineId,
}

impl BindPipeline {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        bind_point: PipelineBindPoint,
        pipeline: PipelineId,
    ) -> Result<(), ValidationError> {
        ctx.inline_in_pass()?;
        let device = ctx.device;
        match bind_point {
            PipelineBindPoint::Graphics => match device.graphics_pipeline(pipeline) {
                Some(info) => {
                    check_formats(ctx, &info.color_formats, info.depth_format)?;
                    ctx.state.graphics_pipeline = Some(pipeline);
                }
                None if device.compute_pipeline(pipeline).is_some() => {
                    return Err(ValidationError::BindPointMismatch(bind_point))
                }
                None => return Err(unknown_pipeline(pipeline)),
            },
            PipelineBindPoint::Compute => match device.compute_pipeline(pipeline) {
                Some(_) => ctx.state.compute_pipeline = Some(pipeline),
                None if device.graphics_pipeline(pipeline).is_some() => {
                    return Err(ValidationError::BindPointMismatch(bind_point))
                }
                None => return Err(unknown_pipeline(pipeline)),
            },
        }

        self.bind_point = bind_point;
        self.pipeline = pipeline;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        let device = encoder.device;
        match self.bind_point {
            PipelineBindPoint::Graphics => match device.graphics_pipeline(self.pipeline) {
                Some(info) => encoder.graphics.bind_pipeline(info),
                None => log::error!("Graphics pipeline {:?} was destroyed", self.pipeline),
            },
            PipelineBindPoint::Compute => match device.compute_pipeline(self.pipeline) {
                Some(info) => encoder.compute.bind_pipeline(info),
                None => log::error!("Compute pipeline {:?} was destroyed", self.pipeline),
            },
        }
    }
}

fn unknown_pipeline(pipeline: PipelineId) -> ValidationError {
    ValidationError::UnknownHandle {
        kind: "pipeline",
        handle: pipeline.raw(),
    }
}

#[derive(Debug, Default)]
pub(crate) struct BindDescriptorSets {
    bind_point: PipelineBindPoint,
    layout: PipelineLayoutId,
    first_set: u32,
    sets: Span<DescriptorSetId>,
    dynamic_offsets: Span<u32>,
}

impl BindDescriptorSets {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: &[DescriptorSetId],
        dynamic_offsets: &[u32],
    ) -> Result<(), ValidationError> {
        ctx.inline_in_pass()?;
        let info = ctx.pipeline_layout(layout)?;
        let end = u64::from(first_set) + sets.len() as u64;
        check_limit("descriptor set index", end, u64::from(info.sets))?;
        check_limit(
            "descriptor set index",
            end,
            u64::from(ctx.limits().max_bound_descriptor_sets),
        )?;

        let mut expected = 0u32;
        for &set in sets {
            let set_info = ctx
                .device
                .descriptor_set(set)
                .ok_or(ValidationError::UnknownHandle {
                    kind: "descriptor set",
                    handle: set.raw(),
                })?;
            expected += set_info.dynamic_offsets;
        }
        if expected as usize != dynamic_offsets.len() {
            return Err(ValidationError::DynamicOffsetCount {
                expected,
                found: dynamic_offsets.len() as u32,
            });
        }

        self.bind_point = bind_point;
        self.layout = layout;
        self.first_set = first_set;
        self.sets = ctx.recording.storage.alloc(sets);
        self.dynamic_offsets = ctx.recording.storage.alloc(dynamic_offsets);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        let device = encoder.device;
        let bind_point = self.bind_point;
        let mut offsets = storage.get(self.dynamic_offsets);

        for (set_index, &set) in (self.first_set..).zip(storage.get(self.sets)) {
            let count = device
                .descriptor_set(set)
                .map_or(0, |info| info.dynamic_offsets as usize)
                .min(offsets.len());
            let (own, rest) = offsets.split_at(count);
            offsets = rest;

            device.descriptor_set_bindings(
                self.layout,
                set_index,
                set,
                own,
                &mut |binding: SlotBinding| encoder.bind_slot(bind_point, binding),
            );
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PushDescriptorSet {
    bind_point: PipelineBindPoint,
    layout: PipelineLayoutId,
    set: u32,
    writes: Span<DescriptorWrite>,
}

impl PushDescriptorSet {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        set: u32,
        writes: &[DescriptorWrite],
    ) -> Result<(), ValidationError> {
        ctx.inline_in_pass()?;
        let info = ctx.pipeline_layout(layout)?;
        if set >= info.sets {
            return Err(ValidationError::OutOfRange {
                what: "push descriptor set index",
                value: u64::from(set),
                limit: u64::from(info.sets),
            });
        }

        self.bind_point = bind_point;
        self.layout = layout;
        self.set = set;
        self.writes = ctx.recording.storage.alloc(writes);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        let device = encoder.device;
        let bind_point = self.bind_point;
        device.push_descriptor_bindings(
            self.layout,
            self.set,
            storage.get(self.writes),
            &mut |binding: SlotBinding| encoder.bind_slot(bind_point, binding),
        );
    }
}

#[derive(Debug, Default)]
pub(crate) struct PushConstants {
    stages: ShaderStageFlags,
    offset: u32,
    bytes: Span<u8>,
}

impl PushConstants {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        layout: PipelineLayoutId,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<(), ValidationError> {
        ctx.inline_in_pass()?;
        let info = ctx.pipeline_layout(layout)?;
        if stages.is_empty() || data.is_empty() {
            return Err(ValidationError::InvalidArgument("empty push constant update"));
        }
        check_aligned("push constant offset", u64::from(offset), 4)?;
        check_aligned("push constant size", data.len() as u64, 4)?;
        let limit = info.push_constant_size.min(ctx.limits().max_push_constants_size);
        check_range(
            "push constants",
            u64::from(offset),
            data.len() as u64,
            u64::from(limit),
        )?;

        self.stages = stages;
        self.offset = offset;
        self.bytes = ctx.recording.storage.alloc(data);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        let data = storage.get(self.bytes);
        if self.stages.contains(ShaderStageFlags::VERTEX) {
            encoder.graphics.push[0].write(self.offset, data);
        }
        if self.stages.contains(ShaderStageFlags::FRAGMENT) {
            encoder.graphics.push[1].write(self.offset, data);
        }
        if self.stages.contains(ShaderStageFlags::COMPUTE) {
            encoder.compute.push.write(self.offset, data);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PipelineBarrier {
    src_stages: PipelineStageFlags,
    dst_stages: PipelineStageFlags,
    barriers: Span<Barrier>,
}

impl PipelineBarrier {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        src_stages: PipelineStageFlags,
        dst_stages: PipelineStageFlags,
        barriers: &[Barrier],
    ) -> Result<(), ValidationError> {
        ctx.inline_in_pass()?;
        check_barriers(ctx, barriers)?;
        self.src_stages = src_stages;
        self.dst_stages = dst_stages;
        self.barriers = ctx.recording.storage.alloc(barriers);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        let barriers = storage.get(self.barriers);
        if let Some(dependency) = Dependency::reduce(self.src_stages, self.dst_stages, barriers) {
            encoder.set_barrier(dependency);
        }
    }
}

/// Event handle with the native event captured at record time.
fn resolve_event(
    ctx: &RecordContext<'_>,
    event: EventId,
) -> Result<Option<NativeEvent>, ValidationError> {
    ctx.event(event).map(|info| info.native)
}

#[derive(Debug, Default)]
pub(crate) struct SetEvent {
    event: EventId,
    native: Option<NativeEvent>,
}

impl SetEvent {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        event: EventId,
        _stages: PipelineStageFlags,
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("set event")?;
        self.native = resolve_event(ctx, event)?;
        self.event = event;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.signal_event(self.event, self.native, true);
    }
}

#[derive(Debug, Default)]
pub(crate) struct ResetEvent {
    event: EventId,
    native: Option<NativeEvent>,
}

impl ResetEvent {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        event: EventId,
        _stages: PipelineStageFlags,
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("reset event")?;
        self.native = resolve_event(ctx, event)?;
        self.event = event;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.signal_event(self.event, self.native, false);
    }
}

#[derive(Debug, Default)]
pub(crate) struct WaitEvents {
    events: Span<EventId>,
    src_stages: PipelineStageFlags,
    dst_stages: PipelineStageFlags,
    barriers: Span<Barrier>,
}

impl WaitEvents {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        events: &[EventId],
        src_stages: PipelineStageFlags,
        dst_stages: PipelineStageFlags,
        barriers: &[Barrier],
    ) -> Result<(), ValidationError> {
        ctx.inline_in_pass()?;
        if events.is_empty() {
            return Err(ValidationError::InvalidArgument("no events to wait for"));
        }
        for &event in events {
            resolve_event(ctx, event)?;
        }
        check_barriers(ctx, barriers)?;

        self.events = ctx.recording.storage.alloc(events);
        self.src_stages = src_stages;
        self.dst_stages = dst_stages;
        self.barriers = ctx.recording.storage.alloc(barriers);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        let device = encoder.device;
        let natives: SmallVec<[Option<NativeEvent>; 4]> = storage
            .get(self.events)
            .iter()
            .map(|&event| device.event(event).and_then(|info| info.native))
            .collect();

        for native in natives {
            encoder.wait_event(native);
        }

        // Emulated waits still order work of this command buffer.
        let barriers = storage.get(self.barriers);
        if let Some(dependency) = Dependency::reduce(self.src_stages, self.dst_stages, barriers) {
            encoder.set_barrier(dependency);
        }
    }
}
