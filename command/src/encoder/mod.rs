//! Translation of recorded commands into native encoder calls.
//!
//! The native API accepts work only inside one open encoder of a kind.
//! `Encoder` opens and closes native encoders on demand, keeps binding state
//! lazily and emits only the binds that changed since the previous draw or dispatch.

mod bindings;
mod clear;
mod dynamic;
mod pass;
mod query;

pub(crate) use self::{
    clear::level_extent,
    pass::PassState,
    query::{DeferredSignal, Occlusion, SignalList},
};

use {
    self::{
        bindings::{PushConstants, StageBindings},
        dynamic::{DynamicState, Tracked},
        query::QueryState,
    },
    crate::command::Recording,
    forge_chain::{BarrierTranslator, Dependency, StageSet, SyncStats},
    forge_core::{
        BindStage, ComputePipelineInfo, Config, Device, EncoderKind, GraphicsPipelineInfo,
        IndexType, NativeBuffer, NativeCommandBuffer, NativePipeline, PipelineBindPoint, Rect,
        SlotBinding,
    },
    thread_profiler::profile_scope,
};

/// Counters of one encoding of a primary buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Commands encoded, replayed ones included.
    pub commands: u64,
    /// Native encoders opened.
    pub encoders: u64,
    /// Render encoders reopened inside the same sub-pass.
    pub restarts: u64,
    /// Native slot binds.
    pub binds: u64,
    /// Inline push constant uploads.
    pub push_constants: u64,
    /// Emulations of behavior the native API lacks.
    pub fallbacks: u64,
    /// Emitted synchronization.
    pub sync: SyncStats,
}

/// Bound index buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct IndexBinding {
    pub buffer: NativeBuffer,
    pub offset: u64,
    pub index_type: IndexType,
}

/// Graphics state requested by commands and the part of it the open encoder has.
#[derive(Debug, Default)]
pub(crate) struct GraphicsState<'a> {
    pub pipeline: Option<&'a GraphicsPipelineInfo>,
    bound: Option<NativePipeline>,
    pub stages: [StageBindings; 2],
    pub push: [PushConstants; 2],
    pub dynamic: DynamicState,
    pub index: Option<IndexBinding>,
    pub view_range: Tracked<[u32; 2]>,
}

impl<'a> GraphicsState<'a> {
    pub(crate) fn stage_mut(&mut self, stage: BindStage) -> Option<&mut StageBindings> {
        match stage {
            BindStage::Vertex => Some(&mut self.stages[0]),
            BindStage::Fragment => Some(&mut self.stages[1]),
            BindStage::Compute => None,
        }
    }

    pub(crate) fn bind_pipeline(&mut self, pipeline: &'a GraphicsPipelineInfo) {
        self.pipeline = Some(pipeline);
        self.dynamic.apply_static(pipeline);
        for push in &mut self.push {
            push.invalidate();
        }
        self.view_range.invalidate();
    }

    /// New native encoder. Everything requested is applied again.
    pub(crate) fn invalidate(&mut self) {
        self.bound = None;
        for stage in &mut self.stages {
            stage.invalidate();
        }
        for push in &mut self.push {
            push.invalidate();
        }
        self.dynamic.invalidate();
        self.view_range.invalidate();
    }
}

/// Compute state requested by commands and the part of it the open encoder has.
#[derive(Debug, Default)]
pub(crate) struct ComputeState<'a> {
    pub pipeline: Option<&'a ComputePipelineInfo>,
    bound: Option<NativePipeline>,
    pub bindings: StageBindings,
    pub push: PushConstants,
}

impl<'a> ComputeState<'a> {
    pub(crate) fn bind_pipeline(&mut self, pipeline: &'a ComputePipelineInfo) {
        self.pipeline = Some(pipeline);
        self.push.invalidate();
    }

    pub(crate) fn invalidate(&mut self) {
        self.bound = None;
        self.bindings.invalidate();
        self.push.invalidate();
    }
}

/// Encoding of one primary buffer into a native command buffer.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub(crate) struct Encoder<'a> {
    #[derivative(Debug = "ignore")]
    pub(crate) device: &'a dyn Device,
    #[derivative(Debug = "ignore")]
    pub(crate) native: &'a mut dyn NativeCommandBuffer,
    pub(crate) config: &'a Config,
    kind: Option<EncoderKind>,
    pub(crate) graphics: GraphicsState<'a>,
    pub(crate) compute: ComputeState<'a>,
    pub(crate) pass: Option<PassState<'a>>,
    pub(crate) queries: QueryState,
    translator: BarrierTranslator,
    signals: Vec<DeferredSignal>,
    pub(crate) stats: EncodeStats,
    next: Option<u32>,
    replay: Option<u32>,
    labels: u32,
}

impl<'a> Encoder<'a> {
    /// Create encoder appending completion signals to `signals`.
    pub(crate) fn new(
        device: &'a dyn Device,
        native: &'a mut dyn NativeCommandBuffer,
        signals: Vec<DeferredSignal>,
    ) -> Self {
        let config = device.config();
        Encoder {
            device,
            native,
            config,
            kind: None,
            graphics: GraphicsState::default(),
            compute: ComputeState::default(),
            pass: None,
            queries: QueryState::default(),
            translator: BarrierTranslator::new(config, |stage, slot| {
                device.barrier_fence(stage, slot)
            }),
            signals,
            stats: EncodeStats::default(),
            next: None,
            replay: None,
            labels: 0,
        }
    }

    /// Encode commands of the recording in order.
    /// Secondary recordings are encoded by nested calls.
    pub(crate) fn encode(&mut self, recording: &Recording) {
        profile_scope!("encode");

        let mut cursor = recording.head();
        while let Some(index) = cursor {
            let (command, next) = recording.node(index);
            self.next = next;
            log::trace!("Encode {:?}", command.kind());
            command.encode(self, &recording.storage);
            self.stats.commands += 1;
            cursor = self.replay.take().or(next);
        }
    }

    /// Close the open encoder and return counters and signals for the completion handler.
    pub(crate) fn finish(mut self) -> (EncodeStats, Vec<DeferredSignal>) {
        if self.pass.is_some() {
            log::error!("Encoding finished inside a render pass");
            self.end_current_encoding();
            self.pass = None;
        }
        self.end_current_encoding();

        while self.labels > 0 {
            log::warn!("Debug label left open");
            self.native.pop_debug_group();
            self.labels -= 1;
        }

        self.stats.sync = self.translator.stats();
        log::debug!("Encoded: {:?}", self.stats);
        (self.stats, self.signals)
    }

    /// Kind of the open native encoder.
    pub(crate) fn kind(&self) -> Option<EncoderKind> {
        self.kind
    }

    /// Remember where a sub-pass starts, for replaying it per view.
    pub(crate) fn replay_start(&self) -> Option<u32> {
        self.next
    }

    pub(crate) fn replay_from(&mut self, start: Option<u32>) {
        self.replay = start;
    }

    pub(crate) fn defer(&mut self, signal: DeferredSignal) {
        self.signals.push(signal);
    }

    /// Count an emulation that costs performance.
    pub(crate) fn fallback(&mut self, what: &str) {
        self.stats.fallbacks += 1;
        if self.config.performance_warnings {
            log::warn!("Emulating {}", what);
        }
    }

    fn opened(&mut self, kind: EncoderKind) {
        self.kind = Some(kind);
        self.stats.encoders += 1;
        self.translator
            .encoder_began(StageSet::from(kind), &mut *self.native);
        match kind {
            EncoderKind::Render => self.graphics.invalidate(),
            EncoderKind::Compute => self.compute.invalidate(),
            EncoderKind::Blit => {}
        }
        log::trace!("Opened {:?} encoder", kind);
    }

    /// Close the open native encoder, if any.
    ///
    /// A render encoder closed before its sub-pass ends keeps attachment contents,
    /// so the encoder reopened later can load them.
    pub(crate) fn end_current_encoding(&mut self) {
        let kind = match self.kind.take() {
            Some(kind) => kind,
            None => return,
        };

        if kind == EncoderKind::Render {
            if let Some(pass) = &self.pass {
                if !pass.closing {
                    pass.interrupt(&mut *self.native);
                }
            }
        }

        self.translator
            .encoder_ending(StageSet::from(kind), &mut *self.native);
        self.native.end_encoding();
        log::trace!("Ended {:?} encoder", kind);
    }

    /// Make sure a render encoder is open.
    /// Returns `false` if there is no render pass to open one for.
    pub(crate) fn graphics_encoder(&mut self) -> bool {
        if self.kind == Some(EncoderKind::Render) {
            return true;
        }
        if self.pass.is_none() {
            log::error!("Render command encoded outside of render pass");
            return false;
        }
        self.end_current_encoding();
        self.begin_native_render_pass();
        true
    }

    pub(crate) fn compute_encoder(&mut self) {
        if self.kind != Some(EncoderKind::Compute) {
            self.end_current_encoding();
            self.native.begin_compute_pass("forge compute");
            self.opened(EncoderKind::Compute);
        }
    }

    pub(crate) fn blit_encoder(&mut self) {
        if self.kind != Some(EncoderKind::Blit) {
            self.end_current_encoding();
            self.native.begin_blit_pass("forge blit");
            self.opened(EncoderKind::Blit);
        }
    }

    /// Route a resolved descriptor to the bindings of its stage.
    pub(crate) fn bind_slot(&mut self, bind_point: PipelineBindPoint, binding: SlotBinding) {
        let stage = match (bind_point, binding.stage) {
            (PipelineBindPoint::Graphics, stage) => self.graphics.stage_mut(stage),
            (PipelineBindPoint::Compute, BindStage::Compute) => Some(&mut self.compute.bindings),
            (PipelineBindPoint::Compute, _) => None,
        };
        match stage {
            Some(stage) => stage.bind(binding.index, binding.resource),
            None => log::trace!("Skip {:?} binding for {:?}", binding.stage, bind_point),
        }
    }

    /// Apply graphics state to the open render encoder before a draw.
    pub(crate) fn finalize_draw_state(&mut self) -> Option<&'a GraphicsPipelineInfo> {
        profile_scope!("finalize_draw_state");

        let pipeline = match self.graphics.pipeline {
            Some(pipeline) => pipeline,
            None => {
                log::error!("Draw without graphics pipeline");
                return None;
            }
        };

        if self.graphics.bound != Some(pipeline.native) {
            self.native.set_render_pipeline(pipeline.native);
            self.graphics.bound = Some(pipeline.native);
        }

        for (index, &stage) in BindStage::GRAPHICS.iter().enumerate() {
            if let Some(usage) = pipeline.usage(stage) {
                let binds = self.graphics.stages[index].finalize(stage, usage, &mut *self.native);
                self.stats.binds += binds as u64;
            }
            let slot = pipeline.push_constant_slot(stage);
            if self.graphics.push[index].finalize(stage, slot, &mut *self.native) {
                self.stats.push_constants += 1;
            }
        }

        let render_area = self
            .pass
            .as_ref()
            .map_or_else(Rect::default, |pass| pass.render_area);
        self.graphics.dynamic.finalize(&mut *self.native, render_area);

        if let Some(slot) = pipeline.view_range_slot {
            if let Some(&[first, count]) = self.graphics.view_range.take_dirty() {
                let mut bytes = [0u8; 8];
                bytes[..4].copy_from_slice(&first.to_le_bytes());
                bytes[4..].copy_from_slice(&count.to_le_bytes());
                self.native.set_bytes(BindStage::Vertex, slot, &bytes);
            }
        }

        Some(pipeline)
    }

    /// Apply compute state to the open compute encoder before a dispatch.
    pub(crate) fn finalize_dispatch_state(&mut self) -> Option<&'a ComputePipelineInfo> {
        profile_scope!("finalize_dispatch_state");

        let pipeline = match self.compute.pipeline {
            Some(pipeline) => pipeline,
            None => {
                log::error!("Dispatch without compute pipeline");
                return None;
            }
        };

        if self.compute.bound != Some(pipeline.native) {
            self.native.set_compute_pipeline(pipeline.native);
            self.compute.bound = Some(pipeline.native);
        }

        let binds =
            self.compute
                .bindings
                .finalize(BindStage::Compute, &pipeline.usage, &mut *self.native);
        self.stats.binds += binds as u64;

        if self.compute.push.finalize(
            BindStage::Compute,
            pipeline.push_constant_slot,
            &mut *self.native,
        ) {
            self.stats.push_constants += 1;
        }

        Some(pipeline)
    }

    /// Order work encoded so far before work encoded later.
    pub(crate) fn set_barrier(&mut self, dependency: Dependency) {
        if self.kind == Some(EncoderKind::Render)
            && self.pass.is_some()
            && self
                .translator
                .render_barrier(dependency, &mut *self.native)
        {
            return;
        }

        // Source work must be fenced before the dependency captures it.
        if let Some(kind) = self.kind {
            if StageSet::from(kind).intersects(dependency.src) {
                self.end_current_encoding();
            }
        }

        self.translator.set_barrier(dependency);

        // Waits are encoded when an encoder opens.
        if let Some(kind) = self.kind {
            if self.translator.has_pending(StageSet::from(kind)) {
                self.end_current_encoding();
            }
        }
    }

    /// Number of views rendered at once by the open native pass.
    pub(crate) fn layered_views(&self) -> u32 {
        self.pass.as_ref().map_or(1, |pass| pass.layered_views)
    }

    /// Check if commands are encoded for the first time.
    /// Replays of multiview sub-passes encode commands again.
    pub(crate) fn first_replay(&self) -> bool {
        self.pass.as_ref().map_or(true, |pass| pass.multiview_pass == 0)
    }

    pub(crate) fn push_label(&mut self, label: &str) {
        self.native.push_debug_group(label);
        self.labels += 1;
    }

    pub(crate) fn pop_label(&mut self) {
        if self.labels == 0 {
            log::warn!("No debug label to end");
            return;
        }
        self.native.pop_debug_group();
        self.labels -= 1;
    }
}
