use {
    crate::{
        barrier::Dependency,
        ring::{FenceRing, FenceToken},
        stage::StageSet,
    },
    forge_core::{BarrierStage, Config, NativeCommandBuffer, NativeFence},
    smallvec::SmallVec,
    thread_profiler::profile_scope,
};

/// Counters of emitted synchronization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Fence waits encoded.
    pub fence_waits: u64,
    /// Fence updates encoded.
    pub fence_updates: u64,
    /// Memory barriers encoded inside render encoders.
    pub memory_barriers: u64,
    /// Waits on slots written again since the dependency was recorded.
    pub stale_waits: u64,
    /// Dependencies widened to coarser stages.
    pub widened: u64,
}

/// Converts stage-to-stage dependencies into fence waits and updates.
///
/// Every native encoder updates the fences of the stages it did work in when it ends.
/// A dependency captures the slots written last by its source stages and the
/// captured slots are waited on by the next encoder that covers a destination stage.
#[derive(Debug)]
pub struct BarrierTranslator {
    ring: FenceRing,
    pending: [SmallVec<[FenceToken; 4]>; 4],
    stats: SyncStats,
    warn: bool,
}

impl BarrierTranslator {
    /// Create translator with rings sized by configuration.
    pub fn new(config: &Config, fence: impl FnMut(BarrierStage, u32) -> NativeFence) -> Self {
        BarrierTranslator {
            ring: FenceRing::new(config.fence_ring_capacity.max(1), fence),
            pending: Default::default(),
            stats: SyncStats::default(),
            warn: config.performance_warnings,
        }
    }

    /// Fence rings.
    pub fn ring(&self) -> &FenceRing {
        &self.ring
    }

    /// Emitted synchronization so far.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Drop pending waits and forget written slots.
    pub fn reset(&mut self) {
        for pending in &mut self.pending {
            pending.clear();
        }
        self.ring.rewind();
        self.stats = SyncStats::default();
    }

    /// Check if opening an encoder covering `stages` would wait on fences.
    pub fn has_pending(&self, stages: StageSet) -> bool {
        stages
            .stages()
            .any(|stage| !self.pending[stage.index()].is_empty())
    }

    /// Record dependency between work encoded so far and work encoded later.
    ///
    /// Encoders that did source work must be ended before,
    /// so their fence updates are already written.
    pub fn set_barrier(&mut self, dependency: Dependency) {
        profile_scope!("set_barrier");

        if dependency.widened {
            self.stats.widened += 1;
            if self.warn {
                log::warn!(
                    "Broad stage mask ordered conservatively as {:?} -> {:?}",
                    dependency.src,
                    dependency.dst
                );
            }
        }

        for src in dependency.src.stages() {
            let token = match self.ring.current(src) {
                Some(token) => token,
                None => continue,
            };

            for dst in dependency.dst.stages() {
                let pending = &mut self.pending[dst.index()];
                if !pending.contains(&token) {
                    log::trace!("{:?} waits for {:?}", dst, token);
                    pending.push(token);
                }
            }
        }
    }

    /// Encode waits of stages covered by the encoder just opened.
    pub fn encoder_began(&mut self, stages: StageSet, native: &mut dyn NativeCommandBuffer) {
        for stage in stages.stages() {
            for token in self.pending[stage.index()].drain() {
                if !self.ring.is_live(token) {
                    self.stats.stale_waits += 1;
                    log::warn!(
                        "Fence slot {} of {:?} was reused before {:?} waited for it. \
                         Increase fence ring capacity above {}",
                        token.slot,
                        token.stage,
                        stage,
                        self.ring.capacity()
                    );
                }
                native.wait_for_fence(self.ring.fence(token), stage);
                self.stats.fence_waits += 1;
            }
        }
    }

    /// Encode updates of stages the ending encoder did work in.
    /// Must be called before the native encoder is ended.
    pub fn encoder_ending(&mut self, stages: StageSet, native: &mut dyn NativeCommandBuffer) {
        for stage in stages.stages() {
            let (_, fence) = self.ring.update(stage);
            native.update_fence(fence, stage);
            self.stats.fence_updates += 1;
        }
    }

    /// Order graphics stages inside the open render encoder.
    ///
    /// Returns `false` if the dependency involves other stages and the encoder must end.
    pub fn render_barrier(
        &mut self,
        dependency: Dependency,
        native: &mut dyn NativeCommandBuffer,
    ) -> bool {
        if !StageSet::GRAPHICS.contains(dependency.src | dependency.dst) {
            return false;
        }

        for after in dependency.src.stages() {
            for before in dependency.dst.stages() {
                native.memory_barrier(after, before);
                self.stats.memory_barriers += 1;
            }
        }
        true
    }
}
