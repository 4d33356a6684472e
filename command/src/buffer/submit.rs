use {
    super::{Body, CommandBuffer, Lifecycle},
    crate::{
        encoder::{EncodeStats, Encoder, SignalList},
        error::SubmitError,
    },
    forge_chain::CompletionFence,
    forge_core::{CommandBufferUsageFlags, Level, NativeCommandBuffer},
    std::sync::Arc,
    thread_profiler::profile_scope,
};

impl CommandBuffer {
    /// Encode the buffer into `native` and register its completion handler.
    ///
    /// Secondary buffers executed by this one are encoded inline.
    /// The optional `fence` must be unsignaled and is signaled once `native` completes.
    /// A signaled or submitted fence fails the submission and leaves the buffer as it was.
    /// Returns counters of the encoding.
    pub fn submit(
        &self,
        native: &mut dyn NativeCommandBuffer,
        fence: Option<Arc<CompletionFence>>,
    ) -> Result<EncodeStats, SubmitError> {
        profile_scope!("submit");

        if self.level != Level::Primary {
            return Err(SubmitError::NotPrimary);
        }
        if let Some(error) = &self.error {
            log::error!("Submission of invalid command buffer: {}", error);
            return Err(SubmitError::Invalid(error.clone()));
        }

        let lifecycle = self.lifecycle();
        let recording = match (&self.body, lifecycle) {
            (Body::Finished(recording), Lifecycle::Executable)
            | (Body::Finished(recording), Lifecycle::Pending) => recording,
            _ => {
                log::error!("Submission of {:?} command buffer", lifecycle);
                return Err(SubmitError::InvalidState(lifecycle));
            }
        };

        if recording.executes.iter().any(|secondary| {
            secondary.is_stale()
                || match secondary.lifecycle() {
                    Lifecycle::Executable | Lifecycle::Pending => false,
                    _ => true,
                }
        }) {
            log::error!("Submission with stale secondary buffers");
            return Err(SubmitError::StaleSecondary);
        }

        let one_time = self
            .usage
            .contains(CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        let simultaneous = !one_time
            && self
                .usage
                .contains(CommandBufferUsageFlags::SIMULTANEOUS_USE);
        let epoch = self
            .shared
            .start(simultaneous)
            .ok_or(SubmitError::InUse)?;
        if let Some(fence) = &fence {
            if !fence.mark_submitted(epoch) {
                self.shared.abort();
                log::error!("Submission with a fence that is signaled or in use");
                return Err(SubmitError::FenceInUse);
            }
        }
        let generation = self.shared.generation();

        let SignalList(signals) = self.signals.acquire_safely();
        let (stats, signals) = {
            let mut encoder = Encoder::new(&*self.device, native, signals);
            encoder.encode(recording);
            encoder.finish()
        };

        let device = self.device.clone();
        let shared = self.shared.clone();
        let pool = self.signals.clone();
        native.add_completed_handler(Box::new(move || {
            log::trace!("Execution {} completed with {} signals", epoch, signals.len());
            for signal in &signals {
                signal.apply(&*device);
            }
            pool.release_safely(SignalList(signals));
            shared.complete(generation, one_time);
            if let Some(fence) = fence {
                fence.signal();
            }
        }));

        Ok(stats)
    }
}
