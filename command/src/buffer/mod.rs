//! Command buffers and their lifecycle.
//!
//! A buffer owns the list of its recorded commands. Commands are taken from the typed pools
//! of the `CommandPool` the buffer was allocated from and are returned there on reset.

mod recorder;
pub(crate) mod state;
mod submit;
mod usage;

pub use self::{recorder::CommandRecorder, state::Lifecycle, usage::Inheritance};

use {
    self::state::{AtomicLifecycle, PassOrigin, PassScope, RecordState},
    crate::{
        command::Recording,
        encoder::SignalList,
        error::{StateError, ValidationError},
        pool::CommandPool,
    },
    forge_core::{
        CommandBufferResetFlags, CommandBufferUsageFlags, CommandPoolCreateFlags, Device,
        InFlightReset, Level, SubpassContents,
    },
    forge_memory::{ArenaStats, SyncObjectPool},
    parking_lot::{Condvar, Mutex},
    std::{
        sync::{
            atomic::{AtomicU64, AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    },
};

/// State shared with completion handlers and executing primary buffers.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    lifecycle: AtomicLifecycle,
    /// Incremented whenever recorded commands are dropped.
    generation: AtomicU64,
    /// Executions in flight.
    pending: AtomicUsize,
    submissions: AtomicU64,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl Shared {
    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.lifecycle.set(lifecycle)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn next_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0
    }

    /// Take the execution guard. Returns submission epoch.
    fn start(&self, simultaneous: bool) -> Option<u64> {
        let _guard = self.idle_lock.lock();
        if simultaneous {
            self.pending.fetch_add(1, Ordering::AcqRel);
        } else if self
            .pending
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.lifecycle.set(Lifecycle::Pending);
        Some(self.submissions.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Release the execution guard of a submission that was never encoded.
    fn abort(&self) {
        let _guard = self.idle_lock.lock();
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.lifecycle.set(Lifecycle::Executable);
        }
        self.idle.notify_all();
    }

    /// Release the execution guard after the execution of `generation` completed.
    fn complete(&self, generation: u64, one_time: bool) {
        let _guard = self.idle_lock.lock();
        let remaining = self.pending.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 && self.generation() == generation {
            self.lifecycle.set(if one_time {
                Lifecycle::Invalid
            } else {
                Lifecycle::Executable
            });
        }
        self.idle.notify_all();
    }

    /// Wait until no executions are in flight.
    /// Returns `false` if timeout expires first.
    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.idle_lock.lock();
        while self.is_pending() {
            if self.idle.wait_until(&mut guard, deadline).timed_out() {
                return !self.is_pending();
            }
        }
        true
    }
}

/// Recording of an executable secondary buffer referenced by a primary one.
#[derive(Clone, Debug)]
pub(crate) struct SecondaryRef {
    pub(crate) recording: Arc<Recording>,
    shared: Arc<Shared>,
    generation: u64,
}

impl SecondaryRef {
    /// Check if the secondary was reset or re-recorded since it was referenced.
    pub(crate) fn is_stale(&self) -> bool {
        self.shared.generation() != self.generation
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        if self.is_stale() {
            Lifecycle::Invalid
        } else {
            self.shared.lifecycle()
        }
    }
}

#[derive(Debug)]
enum Body {
    Empty,
    Recording(Recording),
    Finished(Arc<Recording>),
}

/// Command buffer allocated from a `CommandPool`.
///
/// Must be returned with `CommandPool::free_buffers`.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct CommandBuffer {
    pool: u64,
    epoch: u64,
    level: Level,
    usage: CommandBufferUsageFlags,
    inheritance: Option<Inheritance>,
    body: Body,
    state: RecordState,
    error: Option<ValidationError>,
    pub(crate) shared: Arc<Shared>,
    #[derivative(Debug = "ignore")]
    device: Arc<dyn Device>,
    signals: Arc<SyncObjectPool<SignalList>>,
    relevant: relevant::Relevant,
}

impl CommandBuffer {
    pub(crate) fn new(
        pool: u64,
        epoch: u64,
        level: Level,
        device: Arc<dyn Device>,
        signals: Arc<SyncObjectPool<SignalList>>,
    ) -> Self {
        CommandBuffer {
            pool,
            epoch,
            level,
            usage: CommandBufferUsageFlags::empty(),
            inheritance: None,
            body: Body::Empty,
            state: RecordState::default(),
            error: None,
            shared: Arc::new(Shared::default()),
            device,
            signals,
            relevant: relevant::Relevant,
        }
    }

    /// Level of the buffer.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Usage the buffer was begun with.
    pub fn usage(&self) -> CommandBufferUsageFlags {
        self.usage
    }

    /// Inheritance the secondary buffer was begun with,
    /// with formats completed from the render pass.
    pub fn inheritance(&self) -> Option<&Inheritance> {
        self.inheritance.as_ref()
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle()
    }

    /// Error that invalidated the recording.
    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    /// Number of commands in the recording.
    pub fn len(&self) -> usize {
        match &self.body {
            Body::Empty => 0,
            Body::Recording(recording) => recording.len(),
            Body::Finished(recording) => recording.len(),
        }
    }

    /// Allocation statistics of the payload storage backing the recording.
    pub fn storage_stats(&self) -> Option<ArenaStats> {
        match &self.body {
            Body::Empty => None,
            Body::Recording(recording) => Some(recording.storage.stats()),
            Body::Finished(recording) => Some(recording.storage.stats()),
        }
    }

    /// Check if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the buffer was allocated from `pool`.
    pub fn belongs_to(&self, pool: &CommandPool) -> bool {
        self.pool == pool.id()
    }

    pub(crate) fn secondary_ref(&self) -> Option<SecondaryRef> {
        match (&self.body, self.lifecycle()) {
            (Body::Finished(recording), Lifecycle::Executable)
            | (Body::Finished(recording), Lifecycle::Pending) => Some(SecondaryRef {
                recording: recording.clone(),
                shared: self.shared.clone(),
                generation: self.shared.generation(),
            }),
            _ => None,
        }
    }

    fn check_pool(&self, pool: &CommandPool) -> Result<(), StateError> {
        if self.belongs_to(pool) {
            Ok(())
        } else {
            Err(StateError::ForeignPool)
        }
    }

    /// Drop commands left by a pool reset that happened since the buffer was last used.
    fn sync_epoch(&mut self, pool: &mut CommandPool) {
        if self.epoch != pool.epoch() {
            log::trace!("Buffer was reset with its pool");
            self.release_body(pool, false);
            self.epoch = pool.epoch();
        }
    }

    /// Return recorded commands to the pool.
    fn release_body(&mut self, pool: &mut CommandPool, release_resources: bool) {
        match std::mem::replace(&mut self.body, Body::Empty) {
            Body::Empty => {}
            Body::Recording(recording) => pool.recycle(recording, release_resources),
            Body::Finished(recording) => match Arc::try_unwrap(recording) {
                Ok(recording) => pool.recycle(recording, release_resources),
                // Still referenced by a primary buffer, which will now see it as stale.
                Err(recording) => pool.abandon(&recording),
            },
        }
        self.state = RecordState::default();
        self.error = None;
        self.shared.next_generation();
    }

    /// Wait for executions in flight, following the configured policy.
    fn wait_idle(&self) -> Result<(), StateError> {
        if !self.shared.is_pending() {
            return Ok(());
        }
        match self.device.config().in_flight_reset {
            InFlightReset::Fail => Err(StateError::InUse),
            InFlightReset::Wait(timeout) => {
                if self.shared.wait_idle(timeout) {
                    Ok(())
                } else {
                    Err(StateError::InUse)
                }
            }
        }
    }

    fn reset_with(
        &mut self,
        pool: &mut CommandPool,
        flags: CommandBufferResetFlags,
    ) -> Result<(), StateError> {
        if !pool
            .flags()
            .contains(CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        {
            return Err(StateError::NoIndividualReset);
        }
        if !self.usage.contains(CommandBufferUsageFlags::SIMULTANEOUS_USE) {
            self.wait_idle()?;
        }

        self.release_body(pool, flags.contains(CommandBufferResetFlags::RELEASE_RESOURCES));
        self.shared.set_lifecycle(Lifecycle::Initial);
        log::debug!("Command buffer reset");
        Ok(())
    }

    /// Begin recording.
    ///
    /// Buffers that are neither initial nor recording are reset implicitly,
    /// which requires a pool created with `RESET_COMMAND_BUFFER`.
    /// `inheritance` is required for secondary buffers continuing a render pass
    /// and ignored for primary ones.
    pub fn begin(
        &mut self,
        pool: &mut CommandPool,
        usage: CommandBufferUsageFlags,
        inheritance: Option<&Inheritance>,
    ) -> Result<(), StateError> {
        self.check_pool(pool)?;
        self.sync_epoch(pool);

        let (usage, inheritance) = match self.level {
            Level::Primary => (usage - CommandBufferUsageFlags::RENDER_PASS_CONTINUE, None),
            Level::Secondary => {
                let inheritance = inheritance.map(|inheritance| inheritance.resolve(&*self.device));
                if usage.contains(CommandBufferUsageFlags::RENDER_PASS_CONTINUE)
                    && inheritance.is_none()
                {
                    return Err(StateError::MissingInheritance);
                }
                (usage, inheritance)
            }
        };

        match self.lifecycle() {
            Lifecycle::Initial => {}
            Lifecycle::Recording => {
                return Err(StateError::InvalidState {
                    expected: Lifecycle::Initial,
                    found: Lifecycle::Recording,
                })
            }
            _ => self.reset_with(pool, CommandBufferResetFlags::empty())?,
        }

        let pass = match &inheritance {
            Some(inheritance) if usage.contains(CommandBufferUsageFlags::RENDER_PASS_CONTINUE) => {
                Some(PassScope {
                    origin: PassOrigin::Inherited,
                    render_pass: inheritance.render_pass,
                    subpass: inheritance.subpass,
                    subpass_count: inheritance.subpass + 1,
                    contents: SubpassContents::Inline,
                    color_formats: inheritance.color_formats.clone(),
                    depth_format: inheritance.depth_format,
                    layered_views: inheritance
                        .render_pass
                        .and_then(|id| self.device.render_pass(id))
                        .and_then(|info| info.subpasses.get(inheritance.subpass as usize))
                        .map_or(1, |subpass| {
                            subpass.max_layered_views(self.device.config().layered_multiview)
                        }),
                })
            }
            _ => None,
        };

        self.body = Body::Recording(pool.acquire_recording());
        self.state = RecordState::new(self.level, pass);
        self.usage = usage;
        self.inheritance = inheritance;
        self.error = None;
        self.shared.set_lifecycle(Lifecycle::Recording);
        log::debug!("Begin {:?} command buffer with {:?}", self.level, usage);
        Ok(())
    }

    /// Recorder appending commands to the buffer.
    pub fn recorder<'a>(
        &'a mut self,
        pool: &'a mut CommandPool,
    ) -> Result<CommandRecorder<'a>, StateError> {
        self.check_pool(pool)?;
        self.sync_epoch(pool);
        Ok(CommandRecorder::new(self, pool))
    }

    /// Finish recording.
    ///
    /// A recording invalidated by a rejected command ends in `Invalid` state.
    pub fn end(&mut self) -> Result<(), StateError> {
        let lifecycle = self.lifecycle();
        if lifecycle != Lifecycle::Recording {
            return Err(StateError::InvalidState {
                expected: Lifecycle::Recording,
                found: lifecycle,
            });
        }
        if self.error.is_none() && self.state.has_open_pass() {
            return Err(StateError::UnclosedRenderPass);
        }
        if !self.state.queries.is_empty() {
            log::warn!("Recording ended with active queries {:?}", self.state.queries);
        }

        self.body = match std::mem::replace(&mut self.body, Body::Empty) {
            Body::Recording(recording) => Body::Finished(Arc::new(recording)),
            other => other,
        };

        match &self.error {
            Some(error) => {
                log::debug!("Command buffer ended invalid: {}", error);
                self.shared.set_lifecycle(Lifecycle::Invalid);
            }
            None => {
                log::debug!("Command buffer recorded {} commands", self.len());
                self.shared.set_lifecycle(Lifecycle::Executable);
            }
        }
        Ok(())
    }

    /// Reset the buffer to initial state, returning its commands to the pool.
    pub fn reset(
        &mut self,
        pool: &mut CommandPool,
        flags: CommandBufferResetFlags,
    ) -> Result<(), StateError> {
        self.check_pool(pool)?;
        self.sync_epoch(pool);
        if self.lifecycle() == Lifecycle::Initial && self.is_empty() {
            return Ok(());
        }
        self.reset_with(pool, flags)
    }

    /// Release commands before the buffer is freed.
    pub(crate) fn dispose(mut self, pool: &mut CommandPool) {
        if self.shared.is_pending() {
            log::warn!("Command buffer freed while executing");
        }
        self.release_body(pool, true);
        self.shared.set_lifecycle(Lifecycle::Invalid);
        self.relevant.dispose();
    }
}
