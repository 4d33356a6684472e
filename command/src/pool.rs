//! Command pools.

use {
    crate::{
        buffer::{CommandBuffer, Lifecycle, Shared},
        command::{CommandKind, Recording, TypePools},
        encoder::SignalList,
        error::StateError,
    },
    forge_core::{forge_slow_assert, CommandPoolCreateFlags, Device, Level},
    forge_memory::{PoolCounts, SyncObjectPool},
    std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

static NEXT_POOL: AtomicU64 = AtomicU64::new(1);

/// Pool of command buffers and of the commands they record.
///
/// Not synchronized: buffers of one pool are recorded from one thread at a time.
/// Use one pool per recording thread.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct CommandPool {
    id: u64,
    flags: CommandPoolCreateFlags,
    epoch: u64,
    #[derivative(Debug = "ignore")]
    pub(crate) device: Arc<dyn Device>,
    pub(crate) commands: TypePools,
    recordings: SyncObjectPool<Recording>,
    signals: Arc<SyncObjectPool<SignalList>>,
    buffers: Vec<Arc<Shared>>,
    relevant: relevant::Relevant,
}

impl CommandPool {
    /// Create command pool.
    pub fn new(device: Arc<dyn Device>, flags: CommandPoolCreateFlags) -> Self {
        let pooling = device.config().object_pooling;
        let id = NEXT_POOL.fetch_add(1, Ordering::Relaxed);
        log::debug!("Create command pool {} with {:?}", id, flags);
        CommandPool {
            id,
            flags,
            epoch: 0,
            device,
            commands: TypePools::new(pooling),
            recordings: SyncObjectPool::new(pooling),
            signals: Arc::new(SyncObjectPool::new(pooling)),
            buffers: Vec::new(),
            relevant: relevant::Relevant,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Flags the pool was created with.
    pub fn flags(&self) -> CommandPoolCreateFlags {
        self.flags
    }

    /// Allocate new command buffers in initial state.
    pub fn allocate_buffers(&mut self, level: Level, count: usize) -> Vec<CommandBuffer> {
        (0..count)
            .map(|_| {
                let buffer = CommandBuffer::new(
                    self.id,
                    self.epoch,
                    level,
                    self.device.clone(),
                    self.signals.clone(),
                );
                self.buffers.push(buffer.shared.clone());
                buffer
            })
            .collect()
    }

    /// Free buffers, returning their commands to the pool.
    /// Buffers must be allocated from this pool.
    pub fn free_buffers(&mut self, buffers: impl IntoIterator<Item = CommandBuffer>) {
        for buffer in buffers {
            forge_slow_assert!(
                buffer.belongs_to(self),
                "Command buffer freed to another pool"
            );
            let shared = buffer.shared.clone();
            self.buffers.retain(|other| !Arc::ptr_eq(other, &shared));
            buffer.dispose(self);
        }
    }

    /// Reset all buffers of this pool to initial state.
    ///
    /// Commands of the buffers return to the pool when each buffer is next used.
    /// Fails with `InUse` if any buffer is executing.
    pub fn reset(&mut self, release_resources: bool) -> Result<(), StateError> {
        if self.buffers.iter().any(|shared| shared.is_pending()) {
            return Err(StateError::InUse);
        }

        self.epoch += 1;
        for shared in &self.buffers {
            shared.set_lifecycle(Lifecycle::Initial);
        }
        if release_resources {
            self.trim();
        }
        log::debug!("Command pool {} reset to epoch {}", self.id, self.epoch);
        Ok(())
    }

    /// Destroy commands and recordings kept for reuse.
    pub fn trim(&mut self) {
        self.commands.clear();
        self.recordings.clear();
        self.signals.clear();
    }

    /// Object counts of all command types.
    pub fn counts(&self) -> PoolCounts {
        self.commands.counts()
    }

    /// Object counts of one command type.
    pub fn kind_counts(&self, kind: CommandKind) -> PoolCounts {
        self.commands.kind_counts(kind)
    }

    /// Object counts of command lists.
    pub fn recording_counts(&self) -> PoolCounts {
        self.recordings.counts()
    }

    pub(crate) fn acquire_recording(&mut self) -> Recording {
        self.recordings.acquire_safely()
    }

    /// Return commands of the recording and the recording itself for reuse.
    pub(crate) fn recycle(&mut self, mut recording: Recording, release_resources: bool) {
        recording.release_commands(&mut self.commands);
        if release_resources {
            recording.storage.release();
        }
        self.recordings.release_safely(recording);
    }

    /// Account for a recording that is still referenced elsewhere and is dropped there.
    pub(crate) fn abandon(&mut self, recording: &Recording) {
        for kind in recording.kinds() {
            self.commands.forget(kind);
        }
        self.recordings.forget_safely();
    }

    /// Dispose of command pool.
    /// All buffers allocated from this pool must be freed.
    pub fn dispose(mut self) {
        if !self.buffers.is_empty() {
            log::warn!(
                "Command pool {} disposed with {} buffers alive",
                self.id,
                self.buffers.len()
            );
        }
        self.trim();
        self.relevant.dispose();
    }
}
