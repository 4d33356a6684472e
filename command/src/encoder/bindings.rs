use {
    forge_core::{
        BindStage, NativeBuffer, NativeCommandBuffer, NativeSampler, NativeTexture, SlotResource,
        SlotUsage,
    },
    hibitset::{BitSet, BitSetAnd, BitSetLike},
    smallvec::SmallVec,
};

/// Requested and natively bound values of one kind of slots.
///
/// Setting a slot marks it dirty. Finalizing walks only dirty slots that the
/// pipeline uses and issues native binds for those whose value differs
/// from what the open encoder has bound.
#[derive(Clone, Debug)]
pub(crate) struct BindingTable<T> {
    requested: Vec<Option<T>>,
    bound: Vec<Option<T>>,
    dirty: BitSet,
}

impl<T> Default for BindingTable<T> {
    fn default() -> Self {
        BindingTable {
            requested: Vec::new(),
            bound: Vec::new(),
            dirty: BitSet::new(),
        }
    }
}

impl<T> BindingTable<T>
where
    T: Copy + PartialEq,
{
    pub(crate) fn set(&mut self, index: u32, value: T) {
        let slot = index as usize;
        if self.requested.len() <= slot {
            self.requested.resize(slot + 1, None);
            self.bound.resize(slot + 1, None);
        }
        self.requested[slot] = Some(value);
        self.dirty.add(index);
    }

    #[cfg(test)]
    pub(crate) fn requested(&self, index: u32) -> Option<T> {
        self.requested.get(index as usize).cloned().and_then(|v| v)
    }

    #[cfg(test)]
    pub(crate) fn bound(&self, index: u32) -> Option<T> {
        self.bound.get(index as usize).cloned().and_then(|v| v)
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self, index: u32) -> bool {
        self.dirty.contains(index)
    }

    /// Forget native bindings.
    /// Every requested slot is bound again by the next finalize.
    pub(crate) fn invalidate(&mut self) {
        for bound in &mut self.bound {
            *bound = None;
        }
        for (index, requested) in self.requested.iter().enumerate() {
            if requested.is_some() {
                self.dirty.add(index as u32);
            }
        }
    }

    /// Bind dirty slots in `used`, calling `bind(index, previous, value)` for changed ones.
    /// Dirty slots the pipeline doesn't use stay dirty.
    /// Returns number of binds.
    pub(crate) fn finalize(&mut self, used: &BitSet, mut bind: impl FnMut(u32, Option<T>, T)) -> usize {
        let slots: SmallVec<[u32; 16]> = BitSetAnd(&self.dirty, used).iter().collect();

        let mut binds = 0;
        for index in slots {
            self.dirty.remove(index);
            let slot = index as usize;
            if let Some(value) = self.requested[slot] {
                let previous = self.bound[slot];
                if previous != Some(value) {
                    bind(index, previous, value);
                    self.bound[slot] = Some(value);
                    binds += 1;
                }
            }
        }
        binds
    }
}

/// Buffer bound to a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BufferBinding {
    pub buffer: NativeBuffer,
    pub offset: u64,
}

/// Slots of one shader stage.
#[derive(Clone, Debug, Default)]
pub(crate) struct StageBindings {
    pub buffers: BindingTable<BufferBinding>,
    pub textures: BindingTable<NativeTexture>,
    pub samplers: BindingTable<NativeSampler>,
}

impl StageBindings {
    pub(crate) fn bind(&mut self, index: u32, resource: SlotResource) {
        match resource {
            SlotResource::Buffer { buffer, offset } => {
                self.buffers.set(index, BufferBinding { buffer, offset })
            }
            SlotResource::Texture(texture) => self.textures.set(index, texture),
            SlotResource::Sampler(sampler) => self.samplers.set(index, sampler),
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.buffers.invalidate();
        self.textures.invalidate();
        self.samplers.invalidate();
    }

    /// Issue native binds for changed slots used by the pipeline.
    /// A buffer that only moved within the bound buffer gets its offset updated.
    pub(crate) fn finalize(
        &mut self,
        stage: BindStage,
        usage: &SlotUsage,
        native: &mut dyn NativeCommandBuffer,
    ) -> usize {
        let mut binds = self.buffers.finalize(&usage.buffers, |index, previous, binding| {
            match previous {
                Some(previous) if previous.buffer == binding.buffer => {
                    native.set_buffer_offset(stage, index, binding.offset)
                }
                _ => native.set_buffer(stage, index, binding.buffer, binding.offset),
            }
        });
        binds += self.textures.finalize(&usage.textures, |index, _, texture| {
            native.set_texture(stage, index, texture)
        });
        binds += self.samplers.finalize(&usage.samplers, |index, _, sampler| {
            native.set_sampler(stage, index, sampler)
        });
        binds
    }
}

/// Push constant bytes of one stage, pushed inline when dirty.
#[derive(Clone, Debug, Default)]
pub(crate) struct PushConstants {
    bytes: SmallVec<[u8; 128]>,
    dirty: bool,
}

impl PushConstants {
    pub(crate) fn write(&mut self, offset: u32, data: &[u8]) {
        let start = offset as usize;
        let end = start + data.len();
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(data);
        self.dirty = true;
    }

    pub(crate) fn invalidate(&mut self) {
        self.dirty = !self.bytes.is_empty();
    }

    /// Push bytes to `slot` if changed. Returns `true` if pushed.
    pub(crate) fn finalize(
        &mut self,
        stage: BindStage,
        slot: Option<u32>,
        native: &mut dyn NativeCommandBuffer,
    ) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        match slot {
            Some(slot) => {
                native.set_bytes(stage, slot, &self.bytes);
                true
            }
            None => false,
        }
    }
}
