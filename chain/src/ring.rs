use forge_core::{BarrierStage, NativeFence};

/// Identifies one write of a fence ring slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FenceToken {
    /// Stage the slot belongs to.
    pub stage: BarrierStage,
    /// Slot index.
    pub slot: u32,
    /// Number of the write since ring creation, starting at 1.
    pub generation: u64,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    fence: NativeFence,
    generation: u64,
}

#[derive(Clone, Debug)]
struct Ring {
    slots: Vec<Slot>,
    cursor: usize,
    last: Option<FenceToken>,
}

/// Fixed-capacity rings of native fences, one per barrier stage.
///
/// Every update writes the next slot of the stage ring, wrapping around.
/// Waits read the slot written last. A token whose slot has been written again
/// since is stale: a wait on it orders against newer work than requested.
#[derive(Clone, Debug)]
pub struct FenceRing {
    rings: [Ring; 4],
    generation: u64,
}

impl FenceRing {
    /// Create rings of `capacity` slots, taking native fences from `fence`.
    pub fn new(capacity: usize, mut fence: impl FnMut(BarrierStage, u32) -> NativeFence) -> Self {
        assert!(capacity > 0, "Fence ring can't be empty");
        let mut ring = |stage: BarrierStage| Ring {
            slots: (0..capacity as u32)
                .map(|slot| Slot {
                    fence: fence(stage, slot),
                    generation: 0,
                })
                .collect(),
            cursor: 0,
            last: None,
        };

        FenceRing {
            rings: [
                ring(BarrierStage::Vertex),
                ring(BarrierStage::Fragment),
                ring(BarrierStage::Compute),
                ring(BarrierStage::Copy),
            ],
            generation: 0,
        }
    }

    /// Number of slots per stage.
    pub fn capacity(&self) -> usize {
        self.rings[0].slots.len()
    }

    /// Write the next slot of the stage.
    pub fn update(&mut self, stage: BarrierStage) -> (FenceToken, NativeFence) {
        self.generation += 1;
        let ring = &mut self.rings[stage.index()];
        let index = ring.cursor;
        ring.cursor = (ring.cursor + 1) % ring.slots.len();

        let slot = &mut ring.slots[index];
        slot.generation = self.generation;
        let token = FenceToken {
            stage,
            slot: index as u32,
            generation: self.generation,
        };
        ring.last = Some(token);
        (token, slot.fence)
    }

    /// Slot written last for the stage.
    pub fn current(&self, stage: BarrierStage) -> Option<FenceToken> {
        self.rings[stage.index()].last
    }

    /// Native fence of the token slot.
    pub fn fence(&self, token: FenceToken) -> NativeFence {
        self.rings[token.stage.index()].slots[token.slot as usize].fence
    }

    /// Check that the slot was not written again after the token.
    pub fn is_live(&self, token: FenceToken) -> bool {
        self.rings[token.stage.index()].slots[token.slot as usize].generation == token.generation
    }

    /// Forget written slots. Native fences are kept.
    pub fn rewind(&mut self) {
        for ring in &mut self.rings {
            ring.cursor = 0;
            ring.last = None;
        }
    }
}

#[cfg(test)]
mod test {
    use {super::*, proptest::prelude::*};

    fn ring(capacity: usize) -> FenceRing {
        FenceRing::new(capacity, |stage, slot| {
            NativeFence(stage.index() as u64 * 1000 + slot as u64)
        })
    }

    #[test]
    fn updates_wrap_around() {
        let mut ring = ring(2);
        let (first, fence) = ring.update(BarrierStage::Compute);
        assert_eq!(fence, NativeFence(2000));
        ring.update(BarrierStage::Compute);
        let (third, fence) = ring.update(BarrierStage::Compute);

        assert_eq!(third.slot, 0);
        assert_eq!(fence, NativeFence(2000));
        assert!(!ring.is_live(first));
        assert!(ring.is_live(third));
        assert_eq!(ring.current(BarrierStage::Compute), Some(third));
    }

    #[test]
    fn stages_are_independent() {
        let mut ring = ring(1);
        let (vertex, _) = ring.update(BarrierStage::Vertex);
        let (copy, _) = ring.update(BarrierStage::Copy);

        assert!(ring.is_live(vertex));
        assert!(ring.is_live(copy));
        assert_eq!(ring.current(BarrierStage::Fragment), None);
    }

    #[test]
    fn rewind_forgets_writes() {
        let mut ring = ring(4);
        ring.update(BarrierStage::Fragment);
        ring.rewind();
        assert_eq!(ring.current(BarrierStage::Fragment), None);
        assert_eq!(ring.update(BarrierStage::Fragment).0.slot, 0);
    }

    proptest! {
        #[test]
        fn outstanding_waits_within_capacity_stay_live(
            capacity in 1usize..16,
            count in 0usize..48,
        ) {
            let mut ring = ring(capacity);
            let tokens: Vec<_> = (0..count)
                .map(|_| ring.update(BarrierStage::Compute).0)
                .collect();

            let stale = tokens.iter().filter(|&&token| !ring.is_live(token)).count();
            prop_assert_eq!(stale, count.saturating_sub(capacity));

            // Newest `capacity` tokens each observe their own update.
            for token in tokens.iter().rev().take(capacity) {
                prop_assert!(ring.is_live(*token));
                prop_assert_eq!(ring.fence(*token), NativeFence(2000 + token.slot as u64));
            }
        }
    }
}
