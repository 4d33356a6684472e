use std::{marker::PhantomData, ops::Range};

/// Contiguous run of items carved from an `Arena`.
///
/// Spans are plain indices. They stay valid until the arena is reset,
/// which is checked against the arena epoch when slow safety checks are enabled.
#[derive(derivative::Derivative)]
#[derivative(
    Clone(bound = ""),
    Copy(bound = ""),
    Debug(bound = ""),
    Default(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = "")
)]
pub struct Span<T> {
    start: u32,
    len: u32,
    epoch: u32,
    #[derivative(Debug = "ignore")]
    marker: PhantomData<fn() -> T>,
}

impl<T> Span<T> {
    /// Number of items in the span.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Check if span has no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn range(&self) -> Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

/// Allocation statistics of an `Arena`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Spans allocated since creation.
    pub allocations: u64,
    /// Spans moved to the top of the arena to grow.
    pub relocations: u64,
    /// Items copied by relocations.
    pub copied: u64,
    /// Highest number of used items.
    pub high_water: u64,
}

/// Bump allocator of items of the same type.
///
/// Allocation appends to the end of one vector.
/// A span that grows while it is the topmost allocation grows in place;
/// otherwise its used prefix is copied to the top and the old items become dead
/// until the next `reset`. Storage never shrinks except on `release`.
///
/// Resetting bumps the epoch, invalidating every span handed out before.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
    epoch: u32,
    stats: ArenaStats,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena::new()
    }
}

impl<T> Arena<T> {
    /// Create empty arena.
    pub fn new() -> Self {
        Arena {
            items: Vec::new(),
            epoch: 0,
            stats: ArenaStats::default(),
        }
    }

    /// Create arena with preallocated storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            items: Vec::with_capacity(capacity),
            epoch: 0,
            stats: ArenaStats::default(),
        }
    }

    /// Current epoch.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Items in use, dead items included.
    pub fn used(&self) -> usize {
        self.items.len()
    }

    /// Items that fit without growing the storage.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Allocation statistics.
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Drop every item and invalidate all spans, keeping storage for reuse.
    pub fn reset(&mut self) {
        self.items.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Drop every item, invalidate all spans and return storage to the system.
    pub fn release(&mut self) {
        self.reset();
        self.items.shrink_to_fit();
    }

    fn check(&self, span: &Span<T>) {
        forge_core::forge_slow_assert!(
            span.len == 0 || span.epoch == self.epoch,
            "Span from epoch {} used in arena epoch {}",
            span.epoch,
            self.epoch
        );
    }

    /// Items of the span.
    pub fn get(&self, span: Span<T>) -> &[T] {
        self.check(&span);
        &self.items[span.range()]
    }

    /// Mutable items of the span.
    pub fn get_mut(&mut self, span: Span<T>) -> &mut [T] {
        self.check(&span);
        &mut self.items[span.range()]
    }
}

impl<T> Arena<T>
where
    T: Clone,
{
    /// Allocate span holding copies of `values`.
    pub fn alloc(&mut self, values: &[T]) -> Span<T> {
        if values.is_empty() {
            return Span::default();
        }

        let start = self.items.len();
        self.items.extend_from_slice(values);
        self.stats.allocations += 1;
        self.touch();

        Span {
            start: start as u32,
            len: values.len() as u32,
            epoch: self.epoch,
            marker: PhantomData,
        }
    }

    /// Append `values` to the span, growing it.
    pub fn extend(&mut self, span: &mut Span<T>, values: &[T]) {
        if span.len == 0 {
            *span = self.alloc(values);
            return;
        }

        self.check(span);
        let range = span.range();
        if range.end != self.items.len() {
            // Not on top. Move used prefix to the top first.
            let start = self.items.len();
            self.items.extend_from_within(range.clone());
            self.stats.relocations += 1;
            self.stats.copied += range.len() as u64;
            log::trace!(
                "Relocated span of {} items from {} to {}",
                range.len(),
                range.start,
                start
            );
            span.start = start as u32;
        }

        self.items.extend_from_slice(values);
        span.len += values.len() as u32;
        self.touch();
    }

    /// Append single value to the span, growing it.
    pub fn push(&mut self, span: &mut Span<T>, value: T) {
        self.extend(span, std::slice::from_ref(&value));
    }

    fn touch(&mut self) {
        self.stats.high_water = self.stats.high_water.max(self.items.len() as u64);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[test]
    fn top_span_grows_in_place() {
        let mut arena = Arena::new();
        let mut span = arena.alloc(&[1u32, 2]);
        arena.push(&mut span, 3);

        assert_eq!(arena.get(span), &[1, 2, 3]);
        assert_eq!(arena.used(), 3);
        assert_eq!(arena.stats().relocations, 0);
    }

    #[test]
    fn buried_span_relocates_used_prefix() {
        let mut arena = Arena::new();
        let mut first = arena.alloc(&[1u32, 2]);
        let second = arena.alloc(&[10u32]);
        arena.extend(&mut first, &[3, 4]);

        assert_eq!(arena.get(first), &[1, 2, 3, 4]);
        assert_eq!(arena.get(second), &[10]);
        assert_eq!(arena.stats().relocations, 1);
        assert_eq!(arena.stats().copied, 2);
        // Dead copy stays until reset.
        assert_eq!(arena.used(), 7);
    }

    #[test]
    fn reset_keeps_storage_and_bumps_epoch() {
        let mut arena = Arena::new();
        arena.alloc(&[0u8; 100]);
        let capacity = arena.capacity();
        arena.reset();

        assert_eq!(arena.used(), 0);
        assert_eq!(arena.epoch(), 1);
        assert_eq!(arena.capacity(), capacity);

        arena.release();
        assert_eq!(arena.epoch(), 2);
        assert!(arena.capacity() < capacity);
    }

    #[test]
    #[should_panic]
    #[cfg(not(feature = "no-slow-safety-checks"))]
    fn stale_span_is_detected() {
        let mut arena = Arena::new();
        let span = arena.alloc(&[1u32]);
        arena.reset();
        arena.alloc(&[2u32]);
        arena.get(span);
    }

    #[test]
    fn empty_spans() {
        let mut arena = Arena::<u64>::new();
        let mut span = arena.alloc(&[]);
        assert!(span.is_empty());
        assert!(arena.get(span).is_empty());
        arena.push(&mut span, 7);
        assert_eq!(arena.get(span), &[7]);
    }

    #[test]
    fn random_growth() {
        let mut rng = rand::thread_rng();
        let mut arena = Arena::new();
        let mut spans = vec![Span::default(); 8];
        let mut expected = vec![Vec::new(); 8];

        for value in 0..1000u32 {
            let index = rng.gen_range(0, spans.len());
            arena.push(&mut spans[index], value);
            expected[index].push(value);
        }

        for (span, expected) in spans.iter().zip(&expected) {
            assert_eq!(arena.get(*span), expected.as_slice());
        }
        assert!(arena.stats().high_water >= 1000);
    }
}
