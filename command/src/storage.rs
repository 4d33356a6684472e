//! Variable-length payloads of recorded commands.

use {
    forge_chain::Barrier,
    forge_core::{
        BufferCopy, BufferImageCopy, ClearRect, DescriptorSetId, DescriptorWrite, EventId,
        ImageBlit, ImageCopy, ImageSubresourceRange, NativeBuffer,
    },
    forge_memory::{Arena, ArenaStats, Span},
};

/// Vertex buffer bound by `bind_vertex_buffers`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexBuffer {
    /// Native buffer.
    pub buffer: NativeBuffer,
    /// Offset in bytes.
    pub offset: u64,
}

/// Item type placed in one of the arenas of `Storage`.
pub trait Stored: Clone + Sized {
    /// Arena of the type.
    fn arena(storage: &Storage) -> &Arena<Self>;

    /// Mutable arena of the type.
    fn arena_mut(storage: &mut Storage) -> &mut Arena<Self>;
}

macro_rules! storage {
    ($($field:ident: $ty:ty,)*) => {
        /// Arenas holding command payloads of one recording.
        #[derive(Debug, Default)]
        pub struct Storage {
            $($field: Arena<$ty>,)*
        }

        $(
            impl Stored for $ty {
                fn arena(storage: &Storage) -> &Arena<Self> {
                    &storage.$field
                }

                fn arena_mut(storage: &mut Storage) -> &mut Arena<Self> {
                    &mut storage.$field
                }
            }
        )*

        impl Storage {
            /// Drop payloads keeping memory for the next recording.
            pub fn reset(&mut self) {
                $(self.$field.reset();)*
            }

            /// Drop payloads and return memory to the system.
            pub fn release(&mut self) {
                $(self.$field.release();)*
            }

            /// Statistics summed over all arenas.
            pub fn stats(&self) -> ArenaStats {
                let mut stats = ArenaStats::default();
                $(
                    let arena = self.$field.stats();
                    stats.allocations += arena.allocations;
                    stats.relocations += arena.relocations;
                    stats.copied += arena.copied;
                    stats.high_water += arena.high_water;
                )*
                stats
            }
        }
    };
}

storage! {
    bytes: u8,
    words: u32,
    barriers: Barrier,
    buffer_copies: BufferCopy,
    image_copies: ImageCopy,
    buffer_image_copies: BufferImageCopy,
    blits: ImageBlit,
    vertex_buffers: VertexBuffer,
    descriptor_sets: DescriptorSetId,
    events: EventId,
    clear_rects: ClearRect,
    ranges: ImageSubresourceRange,
    descriptor_writes: DescriptorWrite,
}

impl Storage {
    /// Copy `values` into the arena of their type.
    pub fn alloc<T: Stored>(&mut self, values: &[T]) -> Span<T> {
        T::arena_mut(self).alloc(values)
    }

    /// Items of the span.
    pub fn get<T: Stored>(&self, span: Span<T>) -> &[T] {
        T::arena(self).get(span)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn typed_spans_land_in_separate_arenas() {
        let mut storage = Storage::default();
        let bytes = storage.alloc(&[1u8, 2, 3]);
        let words = storage.alloc(&[7u32]);
        let copies = storage.alloc(&[BufferCopy {
            src_offset: 0,
            dst_offset: 16,
            size: 4,
        }]);

        assert_eq!(storage.get(bytes), &[1, 2, 3]);
        assert_eq!(storage.get(words), &[7]);
        assert_eq!(storage.get(copies)[0].dst_offset, 16);
        assert_eq!(storage.stats().allocations, 3);
    }

    #[test]
    fn reset_drops_payloads() {
        let mut storage = Storage::default();
        storage.alloc(&[0u8; 64]);
        storage.reset();

        let span = storage.alloc(&[5u8]);
        assert_eq!(storage.get(span), &[5]);
        assert_eq!(storage.stats().high_water, 64);
    }
}
