//! Recorded commands.
//!
//! Every command type validates its arguments and captures native handles when recorded,
//! and translates itself into native calls when a primary buffer is encoded.

mod debug;
mod draw;
mod pass;
mod pipeline;
mod query;
mod state;
mod transfer;

pub(crate) use self::{debug::*, draw::*, pass::*, pipeline::*, query::*, state::*, transfer::*};
pub use self::{
    draw::{DispatchCommand, DrawCommand, DrawIndexedCommand},
    pass::{RenderPassBegin, RenderingAttachment, RenderingInfo},
    transfer::WHOLE_SIZE,
};

use {
    crate::{buffer::SecondaryRef, encoder::Encoder, storage::Storage},
    forge_memory::{ObjectPool, PoolCounts, Reuse},
    smallvec::SmallVec,
};

/// Command type kept in its own object pool.
pub(crate) trait Pooled: Reuse {
    fn pool(pools: &mut TypePools) -> &mut ObjectPool<Self>;

    fn into_command(self) -> Command;
}

macro_rules! commands {
    ($($(#[$meta:meta])* $variant:ident => $field:ident,)*) => {
        #[derive(Debug)]
        pub(crate) enum Command {
            $($variant($variant),)*
        }

        /// Kind of a recorded command.
        #[allow(missing_docs)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum CommandKind {
            $($(#[$meta])* $variant,)*
        }

        /// Free lists of every command type.
        #[derive(Debug)]
        pub(crate) struct TypePools {
            $($field: ObjectPool<$variant>,)*
        }

        impl TypePools {
            pub(crate) fn new(pooling: bool) -> Self {
                TypePools {
                    $($field: ObjectPool::new(pooling),)*
                }
            }

            pub(crate) fn release(&mut self, command: Command) {
                match command {
                    $(Command::$variant(command) => self.$field.release(command),)*
                }
            }

            /// Record that a command of the kind was dropped instead of released.
            pub(crate) fn forget(&mut self, kind: CommandKind) {
                match kind {
                    $(CommandKind::$variant => self.$field.forget(),)*
                }
            }

            pub(crate) fn counts(&self) -> PoolCounts {
                let mut counts = PoolCounts::default();
                $(counts = counts + self.$field.counts();)*
                counts
            }

            pub(crate) fn kind_counts(&self, kind: CommandKind) -> PoolCounts {
                match kind {
                    $(CommandKind::$variant => self.$field.counts(),)*
                }
            }

            pub(crate) fn clear(&mut self) {
                $(self.$field.clear();)*
            }
        }

        impl Command {
            pub(crate) fn kind(&self) -> CommandKind {
                match self {
                    $(Command::$variant(_) => CommandKind::$variant,)*
                }
            }

            pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
                match self {
                    $(Command::$variant(command) => command.encode(encoder, storage),)*
                }
            }
        }

        $(
            impl Reuse for $variant {}

            impl Pooled for $variant {
                fn pool(pools: &mut TypePools) -> &mut ObjectPool<Self> {
                    &mut pools.$field
                }

                fn into_command(self) -> Command {
                    Command::$variant(self)
                }
            }
        )*
    };
}

commands! {
    BindVertexBuffers => bind_vertex_buffers,
    BindIndexBuffer => bind_index_buffer,
    Draw => draw,
    DrawIndexed => draw_indexed,
    DrawIndirect => draw_indirect,
    DrawIndexedIndirect => draw_indexed_indirect,
    Dispatch => dispatch,
    DispatchIndirect => dispatch_indirect,
    BindPipeline => bind_pipeline,
    BindDescriptorSets => bind_descriptor_sets,
    PushDescriptorSet => push_descriptor_set,
    PushConstants => push_constants,
    PipelineBarrier => pipeline_barrier,
    SetEvent => set_event,
    ResetEvent => reset_event,
    WaitEvents => wait_events,
    SetViewport => set_viewport,
    SetScissor => set_scissor,
    SetLineWidth => set_line_width,
    SetDepthBias => set_depth_bias,
    SetBlendConstants => set_blend_constants,
    SetDepthBounds => set_depth_bounds,
    SetStencilCompareMask => set_stencil_compare_mask,
    SetStencilWriteMask => set_stencil_write_mask,
    SetStencilReference => set_stencil_reference,
    BeginRenderPass => begin_render_pass,
    NextSubpass => next_subpass,
    EndRenderPass => end_render_pass,
    BeginRendering => begin_rendering,
    EndRendering => end_rendering,
    ExecuteCommands => execute_commands,
    ClearAttachments => clear_attachments,
    CopyBuffer => copy_buffer,
    CopyImage => copy_image,
    BlitImage => blit_image,
    ResolveImage => resolve_image,
    CopyBufferToImage => copy_buffer_to_image,
    CopyImageToBuffer => copy_image_to_buffer,
    FillBuffer => fill_buffer,
    UpdateBuffer => update_buffer,
    ClearColorImage => clear_color_image,
    ClearDepthStencilImage => clear_depth_stencil_image,
    BeginQuery => begin_query,
    EndQuery => end_query,
    ResetQueryPool => reset_query_pool,
    WriteTimestamp => write_timestamp,
    CopyQueryPoolResults => copy_query_pool_results,
    BeginDebugLabel => begin_debug_label,
    EndDebugLabel => end_debug_label,
    InsertDebugLabel => insert_debug_label,
}

#[derive(Debug)]
struct Node {
    command: Command,
    next: Option<u32>,
}

/// Singly linked list of commands with the arenas holding their payloads.
///
/// Nodes live in one vector and link by index, so encoding can jump back
/// to replay a segment of the list.
#[derive(Debug, Default)]
pub(crate) struct Recording {
    nodes: Vec<Node>,
    head: Option<u32>,
    tail: Option<u32>,
    pub(crate) storage: Storage,
    pub(crate) executes: SmallVec<[SecondaryRef; 2]>,
}

impl Reuse for Recording {
    fn reuse(&mut self) {
        debug_assert!(self.nodes.is_empty(), "Commands must be released first");
        self.nodes.clear();
        self.head = None;
        self.tail = None;
        self.storage.reset();
        self.executes.clear();
    }
}

impl Recording {
    /// Number of recorded commands.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn head(&self) -> Option<u32> {
        self.head
    }

    /// Command at `index` and index of the next one.
    pub(crate) fn node(&self, index: u32) -> (&Command, Option<u32>) {
        let node = &self.nodes[index as usize];
        (&node.command, node.next)
    }

    pub(crate) fn push(&mut self, command: Command) {
        let index = self.nodes.len() as u32;
        self.nodes.push(Node {
            command,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
    }

    /// Kinds of recorded commands in order.
    pub(crate) fn kinds(&self) -> impl Iterator<Item = CommandKind> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let (command, next) = self.node(cursor?);
            cursor = next;
            Some(command.kind())
        })
    }

    /// Return commands to their pools. Returns number of released commands.
    pub(crate) fn release_commands(&mut self, pools: &mut TypePools) -> usize {
        let count = self.nodes.len();
        for node in self.nodes.drain(..) {
            pools.release(node.command);
        }
        self.head = None;
        self.tail = None;
        self.executes.clear();
        count
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn released_commands_return_to_type_pools() {
        let mut pools = TypePools::new(true);
        let mut recording = Recording::default();

        for _ in 0..3 {
            let draw = Draw::pool(&mut pools).acquire();
            recording.push(draw.into_command());
        }
        let label = EndDebugLabel::pool(&mut pools).acquire();
        recording.push(label.into_command());

        assert_eq!(
            recording.kinds().collect::<Vec<_>>(),
            vec![
                CommandKind::Draw,
                CommandKind::Draw,
                CommandKind::Draw,
                CommandKind::EndDebugLabel,
            ]
        );

        assert_eq!(recording.release_commands(&mut pools), 4);
        assert_eq!(pools.kind_counts(CommandKind::Draw).resident, 3);
        assert_eq!(pools.counts().resident, 4);
        assert!(recording.head().is_none());

        let draw = Draw::pool(&mut pools).acquire();
        assert_eq!(pools.kind_counts(CommandKind::Draw).created, 3);
        Draw::pool(&mut pools).release(draw);
    }
}
