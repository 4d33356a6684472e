use {
    crate::stage::{map_stages, Side, StageSet},
    forge_core::{
        AccessFlags, BufferId, ImageId, ImageLayout, ImageSubresourceRange, PipelineStageFlags,
    },
    std::ops::Range,
};

/// Memory the barrier applies to.
#[derive(Clone, Debug, PartialEq)]
pub enum BarrierScope {
    /// All memory.
    Global,
    /// Byte range of a buffer.
    Buffer {
        /// Buffer.
        buffer: BufferId,
        /// Byte range.
        range: Range<u64>,
    },
    /// Subresources of an image with layout transition.
    Image {
        /// Image.
        image: ImageId,
        /// Subresources.
        range: ImageSubresourceRange,
        /// Layouts before and after the barrier.
        layouts: Range<ImageLayout>,
    },
}

/// Memory barrier of a pipeline barrier or event wait.
#[derive(Clone, Debug, PartialEq)]
pub struct Barrier {
    /// Memory affected.
    pub scope: BarrierScope,
    /// Accesses made available.
    pub src_access: AccessFlags,
    /// Accesses made visible.
    pub dst_access: AccessFlags,
}

impl Barrier {
    /// Global memory barrier.
    pub fn global(accesses: Range<AccessFlags>) -> Self {
        Barrier {
            scope: BarrierScope::Global,
            src_access: accesses.start,
            dst_access: accesses.end,
        }
    }

    /// Check if barrier needs native synchronization.
    ///
    /// Image barriers accessing nothing on either side only transition layout,
    /// which native textures do not have.
    pub fn is_layout_only(&self) -> bool {
        match self.scope {
            BarrierScope::Image { .. } => self.src_access.is_empty() && self.dst_access.is_empty(),
            _ => false,
        }
    }
}

/// Execution dependency reduced to native stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dependency {
    /// Stages that must complete.
    pub src: StageSet,
    /// Stages that must wait.
    pub dst: StageSet,
    /// Stage masks were widened.
    pub widened: bool,
}

impl Dependency {
    /// Reduce stage masks of a pipeline barrier.
    ///
    /// Returns `None` when nothing has to be ordered: either side maps to no native stage,
    /// or memory barriers are given and all of them are layout-only.
    pub fn reduce<'a>(
        src: PipelineStageFlags,
        dst: PipelineStageFlags,
        barriers: impl IntoIterator<Item = &'a Barrier>,
    ) -> Option<Self> {
        let mut any = false;
        let mut needed = false;
        for barrier in barriers {
            any = true;
            needed |= !barrier.is_layout_only();
        }
        if any && !needed {
            log::trace!("Layout-only barriers, no native synchronization");
            return None;
        }

        let src = map_stages(src, Side::Source);
        let dst = map_stages(dst, Side::Destination);
        if src.stages.is_empty() || dst.stages.is_empty() {
            return None;
        }

        Some(Dependency {
            src: src.stages,
            dst: dst.stages,
            widened: src.widened || dst.widened,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn image_barrier(src_access: AccessFlags, dst_access: AccessFlags) -> Barrier {
        Barrier {
            scope: BarrierScope::Image {
                image: ImageId(1),
                range: ImageSubresourceRange::default(),
                layouts: ImageLayout::Undefined..ImageLayout::ShaderReadOnlyOptimal,
            },
            src_access,
            dst_access,
        }
    }

    #[test]
    fn layout_only_barriers_are_dropped() {
        let barriers = [image_barrier(AccessFlags::empty(), AccessFlags::empty())];
        assert_eq!(
            Dependency::reduce(
                PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                PipelineStageFlags::FRAGMENT_SHADER,
                &barriers,
            ),
            None
        );
    }

    #[test]
    fn accessing_barriers_order_stages() {
        let barriers = [
            image_barrier(AccessFlags::empty(), AccessFlags::empty()),
            image_barrier(AccessFlags::TRANSFER_WRITE, AccessFlags::SHADER_READ),
        ];
        let dependency = Dependency::reduce(
            PipelineStageFlags::TRANSFER,
            PipelineStageFlags::FRAGMENT_SHADER,
            &barriers,
        )
        .unwrap();

        assert_eq!(dependency.src, StageSet::COPY);
        assert_eq!(dependency.dst, StageSet::FRAGMENT);
        assert!(!dependency.widened);
    }

    #[test]
    fn execution_only_dependency() {
        let dependency = Dependency::reduce(
            PipelineStageFlags::COMPUTE_SHADER,
            PipelineStageFlags::ALL_COMMANDS,
            None::<&Barrier>,
        )
        .unwrap();
        assert_eq!(dependency.dst, StageSet::all());
        assert!(dependency.widened);

        assert_eq!(
            Dependency::reduce(
                PipelineStageFlags::TOP_OF_PIPE,
                PipelineStageFlags::COMPUTE_SHADER,
                None::<&Barrier>,
            ),
            None
        );
    }
}
