use {
    super::{Extent2D, Format, ImageLayout, LoadOp, StoreOp},
    crate::handle::ImageViewId,
    smallvec::SmallVec,
};

/// Description of a render pass attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttachmentDescription {
    /// Attachment format.
    pub format: Format,
    /// Sample count.
    pub samples: u32,
    /// Load operation of color or depth aspect.
    pub load_op: LoadOp,
    /// Store operation of color or depth aspect.
    pub store_op: StoreOp,
    /// Load operation of stencil aspect.
    pub stencil_load_op: LoadOp,
    /// Store operation of stencil aspect.
    pub stencil_store_op: StoreOp,
    /// Layout at render pass begin.
    pub initial_layout: ImageLayout,
    /// Layout at render pass end.
    pub final_layout: ImageLayout,
}

impl AttachmentDescription {
    /// Single sampled attachment with given ops for every aspect.
    pub fn new(format: Format, load_op: LoadOp, store_op: StoreOp) -> Self {
        AttachmentDescription {
            format,
            samples: 1,
            load_op,
            store_op,
            stencil_load_op: load_op,
            stencil_store_op: store_op,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::General,
        }
    }
}

/// Description of a sub-pass.
/// Attachment references are indices into `RenderPassInfo::attachments`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubpassDescription {
    /// Color attachments.
    pub colors: SmallVec<[Option<u32>; 4]>,
    /// Resolve targets, one per color attachment when not empty.
    pub resolves: SmallVec<[Option<u32>; 4]>,
    /// Depth-stencil attachment.
    pub depth_stencil: Option<u32>,
    /// Input attachments.
    pub inputs: SmallVec<[Option<u32>; 2]>,
    /// Views rendered by the sub-pass, `0` if multiview is not used.
    pub view_mask: u32,
}

impl SubpassDescription {
    /// Check if sub-pass references the attachment in any role.
    pub fn uses(&self, attachment: u32) -> bool {
        let hit = |r: &Option<u32>| *r == Some(attachment);
        self.colors.iter().any(hit)
            || self.resolves.iter().any(hit)
            || self.inputs.iter().any(hit)
            || self.depth_stencil == Some(attachment)
    }

    /// Resolve target of color attachment `index`.
    pub fn resolve(&self, index: usize) -> Option<u32> {
        self.resolves.get(index).cloned().and_then(|r| r)
    }

    /// Number of native render passes needed to render all views of the sub-pass.
    ///
    /// With layered rendering each contiguous run of views is rendered by one native pass,
    /// otherwise every view needs its own pass.
    pub fn multiview_native_pass_count(&self, layered: bool) -> u32 {
        if self.view_mask == 0 {
            1
        } else if layered {
            view_runs(self.view_mask).count() as u32
        } else {
            self.view_mask.count_ones()
        }
    }

    /// First view rendered by native pass `pass`.
    pub fn first_view_in_native_pass(&self, pass: u32, layered: bool) -> u32 {
        self.native_pass_views(pass, layered).0
    }

    /// Number of views rendered by native pass `pass`.
    pub fn view_count_in_native_pass(&self, pass: u32, layered: bool) -> u32 {
        self.native_pass_views(pass, layered).1
    }

    /// Largest number of views a single native pass renders as layers.
    pub fn max_layered_views(&self, layered: bool) -> u32 {
        if self.view_mask == 0 || !layered {
            return 1;
        }
        view_runs(self.view_mask)
            .map(|(_, count)| count)
            .max()
            .unwrap_or(1)
    }

    fn native_pass_views(&self, pass: u32, layered: bool) -> (u32, u32) {
        if self.view_mask == 0 {
            return (0, 1);
        }

        if layered {
            view_runs(self.view_mask)
                .nth(pass as usize)
                .unwrap_or((0, 0))
        } else {
            (0..32)
                .filter(|bit| self.view_mask & (1 << bit) != 0)
                .nth(pass as usize)
                .map_or((0, 0), |view| (view, 1))
        }
    }
}

/// Iterate over contiguous runs of set bits as `(first, count)` pairs.
fn view_runs(mask: u32) -> impl Iterator<Item = (u32, u32)> {
    let mut rest = mask;
    std::iter::from_fn(move || {
        if rest == 0 {
            return None;
        }
        let first = rest.trailing_zeros();
        let count = (rest >> first).trailing_ones();
        rest &= !(((1u64 << count) - 1) << first) as u32;
        Some((first, count))
    })
}

/// Render pass description supplied by the render pass collaborator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPassInfo {
    /// Attachments of the render pass.
    pub attachments: Vec<AttachmentDescription>,
    /// Sub-passes in execution order.
    pub subpasses: Vec<SubpassDescription>,
}

impl RenderPassInfo {
    /// Index of first sub-pass that uses the attachment.
    pub fn first_use(&self, attachment: u32) -> Option<u32> {
        self.subpasses
            .iter()
            .position(|subpass| subpass.uses(attachment))
            .map(|index| index as u32)
    }

    /// Index of last sub-pass that uses the attachment.
    pub fn last_use(&self, attachment: u32) -> Option<u32> {
        self.subpasses
            .iter()
            .rposition(|subpass| subpass.uses(attachment))
            .map(|index| index as u32)
    }

    /// Formats of color attachments of sub-pass.
    pub fn color_formats(&self, subpass: u32) -> SmallVec<[Format; 4]> {
        self.subpasses
            .get(subpass as usize)
            .map(|subpass| {
                subpass
                    .colors
                    .iter()
                    .map(|color| match color {
                        Some(index) => self.attachments[*index as usize].format,
                        None => Format::UNDEFINED,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Format of depth-stencil attachment of sub-pass.
    pub fn depth_format(&self, subpass: u32) -> Option<Format> {
        self.subpasses
            .get(subpass as usize)
            .and_then(|subpass| subpass.depth_stencil)
            .map(|index| self.attachments[index as usize].format)
    }
}

/// Framebuffer description supplied by the render pass collaborator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FramebufferInfo {
    /// Image views bound to render pass attachments.
    pub attachments: Vec<ImageViewId>,
    /// Framebuffer extent.
    pub extent: Extent2D,
    /// Framebuffer layers.
    pub layers: u32,
}

#[cfg(test)]
mod test {
    use {super::*, smallvec::smallvec};

    fn subpass(view_mask: u32) -> SubpassDescription {
        SubpassDescription {
            view_mask,
            ..SubpassDescription::default()
        }
    }

    #[test]
    fn multiview_pass_count() {
        assert_eq!(subpass(0).multiview_native_pass_count(true), 1);
        assert_eq!(subpass(0b1111).multiview_native_pass_count(true), 1);
        assert_eq!(subpass(0b1111).multiview_native_pass_count(false), 4);
        assert_eq!(subpass(0b1101).multiview_native_pass_count(true), 2);
        assert_eq!(subpass(0x8000_0001).multiview_native_pass_count(true), 2);
    }

    #[test]
    fn multiview_pass_views() {
        let sub = subpass(0b1101);
        assert_eq!(sub.first_view_in_native_pass(0, true), 0);
        assert_eq!(sub.view_count_in_native_pass(0, true), 1);
        assert_eq!(sub.first_view_in_native_pass(1, true), 2);
        assert_eq!(sub.view_count_in_native_pass(1, true), 2);
        assert_eq!(sub.first_view_in_native_pass(2, false), 3);
        assert_eq!(sub.view_count_in_native_pass(2, false), 1);
    }

    #[test]
    fn layered_view_limit() {
        assert_eq!(subpass(0).max_layered_views(true), 1);
        assert_eq!(subpass(0b1011).max_layered_views(true), 2);
        assert_eq!(subpass(0b1011).max_layered_views(false), 1);
        assert_eq!(subpass(0b0111_0001).max_layered_views(true), 3);
    }

    #[test]
    fn attachment_uses() {
        let mut pass = RenderPassInfo::default();
        pass.attachments
            .push(AttachmentDescription::new(Format(1), LoadOp::Clear, StoreOp::Store));
        pass.attachments
            .push(AttachmentDescription::new(Format(2), LoadOp::Load, StoreOp::Store));
        pass.subpasses.push(SubpassDescription {
            colors: smallvec![Some(0)],
            ..SubpassDescription::default()
        });
        pass.subpasses.push(SubpassDescription {
            colors: smallvec![Some(1)],
            inputs: smallvec![Some(0)],
            ..SubpassDescription::default()
        });

        assert_eq!(pass.first_use(0), Some(0));
        assert_eq!(pass.last_use(0), Some(1));
        assert_eq!(pass.first_use(1), Some(1));
        assert_eq!(pass.color_formats(1).as_slice(), &[Format(2)]);
        assert_eq!(pass.depth_format(0), None);
    }
}
