use {
    forge_core::{Device, Format, FramebufferId, RenderPassId},
    smallvec::SmallVec,
};

/// Render state inherited by a secondary command buffer from the primary executing it.
///
/// Formats are checked against the primary's active sub-pass when the secondary is executed.
/// Empty `color_formats` with a known `render_pass` are taken from the render pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inheritance {
    /// Render pass the secondary continues.
    pub render_pass: Option<RenderPassId>,
    /// Sub-pass the secondary continues.
    pub subpass: u32,
    /// Framebuffer, if known.
    pub framebuffer: Option<FramebufferId>,
    /// Color attachment formats of the sub-pass.
    pub color_formats: SmallVec<[Format; 4]>,
    /// Depth-stencil attachment format of the sub-pass.
    pub depth_format: Option<Format>,
    /// View mask of the sub-pass.
    pub view_mask: u32,
    /// Secondary may be executed while an occlusion query is active.
    pub occlusion_query: bool,
}

impl Inheritance {
    /// Inherit sub-pass of a render pass.
    pub fn subpass(render_pass: RenderPassId, subpass: u32) -> Self {
        Inheritance {
            render_pass: Some(render_pass),
            subpass,
            ..Inheritance::default()
        }
    }

    /// Inherit dynamic rendering with given attachment formats.
    pub fn rendering(color_formats: &[Format], depth_format: Option<Format>) -> Self {
        Inheritance {
            color_formats: color_formats.iter().cloned().collect(),
            depth_format,
            ..Inheritance::default()
        }
    }

    /// Number of views rendered by the inherited sub-pass.
    pub fn view_count(&self) -> u32 {
        self.view_mask.count_ones().max(1)
    }

    /// Fill formats and view mask missing from the inheritance with the render pass ones.
    pub(crate) fn resolve(&self, device: &dyn Device) -> Self {
        let mut resolved = self.clone();
        if let Some(info) = self.render_pass.and_then(|id| device.render_pass(id)) {
            if resolved.color_formats.is_empty() {
                resolved.color_formats = info.color_formats(self.subpass);
            }
            if resolved.depth_format.is_none() {
                resolved.depth_format = info.depth_format(self.subpass);
            }
            if resolved.view_mask == 0 {
                if let Some(subpass) = info.subpasses.get(self.subpass as usize) {
                    resolved.view_mask = subpass.view_mask;
                }
            }
        }
        resolved
    }
}
