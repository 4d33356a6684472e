use super::{ClearValue, Extent3D, ImageAspectFlags, Offset3D, Rect};

/// Region of a buffer-to-buffer copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferCopy {
    /// Offset in source buffer.
    pub src_offset: u64,
    /// Offset in destination buffer.
    pub dst_offset: u64,
    /// Bytes to copy.
    pub size: u64,
}

/// Layers of a single mip level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSubresourceLayers {
    /// Aspects.
    pub aspects: ImageAspectFlags,
    /// Mip level.
    pub level: u32,
    /// First layer.
    pub base_layer: u32,
    /// Number of layers.
    pub layers: u32,
}

impl Default for ImageSubresourceLayers {
    fn default() -> Self {
        ImageSubresourceLayers {
            aspects: ImageAspectFlags::COLOR,
            level: 0,
            base_layer: 0,
            layers: 1,
        }
    }
}

/// Range of mip levels and layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSubresourceRange {
    /// Aspects.
    pub aspects: ImageAspectFlags,
    /// First mip level.
    pub base_level: u32,
    /// Number of mip levels.
    pub levels: u32,
    /// First layer.
    pub base_layer: u32,
    /// Number of layers.
    pub layers: u32,
}

impl Default for ImageSubresourceRange {
    fn default() -> Self {
        ImageSubresourceRange {
            aspects: ImageAspectFlags::COLOR,
            base_level: 0,
            levels: 1,
            base_layer: 0,
            layers: 1,
        }
    }
}

/// Region of an image-to-image copy or resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageCopy {
    pub src_subresource: ImageSubresourceLayers,
    pub src_offset: Offset3D,
    pub dst_subresource: ImageSubresourceLayers,
    pub dst_offset: Offset3D,
    pub extent: Extent3D,
}

/// Region of a buffer-to-image or image-to-buffer copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferImageCopy {
    /// Offset in buffer.
    pub buffer_offset: u64,
    /// Row length in texels, `0` means tightly packed.
    pub buffer_row_length: u32,
    /// Image height in texels, `0` means tightly packed.
    pub buffer_image_height: u32,
    pub image_subresource: ImageSubresourceLayers,
    pub image_offset: Offset3D,
    pub image_extent: Extent3D,
}

/// Region of a scaled image blit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageBlit {
    pub src_subresource: ImageSubresourceLayers,
    /// Opposite corners of the source region.
    pub src_bounds: [Offset3D; 2],
    pub dst_subresource: ImageSubresourceLayers,
    /// Opposite corners of the destination region.
    pub dst_bounds: [Offset3D; 2],
}

/// Area cleared by clear-attachments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClearRect {
    /// Cleared area.
    pub rect: Rect,
    /// First layer.
    pub base_layer: u32,
    /// Number of layers.
    pub layers: u32,
}

/// Attachment cleared by clear-attachments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearAttachment {
    /// Cleared aspects.
    pub aspects: ImageAspectFlags,
    /// Index of color attachment in current sub-pass.
    /// Ignored for depth-stencil.
    pub color_attachment: u32,
    /// Clear value.
    pub value: ClearValue,
}
