//! Source-API vocabulary shared by forge crates.

mod flags;
mod pass;
mod region;

pub use self::{flags::*, pass::*, region::*};

use crate::handle::{BufferId, ImageViewId, SamplerId};

/// Opaque pixel format.
/// Format tables live with the capability collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Format(pub u32);

impl Format {
    /// Format is not specified.
    pub const UNDEFINED: Format = Format(0);
}

/// Image layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    DepthStencilReadOnlyOptimal,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    Preinitialized,
    PresentSrc,
}

impl Default for ImageLayout {
    fn default() -> Self {
        ImageLayout::Undefined
    }
}

/// Type of index buffer elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16 bit indices.
    U16,
    /// 32 bit indices.
    U32,
}

impl Default for IndexType {
    fn default() -> Self {
        IndexType::U16
    }
}

impl IndexType {
    /// Size of one index in bytes.
    pub fn size(&self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Bind point of pipelines and descriptor sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    /// Graphics pipelines.
    Graphics,
    /// Compute pipelines.
    Compute,
}

impl Default for PipelineBindPoint {
    fn default() -> Self {
        PipelineBindPoint::Graphics
    }
}

/// Command buffer level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Submitted to queues.
    Primary,
    /// Executed by primary buffers.
    Secondary,
}

impl Default for Level {
    fn default() -> Self {
        Level::Primary
    }
}

/// How the commands of a sub-pass are provided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubpassContents {
    /// Recorded directly into the primary buffer.
    Inline,
    /// Recorded in secondary buffers.
    SecondaryCommandBuffers,
}

impl Default for SubpassContents {
    fn default() -> Self {
        SubpassContents::Inline
    }
}

/// Attachment load operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Preserve previous contents.
    Load,
    /// Clear with the provided clear value.
    Clear,
    /// Contents are undefined.
    DontCare,
}

impl Default for LoadOp {
    fn default() -> Self {
        LoadOp::DontCare
    }
}

/// Attachment store operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Write contents to memory.
    Store,
    /// Contents may be discarded.
    DontCare,
}

impl Default for StoreOp {
    fn default() -> Self {
        StoreOp::DontCare
    }
}

/// Blit filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Nearest
    }
}

/// Query kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryType {
    Occlusion,
    Timestamp,
    PipelineStatistics,
}

impl Default for QueryType {
    fn default() -> Self {
        QueryType::Occlusion
    }
}

/// 2D offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset2D {
    pub x: i32,
    pub y: i32,
}

/// 2D extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

/// 3D offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// 3D extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub offset: Offset2D,
    pub extent: Extent2D,
}

impl Rect {
    /// Rectangle covering `extent` from origin.
    pub fn from_extent(extent: Extent2D) -> Self {
        Rect {
            offset: Offset2D::default(),
            extent,
        }
    }

    /// Check if rectangle covers the whole `extent`.
    pub fn covers(&self, extent: Extent2D) -> bool {
        self.offset.x <= 0
            && self.offset.y <= 0
            && i64::from(self.offset.x) + i64::from(self.extent.width) >= i64::from(extent.width)
            && i64::from(self.offset.y) + i64::from(self.extent.height) >= i64::from(extent.height)
    }

    /// Intersection of two rectangles.
    /// Empty rectangles are returned with zero extent.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.offset.x.max(other.offset.x);
        let y0 = self.offset.y.max(other.offset.y);
        let x1 = (i64::from(self.offset.x) + i64::from(self.extent.width))
            .min(i64::from(other.offset.x) + i64::from(other.extent.width));
        let y1 = (i64::from(self.offset.y) + i64::from(self.extent.height))
            .min(i64::from(other.offset.y) + i64::from(other.extent.height));

        Rect {
            offset: Offset2D { x: x0, y: y0 },
            extent: Extent2D {
                width: (x1 - i64::from(x0)).max(0) as u32,
                height: (y1 - i64::from(y0)).max(0) as u32,
            },
        }
    }
}

/// Viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Clear value of an attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    /// Color clear value.
    Color([f32; 4]),
    /// Depth and stencil clear values.
    DepthStencil {
        /// Depth value.
        depth: f32,
        /// Stencil value.
        stencil: u32,
    },
}

impl Default for ClearValue {
    fn default() -> Self {
        ClearValue::Color([0.0; 4])
    }
}

impl ClearValue {
    /// Color part of the clear value.
    pub fn color(&self) -> [f32; 4] {
        match *self {
            ClearValue::Color(color) => color,
            ClearValue::DepthStencil { .. } => [0.0; 4],
        }
    }

    /// Depth part of the clear value.
    pub fn depth(&self) -> f32 {
        match *self {
            ClearValue::DepthStencil { depth, .. } => depth,
            ClearValue::Color(_) => 1.0,
        }
    }

    /// Stencil part of the clear value.
    pub fn stencil(&self) -> u32 {
        match *self {
            ClearValue::DepthStencil { stencil, .. } => stencil,
            ClearValue::Color(_) => 0,
        }
    }
}

/// Resource written by a push-descriptor update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DescriptorResource {
    /// Uniform or storage buffer range.
    Buffer {
        /// Buffer.
        buffer: BufferId,
        /// Offset in bytes.
        offset: u64,
        /// Size in bytes.
        range: u64,
    },
    /// Sampled or storage image.
    Image {
        /// Image view.
        view: ImageViewId,
        /// Layout the image is in when accessed.
        layout: ImageLayout,
    },
    /// Sampler.
    Sampler(SamplerId),
    /// Image with sampler.
    CombinedImageSampler {
        /// Image view.
        view: ImageViewId,
        /// Layout the image is in when accessed.
        layout: ImageLayout,
        /// Sampler.
        sampler: SamplerId,
    },
}

/// Single descriptor written by push-descriptor update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescriptorWrite {
    /// Binding index in the set layout.
    pub binding: u32,
    /// Array element of the binding.
    pub element: u32,
    /// Written resource.
    pub resource: DescriptorResource,
}
