//! Opaque handles.
//!
//! Source handles name objects the application created through the source API.
//! Native handles name objects of the target API and are produced by collaborators.

macro_rules! define_handles {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
            #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
            pub struct $name(pub u64);

            impl $name {
                /// Raw handle value.
                pub fn raw(&self) -> u64 {
                    self.0
                }
            }
        )*
    };
}

define_handles! {
    /// Source-API buffer.
    BufferId;
    /// Source-API image.
    ImageId;
    /// Source-API image view.
    ImageViewId;
    /// Source-API sampler.
    SamplerId;
    /// Source-API graphics or compute pipeline.
    PipelineId;
    /// Source-API pipeline layout.
    PipelineLayoutId;
    /// Source-API descriptor set.
    DescriptorSetId;
    /// Source-API query pool.
    QueryPoolId;
    /// Source-API event.
    EventId;
    /// Source-API render pass.
    RenderPassId;
    /// Source-API framebuffer.
    FramebufferId;

    /// Native buffer.
    NativeBuffer;
    /// Native texture.
    NativeTexture;
    /// Native sampler state.
    NativeSampler;
    /// Native render or compute pipeline state.
    NativePipeline;
    /// Native fence used for intra-command-buffer ordering.
    NativeFence;
    /// Native shared event.
    NativeEvent;
}
