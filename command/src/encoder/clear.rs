use {
    super::Encoder,
    forge_core::{
        ClearValue, ColorAttachmentDescriptor, DepthStencilAttachmentDescriptor, EncoderKind,
        Extent2D, ImageAspectFlags, ImageSubresourceRange, LoadAction, NativeTexture,
        RenderPassDescriptor, StoreAction, TextureTarget,
    },
};

/// Extent of a mip level.
pub(crate) fn level_extent(extent: Extent2D, level: u32) -> Extent2D {
    Extent2D {
        width: (extent.width >> level).max(1),
        height: (extent.height >> level).max(1),
    }
}

impl<'a> Encoder<'a> {
    /// Clear subresources of a texture outside of render passes.
    ///
    /// Every mip level is cleared by a render encoder that clears on load
    /// and stores, covering all layers of the range at once.
    pub(crate) fn clear_texture(
        &mut self,
        texture: NativeTexture,
        extent: Extent2D,
        range: &ImageSubresourceRange,
        value: ClearValue,
    ) {
        self.end_current_encoding();

        for level in range.base_level..range.base_level + range.levels {
            let target = TextureTarget {
                texture,
                level,
                layer: range.base_layer,
            };
            let size = level_extent(extent, level);
            let mut descriptor = RenderPassDescriptor {
                render_target_array_length: if range.layers > 1 { range.layers } else { 0 },
                width: size.width,
                height: size.height,
                ..RenderPassDescriptor::default()
            };

            if range.aspects.contains(ImageAspectFlags::COLOR) {
                descriptor.colors.push(Some(ColorAttachmentDescriptor {
                    target,
                    resolve: None,
                    load: LoadAction::Clear,
                    store: StoreAction::Store,
                    clear: value.color(),
                }));
            }
            if range.aspects.contains(ImageAspectFlags::DEPTH) {
                descriptor.depth = Some(DepthStencilAttachmentDescriptor {
                    target,
                    load: LoadAction::Clear,
                    store: StoreAction::Store,
                    clear: value.depth(),
                });
            }
            if range.aspects.contains(ImageAspectFlags::STENCIL) {
                descriptor.stencil = Some(DepthStencilAttachmentDescriptor {
                    target,
                    load: LoadAction::Clear,
                    store: StoreAction::Store,
                    clear: value.stencil() as f32,
                });
            }

            self.native.begin_render_pass(&descriptor, "forge clear");
            self.opened(EncoderKind::Render);
            self.end_current_encoding();
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        forge_core::empty::{Call, EmptyDevice, Recorder},
    };

    #[test]
    fn every_level_is_cleared_by_its_own_pass() {
        let device = EmptyDevice::default();
        let mut recorder = Recorder::new();
        {
            let mut encoder = Encoder::new(&device, &mut recorder, Vec::new());
            encoder.clear_texture(
                NativeTexture(3),
                Extent2D {
                    width: 16,
                    height: 4,
                },
                &ImageSubresourceRange {
                    base_level: 1,
                    levels: 3,
                    ..ImageSubresourceRange::default()
                },
                ClearValue::Color([0.5; 4]),
            );
            encoder.finish();
        }

        let sizes: Vec<_> = recorder
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::BeginRenderPass(descriptor, _) => Some((descriptor.width, descriptor.height)),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1)]);
        assert_eq!(recorder.open(), None);
    }
}
