use {
    super::Encoder,
    forge_core::{
        ClearAttachment, ClearRect, ClearValue, ColorAttachmentDescriptor,
        DepthStencilAttachmentDescriptor, Device, EncoderKind, Extent2D, Extent3D,
        FormatCapabilities, ImageAspectFlags, ImageCopy, ImageSubresourceLayers, ImageViewInfo,
        LoadAction, LoadOp, NativeBuffer, NativeCommandBuffer, NativeTexture, Offset3D, Rect,
        RenderPassDescriptor, RenderPassInfo, StoreAction, StoreOp, SubpassContents,
        SubpassDescription, TextureTarget,
    },
    smallvec::SmallVec,
    std::{borrow::Cow, mem},
    thread_profiler::profile_scope,
};

/// Multisample resolve the native pass can't do.
#[derive(Clone, Copy, Debug)]
struct ExplicitResolve {
    src: NativeTexture,
    dst: NativeTexture,
    region: ImageCopy,
}

/// Store actions of the open native pass.
#[derive(Clone, Debug, Default)]
struct OpenTargets {
    colors: SmallVec<[(u32, StoreAction); 4]>,
    depth: Option<StoreAction>,
    stencil: Option<StoreAction>,
}

/// Native pass to open.
#[derive(Debug)]
struct NativePass {
    restart: bool,
    descriptor: RenderPassDescriptor,
    clears: SmallVec<[ClearAttachment; 4]>,
    view_range: Option<[u32; 2]>,
    layers: u32,
}

/// Source render pass being encoded.
///
/// One sub-pass is encoded by one or more native passes, one per group of views.
/// A native pass may be interrupted by work that needs another encoder,
/// in which case the render encoder is reopened with contents loaded.
#[derive(Debug)]
pub(crate) struct PassState<'a> {
    info: Cow<'a, RenderPassInfo>,
    views: SmallVec<[Option<ImageViewInfo>; 8]>,
    clear_values: SmallVec<[ClearValue; 8]>,
    pub(crate) render_area: Rect,
    extent: Extent2D,
    layers: u32,
    pub(crate) subpass: u32,
    pub(crate) contents: SubpassContents,
    pub(crate) multiview_pass: u32,
    pub(crate) layered_views: u32,
    pub(crate) suspending: bool,
    pub(crate) resuming: bool,
    pub(crate) closing: bool,
    opened: bool,
    replay_start: Option<u32>,
    targets: OpenTargets,
    resolves: SmallVec<[ExplicitResolve; 2]>,
}

fn texture_target(view: &ImageViewInfo, first_view: u32) -> TextureTarget {
    TextureTarget {
        texture: view.native,
        level: view.level,
        layer: view.base_layer + first_view,
    }
}

fn resolve_region(
    src: &ImageViewInfo,
    dst: &ImageViewInfo,
    first_view: u32,
    layers: u32,
    area: Rect,
) -> ImageCopy {
    let subresource = |view: &ImageViewInfo| ImageSubresourceLayers {
        aspects: ImageAspectFlags::COLOR,
        level: view.level,
        base_layer: view.base_layer + first_view,
        layers,
    };
    let offset = Offset3D {
        x: area.offset.x,
        y: area.offset.y,
        z: 0,
    };

    ImageCopy {
        src_subresource: subresource(src),
        src_offset: offset,
        dst_subresource: subresource(dst),
        dst_offset: offset,
        extent: Extent3D {
            width: area.extent.width,
            height: area.extent.height,
            depth: 1,
        },
    }
}

impl<'a> PassState<'a> {
    /// Pass over `views` bound to attachments of `info`.
    pub(crate) fn new(
        info: Cow<'a, RenderPassInfo>,
        views: SmallVec<[Option<ImageViewInfo>; 8]>,
        clear_values: SmallVec<[ClearValue; 8]>,
        render_area: Rect,
        extent: Extent2D,
        layers: u32,
    ) -> Self {
        PassState {
            info,
            views,
            clear_values,
            render_area,
            extent,
            layers,
            subpass: 0,
            contents: SubpassContents::Inline,
            multiview_pass: 0,
            layered_views: 1,
            suspending: false,
            resuming: false,
            closing: false,
            opened: false,
            replay_start: None,
            targets: OpenTargets::default(),
            resolves: SmallVec::new(),
        }
    }

    fn current(&self) -> Option<&SubpassDescription> {
        self.info.subpasses.get(self.subpass as usize)
    }

    /// Number of native passes the current sub-pass needs.
    pub(crate) fn native_pass_count(&self, layered: bool) -> u32 {
        self.current()
            .map_or(1, |subpass| subpass.multiview_native_pass_count(layered))
    }

    /// Number of views the current sub-pass renders.
    pub(crate) fn view_count(&self) -> u32 {
        self.current()
            .map_or(1, |subpass| subpass.view_mask.count_ones().max(1))
    }

    fn view(&self, attachment: u32) -> Option<ImageViewInfo> {
        self.views.get(attachment as usize).cloned().and_then(|v| v)
    }

    fn clear_value(&self, attachment: u32) -> ClearValue {
        self.clear_values
            .get(attachment as usize)
            .cloned()
            .unwrap_or_default()
    }

    fn covers(&self) -> bool {
        self.render_area.covers(self.extent)
    }

    fn first_use(&self, attachment: u32) -> bool {
        !self.opened && !self.resuming && self.info.first_use(attachment) == Some(self.subpass)
    }

    /// Contents are kept unless this is the first use and the whole attachment is rendered.
    fn load_action(&self, attachment: u32, op: LoadOp) -> LoadAction {
        if !self.first_use(attachment) || !self.covers() {
            return LoadAction::Load;
        }
        match op {
            LoadOp::Load => LoadAction::Load,
            LoadOp::Clear => LoadAction::Clear,
            LoadOp::DontCare => LoadAction::DontCare,
        }
    }

    /// Partial render area can't be cleared by load action.
    fn clears_by_drawing(&self, attachment: u32, op: LoadOp) -> bool {
        op == LoadOp::Clear && self.first_use(attachment) && !self.covers()
    }

    /// Contents are kept unless this is the last use and the whole attachment is rendered.
    fn store_action(&self, attachment: u32, op: StoreOp) -> StoreAction {
        if self.suspending || self.info.last_use(attachment) != Some(self.subpass) || !self.covers()
        {
            return StoreAction::Store;
        }
        match op {
            StoreOp::Store => StoreAction::Store,
            StoreOp::DontCare => StoreAction::DontCare,
        }
    }

    /// Describe next native pass and remember what it stores and resolves.
    fn native_pass(
        &mut self,
        device: &dyn Device,
        layered: bool,
        visibility: Option<NativeBuffer>,
    ) -> NativePass {
        let restart = self.opened;
        let subpass = match self.current() {
            Some(subpass) => subpass.clone(),
            None => SubpassDescription::default(),
        };

        let multiview = subpass.view_mask != 0;
        let first_view = subpass.first_view_in_native_pass(self.multiview_pass, layered);
        let view_count = subpass.view_count_in_native_pass(self.multiview_pass, layered);
        let base = if multiview { first_view } else { 0 };
        let array_length = if multiview && layered {
            view_count
        } else if self.layers > 1 {
            self.layers
        } else {
            0
        };
        let layers = array_length.max(1);

        let mut descriptor = RenderPassDescriptor {
            render_target_array_length: array_length,
            width: self.extent.width,
            height: self.extent.height,
            visibility_buffer: visibility,
            ..RenderPassDescriptor::default()
        };
        let mut clears = SmallVec::new();
        let mut resolves = SmallVec::new();
        let mut targets = OpenTargets::default();

        for (index, &color) in subpass.colors.iter().enumerate() {
            let (attachment, view) = match color.and_then(|a| self.view(a).map(|v| (a, v))) {
                Some(found) => found,
                None => {
                    descriptor.colors.push(None);
                    continue;
                }
            };
            let description = self.info.attachments[attachment as usize];
            let load = self.load_action(attachment, description.load_op);
            let mut store = self.store_action(attachment, description.store_op);
            let mut resolve = None;

            if let Some(target) = subpass.resolve(index).and_then(|r| self.view(r)) {
                let native = view.samples > 1
                    && view.format == target.format
                    && device
                        .format_capabilities(target.format)
                        .contains(FormatCapabilities::RESOLVE);
                if native {
                    resolve = Some(texture_target(&target, base));
                    store = store.with_resolve();
                } else {
                    store = StoreAction::Store;
                    resolves.push(ExplicitResolve {
                        src: view.native,
                        dst: target.native,
                        region: resolve_region(&view, &target, base, layers, self.render_area),
                    });
                }
            }

            if self.clears_by_drawing(attachment, description.load_op) {
                clears.push(ClearAttachment {
                    aspects: ImageAspectFlags::COLOR,
                    color_attachment: index as u32,
                    value: self.clear_value(attachment),
                });
            }

            targets.colors.push((index as u32, store));
            descriptor.colors.push(Some(ColorAttachmentDescriptor {
                target: texture_target(&view, base),
                resolve,
                load,
                store,
                clear: self.clear_value(attachment).color(),
            }));
        }

        if let Some((attachment, view)) = subpass
            .depth_stencil
            .and_then(|a| self.view(a).map(|v| (a, v)))
        {
            let description = self.info.attachments[attachment as usize];
            let clear = self.clear_value(attachment);
            let target = texture_target(&view, base);
            let mut aspects = ImageAspectFlags::empty();

            let store = self.store_action(attachment, description.store_op);
            descriptor.depth = Some(DepthStencilAttachmentDescriptor {
                target,
                load: self.load_action(attachment, description.load_op),
                store,
                clear: clear.depth(),
            });
            targets.depth = Some(store);
            if self.clears_by_drawing(attachment, description.load_op) {
                aspects |= ImageAspectFlags::DEPTH;
            }

            if device
                .format_capabilities(view.format)
                .contains(FormatCapabilities::STENCIL)
            {
                let store = self.store_action(attachment, description.stencil_store_op);
                descriptor.stencil = Some(DepthStencilAttachmentDescriptor {
                    target,
                    load: self.load_action(attachment, description.stencil_load_op),
                    store,
                    clear: clear.stencil() as f32,
                });
                targets.stencil = Some(store);
                if self.clears_by_drawing(attachment, description.stencil_load_op) {
                    aspects |= ImageAspectFlags::STENCIL;
                }
            }

            if !aspects.is_empty() {
                clears.push(ClearAttachment {
                    aspects,
                    color_attachment: 0,
                    value: clear,
                });
            }
        }

        self.opened = true;
        self.targets = targets;
        self.layered_views = if multiview && layered { view_count } else { 1 };
        if !restart {
            self.resolves = resolves;
        }

        NativePass {
            restart,
            descriptor,
            clears,
            view_range: if multiview {
                Some([first_view, view_count])
            } else {
                None
            },
            layers,
        }
    }

    /// Keep contents of the interrupted native pass for the encoder reopened later.
    pub(crate) fn interrupt(&self, native: &mut dyn NativeCommandBuffer) {
        for &(index, store) in &self.targets.colors {
            if store != StoreAction::Store {
                native.set_color_store_action(index, StoreAction::Store);
            }
        }
        if self.targets.depth.map_or(false, |store| store != StoreAction::Store) {
            native.set_depth_store_action(StoreAction::Store);
        }
        if self.targets.stencil.map_or(false, |store| store != StoreAction::Store) {
            native.set_stencil_store_action(StoreAction::Store);
        }
    }
}

impl<'a> Encoder<'a> {
    fn layered_multiview(&self) -> bool {
        self.config.layered_multiview && self.device.limits().layered_rendering
    }

    /// Enter a render pass and open its first native pass.
    pub(crate) fn begin_pass(&mut self, mut pass: PassState<'a>) {
        self.end_current_encoding();
        pass.replay_start = self.replay_start();
        self.pass = Some(pass);
        self.begin_native_render_pass();
    }

    /// Open render encoder for the current native pass of the current sub-pass.
    pub(crate) fn begin_native_render_pass(&mut self) {
        profile_scope!("begin_native_render_pass");

        let layered = self.layered_multiview();
        let device = self.device;
        let visibility = self.queries.visibility_buffer();
        let (native, render_area) = match self.pass.as_mut() {
            Some(pass) => (pass.native_pass(device, layered, visibility), pass.render_area),
            None => return,
        };

        let label = if native.restart {
            "forge render (restarted)"
        } else {
            "forge render"
        };
        self.native.begin_render_pass(&native.descriptor, label);
        if native.restart {
            self.stats.restarts += 1;
        }
        self.queries.visibility = native.descriptor.visibility_buffer;
        self.opened(EncoderKind::Render);

        if let Some(range) = native.view_range {
            self.graphics.view_range.set(range);
        }

        if !native.clears.is_empty() {
            self.native.clear_attachments(
                &native.clears,
                &[ClearRect {
                    rect: render_area,
                    base_layer: 0,
                    layers: native.layers,
                }],
            );
            self.fallback("clear of partial render area");
        }

        self.resume_occlusion();
    }

    /// End the native pass with final actions and run explicit resolves.
    /// Returns `true` if the sub-pass needs another native pass, which is opened
    /// and the sub-pass commands are replayed into it.
    fn finish_native_pass(&mut self) -> bool {
        if self.kind != Some(EncoderKind::Render) && !self.graphics_encoder() {
            return false;
        }
        if let Some(pass) = self.pass.as_mut() {
            pass.closing = true;
        }
        self.end_current_encoding();

        let layered = self.layered_multiview();
        let (resolves, more, replay) = match self.pass.as_mut() {
            Some(pass) => {
                pass.closing = false;
                pass.opened = false;
                let more = pass.multiview_pass + 1 < pass.native_pass_count(layered);
                if more {
                    pass.multiview_pass += 1;
                }
                (mem::take(&mut pass.resolves), more, pass.replay_start)
            }
            None => return false,
        };

        if !resolves.is_empty() {
            self.blit_encoder();
            for resolve in &resolves {
                self.native
                    .resolve_texture(resolve.src, resolve.dst, &resolve.region);
            }
            self.fallback("multisample resolve of non-resolvable format");
        }

        if more {
            self.end_current_encoding();
            self.begin_native_render_pass();
            self.replay_from(replay);
        }
        more
    }

    /// Advance to the next sub-pass.
    pub(crate) fn next_subpass(&mut self, contents: SubpassContents) {
        if self.finish_native_pass() {
            return;
        }
        let start = self.replay_start();
        if let Some(pass) = self.pass.as_mut() {
            pass.subpass += 1;
            pass.multiview_pass = 0;
            pass.contents = contents;
            pass.replay_start = start;
        }
        self.end_current_encoding();
        self.begin_native_render_pass();
    }

    /// Leave the render pass once all its native passes are encoded.
    pub(crate) fn end_pass(&mut self) {
        if self.finish_native_pass() {
            return;
        }
        self.end_current_encoding();
        self.pass = None;
        self.graphics.view_range.clear();
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        forge_core::{
            empty::{Call, EmptyDevice, Recorder},
            AttachmentDescription, Format, ImageViewId, Offset2D,
        },
        smallvec::smallvec,
    };

    const COLOR: Format = Format(1);

    fn pass_info(load_op: LoadOp, store_op: StoreOp) -> RenderPassInfo {
        RenderPassInfo {
            attachments: vec![AttachmentDescription::new(COLOR, load_op, store_op)],
            subpasses: vec![SubpassDescription {
                colors: smallvec![Some(0)],
                ..SubpassDescription::default()
            }],
        }
    }

    fn state<'a>(
        device: &EmptyDevice,
        info: RenderPassInfo,
        view: ImageViewId,
        render_area: Rect,
    ) -> PassState<'a> {
        PassState::new(
            Cow::Owned(info),
            smallvec![device.image_view(view)],
            smallvec![ClearValue::Color([1.0, 0.0, 0.0, 1.0])],
            render_area,
            Extent2D {
                width: 64,
                height: 64,
            },
            1,
        )
    }

    fn full() -> Rect {
        Rect::from_extent(Extent2D {
            width: 64,
            height: 64,
        })
    }

    fn begin_descriptor(recorder: &Recorder) -> RenderPassDescriptor {
        match &recorder.calls[0] {
            Call::BeginRenderPass(descriptor, _) => descriptor.clone(),
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn covered_single_use_attachment_clears_and_stores() {
        let mut device = EmptyDevice::default();
        let (_, view) = device.create_render_target(COLOR, 64, 64, 1);
        let mut recorder = Recorder::new();
        {
            let mut encoder = Encoder::new(&device, &mut recorder, Vec::new());
            encoder.begin_pass(state(&device, pass_info(LoadOp::Clear, StoreOp::Store), view, full()));
            encoder.end_pass();
            encoder.finish();
        }

        let color = begin_descriptor(&recorder).colors[0].unwrap();
        assert_eq!(color.load, LoadAction::Clear);
        assert_eq!(color.store, StoreAction::Store);
        assert_eq!(color.clear, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(recorder.count(|call| matches!(call, Call::SetColorStoreAction(..))), 0);
    }

    #[test]
    fn partial_render_area_loads_and_clears_by_drawing() {
        let mut device = EmptyDevice::default();
        let (_, view) = device.create_render_target(COLOR, 64, 64, 1);
        let area = Rect {
            offset: Offset2D { x: 16, y: 16 },
            extent: Extent2D {
                width: 16,
                height: 16,
            },
        };
        let mut recorder = Recorder::new();
        let stats = {
            let mut encoder = Encoder::new(&device, &mut recorder, Vec::new());
            encoder.begin_pass(state(&device, pass_info(LoadOp::Clear, StoreOp::DontCare), view, area));
            encoder.end_pass();
            encoder.finish().0
        };

        let color = begin_descriptor(&recorder).colors[0].unwrap();
        assert_eq!(color.load, LoadAction::Load);
        assert_eq!(color.store, StoreAction::Store);
        assert_eq!(
            recorder.calls[1],
            Call::ClearAttachments(
                vec![ClearAttachment {
                    aspects: ImageAspectFlags::COLOR,
                    color_attachment: 0,
                    value: ClearValue::Color([1.0, 0.0, 0.0, 1.0]),
                }],
                vec![ClearRect {
                    rect: area,
                    base_layer: 0,
                    layers: 1,
                }],
            )
        );
        assert_eq!(stats.fallbacks, 1);
    }

    #[test]
    fn interrupted_pass_keeps_contents() {
        let mut device = EmptyDevice::default();
        let (_, view) = device.create_render_target(COLOR, 64, 64, 1);
        let mut recorder = Recorder::new();
        let stats = {
            let mut encoder = Encoder::new(&device, &mut recorder, Vec::new());
            encoder.begin_pass(state(&device, pass_info(LoadOp::Clear, StoreOp::DontCare), view, full()));
            encoder.blit_encoder();
            assert!(encoder.graphics_encoder());
            encoder.end_pass();
            encoder.finish().0
        };

        let begins: Vec<_> = recorder
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::BeginRenderPass(descriptor, _) => descriptor.colors[0],
                _ => None,
            })
            .collect();
        assert_eq!(begins.len(), 2);
        assert_eq!(begins[0].load, LoadAction::Clear);
        assert_eq!(begins[1].load, LoadAction::Load);
        assert_eq!(begins[1].store, StoreAction::DontCare);
        assert_eq!(
            recorder.count(|call| *call == Call::SetColorStoreAction(0, StoreAction::Store)),
            1
        );
        assert_eq!(stats.restarts, 1);
    }

    #[test]
    fn unresolvable_format_resolves_with_blit() {
        let mut device = EmptyDevice::default();
        device.set_format_capabilities(COLOR, FormatCapabilities::COLOR_ATTACHMENT);
        let (_, msaa) = device.create_render_target(COLOR, 64, 64, 4);
        let (_, single) = device.create_render_target(COLOR, 64, 64, 1);
        let mut info = pass_info(LoadOp::Clear, StoreOp::DontCare);
        info.attachments
            .push(AttachmentDescription::new(COLOR, LoadOp::DontCare, StoreOp::Store));
        info.subpasses[0].resolves = smallvec![Some(1)];

        let mut recorder = Recorder::new();
        let stats = {
            let mut encoder = Encoder::new(&device, &mut recorder, Vec::new());
            let pass = PassState::new(
                Cow::Owned(info),
                smallvec![device.image_view(msaa), device.image_view(single)],
                smallvec![ClearValue::default(), ClearValue::default()],
                full(),
                Extent2D {
                    width: 64,
                    height: 64,
                },
                1,
            );
            encoder.begin_pass(pass);
            encoder.end_pass();
            encoder.finish().0
        };

        let color = begin_descriptor(&recorder).colors[0].unwrap();
        assert_eq!(color.resolve, None);
        assert_eq!(color.store, StoreAction::Store);
        assert_eq!(
            recorder.count(|call| matches!(call, Call::ResolveTexture(..))),
            1
        );
        assert_eq!(stats.fallbacks, 1);
    }
}
