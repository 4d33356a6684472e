use {
    crate::{
        buffer::{
            state::{check_limit, PassOrigin, PassScope, RecordContext},
            CommandBuffer, Lifecycle, SecondaryRef,
        },
        encoder::{Encoder, PassState},
        error::ValidationError,
        storage::Storage,
    },
    forge_core::{
        AttachmentDescription, ClearAttachment, ClearRect, ClearValue, CommandBufferUsageFlags,
        Extent2D, FramebufferId, ImageAspectFlags, ImageViewId, Level, LoadOp, Rect,
        RenderPassId, RenderPassInfo, RenderingFlags, StoreOp, SubpassContents,
        SubpassDescription,
    },
    forge_memory::Span,
    smallvec::SmallVec,
    std::borrow::Cow,
};

/// Parameters of [`begin_render_pass`].
///
/// [`begin_render_pass`]: ../struct.CommandRecorder.html#method.begin_render_pass
#[derive(Clone, Copy, Debug)]
pub struct RenderPassBegin<'a> {
    /// Render pass to begin.
    pub render_pass: RenderPassId,

    /// Framebuffer with views of the render pass attachments.
    pub framebuffer: FramebufferId,

    /// Area affected by the render pass.
    pub render_area: Rect,

    /// Clear values indexed by attachment.
    pub clear_values: &'a [ClearValue],
}

/// Attachment of a dynamic rendering scope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderingAttachment {
    /// View rendered to.
    pub view: ImageViewId,

    /// View receiving the multisample resolve.
    pub resolve: Option<ImageViewId>,

    /// Load operation, also used for stencil.
    pub load_op: LoadOp,

    /// Store operation, also used for stencil.
    pub store_op: StoreOp,

    /// Clear value used by `LoadOp::Clear`.
    pub clear: ClearValue,
}

impl RenderingAttachment {
    /// Attachment that is loaded and stored.
    pub fn new(view: ImageViewId) -> Self {
        RenderingAttachment {
            view,
            resolve: None,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
            clear: ClearValue::default(),
        }
    }
}

/// Parameters of [`begin_rendering`].
///
/// [`begin_rendering`]: ../struct.CommandRecorder.html#method.begin_rendering
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderingInfo<'a> {
    /// Contents, suspending and resuming.
    pub flags: RenderingFlags,

    /// Area affected by rendering.
    pub render_area: Rect,

    /// Layers rendered when `view_mask` is zero.
    pub layers: u32,

    /// Views rendered by multiview.
    pub view_mask: u32,

    /// Color attachments, `None` for unused locations.
    pub colors: &'a [Option<RenderingAttachment>],

    /// Depth-stencil attachment.
    pub depth_stencil: Option<RenderingAttachment>,
}

fn check_render_area(render_area: Rect, extent: Extent2D) -> Result<(), ValidationError> {
    if render_area.offset.x < 0 || render_area.offset.y < 0 {
        return Err(ValidationError::InvalidArgument("negative render area offset"));
    }
    check_limit(
        "render area width",
        render_area.offset.x as u64 + u64::from(render_area.extent.width),
        u64::from(extent.width),
    )?;
    check_limit(
        "render area height",
        render_area.offset.y as u64 + u64::from(render_area.extent.height),
        u64::from(extent.height),
    )
}

fn scope(
    origin: PassOrigin,
    info: &RenderPassInfo,
    contents: SubpassContents,
    layered: bool,
) -> PassScope {
    PassScope {
        origin,
        render_pass: None,
        subpass: 0,
        subpass_count: info.subpasses.len() as u32,
        contents,
        color_formats: info.color_formats(0),
        depth_format: info.depth_format(0),
        layered_views: info
            .subpasses
            .first()
            .map_or(1, |subpass| subpass.max_layered_views(layered)),
    }
}

#[derive(Debug, Default)]
pub(crate) struct BeginRenderPass {
    render_pass: RenderPassId,
    framebuffer: FramebufferId,
    render_area: Rect,
    clear_values: SmallVec<[ClearValue; 8]>,
    contents: SubpassContents,
}

impl BeginRenderPass {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        begin: &RenderPassBegin<'_>,
        contents: SubpassContents,
    ) -> Result<(), ValidationError> {
        ctx.primary("begin render pass")?;
        if ctx.state.pass.is_some() {
            return Err(ValidationError::NestedRenderPass);
        }

        let device = ctx.device;
        let info = device
            .render_pass(begin.render_pass)
            .ok_or(ValidationError::UnknownHandle {
                kind: "render pass",
                handle: begin.render_pass.raw(),
            })?;
        let framebuffer =
            device
                .framebuffer(begin.framebuffer)
                .ok_or(ValidationError::UnknownHandle {
                    kind: "framebuffer",
                    handle: begin.framebuffer.raw(),
                })?;

        if info.subpasses.is_empty() {
            return Err(ValidationError::InvalidArgument("render pass has no sub-passes"));
        }
        if framebuffer.attachments.len() != info.attachments.len() {
            return Err(ValidationError::AttachmentMismatch(
                "framebuffer attachment count differs from render pass",
            ));
        }
        for &view in &framebuffer.attachments {
            ctx.image_view(view)?;
        }
        for (index, attachment) in info.attachments.iter().enumerate() {
            let clears = attachment.load_op == LoadOp::Clear
                || attachment.stencil_load_op == LoadOp::Clear;
            if clears && index >= begin.clear_values.len() {
                return Err(ValidationError::InvalidArgument("missing clear value"));
            }
        }
        check_render_area(begin.render_area, framebuffer.extent)?;

        let layered = ctx.device.config().layered_multiview;
        let mut scope = scope(PassOrigin::RenderPass, info, contents, layered);
        scope.render_pass = Some(begin.render_pass);
        ctx.state.pass = Some(scope);

        self.render_pass = begin.render_pass;
        self.framebuffer = begin.framebuffer;
        self.render_area = begin.render_area;
        self.clear_values.clear();
        self.clear_values.extend_from_slice(begin.clear_values);
        self.contents = contents;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        let device = encoder.device;
        let (info, framebuffer) = match (
            device.render_pass(self.render_pass),
            device.framebuffer(self.framebuffer),
        ) {
            (Some(info), Some(framebuffer)) => (info, framebuffer),
            _ => {
                log::error!("Render pass {:?} or its framebuffer was destroyed", self.render_pass);
                return;
            }
        };

        let views = framebuffer
            .attachments
            .iter()
            .map(|&view| device.image_view(view))
            .collect();
        let mut pass = PassState::new(
            Cow::Borrowed(info),
            views,
            self.clear_values.clone(),
            self.render_area,
            framebuffer.extent,
            framebuffer.layers,
        );
        pass.contents = self.contents;
        encoder.begin_pass(pass);
    }
}

#[derive(Debug, Default)]
pub(crate) struct NextSubpass {
    contents: SubpassContents,
}

impl NextSubpass {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        contents: SubpassContents,
    ) -> Result<(), ValidationError> {
        ctx.primary("next sub-pass")?;
        let device = ctx.device;
        let pass = match ctx.state.pass.as_mut() {
            Some(pass) => pass,
            None => return Err(ValidationError::OutsideRenderPass("next sub-pass")),
        };
        if pass.origin != PassOrigin::RenderPass {
            return Err(ValidationError::PassKindMismatch);
        }
        let subpass = pass.subpass + 1;
        if subpass >= pass.subpass_count {
            return Err(ValidationError::SubpassOutOfRange {
                subpass,
                count: pass.subpass_count,
            });
        }

        let info = pass.render_pass.and_then(|id| device.render_pass(id));
        pass.subpass = subpass;
        pass.contents = contents;
        pass.color_formats = info.map_or_else(SmallVec::new, |info| info.color_formats(subpass));
        pass.depth_format = info.and_then(|info| info.depth_format(subpass));
        pass.layered_views = info
            .and_then(|info| info.subpasses.get(subpass as usize))
            .map_or(1, |description| {
                description.max_layered_views(device.config().layered_multiview)
            });

        self.contents = contents;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.next_subpass(self.contents);
    }
}

#[derive(Debug, Default)]
pub(crate) struct EndRenderPass;

impl EndRenderPass {
    pub(crate) fn set_content(&mut self, ctx: &mut RecordContext<'_>) -> Result<(), ValidationError> {
        ctx.primary("end render pass")?;
        let pass = ctx.inside_pass("end render pass")?;
        if pass.origin != PassOrigin::RenderPass {
            return Err(ValidationError::PassKindMismatch);
        }
        if pass.subpass + 1 != pass.subpass_count {
            return Err(ValidationError::NotLastSubpass {
                subpass: pass.subpass,
                count: pass.subpass_count,
            });
        }
        ctx.state.pass = None;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.end_pass();
    }
}

#[derive(Debug, Default)]
pub(crate) struct BeginRendering {
    info: RenderPassInfo,
    views: SmallVec<[ImageViewId; 8]>,
    clear_values: SmallVec<[ClearValue; 8]>,
    render_area: Rect,
    extent: Extent2D,
    layers: u32,
    flags: RenderingFlags,
}

impl BeginRendering {
    fn push_attachment(
        &mut self,
        ctx: &RecordContext<'_>,
        view: ImageViewId,
        load_op: LoadOp,
        store_op: StoreOp,
        clear: ClearValue,
    ) -> Result<u32, ValidationError> {
        let info = ctx.image_view(view)?;
        let mut description = AttachmentDescription::new(info.format, load_op, store_op);
        description.samples = info.samples;

        self.extent = if self.info.attachments.is_empty() {
            info.extent
        } else {
            Extent2D {
                width: self.extent.width.min(info.extent.width),
                height: self.extent.height.min(info.extent.height),
            }
        };

        self.info.attachments.push(description);
        self.views.push(view);
        self.clear_values.push(clear);
        Ok(self.info.attachments.len() as u32 - 1)
    }

    fn push_target(
        &mut self,
        ctx: &RecordContext<'_>,
        attachment: &RenderingAttachment,
    ) -> Result<(u32, Option<u32>), ValidationError> {
        let index = self.push_attachment(
            ctx,
            attachment.view,
            attachment.load_op,
            attachment.store_op,
            attachment.clear,
        )?;
        let resolve = match attachment.resolve {
            Some(view) => Some(self.push_attachment(
                ctx,
                view,
                LoadOp::DontCare,
                StoreOp::Store,
                ClearValue::default(),
            )?),
            None => None,
        };
        Ok((index, resolve))
    }

    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        rendering: &RenderingInfo<'_>,
    ) -> Result<(), ValidationError> {
        if ctx.state.pass.is_some() {
            return Err(ValidationError::NestedRenderPass);
        }
        if rendering.view_mask == 0 && rendering.layers == 0 {
            return Err(ValidationError::InvalidArgument("rendering without layers"));
        }

        self.info = RenderPassInfo::default();
        self.views.clear();
        self.clear_values.clear();

        let mut subpass = SubpassDescription {
            view_mask: rendering.view_mask,
            ..SubpassDescription::default()
        };
        for color in rendering.colors {
            match color {
                Some(attachment) => {
                    let (index, resolve) = self.push_target(ctx, attachment)?;
                    subpass.colors.push(Some(index));
                    subpass.resolves.push(resolve);
                }
                None => {
                    subpass.colors.push(None);
                    subpass.resolves.push(None);
                }
            }
        }
        if let Some(attachment) = &rendering.depth_stencil {
            let (index, _) = self.push_target(ctx, attachment)?;
            subpass.depth_stencil = Some(index);
        }
        self.info.subpasses.push(subpass);

        if self.info.attachments.is_empty() {
            let area = rendering.render_area;
            self.extent = Extent2D {
                width: area.offset.x.max(0) as u32 + area.extent.width,
                height: area.offset.y.max(0) as u32 + area.extent.height,
            };
        }
        check_render_area(rendering.render_area, self.extent)?;

        let contents = if rendering
            .flags
            .contains(RenderingFlags::CONTENTS_SECONDARY_COMMAND_BUFFERS)
        {
            SubpassContents::SecondaryCommandBuffers
        } else {
            SubpassContents::Inline
        };
        let layered = ctx.device.config().layered_multiview;
        ctx.state.pass = Some(scope(PassOrigin::Rendering, &self.info, contents, layered));

        self.render_area = rendering.render_area;
        self.layers = if rendering.view_mask == 0 { rendering.layers } else { 1 };
        self.flags = rendering.flags;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        let device = encoder.device;
        let views = self.views.iter().map(|&view| device.image_view(view)).collect();
        let mut pass = PassState::new(
            Cow::Owned(self.info.clone()),
            views,
            self.clear_values.clone(),
            self.render_area,
            self.extent,
            self.layers,
        );
        if self
            .flags
            .contains(RenderingFlags::CONTENTS_SECONDARY_COMMAND_BUFFERS)
        {
            pass.contents = SubpassContents::SecondaryCommandBuffers;
        }
        pass.suspending = self.flags.contains(RenderingFlags::SUSPENDING);
        pass.resuming = self.flags.contains(RenderingFlags::RESUMING);
        encoder.begin_pass(pass);
    }
}

#[derive(Debug, Default)]
pub(crate) struct EndRendering;

impl EndRendering {
    pub(crate) fn set_content(&mut self, ctx: &mut RecordContext<'_>) -> Result<(), ValidationError> {
        let pass = ctx.inside_pass("end rendering")?;
        if pass.origin != PassOrigin::Rendering {
            return Err(ValidationError::PassKindMismatch);
        }
        ctx.state.pass = None;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.end_pass();
    }
}

#[derive(Debug, Default)]
pub(crate) struct ExecuteCommands {
    secondaries: SmallVec<[SecondaryRef; 2]>,
}

impl ExecuteCommands {
    fn check_secondary(
        ctx: &RecordContext<'_>,
        secondary: &CommandBuffer,
    ) -> Result<SecondaryRef, ValidationError> {
        if secondary.level() != Level::Secondary {
            return Err(ValidationError::InvalidSecondary("not a secondary command buffer"));
        }
        let continues = secondary
            .usage()
            .contains(CommandBufferUsageFlags::RENDER_PASS_CONTINUE);

        match &ctx.state.pass {
            Some(pass) => {
                if pass.contents != SubpassContents::SecondaryCommandBuffers {
                    return Err(ValidationError::ContentsMismatch);
                }
                if !continues {
                    return Err(ValidationError::InvalidSecondary(
                        "executed inside render pass without render pass continue",
                    ));
                }
                if let Some(inheritance) = secondary.inheritance() {
                    let formats_match = inheritance.color_formats.is_empty()
                        || inheritance.color_formats[..] == pass.color_formats[..];
                    let depth_matches = inheritance.depth_format.is_none()
                        || inheritance.depth_format == pass.depth_format;
                    if !formats_match || !depth_matches {
                        return Err(ValidationError::AttachmentMismatch(
                            "inherited formats differ from render pass",
                        ));
                    }
                }
            }
            None if continues => {
                return Err(ValidationError::InvalidSecondary(
                    "render pass continue outside render pass",
                ))
            }
            None => {}
        }

        match secondary.secondary_ref() {
            Some(secondary) => Ok(secondary),
            None => Err(ValidationError::InvalidSecondary("not executable")),
        }
    }

    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        secondaries: &[&CommandBuffer],
    ) -> Result<(), ValidationError> {
        ctx.primary("execute commands")?;
        self.secondaries.clear();
        for secondary in secondaries {
            let secondary = Self::check_secondary(ctx, secondary)?;
            self.secondaries.push(secondary);
        }
        ctx.recording
            .executes
            .extend(self.secondaries.iter().cloned());
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        for secondary in &self.secondaries {
            if secondary.lifecycle() != Lifecycle::Executable
                && secondary.lifecycle() != Lifecycle::Pending
            {
                log::error!("Skip secondary buffer in {:?} state", secondary.lifecycle());
                continue;
            }
            encoder.encode(&secondary.recording);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClearAttachments {
    attachments: SmallVec<[ClearAttachment; 4]>,
    rects: Span<ClearRect>,
}

impl ClearAttachments {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        attachments: &[ClearAttachment],
        rects: &[ClearRect],
    ) -> Result<(), ValidationError> {
        let pass = ctx.inside_pass("clear attachments")?;
        ctx.inline_in_pass()?;
        for attachment in attachments {
            if attachment.aspects.contains(ImageAspectFlags::COLOR) {
                let count = pass.color_formats.len() as u64;
                if u64::from(attachment.color_attachment) >= count {
                    return Err(ValidationError::OutOfRange {
                        what: "cleared color attachment",
                        value: u64::from(attachment.color_attachment),
                        limit: count,
                    });
                }
            }
            if attachment
                .aspects
                .intersects(ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL)
                && pass.depth_format.is_none()
            {
                return Err(ValidationError::AttachmentMismatch(
                    "no depth-stencil attachment to clear",
                ));
            }
        }
        if rects.is_empty() || rects.iter().any(|rect| rect.layers == 0) {
            return Err(ValidationError::InvalidArgument("empty clear rectangle"));
        }

        self.attachments.clear();
        self.attachments.extend_from_slice(attachments);
        self.rects = ctx.recording.storage.alloc(rects);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        if self.attachments.is_empty() || !encoder.graphics_encoder() {
            return;
        }
        encoder
            .native
            .clear_attachments(&self.attachments, storage.get(self.rects));

        // Clearing draws with its own pipeline and bindings.
        encoder.graphics.invalidate();
    }
}
