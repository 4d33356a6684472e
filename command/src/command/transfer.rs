use {
    crate::{
        buffer::state::{check_aligned, check_limit, check_range, RecordContext},
        encoder::{level_extent, Encoder},
        error::ValidationError,
        storage::Storage,
    },
    forge_core::{
        BufferCopy, BufferId, BufferImageCopy, ClearValue, Extent2D, Extent3D, Filter,
        FormatCapabilities, ImageAspectFlags, ImageBlit, ImageCopy, ImageId, ImageInfo,
        ImageSubresourceLayers, ImageSubresourceRange, NativeBuffer, NativeTexture, Offset3D,
    },
    forge_memory::Span,
};

/// Size of `fill_buffer` reaching the end of the buffer.
pub const WHOLE_SIZE: u64 = !0;

fn check_regions<T>(regions: &[T]) -> Result<(), ValidationError> {
    if regions.is_empty() {
        Err(ValidationError::InvalidArgument("no regions"))
    } else {
        Ok(())
    }
}

fn check_layers(info: &ImageInfo, subresource: &ImageSubresourceLayers) -> Result<(), ValidationError> {
    if subresource.layers == 0 {
        return Err(ValidationError::InvalidArgument("empty layer range"));
    }
    check_limit("mip level", u64::from(subresource.level) + 1, u64::from(info.levels))?;
    check_range(
        "image layers",
        u64::from(subresource.base_layer),
        u64::from(subresource.layers),
        u64::from(info.layers),
    )
}

fn check_range_of(info: &ImageInfo, range: &ImageSubresourceRange) -> Result<(), ValidationError> {
    if range.levels == 0 || range.layers == 0 {
        return Err(ValidationError::InvalidArgument("empty subresource range"));
    }
    check_range(
        "mip levels",
        u64::from(range.base_level),
        u64::from(range.levels),
        u64::from(info.levels),
    )?;
    check_range(
        "image layers",
        u64::from(range.base_layer),
        u64::from(range.layers),
        u64::from(info.layers),
    )
}

/// Check that the box lies within the mip level.
fn check_box(
    info: &ImageInfo,
    level: u32,
    offset: Offset3D,
    extent: Extent3D,
) -> Result<(), ValidationError> {
    if offset.x < 0 || offset.y < 0 || offset.z < 0 {
        return Err(ValidationError::InvalidArgument("negative image offset"));
    }
    let size = level_extent(
        Extent2D {
            width: info.extent.width,
            height: info.extent.height,
        },
        level,
    );
    let depth = (info.extent.depth >> level).max(1);
    check_range("image width", offset.x as u64, u64::from(extent.width), u64::from(size.width))?;
    check_range(
        "image height",
        offset.y as u64,
        u64::from(extent.height),
        u64::from(size.height),
    )?;
    check_range("image depth", offset.z as u64, u64::from(extent.depth), u64::from(depth))
}

fn check_capability(
    ctx: &RecordContext<'_>,
    info: &ImageInfo,
    capability: FormatCapabilities,
    message: &'static str,
) -> Result<(), ValidationError> {
    if ctx
        .device
        .format_capabilities(info.format)
        .contains(capability)
    {
        Ok(())
    } else {
        Err(ValidationError::InvalidArgument(message))
    }
}

#[derive(Debug, Default)]
pub(crate) struct CopyBuffer {
    src: NativeBuffer,
    dst: NativeBuffer,
    regions: Span<BufferCopy>,
}

impl CopyBuffer {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        src: BufferId,
        dst: BufferId,
        regions: &[BufferCopy],
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("copy buffer")?;
        check_regions(regions)?;
        let src_info = ctx.buffer(src)?;
        let dst_info = ctx.buffer(dst)?;
        for region in regions {
            if region.size == 0 {
                return Err(ValidationError::InvalidArgument("empty copy region"));
            }
            check_range("copy source", region.src_offset, region.size, src_info.size)?;
            check_range("copy destination", region.dst_offset, region.size, dst_info.size)?;
        }

        self.src = src_info.native;
        self.dst = dst_info.native;
        self.regions = ctx.recording.storage.alloc(regions);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        encoder.blit_encoder();
        for region in storage.get(self.regions) {
            encoder.native.copy_buffer(
                self.src,
                region.src_offset,
                self.dst,
                region.dst_offset,
                region.size,
            );
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CopyImage {
    src: NativeTexture,
    dst: NativeTexture,
    regions: Span<ImageCopy>,
}

impl CopyImage {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageCopy],
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("copy image")?;
        check_regions(regions)?;
        let src_info = ctx.image(src)?;
        let dst_info = ctx.image(dst)?;
        if src_info.samples != dst_info.samples {
            return Err(ValidationError::InvalidArgument("sample counts of copied images differ"));
        }
        for region in regions {
            check_layers(&src_info, &region.src_subresource)?;
            check_layers(&dst_info, &region.dst_subresource)?;
            check_box(&src_info, region.src_subresource.level, region.src_offset, region.extent)?;
            check_box(&dst_info, region.dst_subresource.level, region.dst_offset, region.extent)?;
        }

        self.src = src_info.native;
        self.dst = dst_info.native;
        self.regions = ctx.recording.storage.alloc(regions);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        encoder.blit_encoder();
        for region in storage.get(self.regions) {
            encoder.native.copy_texture(self.src, self.dst, region);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct BlitImage {
    src: NativeTexture,
    dst: NativeTexture,
    regions: Span<ImageBlit>,
    filter: Filter,
}

impl BlitImage {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageBlit],
        filter: Filter,
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("blit image")?;
        check_regions(regions)?;
        let src_info = ctx.image(src)?;
        let dst_info = ctx.image(dst)?;
        if src_info.samples > 1 || dst_info.samples > 1 {
            return Err(ValidationError::InvalidArgument("blit of multisampled image"));
        }
        check_capability(ctx, &src_info, FormatCapabilities::BLIT, "source format can't be blitted")?;
        check_capability(
            ctx,
            &dst_info,
            FormatCapabilities::BLIT,
            "destination format can't be blitted",
        )?;
        if filter == Filter::Linear {
            check_capability(
                ctx,
                &src_info,
                FormatCapabilities::FILTER,
                "source format can't be filtered linearly",
            )?;
        }
        for region in regions {
            check_layers(&src_info, &region.src_subresource)?;
            check_layers(&dst_info, &region.dst_subresource)?;
        }

        self.src = src_info.native;
        self.dst = dst_info.native;
        self.regions = ctx.recording.storage.alloc(regions);
        self.filter = filter;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        encoder.blit_encoder();
        for region in storage.get(self.regions) {
            encoder
                .native
                .blit_texture(self.src, self.dst, region, self.filter);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ResolveImage {
    src: NativeTexture,
    dst: NativeTexture,
    regions: Span<ImageCopy>,
}

impl ResolveImage {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageCopy],
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("resolve image")?;
        check_regions(regions)?;
        let src_info = ctx.image(src)?;
        let dst_info = ctx.image(dst)?;
        if src_info.samples <= 1 {
            return Err(ValidationError::InvalidArgument("resolve source is single-sampled"));
        }
        if dst_info.samples != 1 {
            return Err(ValidationError::InvalidArgument("resolve destination is multisampled"));
        }
        if src_info.format != dst_info.format {
            return Err(ValidationError::InvalidArgument("resolve formats differ"));
        }
        for region in regions {
            check_layers(&src_info, &region.src_subresource)?;
            check_layers(&dst_info, &region.dst_subresource)?;
            check_box(&dst_info, region.dst_subresource.level, region.dst_offset, region.extent)?;
        }

        self.src = src_info.native;
        self.dst = dst_info.native;
        self.regions = ctx.recording.storage.alloc(regions);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        encoder.blit_encoder();
        for region in storage.get(self.regions) {
            encoder.native.resolve_texture(self.src, self.dst, region);
        }
    }
}

fn check_buffer_image_regions(
    buffer_size: u64,
    image: &ImageInfo,
    regions: &[BufferImageCopy],
) -> Result<(), ValidationError> {
    check_regions(regions)?;
    for region in regions {
        check_aligned("buffer offset", region.buffer_offset, 4)?;
        check_range("buffer offset", region.buffer_offset, 1, buffer_size)?;
        if region.buffer_row_length != 0 && region.buffer_row_length < region.image_extent.width {
            return Err(ValidationError::InvalidArgument("buffer row shorter than image row"));
        }
        if region.buffer_image_height != 0
            && region.buffer_image_height < region.image_extent.height
        {
            return Err(ValidationError::InvalidArgument("buffer image shorter than image"));
        }
        check_layers(image, &region.image_subresource)?;
        check_box(
            image,
            region.image_subresource.level,
            region.image_offset,
            region.image_extent,
        )?;
    }
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct CopyBufferToImage {
    src: NativeBuffer,
    dst: NativeTexture,
    regions: Span<BufferImageCopy>,
}

impl CopyBufferToImage {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        src: BufferId,
        dst: ImageId,
        regions: &[BufferImageCopy],
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("copy buffer to image")?;
        let buffer = ctx.buffer(src)?;
        let image = ctx.image(dst)?;
        check_buffer_image_regions(buffer.size, &image, regions)?;

        self.src = buffer.native;
        self.dst = image.native;
        self.regions = ctx.recording.storage.alloc(regions);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        encoder.blit_encoder();
        for region in storage.get(self.regions) {
            encoder.native.copy_buffer_to_texture(self.src, self.dst, region);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CopyImageToBuffer {
    src: NativeTexture,
    dst: NativeBuffer,
    regions: Span<BufferImageCopy>,
}

impl CopyImageToBuffer {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        src: ImageId,
        dst: BufferId,
        regions: &[BufferImageCopy],
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("copy image to buffer")?;
        let image = ctx.image(src)?;
        let buffer = ctx.buffer(dst)?;
        check_buffer_image_regions(buffer.size, &image, regions)?;

        self.src = image.native;
        self.dst = buffer.native;
        self.regions = ctx.recording.storage.alloc(regions);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        encoder.blit_encoder();
        for region in storage.get(self.regions) {
            encoder.native.copy_texture_to_buffer(self.src, self.dst, region);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FillBuffer {
    dst: NativeBuffer,
    offset: u64,
    size: u64,
    value: u32,
}

impl FillBuffer {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        dst: BufferId,
        offset: u64,
        size: u64,
        value: u32,
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("fill buffer")?;
        let info = ctx.buffer(dst)?;
        check_aligned("fill offset", offset, 4)?;
        let size = if size == WHOLE_SIZE {
            check_range("fill offset", offset, 0, info.size)?;
            (info.size - offset) & !3
        } else {
            check_aligned("fill size", size, 4)?;
            check_range("fill", offset, size, info.size)?;
            size
        };
        if size == 0 {
            return Err(ValidationError::InvalidArgument("empty fill"));
        }

        self.dst = info.native;
        self.offset = offset;
        self.size = size;
        self.value = value;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.blit_encoder();
        encoder
            .native
            .fill_buffer(self.dst, self.offset, self.size, self.value);
    }
}

#[derive(Debug, Default)]
pub(crate) struct UpdateBuffer {
    dst: NativeBuffer,
    offset: u64,
    data: Span<u8>,
}

impl UpdateBuffer {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        dst: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ValidationError> {
        ctx.outside_pass("update buffer")?;
        let info = ctx.buffer(dst)?;
        if data.is_empty() {
            return Err(ValidationError::InvalidArgument("empty update"));
        }
        check_limit("update size", data.len() as u64, ctx.limits().max_update_buffer_size)?;
        check_aligned("update offset", offset, 4)?;
        check_aligned("update size", data.len() as u64, 4)?;
        check_range("update", offset, data.len() as u64, info.size)?;

        self.dst = info.native;
        self.offset = offset;
        self.data = ctx.recording.storage.alloc(data);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        encoder.blit_encoder();
        encoder
            .native
            .update_buffer(self.dst, self.offset, storage.get(self.data));
    }
}

#[derive(Debug, Default)]
struct ClearImage {
    image: NativeTexture,
    extent: Extent2D,
    value: ClearValue,
    ranges: Span<ImageSubresourceRange>,
}

impl ClearImage {
    fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        op: &'static str,
        image: ImageId,
        value: ClearValue,
        ranges: &[ImageSubresourceRange],
        aspects: ImageAspectFlags,
        capability: FormatCapabilities,
    ) -> Result<(), ValidationError> {
        ctx.outside_pass(op)?;
        check_regions(ranges)?;
        let info = ctx.image(image)?;
        check_capability(ctx, &info, capability, "format can't be rendered to")?;
        for range in ranges {
            if range.aspects.is_empty() || !aspects.contains(range.aspects) {
                return Err(ValidationError::InvalidArgument("aspects don't match the clear"));
            }
            check_range_of(&info, range)?;
        }

        self.image = info.native;
        self.extent = Extent2D {
            width: info.extent.width,
            height: info.extent.height,
        };
        self.value = value;
        self.ranges = ctx.recording.storage.alloc(ranges);
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        for range in storage.get(self.ranges) {
            encoder.clear_texture(self.image, self.extent, range, self.value);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClearColorImage {
    clear: ClearImage,
}

impl ClearColorImage {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        image: ImageId,
        color: [f32; 4],
        ranges: &[ImageSubresourceRange],
    ) -> Result<(), ValidationError> {
        self.clear.set_content(
            ctx,
            "clear color image",
            image,
            ClearValue::Color(color),
            ranges,
            ImageAspectFlags::COLOR,
            FormatCapabilities::COLOR_ATTACHMENT,
        )
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        self.clear.encode(encoder, storage)
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClearDepthStencilImage {
    clear: ClearImage,
}

impl ClearDepthStencilImage {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        image: ImageId,
        depth: f32,
        stencil: u32,
        ranges: &[ImageSubresourceRange],
    ) -> Result<(), ValidationError> {
        self.clear.set_content(
            ctx,
            "clear depth stencil image",
            image,
            ClearValue::DepthStencil { depth, stencil },
            ranges,
            ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL,
            FormatCapabilities::DEPTH_STENCIL_ATTACHMENT,
        )
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, storage: &Storage) {
        self.clear.encode(encoder, storage)
    }
}
