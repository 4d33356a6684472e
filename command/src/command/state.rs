use {
    crate::{
        buffer::state::{check_limit, RecordContext},
        encoder::Encoder,
        error::ValidationError,
        storage::Storage,
    },
    forge_core::{Rect, StencilFaceFlags, Viewport},
    smallvec::SmallVec,
};

fn check_viewport_range(
    ctx: &RecordContext<'_>,
    what: &'static str,
    first: u32,
    count: usize,
) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::InvalidArgument("empty viewport or scissor update"));
    }
    check_limit(
        what,
        u64::from(first) + count as u64,
        u64::from(ctx.limits().max_viewports),
    )
}

#[derive(Debug, Default)]
pub(crate) struct SetViewport {
    first: u32,
    viewports: SmallVec<[Viewport; 1]>,
}

impl SetViewport {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        first: u32,
        viewports: &[Viewport],
    ) -> Result<(), ValidationError> {
        check_viewport_range(ctx, "viewport index", first, viewports.len())?;
        self.first = first;
        self.viewports.clear();
        self.viewports.extend_from_slice(viewports);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder
            .graphics
            .dynamic
            .set_viewports(self.first, &self.viewports);
    }
}

#[derive(Debug, Default)]
pub(crate) struct SetScissor {
    first: u32,
    scissors: SmallVec<[Rect; 1]>,
}

impl SetScissor {
    pub(crate) fn set_content(
        &mut self,
        ctx: &mut RecordContext<'_>,
        first: u32,
        scissors: &[Rect],
    ) -> Result<(), ValidationError> {
        check_viewport_range(ctx, "scissor index", first, scissors.len())?;
        if scissors
            .iter()
            .any(|scissor| scissor.offset.x < 0 || scissor.offset.y < 0)
        {
            return Err(ValidationError::InvalidArgument("negative scissor offset"));
        }
        self.first = first;
        self.scissors.clear();
        self.scissors.extend_from_slice(scissors);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder
            .graphics
            .dynamic
            .set_scissors(self.first, &self.scissors);
    }
}

#[derive(Debug, Default)]
pub(crate) struct SetLineWidth {
    width: f32,
}

impl SetLineWidth {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        width: f32,
    ) -> Result<(), ValidationError> {
        if !(width > 0.0) {
            return Err(ValidationError::InvalidArgument("line width must be positive"));
        }
        self.width = width;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        // Native lines are always one pixel wide.
        if self.width != 1.0 {
            encoder.fallback("wide lines");
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SetDepthBias {
    constant: f32,
    clamp: f32,
    slope: f32,
}

impl SetDepthBias {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        constant: f32,
        clamp: f32,
        slope: f32,
    ) -> Result<(), ValidationError> {
        self.constant = constant;
        self.clamp = clamp;
        self.slope = slope;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder
            .graphics
            .dynamic
            .set_depth_bias(self.constant, self.slope, self.clamp);
    }
}

#[derive(Debug, Default)]
pub(crate) struct SetBlendConstants {
    constants: [f32; 4],
}

impl SetBlendConstants {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        constants: [f32; 4],
    ) -> Result<(), ValidationError> {
        self.constants = constants;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.graphics.dynamic.set_blend_constants(self.constants);
    }
}

#[derive(Debug, Default)]
pub(crate) struct SetDepthBounds {
    min: f32,
    max: f32,
}

impl SetDepthBounds {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        min: f32,
        max: f32,
    ) -> Result<(), ValidationError> {
        if !(0.0 <= min && min <= max && max <= 1.0) {
            return Err(ValidationError::InvalidArgument("depth bounds outside 0..=1"));
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        if self.min > 0.0 || self.max < 1.0 {
            encoder.fallback("depth bounds test");
        }
    }
}

/// Stencil masks are part of native depth-stencil state objects,
/// so changing them dynamically is recorded but has no native effect.
#[derive(Debug, Default)]
pub(crate) struct SetStencilCompareMask {
    faces: StencilFaceFlags,
    mask: u32,
}

impl SetStencilCompareMask {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        faces: StencilFaceFlags,
        mask: u32,
    ) -> Result<(), ValidationError> {
        self.faces = faces;
        self.mask = mask;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        log::trace!("Stencil compare mask {:#x} for {:?}", self.mask, self.faces);
        encoder.fallback("dynamic stencil compare mask");
    }
}

#[derive(Debug, Default)]
pub(crate) struct SetStencilWriteMask {
    faces: StencilFaceFlags,
    mask: u32,
}

impl SetStencilWriteMask {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        faces: StencilFaceFlags,
        mask: u32,
    ) -> Result<(), ValidationError> {
        self.faces = faces;
        self.mask = mask;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        log::trace!("Stencil write mask {:#x} for {:?}", self.mask, self.faces);
        encoder.fallback("dynamic stencil write mask");
    }
}

#[derive(Debug, Default)]
pub(crate) struct SetStencilReference {
    faces: StencilFaceFlags,
    reference: u32,
}

impl SetStencilReference {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        faces: StencilFaceFlags,
        reference: u32,
    ) -> Result<(), ValidationError> {
        if faces.is_empty() {
            return Err(ValidationError::InvalidArgument("no stencil faces"));
        }
        self.faces = faces;
        self.reference = reference;
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder
            .graphics
            .dynamic
            .set_stencil_reference(self.faces, self.reference);
    }
}
