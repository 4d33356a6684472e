use {
    forge_core::{
        DynamicStates, GraphicsPipelineInfo, NativeCommandBuffer, Rect, StencilFaceFlags, Viewport,
    },
    smallvec::SmallVec,
};

/// Value applied to the open encoder when it changes.
#[derive(Clone, Debug)]
pub(crate) struct Tracked<T> {
    value: Option<T>,
    dirty: bool,
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Tracked {
            value: None,
            dirty: false,
        }
    }
}

impl<T> Tracked<T>
where
    T: PartialEq,
{
    pub(crate) fn set(&mut self, value: T) {
        if self.value.as_ref() != Some(&value) {
            self.value = Some(value);
            self.dirty = true;
        }
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn invalidate(&mut self) {
        self.dirty = self.value.is_some();
    }

    pub(crate) fn clear(&mut self) {
        self.value = None;
        self.dirty = false;
    }

    /// Value if it has to be applied.
    pub(crate) fn take_dirty(&mut self) -> Option<&T> {
        if self.dirty {
            self.dirty = false;
            self.value.as_ref()
        } else {
            None
        }
    }
}

/// Graphics state set by commands or baked into the bound pipeline.
#[derive(Clone, Debug, Default)]
pub(crate) struct DynamicState {
    viewports: Tracked<SmallVec<[Viewport; 1]>>,
    scissors: Tracked<SmallVec<[Rect; 1]>>,
    depth_bias: Tracked<[f32; 3]>,
    blend_constants: Tracked<[f32; 4]>,
    stencil_reference: Tracked<[u32; 2]>,
}

fn merge<T: Copy + Default>(current: Option<&SmallVec<[T; 1]>>, first: u32, values: &[T]) -> SmallVec<[T; 1]> {
    let mut merged = current.cloned().unwrap_or_default();
    let first = first as usize;
    if merged.len() < first + values.len() {
        merged.resize(first + values.len(), T::default());
    }
    merged[first..first + values.len()].copy_from_slice(values);
    merged
}

impl DynamicState {
    pub(crate) fn set_viewports(&mut self, first: u32, viewports: &[Viewport]) {
        let merged = merge(self.viewports.get(), first, viewports);
        self.viewports.set(merged);
    }

    pub(crate) fn set_scissors(&mut self, first: u32, scissors: &[Rect]) {
        let merged = merge(self.scissors.get(), first, scissors);
        self.scissors.set(merged);
    }

    pub(crate) fn set_depth_bias(&mut self, constant: f32, slope: f32, clamp: f32) {
        self.depth_bias.set([constant, slope, clamp]);
    }

    pub(crate) fn set_blend_constants(&mut self, constants: [f32; 4]) {
        self.blend_constants.set(constants);
    }

    pub(crate) fn set_stencil_reference(&mut self, faces: StencilFaceFlags, reference: u32) {
        let mut value = self.stencil_reference.get().cloned().unwrap_or([0; 2]);
        if faces.contains(StencilFaceFlags::FRONT) {
            value[0] = reference;
        }
        if faces.contains(StencilFaceFlags::BACK) {
            value[1] = reference;
        }
        self.stencil_reference.set(value);
    }

    /// Take state that the pipeline doesn't leave to commands.
    pub(crate) fn apply_static(&mut self, pipeline: &GraphicsPipelineInfo) {
        let dynamic = pipeline.dynamic;
        let state = &pipeline.static_state;
        if !dynamic.contains(DynamicStates::VIEWPORT) && !state.viewports.is_empty() {
            self.viewports.set(state.viewports.clone());
        }
        if !dynamic.contains(DynamicStates::SCISSOR) && !state.scissors.is_empty() {
            self.scissors.set(state.scissors.clone());
        }
        if !dynamic.contains(DynamicStates::DEPTH_BIAS) {
            self.depth_bias.set(state.depth_bias.unwrap_or([0.0; 3]));
        }
        if !dynamic.contains(DynamicStates::BLEND_CONSTANTS) {
            self.blend_constants.set(state.blend_constants);
        }
        if !dynamic.contains(DynamicStates::STENCIL_REFERENCE) {
            self.stencil_reference.set(state.stencil_reference);
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.viewports.invalidate();
        self.scissors.invalidate();
        self.depth_bias.invalidate();
        self.blend_constants.invalidate();
        self.stencil_reference.invalidate();
    }

    /// Apply changed state to the open render encoder.
    /// Scissors are clipped to the render area.
    pub(crate) fn finalize(&mut self, native: &mut dyn NativeCommandBuffer, render_area: Rect) {
        if let Some(viewports) = self.viewports.take_dirty() {
            native.set_viewports(viewports);
        }
        if let Some(scissors) = self.scissors.take_dirty() {
            let clipped: SmallVec<[Rect; 1]> = scissors
                .iter()
                .map(|scissor| scissor.intersect(&render_area))
                .collect();
            native.set_scissor_rects(&clipped);
        }
        if let Some(&[constant, slope, clamp]) = self.depth_bias.take_dirty() {
            native.set_depth_bias(constant, slope, clamp);
        }
        if let Some(&constants) = self.blend_constants.take_dirty() {
            native.set_blend_color(constants);
        }
        if let Some(&[front, back]) = self.stencil_reference.take_dirty() {
            native.set_stencil_reference(front, back);
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        forge_core::{
            empty::{Call, Recorder},
            Extent2D, Offset2D,
        },
    };

    fn rect(x: i32, y: i32, width: u32, height: u32) -> Rect {
        Rect {
            offset: Offset2D { x, y },
            extent: Extent2D { width, height },
        }
    }

    fn recorder() -> Recorder {
        let mut recorder = Recorder::new();
        recorder.begin_render_pass(&Default::default(), "test");
        recorder.clear();
        recorder
    }

    #[test]
    fn same_value_is_not_dirty() {
        let mut tracked = Tracked::default();
        tracked.set(1u32);
        assert_eq!(tracked.take_dirty(), Some(&1));
        tracked.set(1);
        assert_eq!(tracked.take_dirty(), None);
        tracked.invalidate();
        assert_eq!(tracked.take_dirty(), Some(&1));
    }

    #[test]
    fn scissors_are_clipped_to_render_area() {
        let mut state = DynamicState::default();
        let mut recorder = recorder();
        state.set_scissors(0, &[rect(-10, 10, 100, 100)]);
        state.finalize(&mut recorder, rect(0, 0, 64, 64));

        assert_eq!(recorder.calls, vec![Call::SetScissorRects(vec![rect(0, 10, 64, 54)])]);
    }

    #[test]
    fn partial_viewport_update_keeps_others() {
        let mut state = DynamicState::default();
        let mut recorder = recorder();
        let viewport = |width| Viewport {
            width,
            height: 1.0,
            max_depth: 1.0,
            ..Viewport::default()
        };
        state.set_viewports(0, &[viewport(1.0), viewport(2.0)]);
        state.set_viewports(1, &[viewport(3.0)]);
        state.finalize(&mut recorder, rect(0, 0, 64, 64));

        assert_eq!(
            recorder.calls,
            vec![Call::SetViewports(vec![viewport(1.0), viewport(3.0)])]
        );
    }

    #[test]
    fn stencil_reference_per_face() {
        let mut state = DynamicState::default();
        let mut recorder = recorder();
        state.set_stencil_reference(StencilFaceFlags::FRONT_AND_BACK, 1);
        state.set_stencil_reference(StencilFaceFlags::BACK, 2);
        state.finalize(&mut recorder, rect(0, 0, 1, 1));

        assert_eq!(recorder.calls, vec![Call::SetStencilReference(1, 2)]);
    }
}
