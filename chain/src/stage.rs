//! Mapping of source pipeline stages onto native barrier stages.

use {
    bitflags::bitflags,
    forge_core::{BarrierStage, EncoderKind, PipelineStageFlags},
};

bitflags! {
    /// Set of native barrier stages.
    pub struct StageSet: u8 {
        /// Vertex processing of render encoders.
        const VERTEX = 0x1;
        /// Fragment processing of render encoders.
        const FRAGMENT = 0x2;
        /// Compute encoders.
        const COMPUTE = 0x4;
        /// Blit encoders.
        const COPY = 0x8;
        /// Both stages of render encoders.
        const GRAPHICS = Self::VERTEX.bits | Self::FRAGMENT.bits;
    }
}

impl From<BarrierStage> for StageSet {
    fn from(stage: BarrierStage) -> Self {
        match stage {
            BarrierStage::Vertex => StageSet::VERTEX,
            BarrierStage::Fragment => StageSet::FRAGMENT,
            BarrierStage::Compute => StageSet::COMPUTE,
            BarrierStage::Copy => StageSet::COPY,
        }
    }
}

impl From<EncoderKind> for StageSet {
    fn from(kind: EncoderKind) -> Self {
        kind.barrier_stages()
            .iter()
            .fold(StageSet::empty(), |set, &stage| set | stage.into())
    }
}

impl StageSet {
    /// Check if set has the stage.
    pub fn has(&self, stage: BarrierStage) -> bool {
        self.contains(stage.into())
    }

    /// Iterate over stages of the set.
    pub fn stages(self) -> impl Iterator<Item = BarrierStage> {
        BarrierStage::ALL
            .iter()
            .cloned()
            .filter(move |&stage| self.has(stage))
    }
}

/// Which side of a dependency the mask describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Stages that must complete.
    Source,
    /// Stages that must wait.
    Destination,
}

/// Result of mapping a stage mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapped {
    /// Native stages.
    pub stages: StageSet,
    /// Mask could not be expressed precisely and was widened.
    pub widened: bool,
}

const VERTEX_STAGES: PipelineStageFlags = PipelineStageFlags::from_bits_truncate(
    PipelineStageFlags::DRAW_INDIRECT.bits()
        | PipelineStageFlags::VERTEX_INPUT.bits()
        | PipelineStageFlags::VERTEX_SHADER.bits()
        | PipelineStageFlags::TESSELLATION_CONTROL_SHADER.bits()
        | PipelineStageFlags::TESSELLATION_EVALUATION_SHADER.bits()
        | PipelineStageFlags::GEOMETRY_SHADER.bits(),
);

const FRAGMENT_STAGES: PipelineStageFlags = PipelineStageFlags::from_bits_truncate(
    PipelineStageFlags::FRAGMENT_SHADER.bits()
        | PipelineStageFlags::EARLY_FRAGMENT_TESTS.bits()
        | PipelineStageFlags::LATE_FRAGMENT_TESTS.bits()
        | PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT.bits(),
);

/// Map source stage mask to native barrier stages.
///
/// Top of pipe as a source and bottom of pipe as a destination order nothing.
/// The opposite pseudo-stages, `ALL_GRAPHICS` and `ALL_COMMANDS` widen to every
/// stage they could stand for.
pub fn map_stages(mask: PipelineStageFlags, side: Side) -> Mapped {
    let mut stages = StageSet::empty();
    let mut widened = false;

    if mask.intersects(VERTEX_STAGES) {
        stages |= StageSet::VERTEX;
    }
    if mask.contains(PipelineStageFlags::DRAW_INDIRECT) {
        // Indirect arguments are read by dispatches too.
        stages |= StageSet::COMPUTE;
    }
    if mask.intersects(FRAGMENT_STAGES) {
        stages |= StageSet::FRAGMENT;
    }
    if mask.contains(PipelineStageFlags::COMPUTE_SHADER) {
        stages |= StageSet::COMPUTE;
    }
    if mask.contains(PipelineStageFlags::TRANSFER) {
        stages |= StageSet::COPY;
    }
    if mask.contains(PipelineStageFlags::ALL_GRAPHICS) {
        stages |= StageSet::GRAPHICS;
        widened = true;
    }
    if mask.contains(PipelineStageFlags::ALL_COMMANDS) {
        stages = StageSet::all();
        widened = true;
    }

    let whole = match side {
        Side::Source => PipelineStageFlags::BOTTOM_OF_PIPE,
        Side::Destination => PipelineStageFlags::TOP_OF_PIPE,
    };
    if mask.contains(whole) {
        stages = StageSet::all();
        widened = true;
    }

    Mapped { stages, widened }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn precise_masks() {
        let mapped = map_stages(
            PipelineStageFlags::VERTEX_SHADER | PipelineStageFlags::TRANSFER,
            Side::Source,
        );
        assert_eq!(mapped.stages, StageSet::VERTEX | StageSet::COPY);
        assert!(!mapped.widened);

        let mapped = map_stages(PipelineStageFlags::LATE_FRAGMENT_TESTS, Side::Destination);
        assert_eq!(mapped.stages, StageSet::FRAGMENT);
    }

    #[test]
    fn pseudo_stages_depend_on_side() {
        assert_eq!(
            map_stages(PipelineStageFlags::TOP_OF_PIPE, Side::Source).stages,
            StageSet::empty()
        );
        assert_eq!(
            map_stages(PipelineStageFlags::TOP_OF_PIPE, Side::Destination).stages,
            StageSet::all()
        );
        assert_eq!(
            map_stages(PipelineStageFlags::BOTTOM_OF_PIPE, Side::Source).stages,
            StageSet::all()
        );
        assert_eq!(
            map_stages(PipelineStageFlags::BOTTOM_OF_PIPE, Side::Destination).stages,
            StageSet::empty()
        );
    }

    #[test]
    fn broad_masks_widen() {
        let mapped = map_stages(PipelineStageFlags::ALL_GRAPHICS, Side::Destination);
        assert_eq!(mapped.stages, StageSet::GRAPHICS);
        assert!(mapped.widened);

        let mapped = map_stages(PipelineStageFlags::ALL_COMMANDS, Side::Source);
        assert_eq!(mapped.stages, StageSet::all());
    }

    #[test]
    fn encoder_kinds() {
        assert_eq!(StageSet::from(EncoderKind::Render), StageSet::GRAPHICS);
        assert_eq!(
            StageSet::from(EncoderKind::Blit).stages().collect::<Vec<_>>(),
            vec![BarrierStage::Copy]
        );
    }
}
