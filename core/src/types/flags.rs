use bitflags::bitflags;

bitflags! {
    /// Bitmask specifying pipeline stages.
    /// See Vulkan docs for detailed info:
    /// <https://www.khronos.org/registry/vulkan/specs/1.1-extensions/man/html/VkPipelineStageFlagBits.html>
    #[derive(Default)]
    #[repr(transparent)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 0x00000001;
        const DRAW_INDIRECT = 0x00000002;
        const VERTEX_INPUT = 0x00000004;
        const VERTEX_SHADER = 0x00000008;
        const TESSELLATION_CONTROL_SHADER = 0x00000010;
        const TESSELLATION_EVALUATION_SHADER = 0x00000020;
        const GEOMETRY_SHADER = 0x00000040;
        const FRAGMENT_SHADER = 0x00000080;
        const EARLY_FRAGMENT_TESTS = 0x00000100;
        const LATE_FRAGMENT_TESTS = 0x00000200;
        const COLOR_ATTACHMENT_OUTPUT = 0x00000400;
        const COMPUTE_SHADER = 0x00000800;
        const TRANSFER = 0x00001000;
        const BOTTOM_OF_PIPE = 0x00002000;
        const HOST = 0x00004000;
        const ALL_GRAPHICS = 0x00008000;
        const ALL_COMMANDS = 0x00010000;
    }
}

bitflags! {
    /// Bitmask specifying memory access types that will participate in a memory dependency.
    /// See Vulkan docs for detailed info:
    /// <https://www.khronos.org/registry/vulkan/specs/1.1-extensions/man/html/VkAccessFlagBits.html>
    #[derive(Default)]
    #[repr(transparent)]
    pub struct AccessFlags: u32 {
        const INDIRECT_COMMAND_READ = 0x00000001;
        const INDEX_READ = 0x00000002;
        const VERTEX_ATTRIBUTE_READ = 0x00000004;
        const UNIFORM_READ = 0x00000008;
        const INPUT_ATTACHMENT_READ = 0x00000010;
        const SHADER_READ = 0x00000020;
        const SHADER_WRITE = 0x00000040;
        const COLOR_ATTACHMENT_READ = 0x00000080;
        const COLOR_ATTACHMENT_WRITE = 0x00000100;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x00000200;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x00000400;
        const TRANSFER_READ = 0x00000800;
        const TRANSFER_WRITE = 0x00001000;
        const HOST_READ = 0x00002000;
        const HOST_WRITE = 0x00004000;
        const MEMORY_READ = 0x00008000;
        const MEMORY_WRITE = 0x00010000;
    }
}

impl AccessFlags {
    /// Check if any of the accesses writes.
    pub fn is_write(&self) -> bool {
        self.intersects(
            AccessFlags::SHADER_WRITE
                | AccessFlags::COLOR_ATTACHMENT_WRITE
                | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
                | AccessFlags::TRANSFER_WRITE
                | AccessFlags::HOST_WRITE
                | AccessFlags::MEMORY_WRITE,
        )
    }

    /// Check if any of the accesses reads.
    pub fn is_read(&self) -> bool {
        self.intersects(
            AccessFlags::INDIRECT_COMMAND_READ
                | AccessFlags::INDEX_READ
                | AccessFlags::VERTEX_ATTRIBUTE_READ
                | AccessFlags::UNIFORM_READ
                | AccessFlags::INPUT_ATTACHMENT_READ
                | AccessFlags::SHADER_READ
                | AccessFlags::COLOR_ATTACHMENT_READ
                | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | AccessFlags::TRANSFER_READ
                | AccessFlags::HOST_READ
                | AccessFlags::MEMORY_READ,
        )
    }
}

bitflags! {
    /// Shader stages.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x00000001;
        const TESSELLATION_CONTROL = 0x00000002;
        const TESSELLATION_EVALUATION = 0x00000004;
        const GEOMETRY = 0x00000008;
        const FRAGMENT = 0x00000010;
        const COMPUTE = 0x00000020;
        const ALL_GRAPHICS = 0x0000001F;
    }
}

bitflags! {
    /// Image aspects.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct ImageAspectFlags: u32 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
    }
}

bitflags! {
    /// Stencil faces affected by dynamic stencil state.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct StencilFaceFlags: u32 {
        const FRONT = 0x1;
        const BACK = 0x2;
        const FRONT_AND_BACK = 0x3;
    }
}

bitflags! {
    /// Command buffer usage passed to `begin`.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct CommandBufferUsageFlags: u32 {
        /// Buffer is reset or freed after single execution.
        const ONE_TIME_SUBMIT = 0x1;
        /// Secondary buffer is entirely inside a render pass.
        const RENDER_PASS_CONTINUE = 0x2;
        /// Buffer may be pending execution more than once at a time.
        const SIMULTANEOUS_USE = 0x4;
    }
}

bitflags! {
    /// Command buffer reset flags.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct CommandBufferResetFlags: u32 {
        /// Return storage to the system instead of keeping it for reuse.
        const RELEASE_RESOURCES = 0x1;
    }
}

bitflags! {
    /// Command pool creation flags.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct CommandPoolCreateFlags: u32 {
        /// Buffers are short-lived.
        const TRANSIENT = 0x1;
        /// Buffers can be reset individually.
        const RESET_COMMAND_BUFFER = 0x2;
    }
}

bitflags! {
    /// Query control flags.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct QueryControlFlags: u32 {
        /// Occlusion query returns the exact sample count.
        const PRECISE = 0x1;
    }
}

bitflags! {
    /// Query result flags.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct QueryResultFlags: u32 {
        const RESULT_64 = 0x1;
        const WAIT = 0x2;
        const WITH_AVAILABILITY = 0x4;
        const PARTIAL = 0x8;
    }
}

bitflags! {
    /// Dependency flags of pipeline barriers.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct DependencyFlags: u32 {
        const BY_REGION = 0x1;
        const VIEW_LOCAL = 0x2;
    }
}

bitflags! {
    /// Dynamic rendering flags.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct RenderingFlags: u32 {
        const CONTENTS_SECONDARY_COMMAND_BUFFERS = 0x1;
        const SUSPENDING = 0x2;
        const RESUMING = 0x4;
    }
}

bitflags! {
    /// Pipeline state that is set by commands instead of the pipeline.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct DynamicStates: u32 {
        const VIEWPORT = 0x001;
        const SCISSOR = 0x002;
        const LINE_WIDTH = 0x004;
        const DEPTH_BIAS = 0x008;
        const BLEND_CONSTANTS = 0x010;
        const DEPTH_BOUNDS = 0x020;
        const STENCIL_COMPARE_MASK = 0x040;
        const STENCIL_WRITE_MASK = 0x080;
        const STENCIL_REFERENCE = 0x100;
    }
}

bitflags! {
    /// Native capabilities of a pixel format.
    #[derive(Default)]
    #[repr(transparent)]
    pub struct FormatCapabilities: u32 {
        const COLOR_ATTACHMENT = 0x01;
        const DEPTH_STENCIL_ATTACHMENT = 0x02;
        /// Multisample resolve can be expressed as a store action.
        const RESOLVE = 0x04;
        const BLIT = 0x08;
        const FILTER = 0x10;
        /// Format has a stencil aspect.
        const STENCIL = 0x20;
    }
}
