#![allow(dead_code)]

use {
    forge_command::{CommandBuffer, CommandPool, RenderPassBegin},
    forge_core::{
        empty::{Call, EmptyDevice},
        smallvec::smallvec,
        AttachmentDescription, BindStage, BufferId, ClearValue, CommandPoolCreateFlags, Config,
        DescriptorSetId, EventId, Extent2D, Extent3D, Format, FramebufferId, FramebufferInfo,
        ImageId, LoadOp, NativeBuffer, PipelineId, PipelineLayoutId, QueryPoolId, QueryType,
        Rect, RenderPassId, RenderPassInfo, SlotBinding, SlotResource, StoreOp,
        SubpassDescription,
    },
    std::sync::Arc,
};

pub const COLOR: Format = Format(37);
pub const EXTENT: Extent2D = Extent2D {
    width: 64,
    height: 64,
};

pub static CLEAR: [ClearValue; 1] = [ClearValue::Color([0.0, 0.0, 0.0, 1.0])];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Resources registered on an `EmptyDevice` shared by integration tests.
pub struct Scene {
    pub device: Arc<EmptyDevice>,
    pub render_pass: RenderPassId,
    pub framebuffer: FramebufferId,
    pub target: ImageId,
    /// Render pass rendering views 0, 1 and 3 of a 4 layer target.
    pub multiview_pass: RenderPassId,
    pub multiview_framebuffer: FramebufferId,
    pub layout: PipelineLayoutId,
    pub pipeline: PipelineId,
    pub compute: PipelineId,
    pub buffers: [BufferId; 2],
    /// Sets binding each of `buffers` to vertex slot 0.
    pub sets: [DescriptorSetId; 2],
    pub staging: BufferId,
    pub occlusion: QueryPoolId,
    pub timestamps: QueryPoolId,
    pub native_event: EventId,
    pub emulated_event: EventId,
}

impl Scene {
    pub fn new() -> Self {
        Scene::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        init_logger();
        let mut device = EmptyDevice::new(config);

        let (target, view) = device.create_render_target(COLOR, EXTENT.width, EXTENT.height, 1);
        let render_pass = device.create_render_pass(color_pass(0));
        let framebuffer = device.create_framebuffer(FramebufferInfo {
            attachments: vec![view],
            extent: EXTENT,
            layers: 1,
        });

        let layered = device.create_image(
            COLOR,
            Extent3D {
                width: EXTENT.width,
                height: EXTENT.height,
                depth: 1,
            },
            4,
            1,
        );
        let layered_view = device.create_image_view(layered);
        let multiview_pass = device.create_render_pass(color_pass(0b1011));
        let multiview_framebuffer = device.create_framebuffer(FramebufferInfo {
            attachments: vec![layered_view],
            extent: EXTENT,
            layers: 1,
        });

        let layout = device.create_pipeline_layout(2, 128);
        let pipeline = device.create_graphics_pipeline(EmptyDevice::graphics_pipeline_info(
            layout,
            &[COLOR],
            None,
        ));
        let compute = device.create_compute_pipeline(EmptyDevice::compute_pipeline_info(layout));

        let buffers = [device.create_buffer(1024), device.create_buffer(1024)];
        let sets = [
            device.create_descriptor_set(0, vec![vertex_buffer(buffers[0])]),
            device.create_descriptor_set(0, vec![vertex_buffer(buffers[1])]),
        ];
        let staging = device.create_buffer(256);

        let occlusion = device.create_query_pool(QueryType::Occlusion, 4);
        let timestamps = device.create_query_pool(QueryType::Timestamp, 4);
        let native_event = device.create_event(true);
        let emulated_event = device.create_event(false);

        Scene {
            device: Arc::new(device),
            render_pass,
            framebuffer,
            target,
            multiview_pass,
            multiview_framebuffer,
            layout,
            pipeline,
            compute,
            buffers,
            sets,
            staging,
            occlusion,
            timestamps,
            native_event,
            emulated_event,
        }
    }

    pub fn pool(&self) -> CommandPool {
        CommandPool::new(
            self.device.clone(),
            CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )
    }

    /// Begin info of the single sub-pass pass covering the whole target.
    pub fn begin(&self) -> RenderPassBegin<'static> {
        RenderPassBegin {
            render_pass: self.render_pass,
            framebuffer: self.framebuffer,
            render_area: Rect::from_extent(EXTENT),
            clear_values: &CLEAR,
        }
    }

    pub fn begin_multiview(&self) -> RenderPassBegin<'static> {
        RenderPassBegin {
            render_pass: self.multiview_pass,
            framebuffer: self.multiview_framebuffer,
            render_area: Rect::from_extent(EXTENT),
            clear_values: &CLEAR,
        }
    }
}

/// Single sub-pass render pass clearing and storing one color attachment.
pub fn color_pass(view_mask: u32) -> RenderPassInfo {
    RenderPassInfo {
        attachments: vec![AttachmentDescription::new(
            COLOR,
            LoadOp::Clear,
            StoreOp::Store,
        )],
        subpasses: vec![SubpassDescription {
            colors: smallvec![Some(0)],
            view_mask,
            ..SubpassDescription::default()
        }],
    }
}

fn vertex_buffer(buffer: BufferId) -> SlotBinding {
    SlotBinding {
        stage: BindStage::Vertex,
        index: 0,
        resource: SlotResource::Buffer {
            buffer: NativeBuffer(buffer.0),
            offset: 0,
        },
    }
}

pub fn native(buffer: BufferId) -> NativeBuffer {
    NativeBuffer(buffer.0)
}

/// Return buffers to their pool and dispose of it.
pub fn dispose(mut pool: CommandPool, buffers: Vec<CommandBuffer>) {
    pool.free_buffers(buffers);
    pool.dispose();
}

pub fn position(calls: &[Call], predicate: impl Fn(&Call) -> bool) -> Option<usize> {
    calls.iter().position(|call| predicate(call))
}
