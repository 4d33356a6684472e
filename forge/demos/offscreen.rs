//!
//! Records an offscreen frame against the recording backend and logs the native calls
//! it encodes to.
//!
//! Configuration is read from `FORGE_*` environment variables.
//!

use forge::{
    chain::Barrier,
    command::{CommandPool, RenderPassBegin},
    empty::{EmptyDevice, Recorder},
    smallvec::smallvec,
    AccessFlags, AttachmentDescription, BindStage, ClearValue, CommandBufferUsageFlags,
    CommandPoolCreateFlags, Config, Extent2D, Format, FramebufferInfo, Level, LoadOp,
    NativeBuffer, PipelineBindPoint, PipelineStageFlags, QueryType, Rect, RenderPassInfo,
    SlotBinding, SlotResource, StoreOp, SubpassContents, SubpassDescription, Viewport,
};

const COLOR: Format = Format(37);

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("offscreen", log::LevelFilter::Trace)
        .init();

    let config = Config::from_env();
    let mut device = EmptyDevice::new(config);

    let extent = Extent2D {
        width: 1024,
        height: 768,
    };
    let (_, view) = device.create_render_target(COLOR, extent.width, extent.height, 1);
    let render_pass = device.create_render_pass(RenderPassInfo {
        attachments: vec![AttachmentDescription::new(COLOR, LoadOp::Clear, StoreOp::Store)],
        subpasses: vec![SubpassDescription {
            colors: smallvec![Some(0)],
            ..SubpassDescription::default()
        }],
    });
    let framebuffer = device.create_framebuffer(FramebufferInfo {
        attachments: vec![view],
        extent,
        layers: 1,
    });

    let layout = device.create_pipeline_layout(1, 64);
    let pipeline =
        device.create_graphics_pipeline(EmptyDevice::graphics_pipeline_info(layout, &[COLOR], None));
    let vertices = device.create_buffer(4096);
    let uniforms = device.create_buffer(256);
    let set = device.create_descriptor_set(
        0,
        vec![SlotBinding {
            stage: BindStage::Vertex,
            index: 0,
            resource: SlotResource::Buffer {
                buffer: NativeBuffer(uniforms.0),
                offset: 0,
            },
        }],
    );
    let timestamps = device.create_query_pool(QueryType::Timestamp, 2);

    let device = std::sync::Arc::new(device);
    let mut pool = CommandPool::new(device.clone(), CommandPoolCreateFlags::TRANSIENT);
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::ONE_TIME_SUBMIT, None)
        .unwrap();
    {
        let mut recorder = buffer.recorder(&mut pool).unwrap();
        recorder.reset_query_pool(timestamps, 0..2).unwrap();
        recorder
            .write_timestamp(PipelineStageFlags::TOP_OF_PIPE, timestamps, 0)
            .unwrap();
        recorder
            .update_buffer(uniforms, 0, &[0u8; 64])
            .unwrap();
        recorder
            .pipeline_barrier(
                PipelineStageFlags::TRANSFER,
                PipelineStageFlags::VERTEX_SHADER,
                &[Barrier::global(
                    AccessFlags::TRANSFER_WRITE..AccessFlags::UNIFORM_READ,
                )],
            )
            .unwrap();

        recorder.begin_debug_label("scene").unwrap();
        recorder
            .begin_render_pass(
                &RenderPassBegin {
                    render_pass,
                    framebuffer,
                    render_area: Rect::from_extent(extent),
                    clear_values: &[ClearValue::Color([0.1, 0.1, 0.1, 1.0])],
                },
                SubpassContents::Inline,
            )
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, pipeline)
            .unwrap();
        recorder
            .bind_descriptor_sets(PipelineBindPoint::Graphics, layout, 0, &[set], &[])
            .unwrap();
        recorder.bind_vertex_buffers(0, &[(vertices, 0)]).unwrap();
        recorder
            .set_viewports(
                0,
                &[Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: extent.width as f32,
                    height: extent.height as f32,
                    min_depth: 0.0,
                    max_depth: 1.0,
                }],
            )
            .unwrap();
        recorder.set_scissors(0, &[Rect::from_extent(extent)]).unwrap();
        for quad in 0..4 {
            recorder.draw(quad * 6..quad * 6 + 6, 0..1).unwrap();
        }
        recorder.end_render_pass().unwrap();
        recorder.end_debug_label().unwrap();

        recorder
            .write_timestamp(PipelineStageFlags::BOTTOM_OF_PIPE, timestamps, 1)
            .unwrap();
    }
    buffer.end().unwrap();

    let mut native = Recorder::new();
    let stats = buffer.submit(&mut native, None).unwrap();
    for call in &native.calls {
        log::info!("{:?}", call);
    }
    native.complete();

    log::info!("{:#?}", stats);
    log::info!("Device signals: {:#?}", device.signals());

    pool.free_buffers(buffers);
    pool.dispose();
}
