mod common;

use {
    common::{dispose, native, position, Scene, COLOR},
    forge_chain::Barrier,
    forge_command::{EncodeStats, Lifecycle, RecordError, SubmitError, ValidationError},
    forge_core::{
        empty::{Call, DeviceSignal, Recorder},
        AccessFlags, BarrierStage, BindStage, BufferCopy, CommandBufferUsageFlags, Config, Level,
        LoadAction, NativeEvent, PipelineBindPoint, PipelineStageFlags, QueryControlFlags,
        QueryResultFlags, StoreAction, SubpassContents, VisibilityMode,
    },
    proptest::prelude::*,
};

/// Record one primary buffer with `record`, submit it and complete the execution.
fn encode(
    scene: &Scene,
    record: impl FnOnce(&mut forge_command::CommandRecorder<'_>),
) -> (Recorder, EncodeStats) {
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    buffers[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    record(&mut buffers[0].recorder(&mut pool).unwrap());
    buffers[0].end().unwrap();

    let mut recorder = Recorder::new();
    let stats = buffers[0].submit(&mut recorder, None).unwrap();
    assert_eq!(recorder.open(), None, "encoder left open");
    recorder.complete();
    dispose(pool, buffers);
    (recorder, stats)
}

fn draws(recorder: &Recorder) -> Vec<u32> {
    recorder
        .calls
        .iter()
        .filter_map(|call| match *call {
            Call::Draw { instance_count, .. } => Some(instance_count),
            _ => None,
        })
        .collect()
}

#[test]
fn render_pass_clears_and_stores_attachment() {
    let scene = Scene::new();
    let (recorder, stats) = encode(&scene, |recorder| {
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder.draw(0..3, 0..1).unwrap();
        recorder.end_render_pass().unwrap();
    });

    let color = match &recorder.calls[0] {
        Call::BeginRenderPass(descriptor, _) => descriptor.colors[0].unwrap(),
        other => panic!("Unexpected {:?}", other),
    };
    assert_eq!(color.load, LoadAction::Clear);
    assert_eq!(color.store, StoreAction::Store);
    assert_eq!(color.clear, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(draws(&recorder), vec![1]);
    assert_eq!(
        recorder.count(|call| matches!(call, Call::SetColorStoreAction(..))),
        0
    );
    assert_eq!(stats.commands, 4);
    assert_eq!(stats.encoders, 1);
    assert_eq!(stats.fallbacks, 0);
}

#[test]
fn unchanged_descriptor_sets_are_not_rebound() {
    let scene = Scene::new();
    let (recorder, stats) = encode(&scene, |recorder| {
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        for &set in &[scene.sets[0], scene.sets[0], scene.sets[1]] {
            recorder
                .bind_descriptor_sets(PipelineBindPoint::Graphics, scene.layout, 0, &[set], &[])
                .unwrap();
            recorder.draw(0..3, 0..1).unwrap();
        }
        recorder.end_render_pass().unwrap();
    });

    let bound: Vec<_> = recorder
        .calls
        .iter()
        .filter_map(|call| match *call {
            Call::SetBuffer {
                stage: BindStage::Vertex,
                index: 0,
                buffer,
                ..
            } => Some(buffer),
            _ => None,
        })
        .collect();
    assert_eq!(bound, vec![native(scene.buffers[0]), native(scene.buffers[1])]);
    assert_eq!(recorder.binds(), 2);
    assert_eq!(stats.binds, 2);
    assert_eq!(draws(&recorder).len(), 3);
}

#[test]
fn layered_multiview_renders_view_runs_with_instancing() {
    let scene = Scene::new();
    let (recorder, stats) = encode(&scene, |recorder| {
        recorder
            .begin_render_pass(&scene.begin_multiview(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder.draw(0..3, 0..1).unwrap();
        recorder.end_render_pass().unwrap();
    });

    let passes: Vec<_> = recorder
        .calls
        .iter()
        .filter_map(|call| match call {
            Call::BeginRenderPass(descriptor, _) => Some((
                descriptor.render_target_array_length,
                descriptor.colors[0].unwrap().target.layer,
            )),
            _ => None,
        })
        .collect();
    assert_eq!(passes, vec![(2, 0), (1, 3)]);
    assert_eq!(draws(&recorder), vec![2, 1]);

    let ranges: Vec<_> = recorder
        .calls
        .iter()
        .filter_map(|call| match call {
            Call::SetBytes {
                stage: BindStage::Vertex,
                index: 9,
                bytes,
            } => Some(bytes.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        ranges,
        vec![vec![0, 0, 0, 0, 2, 0, 0, 0], vec![3, 0, 0, 0, 1, 0, 0, 0]]
    );
    // Pipeline bind, draw and end are replayed for the second run.
    assert_eq!(stats.commands, 7);
    assert_eq!(stats.restarts, 0);
}

#[test]
fn multiview_without_layered_rendering_renders_every_view() {
    let scene = Scene::with_config(Config {
        layered_multiview: false,
        ..Config::default()
    });
    let (recorder, _) = encode(&scene, |recorder| {
        recorder
            .begin_render_pass(&scene.begin_multiview(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder.draw(0..3, 0..2).unwrap();
        recorder.end_render_pass().unwrap();
    });

    let layers: Vec<_> = recorder
        .calls
        .iter()
        .filter_map(|call| match call {
            Call::BeginRenderPass(descriptor, _) => {
                Some(descriptor.colors[0].unwrap().target.layer)
            }
            _ => None,
        })
        .collect();
    assert_eq!(layers, vec![0, 1, 3]);
    assert_eq!(draws(&recorder), vec![2, 2, 2]);
}

#[test]
fn layered_instances_must_fit() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    buffers[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    {
        let mut recorder = buffers[0].recorder(&mut pool).unwrap();
        recorder
            .begin_render_pass(&scene.begin_multiview(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder.draw(0..3, 0..0x7fff_ffff).unwrap();
        // Two views of the first run double every instance.
        assert_eq!(
            recorder.draw(0..3, 0..0x8000_0001),
            Err(RecordError::Rejected(ValidationError::InstanceOverflow {
                first: 0,
                count: 0x8000_0001,
                views: 2,
            }))
        );
    }
    buffers[0].end().unwrap();
    match buffers[0].submit(&mut Recorder::new(), None) {
        Err(SubmitError::Invalid(ValidationError::InstanceOverflow { .. })) => {}
        other => panic!("Unexpected {:?}", other),
    }
    assert_eq!(buffers[0].lifecycle(), Lifecycle::Invalid);
    dispose(pool, buffers);

    // Every view has its own pass without layered rendering.
    let scene = Scene::with_config(Config {
        layered_multiview: false,
        ..Config::default()
    });
    let (recorder, _) = encode(&scene, |recorder| {
        recorder
            .begin_render_pass(&scene.begin_multiview(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder.draw(0..3, 0..0x8000_0001).unwrap();
        recorder.end_render_pass().unwrap();
    });
    assert_eq!(draws(&recorder), vec![0x8000_0001; 3]);
}

#[test]
fn transfers_share_blit_encoder() {
    let scene = Scene::new();
    let (recorder, stats) = encode(&scene, |recorder| {
        recorder
            .copy_buffer(
                scene.buffers[0],
                scene.staging,
                &[BufferCopy {
                    src_offset: 0,
                    dst_offset: 0,
                    size: 128,
                }],
            )
            .unwrap();
        recorder.fill_buffer(scene.staging, 128, 64, 0).unwrap();
        recorder
            .update_buffer(scene.staging, 192, &[1, 2, 3, 4])
            .unwrap();
    });

    assert_eq!(recorder.count(Call::is_begin), 1);
    assert!(recorder.calls.contains(&Call::UpdateBuffer {
        dst: native(scene.staging),
        offset: 192,
        data: vec![1, 2, 3, 4],
    }));
    assert_eq!(stats.encoders, 1);
    assert_eq!(stats.sync.fence_waits, 0);
}

#[test]
fn barrier_orders_copy_before_dispatch() {
    let scene = Scene::new();
    let (recorder, stats) = encode(&scene, |recorder| {
        recorder
            .copy_buffer(
                scene.buffers[0],
                scene.buffers[1],
                &[BufferCopy {
                    src_offset: 0,
                    dst_offset: 0,
                    size: 256,
                }],
            )
            .unwrap();
        recorder
            .pipeline_barrier(
                PipelineStageFlags::TRANSFER,
                PipelineStageFlags::COMPUTE_SHADER,
                &[Barrier::global(
                    AccessFlags::TRANSFER_WRITE..AccessFlags::SHADER_READ,
                )],
            )
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Compute, scene.compute)
            .unwrap();
        recorder.dispatch(4, 4, 1).unwrap();
    });

    let fence = recorder
        .calls
        .iter()
        .find_map(|call| match *call {
            Call::UpdateFence(fence, BarrierStage::Copy) => Some(fence),
            _ => None,
        })
        .expect("copy encoder updates its fence");
    let update = position(&recorder.calls, |call| {
        *call == Call::UpdateFence(fence, BarrierStage::Copy)
    });
    let begin = position(&recorder.calls, |call| matches!(call, Call::BeginComputePass(_)));
    let wait = position(&recorder.calls, |call| {
        *call == Call::WaitForFence(fence, BarrierStage::Compute)
    });
    assert!(update < begin);
    assert_eq!(wait, begin.map(|begin| begin + 1));
    assert_eq!(stats.sync.fence_waits, 1);
    assert!(recorder.calls.contains(&Call::Dispatch {
        groups: [4, 4, 1],
        threads: [8, 8, 1],
    }));
}

#[test]
fn graphics_barrier_inside_render_pass_stays_in_encoder() {
    let scene = Scene::new();
    let (recorder, stats) = encode(&scene, |recorder| {
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder.draw(0..3, 0..1).unwrap();
        recorder
            .pipeline_barrier(
                PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                PipelineStageFlags::FRAGMENT_SHADER,
                &[Barrier::global(
                    AccessFlags::COLOR_ATTACHMENT_WRITE..AccessFlags::INPUT_ATTACHMENT_READ,
                )],
            )
            .unwrap();
        recorder.draw(0..3, 0..1).unwrap();
        recorder.end_render_pass().unwrap();
    });

    assert!(recorder.calls.contains(&Call::MemoryBarrier(
        BarrierStage::Fragment,
        BarrierStage::Fragment
    )));
    assert_eq!(recorder.count(Call::is_begin), 1);
    assert_eq!(stats.sync.memory_barriers, 1);
}

#[test]
fn queries_become_available_on_completion() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    buffers[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    {
        let mut recorder = buffers[0].recorder(&mut pool).unwrap();
        recorder.reset_query_pool(scene.occlusion, 0..4).unwrap();
        recorder.reset_query_pool(scene.timestamps, 0..4).unwrap();
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::Inline)
            .unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder
            .begin_query(scene.occlusion, 2, QueryControlFlags::PRECISE)
            .unwrap();
        recorder.draw(0..3, 0..1).unwrap();
        recorder.end_query(scene.occlusion, 2).unwrap();
        recorder.end_render_pass().unwrap();
        recorder
            .write_timestamp(PipelineStageFlags::BOTTOM_OF_PIPE, scene.timestamps, 1)
            .unwrap();
        recorder
            .copy_query_pool_results(
                scene.occlusion,
                2..3,
                scene.staging,
                0,
                8,
                QueryResultFlags::RESULT_64,
            )
            .unwrap();
    }
    buffers[0].end().unwrap();

    let mut recorder = Recorder::new();
    let stats = buffers[0].submit(&mut recorder, None).unwrap();
    assert!(scene.device.signals().is_empty());
    assert!(recorder
        .calls
        .contains(&Call::SetVisibilityResultMode(VisibilityMode::Counting, 16)));
    assert!(recorder.calls.contains(&Call::CopyQueryResults {
        first: 2,
        count: 1,
        dst: native(scene.staging),
        dst_offset: 0,
        stride: 8,
    }));
    // Visibility buffer can only be attached when a render encoder opens.
    assert_eq!(stats.restarts, 1);

    recorder.complete();
    assert_eq!(
        scene.device.signals(),
        vec![
            DeviceSignal::QueriesReset {
                pool: scene.occlusion,
                first: 0,
                count: 4,
            },
            DeviceSignal::QueriesReset {
                pool: scene.timestamps,
                first: 0,
                count: 4,
            },
            DeviceSignal::QueriesAvailable {
                pool: scene.occlusion,
                queries: vec![2],
            },
            DeviceSignal::Timestamp {
                pool: scene.timestamps,
                query: 1,
            },
            DeviceSignal::QueriesAvailable {
                pool: scene.timestamps,
                queries: vec![1],
            },
        ]
    );

    dispose(pool, buffers);
}

#[test]
fn only_one_occlusion_query_is_active() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    buffers[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    {
        let mut recorder = buffers[0].recorder(&mut pool).unwrap();
        recorder
            .begin_query(scene.occlusion, 0, QueryControlFlags::empty())
            .unwrap();
        assert_eq!(
            recorder.begin_query(scene.occlusion, 0, QueryControlFlags::empty()),
            Err(RecordError::Rejected(ValidationError::QueryActive {
                pool: scene.occlusion,
                query: 0,
            }))
        );
    }

    dispose(pool, buffers);
}

#[test]
fn events_signal_natively_or_on_completion() {
    let scene = Scene::new();
    let (recorder, stats) = encode(&scene, |recorder| {
        recorder
            .set_event(scene.native_event, PipelineStageFlags::TRANSFER)
            .unwrap();
        recorder
            .set_event(scene.emulated_event, PipelineStageFlags::TRANSFER)
            .unwrap();
        recorder
            .wait_events(
                &[scene.native_event],
                PipelineStageFlags::TRANSFER,
                PipelineStageFlags::COMPUTE_SHADER,
                &[],
            )
            .unwrap();
        recorder
            .wait_events(
                &[scene.emulated_event],
                PipelineStageFlags::TRANSFER,
                PipelineStageFlags::COMPUTE_SHADER,
                &[],
            )
            .unwrap();
        recorder
            .reset_event(scene.emulated_event, PipelineStageFlags::TRANSFER)
            .unwrap();
    });

    let event = NativeEvent(scene.native_event.0);
    assert_eq!(
        recorder.calls,
        vec![Call::SignalEvent(event, 1), Call::WaitEvent(event, 1)]
    );
    assert_eq!(stats.fallbacks, 1);
    assert_eq!(
        scene.device.signals(),
        vec![
            DeviceSignal::EventStatus {
                event: scene.emulated_event,
                signaled: true,
            },
            DeviceSignal::EventStatus {
                event: scene.emulated_event,
                signaled: false,
            },
        ]
    );
}

#[test]
fn events_are_emulated_when_disabled() {
    let scene = Scene::with_config(Config {
        native_events: false,
        ..Config::default()
    });
    let (recorder, _) = encode(&scene, |recorder| {
        recorder
            .set_event(scene.native_event, PipelineStageFlags::TRANSFER)
            .unwrap();
    });

    assert!(recorder.calls.is_empty());
    assert_eq!(
        scene.device.signals(),
        vec![DeviceSignal::EventStatus {
            event: scene.native_event,
            signaled: true,
        }]
    );
}

#[test]
fn debug_labels_are_balanced() {
    let scene = Scene::new();
    let (recorder, _) = encode(&scene, |recorder| {
        recorder.begin_debug_label("upload").unwrap();
        recorder.fill_buffer(scene.staging, 0, 64, 0).unwrap();
        recorder.insert_debug_label("filled").unwrap();
        recorder.end_debug_label().unwrap();
    });

    let pushes = recorder.count(|call| matches!(call, Call::PushDebugGroup(_)));
    let pops = recorder.count(|call| *call == Call::PopDebugGroup);
    assert_eq!((pushes, pops), (1, 1));
    assert!(recorder
        .calls
        .contains(&Call::InsertDebugSignpost("filled".to_owned())));
}

#[test]
fn pipeline_formats_must_match_render_pass() {
    let mut scene = Scene::new();
    let mismatched = {
        let device = std::sync::Arc::get_mut(&mut scene.device).expect("device is not shared yet");
        let info = forge_core::empty::EmptyDevice::graphics_pipeline_info(
            scene.layout,
            &[forge_core::Format(COLOR.0 + 1)],
            None,
        );
        device.create_graphics_pipeline(info)
    };

    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    buffers[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    {
        let mut recorder = buffers[0].recorder(&mut pool).unwrap();
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::Inline)
            .unwrap();
        match recorder.bind_pipeline(PipelineBindPoint::Graphics, mismatched) {
            Err(RecordError::Rejected(ValidationError::AttachmentMismatch(_))) => {}
            other => panic!("Unexpected {:?}", other),
        }
    }

    dispose(pool, buffers);
}

#[derive(Clone, Copy, Debug)]
enum Op {
    Copy,
    Fill,
    Dispatch,
    Barrier(PipelineStageFlags, PipelineStageFlags),
}

fn stages() -> impl Strategy<Value = PipelineStageFlags> {
    prop::sample::select(vec![
        PipelineStageFlags::TOP_OF_PIPE,
        PipelineStageFlags::TRANSFER,
        PipelineStageFlags::COMPUTE_SHADER,
        PipelineStageFlags::VERTEX_SHADER,
        PipelineStageFlags::DRAW_INDIRECT,
        PipelineStageFlags::ALL_COMMANDS,
        PipelineStageFlags::BOTTOM_OF_PIPE,
    ])
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Copy),
        Just(Op::Fill),
        Just(Op::Dispatch),
        (stages(), stages()).prop_map(|(src, dst)| Op::Barrier(src, dst)),
    ]
}

proptest! {
    #[test]
    fn fence_waits_follow_updates(ops in prop::collection::vec(op(), 1..40)) {
        let scene = Scene::new();
        let (recorder, stats) = encode(&scene, |recorder| {
            recorder.bind_pipeline(PipelineBindPoint::Compute, scene.compute).unwrap();
            for op in &ops {
                match *op {
                    Op::Copy => recorder
                        .copy_buffer(
                            scene.buffers[0],
                            scene.buffers[1],
                            &[BufferCopy { src_offset: 0, dst_offset: 0, size: 64 }],
                        )
                        .unwrap(),
                    Op::Fill => recorder.fill_buffer(scene.buffers[1], 0, 64, 1).unwrap(),
                    Op::Dispatch => recorder.dispatch(1, 1, 1).unwrap(),
                    Op::Barrier(src, dst) => recorder.pipeline_barrier(src, dst, &[]).unwrap(),
                }
            }
        });

        let calls = &recorder.calls;
        for (index, call) in calls.iter().enumerate() {
            if let Call::WaitForFence(fence, _) = *call {
                prop_assert!(
                    calls[..index]
                        .iter()
                        .any(|earlier| matches!(*earlier, Call::UpdateFence(f, _) if f == fence)),
                    "wait for {:?} before its update",
                    fence
                );
                // Waits are encoded right after their encoder opens.
                let begin = calls[..index].iter().rposition(Call::is_begin);
                prop_assert!(begin.is_some());
                prop_assert!(calls[begin.unwrap() + 1..index]
                    .iter()
                    .all(|call| matches!(call, Call::WaitForFence(..))));
            }
        }

        let waits = recorder.count(|call| matches!(call, Call::WaitForFence(..)));
        let updates = recorder.count(|call| matches!(call, Call::UpdateFence(..)));
        prop_assert_eq!(stats.sync.fence_waits, waits as u64);
        prop_assert_eq!(stats.sync.fence_updates, updates as u64);
        prop_assert_eq!(stats.sync.stale_waits, 0);
    }
}
