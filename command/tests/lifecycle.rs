mod common;

use {
    common::{dispose, native, Scene},
    forge_chain::CompletionFence,
    forge_command::{
        CommandKind, CommandPool, Lifecycle, RecordError, StateError, SubmitError,
        ValidationError, WHOLE_SIZE,
    },
    forge_core::{
        empty::{Call, Recorder},
        CommandBufferResetFlags, CommandBufferUsageFlags, CommandPoolCreateFlags, Config,
        InFlightReset, Level, SubpassContents,
    },
    std::{sync::Arc, thread, time::Duration},
};

#[test]
fn record_submit_complete() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];
    assert_eq!(buffer.lifecycle(), Lifecycle::Initial);

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Recording);
    buffer
        .recorder(&mut pool)
        .unwrap()
        .fill_buffer(scene.staging, 0, WHOLE_SIZE, 7)
        .unwrap();
    buffer.end().unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);
    assert_eq!(buffer.len(), 1);

    let mut recorder = Recorder::new();
    let fence = Arc::new(CompletionFence::new(false));
    let stats = buffer.submit(&mut recorder, Some(fence.clone())).unwrap();
    assert_eq!(stats.commands, 1);
    assert_eq!(stats.encoders, 1);
    assert_eq!(buffer.lifecycle(), Lifecycle::Pending);
    assert!(fence.is_submitted());
    assert!(!fence.is_signaled());
    assert!(recorder.calls.contains(&Call::FillBuffer {
        dst: native(scene.staging),
        offset: 0,
        size: 256,
        value: 7,
    }));

    recorder.complete();
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);
    assert!(fence.is_signaled());

    dispose(pool, buffers);
}

#[test]
fn busy_fence_is_refused() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    buffer
        .recorder(&mut pool)
        .unwrap()
        .update_buffer(scene.staging, 0, &[1, 2, 3, 4])
        .unwrap();
    buffer.end().unwrap();
    assert!(buffer
        .storage_stats()
        .map_or(false, |stats| stats.allocations > 0));

    let mut recorder = Recorder::new();
    let signaled = Arc::new(CompletionFence::new(true));
    assert_eq!(
        buffer.submit(&mut recorder, Some(signaled.clone())).err(),
        Some(SubmitError::FenceInUse)
    );
    assert!(recorder.calls.is_empty());
    assert!(signaled.is_signaled());
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);

    let fence = Arc::new(CompletionFence::new(false));
    assert!(fence.mark_submitted(1));
    assert_eq!(
        buffer.submit(&mut recorder, Some(fence.clone())).err(),
        Some(SubmitError::FenceInUse)
    );
    assert!(recorder.calls.is_empty());
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);

    // Refused submissions leave the buffer resettable and submittable.
    buffer
        .reset(&mut pool, CommandBufferResetFlags::empty())
        .unwrap();
    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    buffer.end().unwrap();

    assert_eq!(fence.signal(), Some(1));
    fence.reset();
    buffer.submit(&mut recorder, Some(fence.clone())).unwrap();
    assert!(fence.is_submitted());
    recorder.complete();
    assert!(fence.wait(Duration::from_secs(1)));
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);
    pool.reset(false).unwrap();

    dispose(pool, buffers);
}

#[test]
fn refused_fence_keeps_other_executions_pending() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::SIMULTANEOUS_USE, None)
        .unwrap();
    buffer.end().unwrap();

    let mut first = Recorder::new();
    buffer.submit(&mut first, None).unwrap();
    let mut second = Recorder::new();
    assert_eq!(
        buffer
            .submit(&mut second, Some(Arc::new(CompletionFence::new(true))))
            .err(),
        Some(SubmitError::FenceInUse)
    );
    assert_eq!(buffer.lifecycle(), Lifecycle::Pending);

    first.complete();
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);

    dispose(pool, buffers);
}

#[test]
fn begin_while_recording_fails() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    assert_eq!(
        buffer.begin(&mut pool, CommandBufferUsageFlags::empty(), None),
        Err(StateError::InvalidState {
            expected: Lifecycle::Initial,
            found: Lifecycle::Recording,
        })
    );
    assert_eq!(buffer.lifecycle(), Lifecycle::Recording);

    dispose(pool, buffers);
}

#[test]
fn end_requires_closed_render_pass() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    buffer
        .recorder(&mut pool)
        .unwrap()
        .begin_render_pass(&scene.begin(), SubpassContents::Inline)
        .unwrap();
    assert_eq!(buffer.end(), Err(StateError::UnclosedRenderPass));
    assert_eq!(buffer.lifecycle(), Lifecycle::Recording);

    buffer.recorder(&mut pool).unwrap().end_render_pass().unwrap();
    buffer.end().unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);

    dispose(pool, buffers);
}

#[test]
fn rejected_command_invalidates_buffer() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    {
        let mut recorder = buffer.recorder(&mut pool).unwrap();
        assert_eq!(
            recorder.draw(0..3, 0..1),
            Err(RecordError::Rejected(ValidationError::OutsideRenderPass(
                "draw"
            )))
        );
        assert_eq!(
            recorder.fill_buffer(scene.staging, 0, WHOLE_SIZE, 0),
            Err(RecordError::Invalidated(ValidationError::OutsideRenderPass(
                "draw"
            )))
        );
    }
    assert!(buffer.is_empty());
    assert_eq!(
        pool.kind_counts(CommandKind::Draw).resident,
        1,
        "rejected command returns to its pool"
    );

    buffer.end().unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Invalid);
    assert_eq!(
        buffer.submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::Invalid(ValidationError::OutsideRenderPass(
            "draw"
        )))
    );

    buffer
        .reset(&mut pool, CommandBufferResetFlags::empty())
        .unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Initial);
    assert_eq!(buffer.error(), None);

    dispose(pool, buffers);
}

#[test]
fn reset_while_pending_fails() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    buffer
        .recorder(&mut pool)
        .unwrap()
        .fill_buffer(scene.staging, 0, 64, 0)
        .unwrap();
    buffer.end().unwrap();

    let mut recorder = Recorder::new();
    buffer.submit(&mut recorder, None).unwrap();
    assert_eq!(
        buffer.reset(&mut pool, CommandBufferResetFlags::empty()),
        Err(StateError::InUse)
    );
    assert_eq!(
        buffer.begin(&mut pool, CommandBufferUsageFlags::empty(), None),
        Err(StateError::InUse)
    );
    assert_eq!(pool.reset(false), Err(StateError::InUse));
    assert_eq!(
        buffer.submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::InUse)
    );

    recorder.complete();
    buffer
        .reset(&mut pool, CommandBufferResetFlags::empty())
        .unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Initial);

    dispose(pool, buffers);
}

#[test]
fn reset_waits_for_completion_when_configured() {
    let scene = Scene::with_config(Config {
        in_flight_reset: InFlightReset::Wait(Duration::from_secs(10)),
        ..Config::default()
    });
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    buffer
        .recorder(&mut pool)
        .unwrap()
        .fill_buffer(scene.staging, 0, 64, 0)
        .unwrap();
    buffer.end().unwrap();

    let mut recorder = Recorder::new();
    buffer.submit(&mut recorder, None).unwrap();
    let completion = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        recorder.complete();
    });

    buffer
        .reset(&mut pool, CommandBufferResetFlags::empty())
        .unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Initial);
    completion.join().unwrap();

    dispose(pool, buffers);
}

#[test]
fn one_time_submit_invalidates_after_completion() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::ONE_TIME_SUBMIT, None)
        .unwrap();
    buffer
        .recorder(&mut pool)
        .unwrap()
        .fill_buffer(scene.staging, 0, 64, 0)
        .unwrap();
    buffer.end().unwrap();

    let mut recorder = Recorder::new();
    buffer.submit(&mut recorder, None).unwrap();
    recorder.complete();
    assert_eq!(buffer.lifecycle(), Lifecycle::Invalid);
    assert_eq!(
        buffer.submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::InvalidState(Lifecycle::Invalid))
    );

    // Invalid buffers are reset implicitly.
    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    assert!(buffer.is_empty());

    dispose(pool, buffers);
}

#[test]
fn simultaneous_use_allows_overlapping_executions() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::SIMULTANEOUS_USE, None)
        .unwrap();
    buffer
        .recorder(&mut pool)
        .unwrap()
        .fill_buffer(scene.staging, 0, 64, 0)
        .unwrap();
    buffer.end().unwrap();

    let mut first = Recorder::new();
    let mut second = Recorder::new();
    buffer.submit(&mut first, None).unwrap();
    buffer.submit(&mut second, None).unwrap();
    assert_eq!(first.calls, second.calls);

    first.complete();
    assert_eq!(buffer.lifecycle(), Lifecycle::Pending);
    second.complete();
    assert_eq!(buffer.lifecycle(), Lifecycle::Executable);

    dispose(pool, buffers);
}

#[test]
fn individual_reset_requires_pool_flag() {
    let scene = Scene::new();
    let mut pool = CommandPool::new(scene.device.clone(), CommandPoolCreateFlags::empty());
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    buffer.end().unwrap();
    assert_eq!(
        buffer.reset(&mut pool, CommandBufferResetFlags::empty()),
        Err(StateError::NoIndividualReset)
    );
    assert_eq!(
        buffer.begin(&mut pool, CommandBufferUsageFlags::empty(), None),
        Err(StateError::NoIndividualReset)
    );

    pool.reset(false).unwrap();
    assert_eq!(buffer.lifecycle(), Lifecycle::Initial);
    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();

    dispose(pool, buffers);
}

#[test]
fn buffers_are_bound_to_their_pool() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut other = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 1);

    assert!(buffers[0].belongs_to(&pool));
    assert!(!buffers[0].belongs_to(&other));
    assert_eq!(
        buffers[0].begin(&mut other, CommandBufferUsageFlags::empty(), None),
        Err(StateError::ForeignPool)
    );
    assert_eq!(
        buffers[0].recorder(&mut other).err(),
        Some(StateError::ForeignPool)
    );

    other.dispose();
    dispose(pool, buffers);
}

#[test]
fn secondary_buffers_are_not_submitted() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Secondary, 1);
    let buffer = &mut buffers[0];

    buffer
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    buffer.end().unwrap();
    assert_eq!(
        buffer.submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::NotPrimary)
    );

    dispose(pool, buffers);
}

#[test]
fn pool_reuses_released_commands() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut buffers = pool.allocate_buffers(Level::Primary, 2);

    for buffer in &mut buffers {
        buffer
            .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
            .unwrap();
        let mut recorder = buffer.recorder(&mut pool).unwrap();
        recorder.fill_buffer(scene.staging, 0, 64, 1).unwrap();
        recorder.fill_buffer(scene.staging, 64, 64, 2).unwrap();
        drop(recorder);
        buffer.end().unwrap();
    }
    let counts = pool.kind_counts(CommandKind::FillBuffer);
    assert_eq!((counts.created, counts.alive, counts.resident), (4, 4, 0));

    pool.reset(false).unwrap();
    assert!(buffers
        .iter()
        .all(|buffer| buffer.lifecycle() == Lifecycle::Initial));

    // Commands of a buffer reset with its pool return when the buffer is next used.
    assert_eq!(pool.kind_counts(CommandKind::FillBuffer).resident, 0);
    buffers[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    assert_eq!(pool.kind_counts(CommandKind::FillBuffer).resident, 2);

    buffers[0]
        .recorder(&mut pool)
        .unwrap()
        .fill_buffer(scene.staging, 0, 64, 3)
        .unwrap();
    let counts = pool.kind_counts(CommandKind::FillBuffer);
    assert_eq!((counts.created, counts.resident), (4, 1));

    pool.free_buffers(buffers);
    let counts = pool.kind_counts(CommandKind::FillBuffer);
    assert_eq!((counts.alive, counts.resident), (4, 4));
    assert_eq!(pool.recording_counts().created, 2);

    pool.trim();
    let counts = pool.counts();
    assert_eq!((counts.created, counts.alive, counts.resident), (4, 0, 0));
    pool.dispose();
}
