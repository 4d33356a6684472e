mod common;

use {
    common::{dispose, Scene},
    forge_command::{
        CommandBuffer, CommandPool, Inheritance, Lifecycle, RecordError, StateError, SubmitError,
        ValidationError,
    },
    forge_core::{
        empty::{Call, Recorder},
        CommandBufferResetFlags, CommandBufferUsageFlags, Level, PipelineBindPoint,
        SubpassContents,
    },
};

/// Record a secondary buffer drawing inside sub-pass 0 of the scene render pass.
fn record_secondary(scene: &Scene, pool: &mut CommandPool, buffer: &mut CommandBuffer) {
    buffer
        .begin(
            pool,
            CommandBufferUsageFlags::RENDER_PASS_CONTINUE,
            Some(&Inheritance::subpass(scene.render_pass, 0)),
        )
        .unwrap();
    {
        let mut recorder = buffer.recorder(pool).unwrap();
        recorder
            .bind_pipeline(PipelineBindPoint::Graphics, scene.pipeline)
            .unwrap();
        recorder.draw(0..6, 0..1).unwrap();
    }
    buffer.end().unwrap();
}

/// Record a primary buffer executing `secondary` inside the scene render pass.
fn record_primary(
    scene: &Scene,
    pool: &mut CommandPool,
    buffer: &mut CommandBuffer,
    secondary: &CommandBuffer,
) {
    buffer
        .begin(pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    {
        let mut recorder = buffer.recorder(pool).unwrap();
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::SecondaryCommandBuffers)
            .unwrap();
        recorder.execute_commands(&[secondary]).unwrap();
        recorder.end_render_pass().unwrap();
    }
    buffer.end().unwrap();
}

#[test]
fn secondary_commands_are_encoded_inline() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondaries = pool.allocate_buffers(Level::Secondary, 1);
    let mut primaries = pool.allocate_buffers(Level::Primary, 1);
    record_secondary(&scene, &mut pool, &mut secondaries[0]);
    assert_eq!(
        secondaries[0].inheritance().map(|inheritance| inheritance.color_formats.len()),
        Some(1)
    );
    record_primary(&scene, &mut pool, &mut primaries[0], &secondaries[0]);

    let mut recorder = Recorder::new();
    let stats = primaries[0].submit(&mut recorder, None).unwrap();
    assert_eq!(recorder.count(Call::is_begin), 1);
    assert_eq!(
        recorder.count(|call| matches!(*call, Call::Draw { vertex_count: 6, .. })),
        1
    );
    // Begin, execute, end and the two secondary commands.
    assert_eq!(stats.commands, 5);

    recorder.complete();
    assert_eq!(primaries[0].lifecycle(), Lifecycle::Executable);
    assert_eq!(secondaries[0].lifecycle(), Lifecycle::Executable);

    // Secondary stays executable and is encoded again.
    let mut again = Recorder::new();
    primaries[0].submit(&mut again, None).unwrap();
    again.complete();
    assert_eq!(again.calls, recorder.calls);

    pool.free_buffers(primaries);
    dispose(pool, secondaries);
}

#[test]
fn reset_secondary_makes_primary_stale() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondaries = pool.allocate_buffers(Level::Secondary, 1);
    let mut primaries = pool.allocate_buffers(Level::Primary, 1);
    record_secondary(&scene, &mut pool, &mut secondaries[0]);
    record_primary(&scene, &mut pool, &mut primaries[0], &secondaries[0]);

    secondaries[0]
        .reset(&mut pool, CommandBufferResetFlags::empty())
        .unwrap();
    assert_eq!(
        primaries[0].submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::StaleSecondary)
    );

    // Re-recording the secondary does not revive the old reference.
    record_secondary(&scene, &mut pool, &mut secondaries[0]);
    assert_eq!(
        primaries[0].submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::StaleSecondary)
    );

    record_primary(&scene, &mut pool, &mut primaries[0], &secondaries[0]);
    let mut recorder = Recorder::new();
    primaries[0].submit(&mut recorder, None).unwrap();
    recorder.complete();

    pool.free_buffers(primaries);
    dispose(pool, secondaries);
}

#[test]
fn secondary_pool_reset_makes_primary_stale() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondary_pool = scene.pool();
    let mut secondaries = secondary_pool.allocate_buffers(Level::Secondary, 1);
    let mut primaries = pool.allocate_buffers(Level::Primary, 1);
    record_secondary(&scene, &mut secondary_pool, &mut secondaries[0]);
    record_primary(&scene, &mut pool, &mut primaries[0], &secondaries[0]);

    secondary_pool.reset(false).unwrap();
    assert_eq!(secondaries[0].lifecycle(), Lifecycle::Initial);
    assert_eq!(
        primaries[0].submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::StaleSecondary)
    );

    dispose(pool, primaries);
    dispose(secondary_pool, secondaries);
}

#[test]
fn freed_secondary_makes_primary_stale() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondaries = pool.allocate_buffers(Level::Secondary, 1);
    let mut primaries = pool.allocate_buffers(Level::Primary, 1);
    record_secondary(&scene, &mut pool, &mut secondaries[0]);
    record_primary(&scene, &mut pool, &mut primaries[0], &secondaries[0]);

    pool.free_buffers(secondaries);
    assert_eq!(
        primaries[0].submit(&mut Recorder::new(), None).err(),
        Some(SubmitError::StaleSecondary)
    );

    dispose(pool, primaries);
}

#[test]
fn execution_inside_render_pass_is_validated() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondaries = pool.allocate_buffers(Level::Secondary, 2);
    let mut primaries = pool.allocate_buffers(Level::Primary, 3);

    record_secondary(&scene, &mut pool, &mut secondaries[0]);
    secondaries[1]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    secondaries[1].end().unwrap();

    for primary in &mut primaries {
        primary
            .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
            .unwrap();
    }

    {
        let mut recorder = primaries[0].recorder(&mut pool).unwrap();
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::Inline)
            .unwrap();
        assert_eq!(
            recorder.execute_commands(&[&secondaries[0]]),
            Err(RecordError::Rejected(ValidationError::ContentsMismatch))
        );
    }
    {
        let mut recorder = primaries[1].recorder(&mut pool).unwrap();
        recorder
            .begin_render_pass(&scene.begin(), SubpassContents::SecondaryCommandBuffers)
            .unwrap();
        match recorder.execute_commands(&[&secondaries[1]]) {
            Err(RecordError::Rejected(ValidationError::InvalidSecondary(_))) => {}
            other => panic!("Unexpected {:?}", other),
        }
    }
    {
        // Continuing secondaries run only inside render passes.
        let mut recorder = primaries[2].recorder(&mut pool).unwrap();
        match recorder.execute_commands(&[&secondaries[0]]) {
            Err(RecordError::Rejected(ValidationError::InvalidSecondary(_))) => {}
            other => panic!("Unexpected {:?}", other),
        }
    }

    pool.free_buffers(primaries);
    dispose(pool, secondaries);
}

#[test]
fn recording_secondary_cannot_be_executed() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondaries = pool.allocate_buffers(Level::Secondary, 1);
    let mut primaries = pool.allocate_buffers(Level::Primary, 1);

    secondaries[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    primaries[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    assert_eq!(
        primaries[0]
            .recorder(&mut pool)
            .unwrap()
            .execute_commands(&[&secondaries[0]]),
        Err(RecordError::Rejected(ValidationError::InvalidSecondary(
            "not executable"
        )))
    );

    pool.free_buffers(primaries);
    dispose(pool, secondaries);
}

#[test]
fn only_primaries_execute_commands() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondaries = pool.allocate_buffers(Level::Secondary, 2);
    secondaries[1]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    secondaries[1].end().unwrap();

    let (first, rest) = secondaries.split_at_mut(1);
    first[0]
        .begin(&mut pool, CommandBufferUsageFlags::empty(), None)
        .unwrap();
    assert_eq!(
        first[0]
            .recorder(&mut pool)
            .unwrap()
            .execute_commands(&[&rest[0]]),
        Err(RecordError::Rejected(ValidationError::NotPrimary(
            "execute commands"
        )))
    );

    dispose(pool, secondaries);
}

#[test]
fn continuing_secondary_requires_inheritance() {
    let scene = Scene::new();
    let mut pool = scene.pool();
    let mut secondaries = pool.allocate_buffers(Level::Secondary, 1);

    assert_eq!(
        secondaries[0].begin(
            &mut pool,
            CommandBufferUsageFlags::RENDER_PASS_CONTINUE,
            None
        ),
        Err(StateError::MissingInheritance)
    );
    assert_eq!(secondaries[0].lifecycle(), Lifecycle::Initial);

    dispose(pool, secondaries);
}
