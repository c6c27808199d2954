use cgmath::InnerSpace;
use flow_playground::{
    Playground, PlaygroundConfig,
    physics::{FIXED_TIME_STEP, PhysicsConfig, RapierPlugin},
};

use crate::common::test_utils::{CountingSurface, RecordingPhysics, SceneFixture, assert_close};

mod common;

async fn running_playground() -> Playground<CountingSurface> {
    let mut playground = Playground::new(
        CountingSurface::default(),
        Box::new(RapierPlugin::new()),
        PlaygroundConfig::default(),
    )
    .unwrap();
    playground
        .start(&SceneFixture::playground().assets())
        .await
        .unwrap();
    playground
}

fn height_of(playground: &Playground<CountingSurface>, name: &str) -> f32 {
    let scene = playground.scene();
    let id = scene.get_mesh_by_name(name).unwrap();
    scene.mesh(id).unwrap().transform.position.y
}

#[tokio::test]
async fn bodies_should_fall_and_rest_on_ground() {
    let mut playground = running_playground().await;
    let mut lowest_sphere = f32::INFINITY;

    for _ in 0..600 {
        playground.scene_mut().advance(FIXED_TIME_STEP);
        lowest_sphere = lowest_sphere.min(height_of(&playground, "sphere1"));
    }

    let cube = height_of(&playground, "cube1");
    assert!((0.4..0.7).contains(&cube), "cube1 rests at {}", cube);
    let cube1 = playground.scene().get_mesh_by_name("cube1").unwrap();
    let velocity = playground.scene().linear_velocity(cube1).unwrap();
    assert!(velocity.magnitude() < 0.1, "cube1 still moving at {:?}", velocity);
    assert!(lowest_sphere > 0.3, "sphere1 sank to {}", lowest_sphere);

    // The ground and the imported mesh have no dynamic body.
    let scene = playground.scene();
    let ground = scene.mesh(scene.get_mesh_by_name("ground").unwrap()).unwrap();
    assert_eq!(ground.transform.position.y, 0.0);
    let cube2 = scene.mesh(scene.get_mesh_by_name("cube2").unwrap()).unwrap();
    assert_eq!(cube2.transform.position.y, 0.5);
}

#[tokio::test]
async fn bodies_should_start_falling_after_first_step() {
    let mut playground = running_playground().await;
    assert_eq!(height_of(&playground, "cube1"), 5.0);

    for _ in 0..10 {
        playground.scene_mut().advance(FIXED_TIME_STEP);
    }

    assert!(height_of(&playground, "cube1") < 5.0);
    assert!(height_of(&playground, "sphere1") < 5.0);
    let sphere1 = playground.scene().get_mesh_by_name("sphere1").unwrap();
    assert!(playground.scene().linear_velocity(sphere1).unwrap().y < 0.0);
    // Static and body-less meshes report nothing.
    let cube2 = playground.scene().get_mesh_by_name("cube2").unwrap();
    assert!(playground.scene().linear_velocity(cube2).is_none());
}

#[test]
fn fixed_step_should_ignore_frame_time() {
    let (physics, log) = RecordingPhysics::new();
    let mut playground = Playground::new(
        CountingSurface::default(),
        Box::new(physics),
        PlaygroundConfig::default(),
    )
    .unwrap();

    let scene = playground.scene_mut();
    assert_close(scene.advance(0.5), FIXED_TIME_STEP);
    assert_close(scene.advance(0.001), FIXED_TIME_STEP);

    assert_eq!(log.borrow().steps, vec![FIXED_TIME_STEP, FIXED_TIME_STEP]);
}

#[test]
fn delta_step_should_follow_frame_time_up_to_cap() {
    let (physics, log) = RecordingPhysics::new();
    let config =
        PlaygroundConfig::default().with_physics(PhysicsConfig::default().with_delta_world_step(true));
    let mut playground =
        Playground::new(CountingSurface::default(), Box::new(physics), config).unwrap();

    let scene = playground.scene_mut();
    assert_close(scene.advance(0.02), 0.02);
    assert_close(scene.advance(1.0), 0.1);
    // A zero-length frame does not reach the backend.
    assert_close(scene.advance(0.0), 0.0);

    assert_eq!(log.borrow().steps.len(), 2);
}

#[test]
fn delta_step_should_drop_non_finite_frame_times() {
    let (physics, log) = RecordingPhysics::new();
    let config =
        PlaygroundConfig::default().with_physics(PhysicsConfig::default().with_delta_world_step(true));
    let mut playground =
        Playground::new(CountingSurface::default(), Box::new(physics), config).unwrap();

    let scene = playground.scene_mut();
    assert_eq!(scene.advance(f32::NAN), 0.0);
    assert_eq!(scene.advance(f32::INFINITY), 0.0);

    assert!(log.borrow().steps.is_empty());
}

#[test]
fn advance_without_physics_should_do_nothing() {
    let mut scene = flow_playground::data_structures::scene_graph::Scene::new();
    assert!(!scene.is_physics_enabled());
    assert_eq!(scene.advance(FIXED_TIME_STEP), 0.0);
}
