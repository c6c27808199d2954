use std::{cell::Cell, rc::Rc};

use cgmath::{InnerSpace, Point3, Vector3};
use flow_playground::{
    Playground, PlaygroundConfig,
    actions::{ExecuteCodeAction, Trigger},
    camera::Ray,
    data_structures::{
        material::Colour3,
        scene_graph::{MeshId, Scene},
    },
    physics::RapierPlugin,
    pick::{PointerTracker, pick},
};
use winit::dpi::PhysicalPosition;

use crate::common::test_utils::{CountingSurface, SceneFixture, assert_close};

mod common;

async fn running_playground(seed: u64) -> Playground<CountingSurface> {
    let mut playground = Playground::new(
        CountingSurface::default(),
        Box::new(RapierPlugin::new()),
        PlaygroundConfig::default(),
    )
    .unwrap()
    .with_pick_seed(seed);
    playground
        .start(&SceneFixture::playground().assets())
        .await
        .unwrap();
    playground
}

fn from_above(x: f32, z: f32) -> Option<Ray> {
    Ray::new(Point3::new(x, 20.0, z), Vector3::new(0.0, -1.0, 0.0))
}

fn diffuse_of(playground: &Playground<CountingSurface>, name: &str) -> Colour3 {
    let scene = playground.scene();
    scene
        .mesh_material(scene.get_mesh_by_name(name).unwrap())
        .unwrap()
        .diffuse
}

fn click(playground: &mut Playground<CountingSurface>, ray: Option<Ray>) -> Option<MeshId> {
    let mut pointer = PointerTracker::new();
    pointer.press(playground.scene(), ray);
    pointer.release(playground.scene_mut(), ray)
}

#[tokio::test]
async fn should_pick_nearest_mesh() {
    let playground = running_playground(1).await;
    let scene = playground.scene();

    let hit = pick(scene, &from_above(0.0, 0.0).unwrap()).expect("cube1 is under the ray");
    assert_eq!(hit.mesh, scene.get_mesh_by_name("cube1").unwrap());
    assert_close(hit.distance, 14.5);

    let hit = pick(scene, &from_above(2.0, 0.0).unwrap()).unwrap();
    assert_eq!(hit.mesh, scene.get_mesh_by_name("sphere1").unwrap());
    assert_close(hit.distance, 14.5);

    // cube2 sits on the ground, so it is hit first.
    let hit = pick(scene, &from_above(-2.0, 0.0).unwrap()).unwrap();
    assert_eq!(hit.mesh, scene.get_mesh_by_name("cube2").unwrap());
    assert_close(hit.distance, 19.0);

    assert!(pick(scene, &from_above(50.0, 50.0).unwrap()).is_none());
}

#[tokio::test]
async fn should_skip_non_pickable_meshes() {
    let mut playground = running_playground(1).await;
    let cube1 = playground.scene().get_mesh_by_name("cube1").unwrap();
    playground.scene_mut().mesh_mut(cube1).unwrap().pickable = false;

    let hit = pick(playground.scene(), &from_above(0.0, 0.0).unwrap()).unwrap();

    assert_eq!(hit.mesh, playground.ground().unwrap());
    assert_close(hit.distance, 20.0);
}

#[tokio::test]
async fn picking_cube1_should_recolour_it() {
    let mut playground = running_playground(42).await;
    assert_eq!(diffuse_of(&playground, "cube1"), Colour3::RED);

    let picked = click(&mut playground, from_above(0.0, 0.0));

    assert_eq!(picked, playground.scene().get_mesh_by_name("cube1"));
    let colour = diffuse_of(&playground, "cube1");
    assert_ne!(colour, Colour3::RED);
    for channel in colour.to_array() {
        assert!((0.0..1.0).contains(&channel), "channel {} out of range", channel);
    }

    click(&mut playground, from_above(0.0, 0.0));
    assert_ne!(diffuse_of(&playground, "cube1"), colour);
}

#[tokio::test]
async fn release_elsewhere_should_not_recolour() {
    let mut playground = running_playground(42).await;
    let mut pointer = PointerTracker::new();

    let pressed = pointer.press(playground.scene(), from_above(0.0, 0.0));
    assert!(pressed.is_some());
    assert!(pointer.is_pressed());
    let released = pointer.release(playground.scene_mut(), from_above(-2.0, 0.0));

    assert!(released.is_none());
    assert!(!pointer.is_pressed());
    assert_eq!(diffuse_of(&playground, "cube1"), Colour3::RED);

    // Releasing without a preceding press does nothing either.
    assert!(pointer.release(playground.scene_mut(), from_above(0.0, 0.0)).is_none());
    assert_eq!(diffuse_of(&playground, "cube1"), Colour3::RED);
}

#[tokio::test]
async fn other_meshes_should_keep_their_colour() {
    let mut playground = running_playground(42).await;

    let picked = click(&mut playground, from_above(2.0, 0.0));

    assert_eq!(picked, playground.scene().get_mesh_by_name("sphere1"));
    assert_eq!(diffuse_of(&playground, "sphere1"), Colour3::BLUE);
    assert_eq!(diffuse_of(&playground, "cube1"), Colour3::RED);
}

#[tokio::test]
async fn registered_code_action_should_run_on_pick() {
    let mut playground = running_playground(42).await;
    let sphere1 = playground.scene().get_mesh_by_name("sphere1").unwrap();
    let picks = Rc::new(Cell::new(0));
    let counter = picks.clone();
    playground.scene_mut().register_action(
        sphere1,
        Trigger::OnPick,
        Box::new(ExecuteCodeAction(move |scene: &mut Scene, mesh: MeshId| {
            counter.set(counter.get() + 1);
            if let Some(node) = scene.mesh_mut(mesh) {
                node.pickable = false;
            }
        })),
    );

    assert_eq!(click(&mut playground, from_above(2.0, 0.0)), Some(sphere1));

    assert_eq!(picks.get(), 1);
    // The action made the sphere unpickable, so the ground is hit instead.
    let hit = pick(playground.scene(), &from_above(2.0, 0.0).unwrap()).unwrap();
    assert_eq!(hit.mesh, playground.ground().unwrap());
}

#[tokio::test]
async fn seeded_recolours_should_be_reproducible() {
    let mut first = running_playground(7).await;
    let mut second = running_playground(7).await;
    let mut other = running_playground(8).await;

    click(&mut first, from_above(0.0, 0.0));
    click(&mut second, from_above(0.0, 0.0));
    click(&mut other, from_above(0.0, 0.0));

    assert_eq!(diffuse_of(&first, "cube1"), diffuse_of(&second, "cube1"));
    assert_ne!(diffuse_of(&first, "cube1"), diffuse_of(&other, "cube1"));
}

#[tokio::test]
async fn centre_ray_should_follow_camera_forward() {
    let playground = running_playground(1).await;
    let camera = playground.scene().active_camera().unwrap();

    let ray = camera
        .cast_ray_from_mouse(PhysicalPosition::new(400.0, 300.0), 800, 600)
        .unwrap();

    assert!(ray.direction.dot(camera.forward()) > 0.999);
    assert_close(ray.direction.magnitude(), 1.0);
}
