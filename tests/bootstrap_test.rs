use flow_playground::{
    AppPhase, BodyKind, BootstrapError, Placement, Playground, PlaygroundConfig,
    actions::Trigger,
    bootstrap::{GROUND_MATERIAL, GROUND_NAME, find_canvas},
    data_structures::material::Colour3,
    physics::{ColliderShape, RapierPlugin, RigidBodyParams},
    resources::InMemoryAssets,
};
use instant::Duration;

use crate::common::test_utils::{
    CountingSurface, FixtureMesh, MapLookup, PendingAssets, RecordingPhysics, SceneFixture,
    assert_close,
};

mod common;

fn playground() -> Playground<CountingSurface> {
    Playground::new(
        CountingSurface::default(),
        Box::new(RapierPlugin::new()),
        PlaygroundConfig::default(),
    )
    .expect("playground")
}

#[tokio::test]
async fn should_load_scene_and_set_up_lighting() {
    let mut playground = playground();
    assert_eq!(playground.phase(), AppPhase::Initializing);

    let report = playground
        .start(&SceneFixture::playground().assets())
        .await
        .expect("start");

    assert_eq!(playground.phase(), AppPhase::Running);
    let scene = playground.scene();
    let camera = scene.active_camera().expect("active camera");
    assert!(camera.controls_attached());
    assert_eq!(scene.shadow_generators().len(), 1);
    assert_eq!(scene.shadow_generators()[0].map_size, 1024);

    let light = &scene.lights()[0];
    assert_eq!(light.name, "directionalLight");
    assert_eq!(light.direction, cgmath::Vector3::new(0.0, -1.0, -1.0));
    assert_eq!(light.position, cgmath::Vector3::new(0.0, 10.0, 0.0));
    assert_close(light.intensity, 1.0);

    let ground = scene.get_mesh_by_name(GROUND_NAME).unwrap();
    let cube1 = scene.get_mesh_by_name("cube1").unwrap();
    let cube2 = scene.get_mesh_by_name("cube2").unwrap();
    assert_eq!(report.casters, vec![ground, cube1, cube2]);
    assert_eq!(scene.shadow_generators()[0].casters(), report.casters.as_slice());
    assert!(report.missing.is_empty());
    assert!(scene.get_mesh_by_name("sphere1").is_some());
    assert!(!scene.casts_shadow(scene.get_mesh_by_name("sphere1").unwrap()));
}

#[tokio::test]
async fn should_fail_without_camera_and_stay_initializing() {
    let mut playground = playground();
    let assets = SceneFixture::new()
        .mesh(FixtureMesh::at("cube2", [0.0, 0.0, 0.0]))
        .assets();

    let err = playground.start(&assets).await.unwrap_err();

    assert!(
        matches!(err, BootstrapError::MissingCamera { ref path } if path == "scenes/scene.gltf"),
        "unexpected error {:?}",
        err
    );
    assert_eq!(playground.phase(), AppPhase::Initializing);
    let scene = playground.scene();
    assert!(scene.lights().is_empty());
    assert!(scene.shadow_generators().is_empty());
    assert!(scene.get_mesh_by_name("cube1").is_none());
    assert!(scene.get_mesh_by_name("sphere1").is_none());
    // Nothing from the rejected file was kept.
    assert!(scene.get_mesh_by_name("cube2").is_none());
    assert_eq!(scene.mesh_count(), 1);
}

#[tokio::test]
async fn retry_after_failed_load_should_not_duplicate_meshes() {
    let mut playground = playground();
    let cameraless = SceneFixture::new()
        .mesh(FixtureMesh::at("cube2", [0.0, 0.0, 0.0]))
        .assets();
    assert!(playground.start(&cameraless).await.is_err());

    playground
        .start(&SceneFixture::playground().assets())
        .await
        .expect("second attempt loads");

    let cube2s = playground
        .scene()
        .meshes()
        .filter(|(_, m)| m.name == "cube2")
        .count();
    assert_eq!(cube2s, 1);
    assert_eq!(playground.scene().cameras().len(), 1);
    assert_eq!(playground.phase(), AppPhase::Running);
}

#[tokio::test]
async fn should_spawn_cube1_with_expected_body() {
    let (physics, log) = RecordingPhysics::new();
    let mut playground = Playground::new(
        CountingSurface::default(),
        Box::new(physics),
        PlaygroundConfig::default(),
    )
    .unwrap();

    playground
        .load_scene(&SceneFixture::playground().assets(), "scenes/", "scene.gltf")
        .await
        .unwrap();

    let scene = playground.scene();
    let named: Vec<_> = scene.meshes().filter(|(_, m)| m.name == "cube1").collect();
    assert_eq!(named.len(), 1);
    let (_, cube1) = named[0];
    let impostor = cube1.impostor().expect("cube1 impostor");
    assert_close(impostor.params.mass(), 1.0);
    assert_close(impostor.params.restitution(), 0.8);
    assert!(!impostor.params.is_static());
    assert_eq!(
        cube1.transform.position,
        cgmath::Vector3::new(0.0, 5.0, 0.0)
    );
    assert_eq!(
        scene.mesh_material(scene.get_mesh_by_name("cube1").unwrap()).unwrap().diffuse,
        Colour3::RED
    );

    // ground, cube1, sphere1
    let log = log.borrow();
    assert_eq!(log.bodies.len(), 3);
    assert_eq!(
        log.config.as_ref().unwrap().gravity,
        cgmath::Vector3::new(0.0, -9.82, 0.0)
    );
    assert!(!log.config.as_ref().unwrap().use_delta_for_world_step);
    match log.bodies[1].shape {
        ColliderShape::Cuboid { half_extents } => {
            assert_close(half_extents.x, 0.5);
            assert_close(half_extents.y, 0.5);
            assert_close(half_extents.z, 0.5);
        }
        other => panic!("cube1 should be a cuboid, got {:?}", other),
    }
}

#[tokio::test]
async fn should_spawn_bouncy_sphere1() {
    let mut playground = playground();
    playground
        .start(&SceneFixture::playground().assets())
        .await
        .unwrap();

    let scene = playground.scene();
    let sphere = scene
        .mesh(scene.get_mesh_by_name("sphere1").unwrap())
        .unwrap();
    let impostor = sphere.impostor().unwrap();
    assert_close(impostor.params.mass(), 1.0);
    assert_close(impostor.params.restitution(), 3.0);
    assert_eq!(impostor.shape, ColliderShape::Ball { radius: 0.5 });
    assert_eq!(sphere.transform.position, cgmath::Vector3::new(2.0, 5.0, 0.0));
    assert_eq!(
        scene
            .mesh_material(scene.get_mesh_by_name("sphere1").unwrap())
            .unwrap()
            .diffuse,
        Colour3::BLUE
    );
}

#[test]
fn should_set_up_static_ground_on_construction() {
    let playground = playground();
    let scene = playground.scene();

    let grounds: Vec<_> = scene.meshes().filter(|(_, m)| m.name == GROUND_NAME).collect();
    assert_eq!(grounds.len(), 1);
    let (id, ground) = grounds[0];
    assert_eq!(playground.ground(), Some(id));
    assert!(ground.impostor().unwrap().params.is_static());
    assert!(!ground.receive_shadows);
    assert_eq!(ground.transform.position, cgmath::Vector3::new(0.0, 0.0, 0.0));

    let material = scene.mesh_material(id).unwrap();
    assert_eq!(material.name, GROUND_MATERIAL);
    assert_eq!(material.diffuse, Colour3::grey(0.5));
    assert_eq!(
        scene.clear_colour,
        wgpu::Color {
            r: 0.8,
            g: 0.8,
            b: 0.8,
            a: 1.0
        }
    );
    let extents = ground.bounds().extents();
    assert_close(extents.x, 10.0);
    assert_close(extents.z, 10.0);
}

#[tokio::test]
async fn ground_should_receive_shadows_only_after_lighting() {
    let mut playground = playground();
    playground
        .load_scene(&SceneFixture::playground().assets(), "scenes/", "scene.gltf")
        .await
        .unwrap();
    let ground = playground.ground().unwrap();
    assert!(!playground.scene().mesh(ground).unwrap().receive_shadows);

    playground.setup_lighting();

    assert!(playground.scene().mesh(ground).unwrap().receive_shadows);
    assert!(playground.scene().casts_shadow(ground));
}

#[tokio::test]
async fn should_report_missing_caster_without_failing() {
    let mut playground = playground();
    let assets = SceneFixture::new().camera([0.0, 5.0, 10.0]).assets();

    let report = playground.start(&assets).await.expect("missing casters are not fatal");

    assert_eq!(report.missing, vec!["cube2".to_string()]);
    assert_eq!(report.casters.len(), 2);
    assert_eq!(playground.phase(), AppPhase::Running);
}

#[tokio::test]
async fn should_time_out_slow_loads() {
    let config = PlaygroundConfig::default().with_load_timeout(Duration::from_millis(20));
    let mut playground =
        Playground::new(CountingSurface::default(), Box::new(RapierPlugin::new()), config).unwrap();

    let err = playground.start(&PendingAssets).await.unwrap_err();

    assert!(
        matches!(err, BootstrapError::LoadTimedOut { after, .. } if after == Duration::from_millis(20)),
        "unexpected error {:?}",
        err
    );
    assert_eq!(playground.phase(), AppPhase::Initializing);
}

#[tokio::test]
async fn should_wrap_fetch_failures() {
    let mut playground = playground();

    let err = playground.start(&InMemoryAssets::new()).await.unwrap_err();

    match err {
        BootstrapError::SceneLoad { path, source } => {
            assert_eq!(path, "scenes/scene.gltf");
            assert!(source.to_string().contains("not found"), "{}", source);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn should_refuse_second_load() {
    let mut playground = playground();
    let assets = SceneFixture::playground().assets();
    playground.start(&assets).await.unwrap();

    let err = playground
        .load_scene(&assets, "scenes/", "scene.gltf")
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Configuration(_)));
    let cube1s = playground
        .scene()
        .meshes()
        .filter(|(_, m)| m.name == "cube1")
        .count();
    assert_eq!(cube1s, 1);
}

#[test]
fn should_place_spawned_bodies_at_depth_zero() {
    let mut playground = playground();
    let id = playground
        .spawn_dynamic_body(
            BodyKind::Box,
            "crate",
            Placement::new(-3.0, 7.5),
            RigidBodyParams::new(2.0, 0.1).unwrap(),
        )
        .unwrap();

    let mesh = playground.scene().mesh(id).unwrap();
    assert_eq!(mesh.transform.position, cgmath::Vector3::new(-3.0, 7.5, 0.0));
    let actions = playground.scene().action_manager(id).unwrap();
    assert!(actions.has_trigger(Trigger::OnPick));
    // Not an expected caster, so no role is recorded
    assert!(playground.roles().get("crate").is_none());
}

#[test]
fn should_reject_invalid_body_params() {
    assert!(matches!(
        RigidBodyParams::new(-1.0, 0.5),
        Err(BootstrapError::InvalidBodyParams(_))
    ));
    assert!(RigidBodyParams::new(f32::NAN, 0.5).is_err());
    assert!(RigidBodyParams::new(1.0, -0.1).is_err());
    assert!(RigidBodyParams::new(1.0, f32::INFINITY).is_err());
    assert!(RigidBodyParams::new(1.0, 3.0).is_ok());
    assert!(RigidBodyParams::new(0.0, 0.0).unwrap().is_static());

    let mut playground = playground();
    let err = playground
        .spawn_dynamic_body(
            BodyKind::Sphere,
            "lost",
            Placement::new(f32::NAN, 1.0),
            RigidBodyParams::new(1.0, 0.5).unwrap(),
        )
        .unwrap_err();
    assert!(matches!(err, BootstrapError::InvalidBodyParams(_)));
}

#[test]
fn should_find_canvas_by_id() {
    let lookup = MapLookup::default()
        .with("renderCanvas", true)
        .with("overlay", false);

    assert_eq!(find_canvas(&lookup, "renderCanvas").unwrap(), "renderCanvas");
    assert!(matches!(
        find_canvas(&lookup, "missing"),
        Err(BootstrapError::Configuration(msg)) if msg.contains("missing")
    ));
    assert!(matches!(
        find_canvas(&lookup, "overlay"),
        Err(BootstrapError::Configuration(msg)) if msg.contains("<div>")
    ));
}

#[test]
fn should_read_asset_dir_override() {
    let config = PlaygroundConfig::default().with_env_overrides(Some("/srv/assets".to_string()));
    assert_eq!(config.asset_dir, std::path::PathBuf::from("/srv/assets"));

    let config = PlaygroundConfig::default().with_env_overrides(Some("  ".to_string()));
    assert_eq!(config.asset_dir, std::path::PathBuf::from("assets"));

    let config = PlaygroundConfig::default();
    assert_eq!(config.canvas_id, "renderCanvas");
    assert_eq!(config.scene_path(), "scenes/scene.gltf");
    assert_eq!(config.load_timeout, Duration::from_secs(30));
}
