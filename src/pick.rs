//! Pointer picking on the CPU.
//!
//! A ray from the active camera through the cursor is intersected with every
//! pickable mesh's local bounds. Box-like meshes are hit-tested against their
//! bounding box, spheres against their bounding sphere. A pick completes when
//! the primary button goes down and comes back up over the same mesh, as
//! with a regular click.

use cgmath::{EuclideanSpace, InnerSpace, Point3, SquareMatrix, Transform, Vector3};

use crate::{
    actions::Trigger,
    camera::Ray,
    data_structures::{
        geometry::{Aabb, GeometryKind},
        scene_graph::{MeshId, MeshNode, Scene},
    },
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickInfo {
    pub mesh: MeshId,
    /// Distance from the ray origin to the hit, in world units.
    pub distance: f32,
}

/// Nearest pickable mesh hit by `ray`.
pub fn pick(scene: &Scene, ray: &Ray) -> Option<PickInfo> {
    scene
        .meshes()
        .filter(|(_, mesh)| mesh.pickable)
        .filter_map(|(id, mesh)| {
            intersect(mesh, ray).map(|distance| PickInfo { mesh: id, distance })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn intersect(mesh: &MeshNode, ray: &Ray) -> Option<f32> {
    let inverse = mesh.transform.to_matrix().invert()?;
    // The direction is not renormalised, so `t` stays a world distance.
    let origin = inverse.transform_point(ray.origin);
    let direction = inverse.transform_vector(ray.direction);
    let bounds = mesh.bounds();
    match mesh.geometry {
        GeometryKind::Sphere { diameter, .. } => {
            ray_sphere(origin, direction, bounds.centre(), diameter / 2.0)
        }
        _ => ray_aabb(origin, direction, &bounds),
    }
}

/// Slab test. Flat bounds (zero thickness on one axis) still register hits.
fn ray_aabb(origin: Point3<f32>, direction: Vector3<f32>, bounds: &Aabb) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let (o, d) = (origin[axis], direction[axis]);
        let (lo, hi) = (bounds.min[axis], bounds.max[axis]);
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let t1 = (lo - o) / d;
        let t2 = (hi - o) / d;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }
    if t_max < t_min || t_max < 0.0 {
        return None;
    }
    Some(if t_min >= 0.0 { t_min } else { t_max })
}

fn ray_sphere(
    origin: Point3<f32>,
    direction: Vector3<f32>,
    centre: Vector3<f32>,
    radius: f32,
) -> Option<f32> {
    let oc = origin.to_vec() - centre;
    let a = direction.magnitude2();
    let b = oc.dot(direction);
    let c = oc.magnitude2() - radius * radius;
    let discriminant = b * b - a * c;
    if a <= f32::EPSILON || discriminant < 0.0 {
        return None;
    }
    let sqrt = discriminant.sqrt();
    let near = (-b - sqrt) / a;
    let far = (-b + sqrt) / a;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Turns press/release pairs into [`Trigger::OnPick`] dispatches.
#[derive(Debug, Default)]
pub struct PointerTracker {
    pressed: Option<MeshId>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records which mesh, if any, is under the pointer as the button goes down.
    pub fn press(&mut self, scene: &Scene, ray: Option<Ray>) -> Option<MeshId> {
        self.pressed = ray.and_then(|ray| pick(scene, &ray)).map(|info| info.mesh);
        self.pressed
    }

    /// Completes a pick if the release lands on the pressed mesh. Returns the
    /// picked mesh after its `OnPick` actions ran.
    pub fn release(&mut self, scene: &mut Scene, ray: Option<Ray>) -> Option<MeshId> {
        let pressed = self.pressed.take()?;
        let released = ray.and_then(|ray| pick(scene, &ray))?.mesh;
        if released != pressed {
            return None;
        }
        let executed = scene.dispatch(released, Trigger::OnPick);
        log::debug!("picked {:?}, {} action(s) ran", released, executed);
        Some(released)
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.is_some()
    }
}
