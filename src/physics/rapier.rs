//! Rapier backend.

use std::collections::HashMap;

use cgmath::{Quaternion, Vector3};
use rapier3d::{na, prelude::*};

use super::{BodyDescriptor, BodyHandle, ColliderShape, PhysicsConfig, PhysicsPlugin};

/// Full rigid body simulation on top of `rapier3d`.
///
/// All colliders multiply their restitution on contact, so a bouncy body on a
/// default ground keeps bounces below the body's own coefficient.
pub struct RapierPlugin {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    gravity: Vector<Real>,

    handles: HashMap<BodyHandle, RigidBodyHandle>,
    next_handle: u64,
}

impl RapierPlugin {
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: vector![0.0, -9.82, 0.0],
            handles: HashMap::new(),
            next_handle: 1,
        }
    }

    fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.handles
            .get(&handle)
            .and_then(|h| self.rigid_body_set.get(*h))
    }
}

impl Default for RapierPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsPlugin for RapierPlugin {
    fn name(&self) -> &'static str {
        "rapier"
    }

    fn init(&mut self, config: &PhysicsConfig) {
        self.gravity = vector![config.gravity.x, config.gravity.y, config.gravity.z];
        self.integration_parameters.dt = super::FIXED_TIME_STEP;
    }

    fn add_body(&mut self, body: &BodyDescriptor) -> BodyHandle {
        let rotation = na::UnitQuaternion::from_quaternion(na::Quaternion::new(
            body.rotation.s,
            body.rotation.v.x,
            body.rotation.v.y,
            body.rotation.v.z,
        ));
        let isometry = na::Isometry3::from_parts(
            na::Translation3::new(body.position.x, body.position.y, body.position.z),
            rotation,
        );
        let builder = if body.params.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic().ccd_enabled(true)
        };
        let rapier_handle = self
            .rigid_body_set
            .insert(builder.position(isometry).build());

        let shape = match body.shape {
            ColliderShape::Cuboid { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            ColliderShape::Ball { radius } => SharedShape::ball(radius),
        };
        let mut collider = ColliderBuilder::new(shape)
            .translation(vector![body.offset.x, body.offset.y, body.offset.z])
            .restitution(body.params.restitution())
            .restitution_combine_rule(CoefficientCombineRule::Multiply)
            .friction(body.params.friction());
        if !body.params.is_static() {
            collider = collider.mass(body.params.mass());
        }
        self.collider_set.insert_with_parent(
            collider.build(),
            rapier_handle,
            &mut self.rigid_body_set,
        );

        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.handles.insert(handle, rapier_handle);
        handle
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn body_pose(&self, handle: BodyHandle) -> Option<(Vector3<f32>, Quaternion<f32>)> {
        self.body(handle).map(|body| {
            let t = body.translation();
            // nalgebra stores quaternions as [i, j, k, w]
            let r = body.rotation().coords;
            (
                Vector3::new(t.x, t.y, t.z),
                Quaternion::new(r[3], r[0], r[1], r[2]),
            )
        })
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vector3<f32>> {
        self.body(handle).map(|body| {
            let v = body.linvel();
            Vector3::new(v.x, v.y, v.z)
        })
    }
}
