//! Rigid body simulation.
//!
//! The scene talks to physics only through the [`PhysicsPlugin`] trait so the
//! simulation backend can be swapped at startup. [`RapierPlugin`] is the
//! backend shipped with the playground.
//!
//! Impostors follow the usual engine vocabulary: a mesh gets an impostor of a
//! given [`ImpostorKind`] plus [`RigidBodyParams`], and the shape is derived
//! from the mesh's bounds at attach time. A mass of zero makes the body static.

mod rapier;

pub use rapier::RapierPlugin;

use cgmath::{Quaternion, Vector3};

use crate::error::BootstrapError;

/// Fixed world step used when the backend does not follow the frame delta.
pub const FIXED_TIME_STEP: f32 = 1.0 / 60.0;

/// Smallest half extent a box collider may have. Flat meshes like the ground
/// have zero height and would otherwise produce a degenerate cuboid.
pub const MIN_HALF_EXTENT: f32 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub gravity: Vector3<f32>,
    /// When `false` the world advances by [`FIXED_TIME_STEP`] once per frame,
    /// regardless of how long the frame took.
    pub use_delta_for_world_step: bool,
    /// Cap for a single world step when following the frame delta.
    pub max_time_step: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.82, 0.0),
            use_delta_for_world_step: false,
            max_time_step: 0.1,
        }
    }
}

impl PhysicsConfig {
    pub fn with_delta_world_step(mut self, enabled: bool) -> Self {
        self.use_delta_for_world_step = enabled;
        self
    }

    /// Length of the next world step for a frame that took `frame_dt` seconds.
    /// Non-finite frame times yield a zero step.
    pub fn world_step(&self, frame_dt: f32) -> f32 {
        if self.use_delta_for_world_step {
            if !frame_dt.is_finite() {
                return 0.0;
            }
            frame_dt.clamp(0.0, self.max_time_step)
        } else {
            FIXED_TIME_STEP
        }
    }
}

/// Per-body physics parameters. Validated on construction and immutable once
/// attached to a mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBodyParams {
    mass: f32,
    restitution: f32,
    friction: f32,
}

impl RigidBodyParams {
    pub const DEFAULT_RESTITUTION: f32 = 0.2;
    pub const DEFAULT_FRICTION: f32 = 0.2;

    pub fn new(mass: f32, restitution: f32) -> Result<Self, BootstrapError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(BootstrapError::InvalidBodyParams(format!(
                "mass must be a finite value >= 0, got {}",
                mass
            )));
        }
        if !restitution.is_finite() || restitution < 0.0 {
            return Err(BootstrapError::InvalidBodyParams(format!(
                "restitution must be a finite value >= 0, got {}",
                restitution
            )));
        }
        if restitution > 1.0 {
            log::warn!(
                "restitution {} is above 1.0, bounces will gain energy",
                restitution
            );
        }
        Ok(Self {
            mass,
            restitution,
            friction: Self::DEFAULT_FRICTION,
        })
    }

    /// A zero-mass body that never moves.
    pub fn fixed() -> Self {
        Self {
            mass: 0.0,
            restitution: Self::DEFAULT_RESTITUTION,
            friction: Self::DEFAULT_FRICTION,
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpostorKind {
    Box,
    Sphere,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderShape {
    Cuboid { half_extents: Vector3<f32> },
    Ball { radius: f32 },
}

impl ColliderShape {
    /// Derives the collider from a mesh's local bounds and world scale.
    pub fn from_bounds(kind: ImpostorKind, extents: Vector3<f32>, scale: Vector3<f32>) -> Self {
        let size = Vector3::new(
            extents.x * scale.x.abs(),
            extents.y * scale.y.abs(),
            extents.z * scale.z.abs(),
        );
        match kind {
            ImpostorKind::Box => ColliderShape::Cuboid {
                half_extents: Vector3::new(
                    (size.x / 2.0).max(MIN_HALF_EXTENT),
                    (size.y / 2.0).max(MIN_HALF_EXTENT),
                    (size.z / 2.0).max(MIN_HALF_EXTENT),
                ),
            },
            ImpostorKind::Sphere => ColliderShape::Ball {
                radius: (size.x.max(size.y).max(size.z) / 2.0).max(MIN_HALF_EXTENT),
            },
        }
    }
}

/// Everything a backend needs to create one body with one collider.
#[derive(Clone, Debug)]
pub struct BodyDescriptor {
    pub shape: ColliderShape,
    pub params: RigidBodyParams,
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    /// Offset of the collider relative to the body origin, for meshes whose
    /// bounds are not centred on their pivot.
    pub offset: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// The impostor a mesh carries once physics is attached.
#[derive(Clone, Debug)]
pub struct Impostor {
    pub kind: ImpostorKind,
    pub shape: ColliderShape,
    pub params: RigidBodyParams,
    pub handle: BodyHandle,
}

/// Pluggable simulation backend.
pub trait PhysicsPlugin {
    fn name(&self) -> &'static str;

    fn init(&mut self, config: &PhysicsConfig);

    fn add_body(&mut self, body: &BodyDescriptor) -> BodyHandle;

    fn step(&mut self, dt: f32);

    /// World position and orientation of a body.
    fn body_pose(&self, handle: BodyHandle) -> Option<(Vector3<f32>, Quaternion<f32>)>;

    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vector3<f32>>;
}

impl std::fmt::Debug for dyn PhysicsPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PhysicsPlugin({})", self.name())
    }
}

/// A backend together with the configuration it was initialized with.
#[derive(Debug)]
pub struct PhysicsWorld {
    pub config: PhysicsConfig,
    plugin: Box<dyn PhysicsPlugin>,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig, mut plugin: Box<dyn PhysicsPlugin>) -> Self {
        plugin.init(&config);
        log::info!(
            "physics enabled with {} (gravity {:?})",
            plugin.name(),
            config.gravity
        );
        Self { config, plugin }
    }

    pub fn plugin(&self) -> &dyn PhysicsPlugin {
        self.plugin.as_ref()
    }

    pub fn add_body(&mut self, body: &BodyDescriptor) -> BodyHandle {
        self.plugin.add_body(body)
    }

    /// Advances the world for a frame of `frame_dt` seconds and returns the
    /// step length actually used.
    pub fn step(&mut self, frame_dt: f32) -> f32 {
        let dt = self.config.world_step(frame_dt);
        if dt > 0.0 {
            self.plugin.step(dt);
        }
        dt
    }
}
