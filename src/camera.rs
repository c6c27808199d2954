//! Cameras, the keyboard/mouse controller and cursor rays.
//!
//! Scene files define cameras as nodes with a projection. We keep the node's
//! position and derive yaw/pitch from its orientation so the controller can
//! move it around like a free-fly camera once controls are attached.

use std::f32::consts::FRAC_PI_2;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Quaternion, Rad, SquareMatrix, Vector3, Vector4};
use instant::Duration;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CameraId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraProjection {
    Perspective {
        yfov: Rad<f32>,
        znear: f32,
        zfar: f32,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

impl CameraProjection {
    pub fn matrix(&self, aspect: f32) -> Matrix4<f32> {
        let proj = match *self {
            CameraProjection::Perspective { yfov, znear, zfar } => {
                cgmath::perspective(yfov, aspect, znear, zfar)
            }
            CameraProjection::Orthographic {
                xmag,
                ymag,
                znear,
                zfar,
            } => cgmath::ortho(-xmag, xmag, -ymag, ymag, znear, zfar),
        };
        OPENGL_TO_WGPU_MATRIX * proj
    }
}

impl Default for CameraProjection {
    fn default() -> Self {
        CameraProjection::Perspective {
            yfov: Rad(0.8),
            znear: 0.1,
            zfar: 500.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub name: String,
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    pub projection: CameraProjection,
    controls_attached: bool,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        name: impl Into<String>,
        position: V,
        yaw: Y,
        pitch: P,
        projection: CameraProjection,
    ) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            projection,
            controls_attached: false,
        }
    }

    /// Builds a camera from a node transform. Cameras look down their local -Z.
    pub fn from_orientation(
        name: impl Into<String>,
        position: Vector3<f32>,
        rotation: Quaternion<f32>,
        projection: CameraProjection,
    ) -> Self {
        let forward = (rotation * -Vector3::unit_z()).normalize();
        let yaw = Rad(forward.z.atan2(forward.x));
        let pitch = Rad(forward.y.clamp(-1.0, 1.0).asin());
        Self::new(name, Point3::from_vec(position), yaw, pitch, projection)
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }

    pub fn view_projection(&self, width: u32, height: u32) -> Matrix4<f32> {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        self.projection.matrix(aspect) * self.view_matrix()
    }

    /// Routes user input to this camera from now on.
    pub fn attach_control(&mut self) {
        self.controls_attached = true;
    }

    pub fn controls_attached(&self) -> bool {
        self.controls_attached
    }

    /// Ray from the camera through the cursor position in physical pixels.
    pub fn cast_ray_from_mouse(
        &self,
        cursor: PhysicalPosition<f64>,
        width: u32,
        height: u32,
    ) -> Option<Ray> {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let ndc_x = 2.0 * cursor.x as f32 / w - 1.0;
        let ndc_y = 1.0 - 2.0 * cursor.y as f32 / h;
        let inverse = self.view_projection(width, height).invert()?;

        let unproject = |z: f32| {
            let p = inverse * Vector4::new(ndc_x, ndc_y, z, 1.0);
            p.truncate() / p.w
        };
        let near = unproject(0.0);
        let far = unproject(1.0);
        Ray::new(Point3::from_vec(near), far - near)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Option<Self> {
        if direction.magnitude2() <= f32::EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction.normalize(),
        })
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, width: u32, height: u32) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_projection(width, height).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Free-fly controls: WASD/arrows move, Space/Shift rise and sink, dragging
/// with the right mouse button looks around.
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.process_keyboard(*key, *state),
            _ => false,
        }
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed {
            1.0
        } else {
            0.0
        };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => self.amount_forward = amount,
            KeyCode::KeyS | KeyCode::ArrowDown => self.amount_backward = amount,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.amount_left = amount,
            KeyCode::KeyD | KeyCode::ArrowRight => self.amount_right = amount,
            KeyCode::Space => self.amount_up = amount,
            KeyCode::ShiftLeft => self.amount_down = amount,
            _ => return false,
        }
        true
    }

    pub fn handle_mouse(&mut self, mouse_dx: f64, mouse_dy: f64) {
        self.rotate_horizontal = mouse_dx as f32;
        self.rotate_vertical = mouse_dy as f32;
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        let (yaw_sin, yaw_cos) = camera.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin).normalize();
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos).normalize();
        camera.position += forward * (self.amount_forward - self.amount_backward) * self.speed * dt;
        camera.position += right * (self.amount_right - self.amount_left) * self.speed * dt;
        camera.position.y += (self.amount_up - self.amount_down) * self.speed * dt;

        camera.yaw += Rad(self.rotate_horizontal) * self.sensitivity * dt;
        camera.pitch += Rad(-self.rotate_vertical) * self.sensitivity * dt;
        // Mouse deltas arrive as events, so they only apply to one update.
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        if camera.pitch < -Rad(SAFE_FRAC_PI_2) {
            camera.pitch = -Rad(SAFE_FRAC_PI_2);
        } else if camera.pitch > Rad(SAFE_FRAC_PI_2) {
            camera.pitch = Rad(SAFE_FRAC_PI_2);
        }
    }
}
