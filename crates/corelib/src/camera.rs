use std::f32::consts::PI;

use crate::{Mat4, Vec3};

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth range [0, 1], as wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}

/// Keeps the polar angle away from the poles so `look_at` stays defined.
const POLE_EPS: f32 = 1e-4;

/// Smallest orbit radius; at zero the eye sits on the target.
const MIN_RADIUS: f32 = 1e-3;

/// Orbit around a target with damped rotation and dolly zoom.
///
/// Input accumulates deltas; [`update`](Self::update) applies a
/// `damping_factor` share of them per frame and decays the rest.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    radius: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
    delta_theta: f32,
    delta_phi: f32,
    zoom_scale: f32,
}

impl OrbitControls {
    pub fn from_camera(camera: &Camera) -> Self {
        let offset = camera.eye - camera.target;
        let radius = offset.length().max(MIN_RADIUS);
        Self {
            target: camera.target,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom_scale: 1.0,
        }
    }

    /// Pointer drag in physical pixels; a full viewport height turns 2π.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let k = 2.0 * PI * self.rotate_speed / viewport_height.max(1.0);
        self.delta_theta -= dx * k;
        self.delta_phi -= dy * k;
    }

    /// Positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        self.zoom_scale *= 0.95f32.powf(steps);
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Apply pending input to `camera`. Returns `true` while still moving.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let df = self.damping_factor.clamp(0.0, 1.0);
        self.theta += self.delta_theta * df;
        self.phi = (self.phi + self.delta_phi * df).clamp(POLE_EPS, PI - POLE_EPS);
        let min = self.min_distance.max(MIN_RADIUS);
        let max = self.max_distance.max(min);
        self.radius = (self.radius * self.zoom_scale).clamp(min, max);

        self.delta_theta *= 1.0 - df;
        self.delta_phi *= 1.0 - df;
        self.zoom_scale = 1.0;

        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let offset = Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta) * self.radius;
        camera.target = self.target;
        camera.eye = self.target + offset;

        self.delta_theta.abs() > 1e-6 || self.delta_phi.abs() > 1e-6
    }
}
