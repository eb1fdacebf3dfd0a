//! Perspective camera and orbit navigation

use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use std::f64::consts::{PI, TAU};

/// Keeps the orbit away from the poles where the up vector degenerates
const POLAR_EPSILON: f64 = 1e-6;

/// Perspective projection looking from `position` towards `target`
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: Point3<f64>,
    pub target: Point3<f64>,
    pub up: Vector3<f64>,
}

impl PerspectiveCamera {
    pub fn new(fov: f64) -> Self {
        PerspectiveCamera {
            fov,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
        }
    }

    /// Matches the aspect ratio to a viewport, ignoring empty viewports
    pub fn set_viewport(&mut self, width: usize, height: usize) {
        if width > 0 && height > 0 {
            self.aspect = width as f64 / height as f64;
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f64> {
        Perspective3::new(self.aspect, self.fov.to_radians(), self.near, self.far).to_homogeneous()
    }
}

/// Orbit controller keeping the camera on a sphere around `target`
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_distance: f64,
    pub max_distance: f64,
    pub rotate_speed: f64,
    pub zoom_speed: f64,
    /// Ease rotations out over several updates instead of applying them at once
    pub enable_damping: bool,
    /// Share of the pending rotation applied per update while damping
    pub damping_factor: f64,
    pub target: Point3<f64>,
    /// Rotation still to be applied while damping, as (theta, phi)
    pending: (f64, f64),
    /// Distance from the target
    radius: f64,
    /// Azimuth around +Y, measured from +Z towards +X
    theta: f64,
    /// Polar angle from +Y
    phi: f64,
    initial: (Point3<f64>, f64, f64, f64),
}

impl OrbitControls {
    /// Builds controls around the camera's current position
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.norm();
        let theta = offset.x.atan2(offset.z);
        let phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI / 2.0
        };
        OrbitControls {
            enable_zoom: true,
            enable_pan: true,
            min_distance: 0.0,
            max_distance: f64::INFINITY,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            enable_damping: false,
            damping_factor: 0.05,
            target: camera.target,
            pending: (0.0, 0.0),
            radius,
            theta,
            phi,
            initial: (camera.target, radius, theta, phi),
        }
    }

    pub fn distance(&self) -> f64 {
        self.radius.clamp(self.min_distance, self.max_distance)
    }

    pub fn azimuth(&self) -> f64 {
        self.theta
    }

    pub fn polar(&self) -> f64 {
        self.phi
    }

    pub fn rotate_left(&mut self, angle: f64) {
        if self.enable_damping {
            self.pending.0 -= angle;
        } else {
            self.turn(-angle, 0.0);
        }
    }

    pub fn rotate_up(&mut self, angle: f64) {
        if self.enable_damping {
            self.pending.1 -= angle;
        } else {
            self.turn(0.0, -angle);
        }
    }

    fn turn(&mut self, theta: f64, phi: f64) {
        self.theta = (self.theta + theta).rem_euclid(TAU);
        self.phi = (self.phi + phi).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
    }

    /// Applies one step of damped rotation; call once per frame
    pub fn update(&mut self) {
        if !self.enable_damping {
            return;
        }
        let (theta, phi) = self.pending;
        let factor = self.damping_factor.clamp(0.0, 1.0);
        self.turn(theta * factor, phi * factor);
        self.pending = (theta * (1.0 - factor), phi * (1.0 - factor));
    }

    /// Rotates by a pointer drag measured in viewport pixels
    pub fn rotate(&mut self, dx: f64, dy: f64, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }
        let h = viewport_height as f64;
        self.rotate_left(TAU * dx / h * self.rotate_speed);
        self.rotate_up(TAU * dy / h * self.rotate_speed);
    }

    fn zoom_scale(&self) -> f64 {
        0.95_f64.powf(self.zoom_speed)
    }

    /// Moves the camera towards the target; returns false while zoom is disabled
    pub fn zoom_in(&mut self) -> bool {
        if !self.enable_zoom {
            return false;
        }
        self.radius = (self.radius * self.zoom_scale()).clamp(self.min_distance, self.max_distance);
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if !self.enable_zoom {
            return false;
        }
        self.radius = (self.radius / self.zoom_scale()).clamp(self.min_distance, self.max_distance);
        true
    }

    /// Shifts the target in the camera plane; returns false while panning is disabled
    pub fn pan(
        &mut self,
        dx: f64,
        dy: f64,
        camera: &PerspectiveCamera,
        viewport_height: usize,
    ) -> bool {
        if !self.enable_pan || viewport_height == 0 {
            return false;
        }
        // World units covered by one pixel at the target distance
        let per_pixel = 2.0 * self.distance() * (camera.fov.to_radians() / 2.0).tan()
            / viewport_height as f64;
        let forward = (camera.target - camera.position).normalize();
        let right = forward.cross(&camera.up).normalize();
        let up = right.cross(&forward);
        self.target += (-right * dx + up * dy) * per_pixel;
        true
    }

    pub fn reset(&mut self) {
        let (target, radius, theta, phi) = self.initial;
        self.target = target;
        self.radius = radius;
        self.theta = theta;
        self.phi = phi;
        self.pending = (0.0, 0.0);
    }

    /// Writes the orbit position into the camera
    pub fn apply(&self, camera: &mut PerspectiveCamera) {
        let r = self.distance();
        let offset = Vector3::new(
            r * self.phi.sin() * self.theta.sin(),
            r * self.phi.cos(),
            r * self.phi.sin() * self.theta.cos(),
        );
        camera.position = self.target + offset;
        camera.target = self.target;
    }
}
