//! Scene bootstrap: background, lights, camera and controls

use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::config::Color;
use crate::math::{calculate_light_intensity, smoothstep};
use nalgebra::{Point3, Vector3};

/// Cone light aimed at a target
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub position: Point3<f64>,
    pub target: Point3<f64>,
    /// Half-angle of the cone in radians
    pub angle: f64,
    /// Fraction of the cone that fades out, 0 is a hard edge
    pub penumbra: f64,
    pub intensity: f64,
    pub color: Color,
}

impl SpotLight {
    /// Attenuation across the cone for a point in world space
    pub fn cone_factor(&self, point: &Point3<f64>) -> f64 {
        let axis = (self.target - self.position).try_normalize(f64::EPSILON);
        let to_point = (point - self.position).try_normalize(f64::EPSILON);
        let (Some(axis), Some(to_point)) = (axis, to_point) else {
            return 1.0;
        };
        let cone_cos = self.angle.cos();
        let penumbra_cos = (self.angle * (1.0 - self.penumbra)).cos();
        smoothstep(cone_cos, penumbra_cos, axis.dot(&to_point))
    }
}

/// Omnidirectional light without distance falloff
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Point3<f64>,
    pub intensity: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Spot(SpotLight),
    Point(PointLight),
}

impl Light {
    /// Linear irradiance this light delivers to a surface point
    pub fn irradiance(&self, point: &Point3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
        let (position, intensity, color, attenuation) = match self {
            Light::Spot(spot) => (
                spot.position,
                spot.intensity,
                spot.color,
                spot.cone_factor(point),
            ),
            Light::Point(point_light) => {
                (point_light.position, point_light.intensity, point_light.color, 1.0)
            }
        };
        let Some(light_dir) = (position - point).try_normalize(f64::EPSILON) else {
            return Vector3::zeros();
        };
        let lambert = calculate_light_intensity(normal, &light_dir);
        color.to_linear() * (lambert * intensity * attenuation)
    }
}

/// Everything the renderer draws besides the model
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Color,
    pub lights: Vec<Light>,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
}

impl Scene {
    /// Builds the fixed demo stage
    pub fn bootstrap() -> Self {
        let camera = PerspectiveCamera::new(35.0);
        let mut controls = OrbitControls::new(&camera);
        controls.enable_zoom = true;
        controls.enable_pan = false;
        controls.enable_damping = true;
        controls.damping_factor = 0.05;
        controls.min_distance = 5.0;
        controls.max_distance = 200.0;

        let lights = vec![
            Light::Spot(SpotLight {
                position: Point3::new(100.0, 100.0, 10.0),
                target: Point3::origin(),
                angle: 0.45,
                penumbra: 1.0,
                intensity: 1.0,
                color: Color::WHITE,
            }),
            Light::Point(PointLight {
                position: Point3::new(-100.0, -100.0, 5.0),
                intensity: 1.0,
                color: Color::WHITE,
            }),
        ];

        Scene {
            background: Color::BLACK,
            lights,
            camera,
            controls,
        }
    }

    /// Sum of all light contributions at a surface point
    pub fn irradiance(&self, point: &Point3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
        self.lights
            .iter()
            .map(|light| light.irradiance(point, normal))
            .sum()
    }

    /// Re-derives the camera pose from the orbit controls
    pub fn update_camera(&mut self) {
        self.controls.update();
        self.controls.apply(&mut self.camera);
    }
}
