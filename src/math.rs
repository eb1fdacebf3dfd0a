use crate::config::Color;
use nalgebra::{Point3, Vector3};

/// Edge function used in rasterization
pub fn edge_function(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> f64 {
    (c[0] - a[0]) * (b[1] - a[1]) - (c[1] - a[1]) * (b[0] - a[0])
}

/// Calculates the unit normal of a triangle, zero when it is degenerate
pub fn calculate_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
    let normal = (b - a).cross(&(c - a));
    normal.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
}

/// Lambertian term for a surface normal and a unit direction towards the light
pub fn calculate_light_intensity(normal: &Vector3<f64>, light_dir: &Vector3<f64>) -> f64 {
    normal.dot(light_dir).max(0.0)
}

/// Hermite interpolation between two edges, clamped to [0, 1]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Encodes one linear channel as an 8-bit sRGB value
pub fn linear_to_srgb(c: f64) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let encoded = if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}

/// Applies linear irradiance to an albedo color
pub fn apply_lighting(color: Color, irradiance: &Vector3<f64>) -> [u8; 3] {
    let albedo = color.to_linear();
    [
        linear_to_srgb(albedo.x * irradiance.x),
        linear_to_srgb(albedo.y * irradiance.y),
        linear_to_srgb(albedo.z * irradiance.z),
    ]
}
