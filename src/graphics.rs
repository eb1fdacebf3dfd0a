//! CPU rendering context
//!
//! Rasterizes flat-shaded, double-sided triangles into an RGBA frame with a
//! depth buffer. The frame doubles as the capture the glyph effect samples.

use crate::config::Color;
use crate::math::{apply_lighting, calculate_normal, edge_function};
use crate::scene::Scene;
use crate::stl::Mesh;
use crate::vertex::Vertex;
use nalgebra::{Matrix4, Point3};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Identity of a rendering context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

/// A mesh placed in the world for one frame
#[derive(Debug, Clone, Copy)]
pub struct Drawable<'a> {
    pub mesh: &'a Mesh,
    pub transform: Matrix4<f64>,
    /// Albedo of the matte material
    pub color: Color,
}

/// RGBA8 pixels plus depth
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    depth: Vec<f64>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            pixels: vec![0; width * height * 4],
            depth: vec![f64::INFINITY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height * 4, 0);
        self.depth.resize(width * height, f64::INFINITY);
        self.depth.fill(f64::INFINITY);
    }

    /// Fills every pixel with an opaque color and empties the depth buffer
    pub fn clear(&mut self, color: Color) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&[color.r, color.g, color.b, 255]);
        }
        self.depth.fill(f64::INFINITY);
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * self.width + x) * 4;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether geometry was drawn at a pixel
    pub fn covers(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.depth[y * self.width + x].is_finite()
    }
}

/// Owns the raw render target
#[derive(Debug)]
pub struct Renderer {
    id: ContextId,
    frame: FrameBuffer,
    frames_rendered: u64,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            id: ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed)),
            frame: FrameBuffer::new(width, height),
            frames_rendered: 0,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn size(&self) -> (usize, usize) {
        (self.frame.width(), self.frame.height())
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        if self.size() != (width, height) {
            debug!(width, height, "resizing render target");
            self.frame.resize(width, height);
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Draws the scene background and, when present, the model
    pub fn render(&mut self, scene: &Scene, model: Option<&Drawable<'_>>) {
        self.frame.clear(scene.background);
        self.frames_rendered += 1;

        let Some(model) = model else {
            return;
        };
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            return;
        }

        let camera = &scene.camera;
        let view_projection = camera.projection_matrix() * camera.view_matrix();
        let eye = camera.position;

        for triangle in model.mesh.triangles() {
            let world = triangle
                .vertices
                .map(|v| model.transform.transform_point(&v));

            let mut normal = calculate_normal(&world[0], &world[1], &world[2]);
            if normal.dot(&(eye - world[0])) < 0.0 {
                // Back face: shade the side the camera sees
                normal = -normal;
            }

            let Some(projected) = project_triangle(&world, &view_projection, width, height) else {
                continue;
            };

            let centroid = Point3::from(
                (world[0].coords + world[1].coords + world[2].coords) / 3.0,
            );
            let irradiance = scene.irradiance(&centroid, &normal);
            let color = apply_lighting(model.color, &irradiance);

            draw_triangle(&projected, &mut self.frame, color);
        }
    }
}

/// Projects world positions to viewport pixels, rejecting triangles that
/// reach behind the near plane
fn project_triangle(
    world: &[Point3<f64>; 3],
    view_projection: &Matrix4<f64>,
    width: usize,
    height: usize,
) -> Option<[Vertex; 3]> {
    let mut out = [Vertex {
        screen_position: [0.0, 0.0],
        depth: 0.0,
    }; 3];
    for (vertex, point) in out.iter_mut().zip(world.iter()) {
        let clip = view_projection * point.to_homogeneous();
        if clip.w <= f64::EPSILON || clip.z < -clip.w {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        *vertex = Vertex {
            screen_position: [
                (ndc.x + 1.0) * 0.5 * width as f64,
                (1.0 - ndc.y) * 0.5 * height as f64,
            ],
            depth: ndc.z,
        };
    }
    Some(out)
}

/// Draws a flat-colored triangle with depth testing
pub fn draw_triangle(vertices: &[Vertex; 3], frame: &mut FrameBuffer, color: [u8; 3]) {
    let [v0, v1, v2] = vertices;
    let width = frame.width;
    let height = frame.height;
    if width == 0 || height == 0 {
        return;
    }

    // Compute bounding box of the triangle
    let min_x = v0.screen_position[0]
        .min(v1.screen_position[0])
        .min(v2.screen_position[0])
        .floor()
        .max(0.0);
    let max_x = v0.screen_position[0]
        .max(v1.screen_position[0])
        .max(v2.screen_position[0])
        .ceil()
        .min(width as f64 - 1.0);
    let min_y = v0.screen_position[1]
        .min(v1.screen_position[1])
        .min(v2.screen_position[1])
        .floor()
        .max(0.0);
    let max_y = v0.screen_position[1]
        .max(v1.screen_position[1])
        .max(v2.screen_position[1])
        .ceil()
        .min(height as f64 - 1.0);
    if min_x > max_x || min_y > max_y {
        return;
    }

    // Precompute area of the triangle; its sign depends on winding
    let area = edge_function(&v0.screen_position, &v1.screen_position, &v2.screen_position);
    if area.abs() <= f64::EPSILON {
        return;
    }

    for y in min_y as usize..=max_y as usize {
        for x in min_x as usize..=max_x as usize {
            let p = [x as f64 + 0.5, y as f64 + 0.5];

            let w0 = edge_function(&v1.screen_position, &v2.screen_position, &p) / area;
            let w1 = edge_function(&v2.screen_position, &v0.screen_position, &p) / area;
            let w2 = edge_function(&v0.screen_position, &v1.screen_position, &p) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let depth = v0.depth * w0 + v1.depth * w1 + v2.depth * w2;
            let offset = y * width + x;
            if depth < frame.depth[offset] {
                frame.depth[offset] = depth;
                let pixel = offset * 4;
                frame.pixels[pixel..pixel + 4]
                    .copy_from_slice(&[color[0], color[1], color[2], 255]);
            }
        }
    }
}
