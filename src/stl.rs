//! STL mesh assets
//!
//! Both the binary and the ASCII flavours of STL are accepted. Detection
//! follows the usual heuristic: a file whose length matches the triangle
//! count in its binary header is binary, otherwise a leading `solid` keyword
//! marks it as ASCII.

use crate::error::LoadError;
use crate::math::calculate_normal;
use nalgebra::{Point3, Vector3};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const BINARY_HEADER_LEN: usize = 80;
const BINARY_FACE_LEN: usize = 50;

/// A single flat face
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f64>; 3],
    /// Unit face normal, zero for degenerate faces
    pub normal: Vector3<f64>,
}

impl Triangle {
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Triangle {
            vertices: [a, b, c],
            normal: calculate_normal(&a, &b, &c),
        }
    }
}

/// Immutable triangle soup loaded from an asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Mesh { triangles }
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(size: f64) -> Self {
        let h = size / 2.0;
        let p = |x: f64, y: f64, z: f64| Point3::new(x * h, y * h, z * h);
        let corners = [
            p(-1.0, -1.0, -1.0),
            p(1.0, -1.0, -1.0),
            p(1.0, 1.0, -1.0),
            p(-1.0, 1.0, -1.0),
            p(-1.0, -1.0, 1.0),
            p(1.0, -1.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(-1.0, 1.0, 1.0),
        ];
        let faces = [
            (0, 3, 2, 1),
            (4, 5, 6, 7),
            (0, 4, 7, 3),
            (1, 2, 6, 5),
            (0, 1, 5, 4),
            (3, 7, 6, 2),
        ];
        let mut triangles = Vec::with_capacity(12);
        for &(a, b, c, d) in faces.iter() {
            triangles.push(Triangle::new(corners[a], corners[b], corners[c]));
            triangles.push(Triangle::new(corners[a], corners[c], corners[d]));
        }
        Mesh { triangles }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Minimum and maximum corners of the bounding box
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut points = self.triangles.iter().flat_map(|t| t.vertices.iter());
        let first = *points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        }))
    }

    /// Returns a copy centered on the origin whose farthest vertex sits at `radius`
    pub fn fitted(&self, radius: f64) -> Mesh {
        let Some((min, max)) = self.bounds() else {
            return self.clone();
        };
        let center = nalgebra::center(&min, &max);
        let extent = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .map(|p| (p - center).norm())
            .fold(0.0_f64, f64::max);
        let scale = if extent > 0.0 { radius / extent } else { 1.0 };

        let triangles = self
            .triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t
                    .vertices
                    .map(|p| Point3::from((p - center) * scale));
                Triangle {
                    vertices: [a, b, c],
                    normal: t.normal,
                }
            })
            .collect();
        Mesh { triangles }
    }
}

/// Anything able to produce a mesh from a path
///
/// Loading runs off the frame loop, so implementations must be shareable
/// across threads.
pub trait AssetLoader: Send + Sync + 'static {
    fn load(&self, path: &Path) -> Result<Mesh, LoadError>;
}

/// Loads STL files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct StlLoader {
    fit: bool,
}

impl StlLoader {
    pub fn new(fit: bool) -> Self {
        StlLoader { fit }
    }
}

impl AssetLoader for StlLoader {
    fn load(&self, path: &Path) -> Result<Mesh, LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mesh = parse_stl(&bytes)?;
        info!(path = %path.display(), triangles = mesh.len(), "parsed STL");
        Ok(if self.fit { mesh.fitted(1.0) } else { mesh })
    }
}

/// Parses an STL document, binary or ASCII
pub fn parse_stl(bytes: &[u8]) -> Result<Mesh, LoadError> {
    let mesh = if is_binary(bytes) {
        debug!(len = bytes.len(), "decoding binary STL");
        parse_binary(bytes)?
    } else {
        debug!(len = bytes.len(), "decoding ASCII STL");
        let text = std::str::from_utf8(bytes)
            .map_err(|e| LoadError::Malformed(format!("ASCII STL is not UTF-8: {e}")))?;
        parse_ascii(text)?
    };

    if mesh.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(mesh)
}

fn is_binary(bytes: &[u8]) -> bool {
    if let Some(count) = face_count(bytes) {
        let expected = BINARY_HEADER_LEN + 4 + count as usize * BINARY_FACE_LEN;
        if expected == bytes.len() {
            return true;
        }
    }

    // Binary headers may also begin with "solid"; the size check takes precedence
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    !bytes[start..].starts_with(b"solid")
}

fn face_count(bytes: &[u8]) -> Option<u32> {
    let raw = bytes.get(BINARY_HEADER_LEN..BINARY_HEADER_LEN + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn parse_binary(bytes: &[u8]) -> Result<Mesh, LoadError> {
    let count = face_count(bytes)
        .ok_or_else(|| LoadError::Malformed("binary header is truncated".into()))?
        as usize;
    let body = &bytes[BINARY_HEADER_LEN + 4..];
    if body.len() < count * BINARY_FACE_LEN {
        return Err(LoadError::Malformed(format!(
            "header declares {count} faces but only {} bytes follow",
            body.len()
        )));
    }

    let read_f32 = |chunk: &[u8], at: usize| {
        f32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]]) as f64
    };
    let read_point = |chunk: &[u8], at: usize| {
        Point3::new(
            read_f32(chunk, at),
            read_f32(chunk, at + 4),
            read_f32(chunk, at + 8),
        )
    };

    let triangles = body
        .chunks_exact(BINARY_FACE_LEN)
        .take(count)
        .map(|face| {
            // Bytes 0..12 hold the stored normal, which flat shading ignores
            let a = read_point(face, 12);
            let b = read_point(face, 24);
            let c = read_point(face, 36);
            Triangle::new(a, b, c)
        })
        .collect();
    Ok(Mesh::new(triangles))
}

fn parse_ascii(text: &str) -> Result<Mesh, LoadError> {
    let mut tokens = text.split_whitespace();
    let mut corners: Vec<Point3<f64>> = Vec::with_capacity(3);
    let mut triangles = Vec::new();

    let next_float = |tokens: &mut std::str::SplitWhitespace<'_>| -> Result<f64, LoadError> {
        let token = tokens
            .next()
            .ok_or_else(|| LoadError::Malformed("unexpected end of vertex".into()))?;
        token
            .parse::<f64>()
            .map_err(|_| LoadError::Malformed(format!("invalid coordinate '{token}'")))
    };

    while let Some(token) = tokens.next() {
        match token {
            "vertex" => {
                let x = next_float(&mut tokens)?;
                let y = next_float(&mut tokens)?;
                let z = next_float(&mut tokens)?;
                corners.push(Point3::new(x, y, z));
                if corners.len() == 3 {
                    triangles.push(Triangle::new(corners[0], corners[1], corners[2]));
                    corners.clear();
                }
            }
            "endfacet" if !corners.is_empty() => {
                return Err(LoadError::Malformed(format!(
                    "facet closed after {} vertices",
                    corners.len()
                )));
            }
            _ => {}
        }
    }

    if !corners.is_empty() {
        return Err(LoadError::Malformed("trailing incomplete facet".into()));
    }
    Ok(Mesh::new(triangles))
}
