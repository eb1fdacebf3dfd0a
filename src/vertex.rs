/// Vertex after projection, ready for rasterization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in viewport pixels
    pub screen_position: [f64; 2],
    /// Normalized device depth, -1 at the near plane and 1 at the far plane
    pub depth: f64,
}
