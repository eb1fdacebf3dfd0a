//! Spinning STL models rendered as ASCII art in the terminal
//!
//! The pipeline is small: an STL mesh is rasterized on the CPU with two
//! lights and a perspective camera, and every frame is re-sampled into
//! glyphs from a density ramp that fill the terminal.

pub mod ascii;
pub mod camera;
pub mod config;
pub mod error;
pub mod graphics;
pub mod host;
pub mod input;
pub mod math;
pub mod model;
pub mod scene;
pub mod state;
pub mod stl;
pub mod surface;
pub mod vertex;
pub mod viewer;

pub use ascii::{GlyphEffect, GlyphOptions, GlyphPass, GLYPH_RAMP};
pub use config::{Color, ViewerConfig};
pub use error::{ConfigError, LoadError, ViewerError};
pub use model::{LoadState, ModelPresenter};
pub use scene::Scene;
pub use stl::{AssetLoader, Mesh, StlLoader};
pub use surface::{MemorySurface, Screen, Surface, TerminalSurface};
pub use viewer::Viewer;
