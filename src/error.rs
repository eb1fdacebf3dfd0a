use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching or parsing a mesh asset
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed STL: {0}")]
    Malformed(String),

    #[error("STL contains no triangles")]
    Empty,

    #[error("mesh loader exited before delivering a result")]
    Disconnected,

    #[error("timed out waiting for {}", path.display())]
    Timeout { path: PathBuf },
}

/// Errors raised while validating viewer configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("resolution must be in [0.05, 1], got {0}")]
    Resolution(f64),

    #[error("unrecognized color '{0}'")]
    Color(String),

    #[error("invalid size '{0}', expected COLSxROWS")]
    Size(String),
}

/// Fatal errors surfaced by the viewer to its host
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("model load failed: {0}")]
    Load(#[from] LoadError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}
