//! Model presenter: asynchronous load, spin and hover

use crate::config::Color;
use crate::error::LoadError;
use crate::graphics::Drawable;
use crate::stl::{AssetLoader, Mesh};
use nalgebra::{Matrix4, Vector3};
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Uniform scale applied while the pointer is over the model
pub const HOVER_SCALE: f64 = 1.35;

/// Spin rate about the vertical axis, radians per second
pub const SPIN_RATE: f64 = 0.5;

/// Pointer shape requested by the presenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorIcon {
    #[default]
    Default,
    Pointer,
}

/// Where the mesh is in its lifecycle
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready(Arc<Mesh>),
    /// Holds the rendered error message
    Failed(String),
}

type LoadResult = Result<Mesh, LoadError>;

/// Owns the model, its rotation and hover state
pub struct ModelPresenter {
    loader: Arc<dyn AssetLoader>,
    path: Option<PathBuf>,
    state: LoadState,
    pending: Option<Receiver<LoadResult>>,
    cache: HashMap<PathBuf, Arc<Mesh>>,
    rotation: f64,
    hovered: bool,
    color: Color,
}

impl ModelPresenter {
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        ModelPresenter {
            loader,
            path: None,
            state: LoadState::Idle,
            pending: None,
            cache: HashMap::new(),
            rotation: 0.0,
            hovered: false,
            color: Color::WHITE,
        }
    }

    /// Starts loading `path` on a background thread
    ///
    /// Paths loaded before resolve immediately from the cache.
    pub fn load(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.pending = None;
        self.path = Some(path.clone());

        if let Some(mesh) = self.cache.get(&path) {
            info!(path = %path.display(), "model served from cache");
            self.state = LoadState::Ready(Arc::clone(mesh));
            return;
        }

        info!(path = %path.display(), "loading model");
        let (tx, rx) = mpsc::channel();
        let loader = Arc::clone(&self.loader);
        thread::spawn(move || {
            // The receiver may be gone if the presenter was unmounted meanwhile
            let _ = tx.send(loader.load(&path));
        });
        self.pending = Some(rx);
        self.state = LoadState::Loading;
    }

    /// Collects a finished load
    ///
    /// Returns true on the call where the mesh becomes ready. A failure is
    /// returned exactly once.
    pub fn poll(&mut self) -> Result<bool, LoadError> {
        let Some(rx) = self.pending.as_ref() else {
            return Ok(false);
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return Ok(false),
            Err(TryRecvError::Disconnected) => Err(LoadError::Disconnected),
        };
        self.pending = None;

        match result {
            Ok(mesh) => {
                let mesh = Arc::new(mesh);
                if let Some(path) = &self.path {
                    info!(path = %path.display(), triangles = mesh.len(), "model ready");
                    self.cache.insert(path.clone(), Arc::clone(&mesh));
                }
                self.state = LoadState::Ready(mesh);
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "model failed to load");
                self.state = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Polls until the load settles or `timeout` passes
    pub fn block_until_loaded(&mut self, timeout: Duration) -> Result<(), LoadError> {
        let started = Instant::now();
        while self.is_loading() {
            self.poll()?;
            if !self.is_loading() {
                break;
            }
            if started.elapsed() >= timeout {
                return Err(LoadError::Timeout {
                    path: self.path.clone().unwrap_or_default(),
                });
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.state {
            LoadState::Ready(mesh) => Some(mesh.as_ref()),
            _ => None,
        }
    }

    /// Advances the spin by `delta` seconds; nothing moves until the mesh is ready
    pub fn update(&mut self, delta: f64) {
        if self.mesh().is_none() {
            return;
        }
        self.rotation = (self.rotation + delta * SPIN_RATE).rem_euclid(TAU);
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn pointer_enter(&mut self) {
        self.hovered = true;
    }

    pub fn pointer_leave(&mut self) {
        self.hovered = false;
    }

    pub fn hovered(&self) -> bool {
        self.hovered
    }

    pub fn scale(&self) -> f64 {
        if self.hovered {
            HOVER_SCALE
        } else {
            1.0
        }
    }

    pub fn cursor(&self) -> CursorIcon {
        if self.hovered {
            CursorIcon::Pointer
        } else {
            CursorIcon::Default
        }
    }

    /// Model matrix: spin about +Y, then uniform scale
    pub fn transform(&self) -> Matrix4<f64> {
        Matrix4::from_axis_angle(&Vector3::y_axis(), self.rotation)
            * Matrix4::new_nonuniform_scaling(&Vector3::repeat(self.scale()))
    }

    pub fn drawable(&self) -> Option<Drawable<'_>> {
        self.mesh().map(|mesh| Drawable {
            mesh,
            transform: self.transform(),
            color: self.color,
        })
    }

    /// Drops the mesh, the cache and any load still in flight
    pub fn unmount(&mut self) {
        self.pending = None;
        self.cache.clear();
        self.state = LoadState::Idle;
        self.hovered = false;
        self.rotation = 0.0;
    }
}
