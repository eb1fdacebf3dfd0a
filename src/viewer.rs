//! Application context
//!
//! A [`Viewer`] is built explicitly, driven one tick at a time by its host
//! and torn down with [`Viewer::unmount`]. Each tick renders the scene once
//! into the raw target and then converts that frame into glyphs.

use crate::ascii::{GlyphOptions, GlyphPass};
use crate::config::{validate_resolution, Color, ViewerConfig};
use crate::error::{ConfigError, ViewerError};
use crate::graphics::Renderer;
use crate::host::{ElementId, ElementKind, Host};
use crate::input::Action;
use crate::model::{CursorIcon, ModelPresenter};
use crate::scene::Scene;
use crate::state::ViewerState;
use crate::stl::AssetLoader;
use crate::surface::{Screen, Surface};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the container the viewer mounts into
pub const MOUNT_POINT: &str = "root";

/// Shown instead of the model while it loads
pub const PLACEHOLDER_TEXT: &str = "loading...";

/// Orbit step for one arrow key press, in radians
const ORBIT_STEP: f64 = 0.1;

pub struct Viewer<S: Surface> {
    config: ViewerConfig,
    host: Host,
    surface: S,
    scene: Scene,
    renderer: Renderer,
    presenter: ModelPresenter,
    glyphs: GlyphPass,
    state: ViewerState,
    canvas: Option<ElementId>,
    placeholder: Option<ElementId>,
    cells: (u16, u16),
    last_pointer: Option<(u16, u16)>,
    mounted: bool,
}

impl<S: Surface> Viewer<S> {
    /// Bootstraps the scene, mounts the glyph overlay and starts the model load
    pub fn new(
        config: ViewerConfig,
        surface: S,
        loader: Arc<dyn AssetLoader>,
    ) -> Result<Self, ViewerError> {
        let config = config.validate()?;
        let (cols, rows) = surface.size()?;

        let mut host = Host::new(MOUNT_POINT);
        let canvas = host.append(ElementKind::Canvas);
        let scene = Scene::bootstrap();
        let renderer = Renderer::new(0, 0);

        let mut glyphs = GlyphPass::new(
            GlyphOptions {
                invert: true,
                resolution: config.resolution,
            },
            config.background,
            config.foreground,
        );
        glyphs.mount(&mut host, &renderer);

        let mut presenter = ModelPresenter::new(loader);
        presenter.load(config.model_path.clone());

        let mut viewer = Viewer {
            config,
            host,
            surface,
            scene,
            renderer,
            presenter,
            glyphs,
            state: ViewerState::new(),
            canvas: Some(canvas),
            placeholder: None,
            cells: (cols, rows),
            last_pointer: None,
            mounted: true,
        };
        viewer.sync_placeholder();
        viewer.resize_cells(cols, rows);
        info!(
            mount = MOUNT_POINT,
            model = %viewer.config.model_path.display(),
            cols,
            rows,
            "viewer mounted"
        );
        Ok(viewer)
    }

    /// Advances one frame by `delta` seconds and presents it
    pub fn tick(&mut self, delta: f64) -> Result<(), ViewerError> {
        if !self.mounted {
            return Ok(());
        }
        self.state.record_frame();

        // A mesh that arrives this tick is shown unrotated
        let polled = self.presenter.poll();
        self.sync_placeholder();
        if !polled? {
            self.presenter.update(delta);
        }

        self.scene.update_camera();
        let drawable = self.presenter.drawable();
        self.renderer.render(&self.scene, drawable.as_ref());
        self.glyphs.render(&self.renderer);

        let screen = self.screen();
        self.surface.present(&screen)?;
        Ok(())
    }

    /// Applies one input action; returns false when the user asked to quit
    pub fn handle(&mut self, action: Action) -> Result<bool, ViewerError> {
        match action {
            Action::Quit => return Ok(false),
            Action::ResetCamera => self.scene.controls.reset(),
            Action::ToggleDebug => {
                self.state.debug = !self.state.debug;
                let (cols, rows) = self.cells;
                self.resize_cells(cols, rows);
            }
            Action::OrbitLeft => self.scene.controls.rotate_left(ORBIT_STEP),
            Action::OrbitRight => self.scene.controls.rotate_left(-ORBIT_STEP),
            Action::OrbitUp => self.scene.controls.rotate_up(ORBIT_STEP),
            Action::OrbitDown => self.scene.controls.rotate_up(-ORBIT_STEP),
            Action::ZoomIn => {
                self.scene.controls.zoom_in();
            }
            Action::ZoomOut => {
                self.scene.controls.zoom_out();
            }
            Action::PointerMove { col, row } => self.pointer_move(col, row)?,
            Action::PointerDown { col, row } => self.last_pointer = Some((col, row)),
            Action::Drag { col, row } => self.drag(col, row),
            Action::PanDrag { col, row } => self.pan_drag(col, row),
            Action::PointerUp | Action::None => {}
            Action::PointerLeave => self.pointer_leave()?,
            Action::Resize { cols, rows } => self.resize_cells(cols, rows),
        }
        Ok(true)
    }

    /// Resizes to fill a terminal of `cols` by `rows` cells
    pub fn resize_cells(&mut self, cols: u16, rows: u16) {
        self.cells = (cols, rows);
        let rows = if self.state.debug {
            rows.saturating_sub(1)
        } else {
            rows
        };
        // One glyph column per cell, two sampled rows per cell
        let resolution = self.config.resolution;
        let width = (cols as f64 / resolution).round() as usize;
        let height = (2.0 * rows as f64 / resolution).round() as usize;
        self.resize(width, height);
    }

    /// Resizes the viewport in pixels
    pub fn resize(&mut self, width: usize, height: usize) {
        if !self.mounted {
            return;
        }
        self.glyphs.set_size(&mut self.renderer, width, height);
        self.scene.camera.set_viewport(width, height);
        debug!(width, height, "viewport resized");
    }

    /// Restyles the overlay without rebuilding the glyph effect
    pub fn set_colors(&mut self, background: Color, foreground: Color) {
        self.config.background = background;
        self.config.foreground = foreground;
        self.glyphs.set_colors(background, foreground);
    }

    /// Changes glyph density; the effect is rebuilt
    pub fn set_resolution(&mut self, resolution: f64) -> Result<(), ConfigError> {
        let resolution = validate_resolution(resolution)?;
        self.config.resolution = resolution;
        self.glyphs.set_resolution(&self.renderer, resolution);
        let (cols, rows) = self.cells;
        self.resize_cells(cols, rows);
        Ok(())
    }

    /// Hover tracking against the coverage of the last rendered frame
    pub fn pointer_move(&mut self, col: u16, row: u16) -> Result<(), ViewerError> {
        self.last_pointer = Some((col, row));
        let over = self.hit_test(col, row);
        if over != self.presenter.hovered() {
            if over {
                self.presenter.pointer_enter();
            } else {
                self.presenter.pointer_leave();
            }
            debug!(col, row, hovered = over, "hover changed");
        }
        self.surface.set_cursor(self.presenter.cursor())?;
        Ok(())
    }

    pub fn pointer_leave(&mut self) -> Result<(), ViewerError> {
        self.last_pointer = None;
        self.presenter.pointer_leave();
        self.surface.set_cursor(self.presenter.cursor())?;
        Ok(())
    }

    /// Orbits by the pointer travel since the last pointer event
    pub fn drag(&mut self, col: u16, row: u16) {
        let Some((dx, dy)) = self.pointer_delta(col, row) else {
            return;
        };
        let height = self.renderer.size().1;
        self.scene.controls.rotate(dx, dy, height);
    }

    /// Pans by the pointer travel; a no-op while the controls disallow panning
    pub fn pan_drag(&mut self, col: u16, row: u16) {
        let Some((dx, dy)) = self.pointer_delta(col, row) else {
            return;
        };
        let height = self.renderer.size().1;
        if !self.scene.controls.pan(dx, dy, &self.scene.camera, height) {
            debug!("pan ignored");
        }
    }

    /// Pointer travel in viewport pixels since the previous pointer event
    fn pointer_delta(&mut self, col: u16, row: u16) -> Option<(f64, f64)> {
        let (prev_col, prev_row) = self.last_pointer.replace((col, row))?;
        let (text_cols, text_rows) = self.text_size()?;
        let (width, height) = self.renderer.size();
        Some((
            (col as f64 - prev_col as f64) * width as f64 / text_cols as f64,
            (row as f64 - prev_row as f64) * height as f64 / text_rows as f64,
        ))
    }

    /// Waits for the model load to settle
    pub fn wait_for_model(&mut self, timeout: Duration) -> Result<(), ViewerError> {
        self.presenter.block_until_loaded(timeout)?;
        self.sync_placeholder();
        Ok(())
    }

    /// Tears everything down; later ticks do nothing
    pub fn unmount(&mut self) -> Result<(), ViewerError> {
        if !self.mounted {
            return Ok(());
        }
        self.glyphs.unmount(&mut self.host);
        self.presenter.unmount();
        if let Some(id) = self.placeholder.take() {
            self.host.remove(id);
        }
        if let Some(id) = self.canvas.take() {
            self.host.remove(id);
        }
        self.mounted = false;
        self.surface.set_cursor(CursorIcon::Default)?;
        info!(mount = MOUNT_POINT, "viewer unmounted");
        Ok(())
    }

    /// Composes what should be visible right now
    pub fn screen(&self) -> Screen {
        let (background, foreground) = match self.glyphs.overlay() {
            Some(overlay) => (overlay.style.background, overlay.style.color),
            None => (self.config.background, self.config.foreground),
        };
        let lines = if self.placeholder.is_some() {
            vec![PLACEHOLDER_TEXT.to_string()]
        } else {
            self.glyphs
                .overlay()
                .map(|overlay| overlay.lines().to_vec())
                .unwrap_or_default()
        };
        Screen {
            lines,
            foreground,
            background,
            status: self.state.debug.then(|| self.status_line()),
        }
    }

    fn status_line(&self) -> String {
        format!(
            "{} {} | FPS: {:.1} | Angle: {:.2} | Distance: {:.1} | {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            self.state.fps,
            self.presenter.rotation(),
            self.scene.controls.distance(),
            if self.presenter.hovered() { "hover" } else { "-" },
        )
    }

    fn sync_placeholder(&mut self) {
        match (self.presenter.is_loading(), self.placeholder) {
            (true, None) => {
                self.placeholder = Some(self.host.append(ElementKind::Placeholder));
            }
            (false, Some(id)) => {
                self.host.remove(id);
                self.placeholder = None;
            }
            _ => {}
        }
    }

    fn text_size(&self) -> Option<(usize, usize)> {
        let (cols, rows) = self.glyphs.effect()?.text_size();
        (cols > 0 && rows > 0).then_some((cols, rows))
    }

    fn hit_test(&self, col: u16, row: u16) -> bool {
        if self.presenter.mesh().is_none() {
            return false;
        }
        let Some(effect) = self.glyphs.effect() else {
            return false;
        };
        let (text_cols, text_rows) = effect.text_size();
        if col as usize >= text_cols || row as usize >= text_rows {
            return false;
        }
        let (x, y) = cell_pixel(col, row, effect.grid(), self.renderer.size());
        self.renderer.frame().covers(x, y)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn presenter(&self) -> &ModelPresenter {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut ModelPresenter {
        &mut self.presenter
    }

    pub fn glyphs(&self) -> &GlyphPass {
        &self.glyphs
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

/// Center pixel of the grid cell a text cell displays
///
/// Text row `r` shows grid row `2r`; the odd grid rows are never sampled.
fn cell_pixel(
    col: u16,
    row: u16,
    (grid_cols, grid_rows): (usize, usize),
    (width, height): (usize, usize),
) -> (usize, usize) {
    let x = (col as f64 + 0.5) * width as f64 / grid_cols as f64;
    let y = (2.0 * row as f64 + 0.5) * height as f64 / grid_rows as f64;
    (x as usize, y as usize)
}
