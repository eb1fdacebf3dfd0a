use approx::assert_relative_eq;
use asciimesh::config::MIN_RESOLUTION;
use asciimesh::error::{ConfigError, LoadError, ViewerError};
use asciimesh::host::ElementKind;
use asciimesh::input::Action;
use asciimesh::model::{CursorIcon, HOVER_SCALE};
use asciimesh::viewer::PLACEHOLDER_TEXT;
use asciimesh::{AssetLoader, Color, MemorySurface, Mesh, StlLoader, Viewer, ViewerConfig};
use std::f64::consts::TAU;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const FRAME: f64 = 1.0 / 60.0;
const WAIT: Duration = Duration::from_secs(5);

struct CubeLoader;

impl AssetLoader for CubeLoader {
    fn load(&self, _path: &Path) -> Result<Mesh, LoadError> {
        Ok(Mesh::cube(2.0))
    }
}

/// Blocks until the test releases it
struct GatedLoader {
    gate: Mutex<Receiver<()>>,
}

impl GatedLoader {
    fn new() -> (Sender<()>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, GatedLoader { gate: Mutex::new(rx) })
    }
}

impl AssetLoader for GatedLoader {
    fn load(&self, _path: &Path) -> Result<Mesh, LoadError> {
        if let Ok(gate) = self.gate.lock() {
            let _ = gate.recv();
        }
        Ok(Mesh::cube(2.0))
    }
}

struct BrokenLoader;

impl AssetLoader for BrokenLoader {
    fn load(&self, _path: &Path) -> Result<Mesh, LoadError> {
        Err(LoadError::Malformed("truncated facet".into()))
    }
}

fn viewer_with(loader: impl AssetLoader) -> Viewer<MemorySurface> {
    Viewer::new(
        ViewerConfig::default(),
        MemorySurface::new(80, 24),
        Arc::new(loader),
    )
    .unwrap()
}

/// A mounted viewer with the cube loaded and one frame rendered
fn ready_viewer() -> Viewer<MemorySurface> {
    let mut viewer = viewer_with(CubeLoader);
    viewer.wait_for_model(WAIT).unwrap();
    viewer.tick(0.0).unwrap();
    viewer
}

fn ascii_stl(mesh: &Mesh) -> String {
    let mut out = String::from("solid cube\n");
    for triangle in mesh.triangles() {
        out.push_str("  facet normal 0 0 0\n    outer loop\n");
        for v in &triangle.vertices {
            out.push_str(&format!("      vertex {} {} {}\n", v.x, v.y, v.z));
        }
        out.push_str("    endloop\n  endfacet\n");
    }
    out.push_str("endsolid cube\n");
    out
}

#[test]
fn placeholder_is_shown_while_loading() {
    let (release, loader) = GatedLoader::new();
    let mut viewer = viewer_with(loader);

    viewer.tick(FRAME).unwrap();
    viewer.tick(FRAME).unwrap();
    let screen = viewer.surface().last().unwrap();
    assert_eq!(screen.visible_text(), PLACEHOLDER_TEXT);
    assert!(viewer.presenter().is_loading());
    assert_eq!(viewer.host().count(ElementKind::Placeholder), 1);
    assert_eq!(viewer.presenter().rotation(), 0.0);

    release.send(()).unwrap();
    viewer.wait_for_model(WAIT).unwrap();
    assert_eq!(viewer.host().count(ElementKind::Placeholder), 0);
    assert!(viewer.presenter().mesh().is_some());
    assert_eq!(viewer.presenter().scale(), 1.0);
    assert_eq!(viewer.presenter().rotation(), 0.0);

    viewer.tick(FRAME).unwrap();
    let screen = viewer.surface().last().unwrap();
    assert!(!screen.visible_text().is_empty());
    assert_ne!(screen.visible_text(), PLACEHOLDER_TEXT);
}

#[test]
fn mesh_arriving_mid_tick_starts_unrotated() {
    let mut viewer = viewer_with(CubeLoader);
    for _ in 0..5000 {
        viewer.tick(0.5).unwrap();
        if viewer.presenter().mesh().is_some() {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(viewer.presenter().mesh().is_some());
    assert_eq!(viewer.presenter().rotation(), 0.0);
}

#[test]
fn two_seconds_of_ticks_turn_one_radian() {
    let mut viewer = viewer_with(CubeLoader);
    viewer.wait_for_model(WAIT).unwrap();
    for _ in 0..120 {
        viewer.tick(FRAME).unwrap();
    }
    assert_relative_eq!(viewer.presenter().rotation(), 1.0, epsilon = 1e-9);
    assert_eq!(viewer.renderer().frames_rendered(), 120);
    assert_eq!(viewer.glyphs().render_count(), 120);
    assert_eq!(viewer.surface().presented(), 120);
}

#[test]
fn resize_reaches_overlay_and_effect() {
    let mut viewer = ready_viewer();
    assert_eq!(viewer.renderer().size(), (400, 240));
    assert_eq!(viewer.glyphs().effect().unwrap().text_size(), (80, 24));

    viewer.handle(Action::Resize { cols: 100, rows: 30 }).unwrap();
    assert_eq!(viewer.renderer().size(), (500, 300));
    assert_eq!(viewer.glyphs().overlay().unwrap().size(), (500, 300));
    assert_eq!(viewer.glyphs().effect().unwrap().grid(), (100, 60));
    assert_relative_eq!(viewer.scene().camera.aspect, 500.0 / 300.0);

    viewer.tick(FRAME).unwrap();
    let screen = viewer.surface().last().unwrap();
    assert_eq!(screen.lines.len(), 30);
    assert!(screen.lines.iter().all(|line| line.chars().count() == 100));
}

#[test]
fn debug_status_takes_one_row() {
    let mut viewer = ready_viewer();
    viewer.handle(Action::ToggleDebug).unwrap();
    viewer.tick(FRAME).unwrap();

    let screen = viewer.surface().last().unwrap();
    assert_eq!(screen.lines.len(), 23);
    let status = screen.status.as_deref().unwrap();
    assert!(status.contains("FPS"));
    assert!(status.contains(env!("CARGO_PKG_VERSION")));

    viewer.handle(Action::ToggleDebug).unwrap();
    viewer.tick(FRAME).unwrap();
    assert!(viewer.surface().last().unwrap().status.is_none());
}

#[test]
fn color_change_keeps_effect() {
    let mut viewer = ready_viewer();
    let id = viewer.glyphs().effect().unwrap().id();

    let blue = Color::rgb(0, 0, 255);
    let red = Color::rgb(255, 0, 0);
    viewer.set_colors(blue, red);
    assert_eq!(viewer.glyphs().effect().unwrap().id(), id);

    let style = &viewer.glyphs().overlay().unwrap().style;
    assert_eq!(style.background, blue);
    assert_eq!(style.color, red);

    viewer.tick(FRAME).unwrap();
    let screen = viewer.surface().last().unwrap();
    assert_eq!(screen.background, blue);
    assert_eq!(screen.foreground, red);
}

#[test]
fn resolution_change_rebuilds_effect() {
    let mut viewer = ready_viewer();
    let id = viewer.glyphs().effect().unwrap().id();

    viewer.set_resolution(0.5).unwrap();
    let effect = viewer.glyphs().effect().unwrap();
    assert_ne!(effect.id(), id);
    assert_eq!(effect.text_size(), (80, 24));

    assert_eq!(
        viewer.set_resolution(1.5),
        Err(ConfigError::Resolution(1.5))
    );
    assert_eq!(viewer.config().resolution, 0.5);
}

#[test]
fn hover_scales_model_and_sets_pointer() {
    let mut viewer = ready_viewer();

    viewer.handle(Action::PointerMove { col: 40, row: 12 }).unwrap();
    assert!(viewer.presenter().hovered());
    assert_relative_eq!(viewer.presenter().scale(), HOVER_SCALE);
    assert_eq!(viewer.surface().cursor(), CursorIcon::Pointer);

    // Repeated moves over the model change nothing
    viewer.handle(Action::PointerMove { col: 41, row: 12 }).unwrap();
    assert_relative_eq!(viewer.presenter().scale(), HOVER_SCALE);

    viewer.handle(Action::PointerMove { col: 0, row: 0 }).unwrap();
    assert!(!viewer.presenter().hovered());
    assert_eq!(viewer.presenter().scale(), 1.0);
    assert_eq!(viewer.surface().cursor(), CursorIcon::Default);

    viewer.handle(Action::PointerMove { col: 40, row: 12 }).unwrap();
    viewer.handle(Action::PointerLeave).unwrap();
    assert_eq!(viewer.presenter().scale(), 1.0);
    assert_eq!(viewer.surface().cursor(), CursorIcon::Default);
}

#[test]
fn zoom_is_clamped_and_pan_ignored() {
    let mut viewer = ready_viewer();

    for _ in 0..50 {
        viewer.handle(Action::ZoomIn).unwrap();
    }
    assert_relative_eq!(viewer.scene().controls.distance(), 5.0);

    for _ in 0..500 {
        viewer.handle(Action::ZoomOut).unwrap();
    }
    assert_relative_eq!(viewer.scene().controls.distance(), 200.0);

    let target = viewer.scene().controls.target;
    viewer.handle(Action::PointerDown { col: 40, row: 12 }).unwrap();
    viewer.handle(Action::PanDrag { col: 60, row: 20 }).unwrap();
    viewer.tick(FRAME).unwrap();
    assert_eq!(viewer.scene().controls.target, target);
    assert_eq!(viewer.scene().camera.target, target);
}

#[test]
fn drag_orbit_is_damped_across_ticks() {
    let mut viewer = ready_viewer();
    let azimuth = viewer.scene().controls.azimuth();

    // Ten columns over a 400x240 viewport of 80 columns is 50 pixels
    viewer.handle(Action::PointerDown { col: 40, row: 12 }).unwrap();
    viewer.handle(Action::Drag { col: 50, row: 12 }).unwrap();
    assert_relative_eq!(viewer.scene().controls.azimuth(), azimuth);

    let turn = TAU * 50.0 / 240.0;
    viewer.tick(FRAME).unwrap();
    let first = viewer.scene().controls.azimuth();
    assert_relative_eq!(first, (azimuth - turn * 0.05).rem_euclid(TAU), epsilon = 1e-9);

    for _ in 0..300 {
        viewer.tick(FRAME).unwrap();
    }
    assert_relative_eq!(
        viewer.scene().controls.azimuth(),
        (azimuth - turn).rem_euclid(TAU),
        epsilon = 1e-6
    );

    viewer.handle(Action::ResetCamera).unwrap();
    viewer.tick(FRAME).unwrap();
    assert_relative_eq!(viewer.scene().controls.azimuth(), azimuth);
}

#[test]
fn resolution_below_the_floor_is_rejected() {
    let config = ViewerConfig {
        resolution: 1e-9,
        ..ViewerConfig::default()
    };
    let result = Viewer::new(config, MemorySurface::new(80, 24), Arc::new(CubeLoader));
    assert!(matches!(
        result,
        Err(ViewerError::Config(ConfigError::Resolution(_)))
    ));

    let mut viewer = ready_viewer();
    assert_eq!(
        viewer.set_resolution(0.01),
        Err(ConfigError::Resolution(0.01))
    );
    assert_eq!(viewer.renderer().size(), (400, 240));
}

#[test]
fn densest_resolution_stays_bounded() {
    let config = ViewerConfig {
        resolution: MIN_RESOLUTION,
        ..ViewerConfig::default()
    };
    let mut viewer =
        Viewer::new(config, MemorySurface::new(80, 24), Arc::new(CubeLoader)).unwrap();
    assert_eq!(viewer.renderer().size(), (1600, 960));
    viewer.wait_for_model(WAIT).unwrap();
    viewer.tick(FRAME).unwrap();
    assert_eq!(viewer.surface().last().unwrap().lines.len(), 24);
}

#[test]
fn unmount_stops_rendering() {
    let mut viewer = ready_viewer();
    viewer.handle(Action::PointerMove { col: 40, row: 12 }).unwrap();
    viewer.unmount().unwrap();

    assert!(!viewer.is_mounted());
    assert!(viewer.glyphs().overlay().is_none());
    assert!(viewer.host().is_empty());
    assert!(viewer.presenter().mesh().is_none());
    assert_eq!(viewer.surface().cursor(), CursorIcon::Default);

    let renders = viewer.glyphs().render_count();
    let presented = viewer.surface().presented();
    let frames = viewer.renderer().frames_rendered();
    for _ in 0..10 {
        viewer.tick(FRAME).unwrap();
    }
    assert_eq!(viewer.glyphs().render_count(), renders);
    assert_eq!(viewer.surface().presented(), presented);
    assert_eq!(viewer.renderer().frames_rendered(), frames);

    // A second unmount is harmless
    viewer.unmount().unwrap();
}

#[test]
fn load_failure_surfaces_from_tick() {
    let mut viewer = viewer_with(BrokenLoader);
    let mut failure = None;
    for _ in 0..5000 {
        if let Err(e) = viewer.tick(FRAME) {
            failure = Some(e);
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(matches!(
        failure,
        Some(ViewerError::Load(LoadError::Malformed(_)))
    ));
    assert_eq!(viewer.host().count(ElementKind::Placeholder), 0);

    // Reported once; the viewer keeps running without a model
    viewer.tick(FRAME).unwrap();
    assert!(viewer.presenter().mesh().is_none());
}

#[test]
fn renders_stl_file_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".stl").tempfile().unwrap();
    file.write_all(ascii_stl(&Mesh::cube(10.0)).as_bytes()).unwrap();

    let config = ViewerConfig {
        model_path: file.path().to_path_buf(),
        fit: true,
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new(
        config,
        MemorySurface::new(60, 20),
        Arc::new(StlLoader::new(true)),
    )
    .unwrap();
    viewer.wait_for_model(WAIT).unwrap();
    assert_eq!(viewer.presenter().mesh().unwrap().len(), 12);

    viewer.tick(FRAME).unwrap();
    let screen = viewer.surface().last().unwrap();
    assert_eq!(screen.lines.len(), 20);
    assert!(!screen.visible_text().is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ViewerConfig {
        model_path: dir.path().join("missing.stl"),
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new(
        config,
        MemorySurface::new(80, 24),
        Arc::new(StlLoader::default()),
    )
    .unwrap();
    let err = viewer.wait_for_model(WAIT).unwrap_err();
    assert!(matches!(err, ViewerError::Load(LoadError::Io { .. })));
}
