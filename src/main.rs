use anyhow::{Context, Result};
use asciimesh::config::{parse_size, DEFAULT_MODEL_PATH, DEFAULT_RESOLUTION};
use asciimesh::input::parse_event;
use asciimesh::{
    AssetLoader, Color, MemorySurface, StlLoader, TerminalSurface, Viewer, ViewerConfig,
};
use clap::Parser;
use crossterm::event;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Target time between interactive frames
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Simulated frame length for headless runs
const HEADLESS_DELTA: f64 = 1.0 / 60.0;

/// How long a headless run waits for the model
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback when the terminal size cannot be detected
const FALLBACK_SIZE: (u16, u16) = (80, 24);

#[derive(Parser, Debug)]
#[command(name = "asciimesh")]
#[command(about = "Spin an STL model as ASCII art in the terminal")]
#[command(version)]
struct Args {
    /// STL file to display
    #[arg(default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Glyph density relative to viewport pixels, in [0.05, 1]
    #[arg(short, long, default_value_t = DEFAULT_RESOLUTION)]
    resolution: f64,

    /// Glyph color (name, #rgb or #rrggbb)
    #[arg(long, default_value = "white")]
    fg: Color,

    /// Background color (name, #rgb or #rrggbb)
    #[arg(long, default_value = "black")]
    bg: Color,

    /// Recenter and rescale the model to fit the view
    #[arg(long)]
    fit: bool,

    /// Render this many frames without a terminal and print the last one
    #[arg(long, value_name = "FRAMES", value_parser = clap::value_parser!(u32).range(1..))]
    headless: Option<u32>,

    /// Headless canvas size as COLSxROWS
    #[arg(long, value_parser = parse_size)]
    size: Option<(u16, u16)>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let config = ViewerConfig {
        model_path: args.model.clone(),
        resolution: args.resolution,
        foreground: args.fg,
        background: args.bg,
        fit: args.fit,
    }
    .validate()?;
    info!(
        model = %config.model_path.display(),
        resolution = config.resolution,
        "{} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let loader: Arc<dyn AssetLoader> = Arc::new(StlLoader::new(config.fit));
    match args.headless {
        Some(frames) => run_headless(config, loader, frames, args.size),
        None => run_interactive(config, loader),
    }
}

/// Logs go to a file when asked, to stderr in headless runs and nowhere
/// while the terminal is taken over
fn init_tracing(args: &Args) -> Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level))
    };

    if let Some(path) = &args.log_file {
        let file = open_log(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if args.headless.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn open_log(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("failed to create log file {}", path.display()))
}

fn run_interactive(config: ViewerConfig, loader: Arc<dyn AssetLoader>) -> Result<()> {
    let surface = TerminalSurface::new().context("failed to prepare the terminal")?;
    let mut viewer = Viewer::new(config, surface, loader)?;

    let mut last_frame = Instant::now();
    'running: loop {
        // Drain input until the next frame is due
        while let Some(remaining) = FRAME_TIME.checked_sub(last_frame.elapsed()) {
            if !event::poll(remaining)? {
                break;
            }
            if !viewer.handle(parse_event(event::read()?))? {
                break 'running;
            }
        }

        let now = Instant::now();
        let delta = now.duration_since(last_frame).as_secs_f64();
        last_frame = now;
        viewer.tick(delta)?;
    }

    viewer.unmount()?;
    info!("viewer closed");
    Ok(())
}

fn run_headless(
    config: ViewerConfig,
    loader: Arc<dyn AssetLoader>,
    frames: u32,
    size: Option<(u16, u16)>,
) -> Result<()> {
    let (cols, rows) = size
        .or_else(|| termsize::get().map(|size| (size.cols, size.rows)))
        .unwrap_or(FALLBACK_SIZE);
    let path = config.model_path.clone();

    let mut viewer = Viewer::new(config, MemorySurface::new(cols, rows), loader)?;
    viewer
        .wait_for_model(LOAD_TIMEOUT)
        .with_context(|| format!("failed to load {}", path.display()))?;
    for _ in 0..frames {
        viewer.tick(HEADLESS_DELTA)?;
    }
    info!(frames, cols, rows, "headless run finished");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(screen) = viewer.surface().last() {
        for line in &screen.lines {
            writeln!(out, "{line}")?;
        }
    }
    out.flush()?;

    viewer.unmount()?;
    Ok(())
}
