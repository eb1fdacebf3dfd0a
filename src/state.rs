use std::time::Instant;

/// Viewer-wide presentation state
#[derive(Debug, Clone)]
pub struct ViewerState {
    /// Show the debug status line
    pub debug: bool,
    /// Frames per second over the last full second
    pub fps: f64,
    frames_since_last_update: usize,
    last_fps_calculation: Instant,
}

impl ViewerState {
    pub fn new() -> Self {
        ViewerState {
            debug: false,
            fps: 0.0,
            frames_since_last_update: 0,
            last_fps_calculation: Instant::now(),
        }
    }

    /// Counts a frame and refreshes the FPS estimate once per second
    pub fn record_frame(&mut self) {
        self.frames_since_last_update += 1;
        let now = Instant::now();
        let duration = now.duration_since(self.last_fps_calculation);
        if duration.as_secs_f64() >= 1.0 {
            self.fps = self.frames_since_last_update as f64 / duration.as_secs_f64();
            self.frames_since_last_update = 0;
            self.last_fps_calculation = now;
        }
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}
