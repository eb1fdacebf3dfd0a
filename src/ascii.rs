//! Glyph post-processing
//!
//! [`GlyphEffect`] samples a rendered frame into a grid of characters picked
//! from a density ramp. [`GlyphPass`] owns the effect together with the
//! overlay element that displays its output, and manages their lifecycle.

use crate::config::Color;
use crate::graphics::{ContextId, FrameBuffer, Renderer};
use crate::host::{ElementId, ElementKind, Host};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Characters from sparse to dense
pub const GLYPH_RAMP: &str = " .:-+*=%@#";

static NEXT_EFFECT: AtomicU64 = AtomicU64::new(1);

/// Identity of a constructed effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphOptions {
    /// Map bright pixels to dense glyphs
    pub invert: bool,
    /// Glyph cells per viewport pixel, in `[MIN_RESOLUTION, 1]`
    pub resolution: f64,
}

impl Default for GlyphOptions {
    fn default() -> Self {
        GlyphOptions {
            invert: true,
            resolution: crate::config::DEFAULT_RESOLUTION,
        }
    }
}

/// Pixel-to-glyph filter bound to one rendering context
#[derive(Debug)]
pub struct GlyphEffect {
    id: EffectId,
    context: ContextId,
    ramp: Vec<char>,
    options: GlyphOptions,
    size: (usize, usize),
    grid: (usize, usize),
}

impl GlyphEffect {
    pub fn new(renderer: &Renderer, ramp: &str, options: GlyphOptions) -> Self {
        let mut effect = GlyphEffect {
            id: EffectId(NEXT_EFFECT.fetch_add(1, Ordering::Relaxed)),
            context: renderer.id(),
            ramp: ramp.chars().collect(),
            options,
            size: (0, 0),
            grid: (0, 0),
        };
        let (width, height) = renderer.size();
        effect.set_size(width, height);
        effect
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn options(&self) -> GlyphOptions {
        self.options
    }

    /// Viewport size in pixels
    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    /// Sampling grid, one cell per glyph column and half glyph row
    pub fn grid(&self) -> (usize, usize) {
        self.grid
    }

    /// Columns and rows of text produced per frame
    pub fn text_size(&self) -> (usize, usize) {
        (self.grid.0, self.grid.1.div_ceil(2))
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.size = (width, height);
        self.grid = (
            (width as f64 * self.options.resolution).round() as usize,
            (height as f64 * self.options.resolution).round() as usize,
        );
    }

    /// Picks the glyph for one RGBA sample
    pub fn glyph_for(&self, rgba: [u8; 4]) -> char {
        let n = self.ramp.len();
        if n == 0 {
            return ' ';
        }
        let [r, g, b, a] = rgba.map(f64::from);
        let brightness = if a == 0.0 {
            1.0
        } else {
            (0.3 * r + 0.59 * g + 0.11 * b) / 255.0
        };
        let mut index =
            (((1.0 - brightness) * (n - 1) as f64).floor().max(0.0) as usize).min(n - 1);
        if self.options.invert {
            index = n - index - 1;
        }
        self.ramp[index]
    }

    /// Converts a frame into lines of glyphs
    ///
    /// Every other grid row is skipped since glyph cells are about twice as
    /// tall as they are wide.
    pub fn render(&self, frame: &FrameBuffer) -> Vec<String> {
        let (cols, rows) = self.grid;
        let (fw, fh) = (frame.width(), frame.height());
        if cols == 0 || rows == 0 {
            return Vec::new();
        }
        if fw == 0 || fh == 0 {
            return vec![" ".repeat(cols); rows.div_ceil(2)];
        }

        let span = |cell: usize, cells: usize, pixels: usize| {
            let start = cell * pixels / cells;
            let end = ((cell + 1) * pixels / cells).max(start + 1).min(pixels);
            (start.min(pixels - 1), end)
        };

        (0..rows)
            .step_by(2)
            .map(|gy| {
                let (y0, y1) = span(gy, rows, fh);
                (0..cols)
                    .map(|gx| {
                        let (x0, x1) = span(gx, cols, fw);
                        self.glyph_for(average(frame, x0..x1, y0..y1))
                    })
                    .collect()
            })
            .collect()
    }
}

fn average(frame: &FrameBuffer, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> [u8; 4] {
    let mut sum = [0u32; 4];
    let mut count = 0u32;
    for y in ys {
        for x in xs.clone() {
            for (acc, channel) in sum.iter_mut().zip(frame.pixel(x, y)) {
                *acc += channel as u32;
            }
            count += 1;
        }
    }
    if count == 0 {
        return [0; 4];
    }
    sum.map(|s| ((s + count / 2) / count) as u8)
}

/// Presentation style of the overlay element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub absolute: bool,
    pub top: u32,
    pub left: u32,
    pub width_percent: u8,
    pub height_percent: u8,
    pub outline: bool,
    pub background: Color,
    pub color: Color,
}

impl OverlayStyle {
    /// Covers the whole viewport without a focus outline
    pub fn covering(background: Color, color: Color) -> Self {
        OverlayStyle {
            absolute: true,
            top: 0,
            left: 0,
            width_percent: 100,
            height_percent: 100,
            outline: false,
            background,
            color,
        }
    }
}

/// Element displaying the glyph output
#[derive(Debug, Clone)]
pub struct Overlay {
    id: ElementId,
    pub style: OverlayStyle,
    size: (usize, usize),
    lines: Vec<String>,
}

impl Overlay {
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Viewport size in pixels
    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Mounted,
    TornDown,
}

/// Effect plus overlay, driven once per frame after the scene render
#[derive(Debug)]
pub struct GlyphPass {
    ramp: String,
    options: GlyphOptions,
    background: Color,
    foreground: Color,
    phase: Phase,
    effect: Option<GlyphEffect>,
    overlay: Option<Overlay>,
    renders: u64,
}

impl GlyphPass {
    pub fn new(options: GlyphOptions, background: Color, foreground: Color) -> Self {
        GlyphPass {
            ramp: GLYPH_RAMP.to_string(),
            options,
            background,
            foreground,
            phase: Phase::Uninitialized,
            effect: None,
            overlay: None,
            renders: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn effect(&self) -> Option<&GlyphEffect> {
        self.effect.as_ref()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Number of frames converted since mounting
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Builds the effect and attaches the overlay next to the canvas
    pub fn mount(&mut self, host: &mut Host, renderer: &Renderer) {
        if self.phase == Phase::Mounted {
            return;
        }
        let effect = GlyphEffect::new(renderer, &self.ramp, self.options);
        let id = host.append(ElementKind::Overlay);
        info!(
            overlay = %id,
            resolution = self.options.resolution,
            grid = ?effect.grid(),
            "glyph overlay mounted"
        );
        self.overlay = Some(Overlay {
            id,
            style: OverlayStyle::covering(self.background, self.foreground),
            size: renderer.size(),
            lines: Vec::new(),
        });
        self.effect = Some(effect);
        self.phase = Phase::Mounted;
    }

    /// Restyles the overlay; the effect is left untouched
    pub fn set_colors(&mut self, background: Color, foreground: Color) {
        self.background = background;
        self.foreground = foreground;
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.style.background = background;
            overlay.style.color = foreground;
        }
    }

    /// Changing the resolution replaces the effect
    pub fn set_resolution(&mut self, renderer: &Renderer, resolution: f64) {
        if self.options.resolution == resolution {
            return;
        }
        self.options.resolution = resolution;
        if self.phase == Phase::Mounted {
            self.rebuild(renderer);
        }
    }

    /// Resizes the render target, the sampling grid and the overlay together
    pub fn set_size(&mut self, renderer: &mut Renderer, width: usize, height: usize) {
        renderer.set_size(width, height);
        if let Some(effect) = self.effect.as_mut() {
            effect.set_size(width, height);
        }
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.size = (width, height);
        }
    }

    /// Converts the frame the renderer just produced
    pub fn render(&mut self, renderer: &Renderer) {
        if self.phase != Phase::Mounted {
            return;
        }
        if self.effect.as_ref().map(GlyphEffect::context) != Some(renderer.id()) {
            self.rebuild(renderer);
        }
        let Some(effect) = self.effect.as_ref() else {
            return;
        };
        let lines = effect.render(renderer.frame());
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.lines = lines;
        }
        self.renders += 1;
    }

    /// Detaches the overlay and drops the effect
    pub fn unmount(&mut self, host: &mut Host) {
        if let Some(overlay) = self.overlay.take() {
            host.remove(overlay.id);
            info!(overlay = %overlay.id, "glyph overlay removed");
        }
        self.effect = None;
        self.phase = Phase::TornDown;
    }

    fn rebuild(&mut self, renderer: &Renderer) {
        let effect = GlyphEffect::new(renderer, &self.ramp, self.options);
        debug!(grid = ?effect.grid(), "glyph effect rebuilt");
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.size = renderer.size();
        }
        self.effect = Some(effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(width: usize, height: usize) -> (Renderer, GlyphEffect) {
        let renderer = Renderer::new(width, height);
        let effect = GlyphEffect::new(&renderer, GLYPH_RAMP, GlyphOptions::default());
        (renderer, effect)
    }

    #[test]
    fn ramp_has_ten_glyphs() {
        assert_eq!(GLYPH_RAMP.chars().count(), 10);
    }

    #[test]
    fn inverted_mapping_puts_black_at_space_and_white_at_densest() {
        let (_, effect) = effect(10, 10);
        assert_eq!(effect.glyph_for([0, 0, 0, 255]), ' ');
        assert_eq!(effect.glyph_for([255, 255, 255, 255]), '#');
        // Transparent samples read as fully bright
        assert_eq!(effect.glyph_for([0, 0, 0, 0]), '#');
    }

    #[test]
    fn non_inverted_mapping_flips_the_ramp() {
        let renderer = Renderer::new(10, 10);
        let effect = GlyphEffect::new(
            &renderer,
            GLYPH_RAMP,
            GlyphOptions {
                invert: false,
                resolution: 0.5,
            },
        );
        assert_eq!(effect.glyph_for([0, 0, 0, 255]), '#');
        assert_eq!(effect.glyph_for([255, 255, 255, 255]), ' ');
    }

    #[test]
    fn grid_follows_resolution() {
        let (_, mut effect) = effect(400, 200);
        assert_eq!(effect.grid(), (80, 40));
        assert_eq!(effect.text_size(), (80, 20));
        effect.set_size(105, 55);
        assert_eq!(effect.grid(), (21, 11));
        assert_eq!(effect.text_size(), (21, 6));
    }

    #[test]
    fn black_frame_renders_blank_lines() {
        let (mut renderer, effect) = effect(50, 50);
        let scene = crate::scene::Scene::bootstrap();
        renderer.render(&scene, None);
        let lines = effect.render(renderer.frame());
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.len() == 10 && l.trim().is_empty()));
    }

    #[test]
    fn bright_region_becomes_dense_glyphs() {
        let mut frame = FrameBuffer::new(20, 20);
        frame.clear(Color::WHITE);
        let renderer = Renderer::new(20, 20);
        let effect = GlyphEffect::new(
            &renderer,
            GLYPH_RAMP,
            GlyphOptions {
                invert: true,
                resolution: 0.5,
            },
        );
        let lines = effect.render(&frame);
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l == "##########"));
    }

    #[test]
    fn colors_do_not_rebuild_the_effect() {
        let mut host = Host::new("root");
        let renderer = Renderer::new(100, 100);
        let mut pass = GlyphPass::new(GlyphOptions::default(), Color::BLACK, Color::WHITE);
        pass.mount(&mut host, &renderer);
        let before = pass.effect().unwrap().id();

        pass.set_colors(Color::rgb(0, 0, 64), Color::rgb(0, 255, 0));
        assert_eq!(pass.effect().unwrap().id(), before);
        let style = pass.overlay().unwrap().style;
        assert_eq!(style.background, Color::rgb(0, 0, 64));
        assert_eq!(style.color, Color::rgb(0, 255, 0));

        pass.set_resolution(&renderer, 0.5);
        assert_ne!(pass.effect().unwrap().id(), before);
        assert_eq!(pass.effect().unwrap().grid(), (50, 50));
    }

    #[test]
    fn new_context_rebuilds_effect_on_render() {
        let mut host = Host::new("root");
        let first = Renderer::new(10, 10);
        let mut pass = GlyphPass::new(GlyphOptions::default(), Color::BLACK, Color::WHITE);
        pass.mount(&mut host, &first);
        let before = pass.effect().unwrap().id();

        let second = Renderer::new(10, 10);
        pass.render(&second);
        assert_eq!(pass.effect().unwrap().context(), second.id());
        assert_ne!(pass.effect().unwrap().id(), before);
    }

    #[test]
    fn overlay_covers_viewport_and_is_removed_on_unmount() {
        let mut host = Host::new("root");
        let canvas = host.append(ElementKind::Canvas);
        let renderer = Renderer::new(10, 10);
        let mut pass = GlyphPass::new(GlyphOptions::default(), Color::BLACK, Color::WHITE);
        assert_eq!(pass.phase(), Phase::Uninitialized);

        pass.mount(&mut host, &renderer);
        let overlay = pass.overlay().unwrap();
        let id = overlay.id();
        assert_eq!(overlay.style, OverlayStyle::covering(Color::BLACK, Color::WHITE));
        assert!(overlay.style.absolute && !overlay.style.outline);
        assert_eq!(host.children().collect::<Vec<_>>(), vec![
            (canvas, ElementKind::Canvas),
            (id, ElementKind::Overlay),
        ]);

        pass.unmount(&mut host);
        assert_eq!(pass.phase(), Phase::TornDown);
        assert!(!host.contains(id));
        assert!(pass.effect().is_none());

        pass.render(&renderer);
        assert_eq!(pass.render_count(), 0);
    }
}
