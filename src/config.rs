//! Viewer configuration and color parsing

use crate::error::ConfigError;
use nalgebra::Vector3;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Model loaded when no path is given on the command line
pub const DEFAULT_MODEL_PATH: &str = "desk.stl";

/// Ratio of glyph cells to viewport pixels
pub const DEFAULT_RESOLUTION: f64 = 0.2;

/// Densest supported sampling, twenty viewport pixels per glyph column
pub const MIN_RESOLUTION: f64 = 0.05;

/// An opaque 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Converts the sRGB components to linear light in [0, 1]
    pub fn to_linear(self) -> Vector3<f64> {
        fn channel(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Vector3::new(channel(self.r), channel(self.g), channel(self.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let named = match name.as_str() {
            "black" => Some(Color::BLACK),
            "white" => Some(Color::WHITE),
            "red" => Some(Color::rgb(255, 0, 0)),
            "green" => Some(Color::rgb(0, 128, 0)),
            "lime" => Some(Color::rgb(0, 255, 0)),
            "blue" => Some(Color::rgb(0, 0, 255)),
            "yellow" => Some(Color::rgb(255, 255, 0)),
            "cyan" => Some(Color::rgb(0, 255, 255)),
            "magenta" => Some(Color::rgb(255, 0, 255)),
            "gray" | "grey" => Some(Color::rgb(128, 128, 128)),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let hex = name
            .strip_prefix('#')
            .ok_or_else(|| ConfigError::Color(s.to_string()))?;
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(|| ConfigError::Color(s.to_string()))?;

        match digits.as_slice() {
            [r, g, b] => Ok(Color::rgb(r * 17, g * 17, b * 17)),
            [r1, r0, g1, g0, b1, b0] => Ok(Color::rgb(
                r1 * 16 + r0,
                g1 * 16 + g0,
                b1 * 16 + b0,
            )),
            _ => Err(ConfigError::Color(s.to_string())),
        }
    }
}

impl From<Color> for crossterm::style::Color {
    fn from(color: Color) -> Self {
        crossterm::style::Color::Rgb {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

/// Everything the viewer needs to mount
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Path of the STL asset to present
    pub model_path: PathBuf,
    /// Glyph grid density relative to viewport pixels
    pub resolution: f64,
    /// Glyph color of the overlay
    pub foreground: Color,
    /// Fill color of the overlay
    pub background: Color,
    /// Recenter and rescale the mesh to unit radius after loading
    pub fit: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            resolution: DEFAULT_RESOLUTION,
            foreground: Color::WHITE,
            background: Color::BLACK,
            fit: false,
        }
    }
}

impl ViewerConfig {
    /// Checks the values the renderer cannot cope with
    pub fn validate(self) -> Result<Self, ConfigError> {
        validate_resolution(self.resolution)?;
        Ok(self)
    }
}

/// Resolution must be a ratio in `[MIN_RESOLUTION, 1]`
pub fn validate_resolution(resolution: f64) -> Result<f64, ConfigError> {
    if (MIN_RESOLUTION..=1.0).contains(&resolution) {
        Ok(resolution)
    } else {
        Err(ConfigError::Resolution(resolution))
    }
}

/// Parses a terminal size written as `COLSxROWS`
pub fn parse_size(s: &str) -> Result<(u16, u16), ConfigError> {
    let (cols, rows) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| ConfigError::Size(s.to_string()))?;
    let cols = cols
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::Size(s.to_string()))?;
    let rows = rows
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::Size(s.to_string()))?;
    if cols == 0 || rows == 0 {
        return Err(ConfigError::Size(s.to_string()));
    }
    Ok((cols, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_hex_colors() {
        assert_eq!("white".parse::<Color>(), Ok(Color::WHITE));
        assert_eq!("Black".parse::<Color>(), Ok(Color::BLACK));
        assert_eq!("#ff8000".parse::<Color>(), Ok(Color::rgb(255, 128, 0)));
        assert_eq!("#0f0".parse::<Color>(), Ok(Color::rgb(0, 255, 0)));
    }

    #[test]
    fn rejects_unknown_colors() {
        assert!("chartreuse-ish".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
    }

    #[test]
    fn color_display_round_trips_hex() {
        let color = Color::rgb(18, 52, 86);
        assert_eq!(color.to_string(), "#123456");
    }

    #[test]
    fn resolution_bounds() {
        assert!(validate_resolution(0.2).is_ok());
        assert!(validate_resolution(1.0).is_ok());
        assert!(validate_resolution(0.0).is_err());
        assert!(validate_resolution(1.5).is_err());
        assert!(validate_resolution(f64::NAN).is_err());
        assert!(validate_resolution(MIN_RESOLUTION).is_ok());
        assert!(validate_resolution(0.01).is_err());
        assert!(validate_resolution(1e-9).is_err());
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("80x24"), Ok((80, 24)));
        assert_eq!(parse_size("120X40"), Ok((120, 40)));
        assert!(parse_size("80").is_err());
        assert!(parse_size("0x24").is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let config = ViewerConfig::default().validate().unwrap();
        assert_eq!(config.model_path, PathBuf::from("desk.stl"));
        assert_eq!(config.resolution, DEFAULT_RESOLUTION);
    }
}
