//! Colors and line styles.

use crate::config::TrackConfig;
use rand::distr::Open01;
use rand::{rng, Rng};
use serde::Deserialize;

/// Color packed as ARGB, 8 bits per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Creates an opaque color from its RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(0xFF, r, g, b)
    }

    /// Creates a color from its ARGB channels.
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(u32::from_be_bytes([a, r, g, b]))
    }

    /// Creates a new random opaque color.
    pub fn new_random() -> Self {
        let mut rng = rng();
        let r: f32 = rng.sample(Open01);
        let g: f32 = rng.sample(Open01);
        let b: f32 = rng.sample(Open01);
        Self::rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
    }

    /// Returns the channels in RGBA order.
    pub fn to_rgba(self) -> [u8; 4] {
        let [a, r, g, b] = self.0.to_be_bytes();
        [r, g, b, a]
    }
}

/// Shape of the ends of a line.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Cap {
    /// Square end, flush with the last vertex.
    Butt,
    /// Round end.
    #[default]
    Round,
    /// Square end, extending past the last vertex by half the width.
    Square,
}

/// How a line is colored.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// The whole line has the style's color.
    Solid,
    /// Each vertex has the color of its point, interpolated in between.
    #[default]
    Gradient,
}

/// Style of the tour lines.
#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    /// Width, in pixels.
    pub width: f32,
    /// Color used in [`ColorMode::Solid`].
    pub color: Color,
    /// Shape of the line ends.
    pub cap: Cap,
    /// Height above the ground.
    pub height_offset: f32,
    /// Whether the width stays constant in pixels across zoom levels.
    pub fixed: bool,
    /// Whether the line is drawn with a single or per-vertex colors.
    pub color_mode: ColorMode,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::from_config(&TrackConfig::default())
    }
}

impl LineStyle {
    /// Builds the style described by the given configuration.
    pub fn from_config(config: &TrackConfig) -> Self {
        Self {
            width: config.line_width,
            color: Color(config.line_argb()),
            cap: config.line_cap,
            height_offset: config.track_vertical_offset.unwrap_or(0.0),
            // Otherwise the width jumps whenever the zoom level changes.
            fixed: true,
            color_mode: config.line_color_mode,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn color_channels() {
        let color = Color::argb(0x40, 0x10, 0x20, 0x30);
        assert_eq!(color.0, 0x4010_2030);
        assert_eq!(color.to_rgba(), [0x10, 0x20, 0x30, 0x40]);
        assert_eq!(Color::rgb(1, 2, 3).0 >> 24, 0xFF);
    }

    #[test]
    fn random_colors_are_opaque() {
        for _ in 0..10 {
            assert_eq!(Color::new_random().to_rgba()[3], 0xFF);
        }
    }

    #[test]
    fn style_from_config() {
        let config = TrackConfig {
            line_color: [0xFF, 0x00, 0x00],
            line_opacity: 0x80,
            line_width: 6.0,
            line_color_mode: ColorMode::Solid,
            track_vertical_offset: Some(12.0),
            ..TrackConfig::default()
        };
        let style = LineStyle::from_config(&config);
        assert_eq!(style.color, Color(0x80FF_0000));
        assert_eq!(style.width, 6.0);
        assert_eq!(style.height_offset, 12.0);
        assert_eq!(style.color_mode, ColorMode::Solid);
        assert!(style.fixed);
    }
}
