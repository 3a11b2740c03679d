//! Configuration utilities.

use crate::render::style::{Cap, ColorMode};
use anyhow::Context;
use clap::builder;
use clap::error::ErrorKind;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Appearance and tuning of the tour track.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackConfig {
    /// RGB color of the line, used in [`ColorMode::Solid`].
    pub line_color: [u8; 3],
    /// Opacity of the line, from 0 (transparent) to 255 (opaque).
    pub line_opacity: u8,
    /// Width of the line, in pixels.
    pub line_width: f32,
    /// Whether the line has a single color or per-point colors.
    pub line_color_mode: ColorMode,
    /// Shape of the line ends.
    pub line_cap: Cap,
    /// Height of the track above the ground, if any.
    pub track_vertical_offset: Option<f32>,
    /// Whether to produce direction arrows along the track.
    pub show_direction_arrows: bool,
    /// Minimum distance between two direction arrows, in pixels.
    pub arrow_min_distance: f32,
    /// Minimum distance between two vertices of a line, in pixels.
    ///
    /// Closer points are dropped.
    pub min_distance: f32,
    /// Half-size of the square clip region around the map center, in pixels.
    ///
    /// Vertices are compiled to 16-bit integers scaled by
    /// [`crate::render::buckets::COORD_SCALE`], so this must stay below 4096.
    pub clip_extent: f32,
    /// Delay before starting a recomputation, so that bursts of requests are
    /// coalesced into one.
    pub coalescing_delay_ms: u64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            line_color: [0x80, 0x00, 0xFF],
            line_opacity: 0xC0,
            line_width: 4.0,
            line_color_mode: ColorMode::Gradient,
            line_cap: Cap::Round,
            track_vertical_offset: None,
            show_direction_arrows: false,
            arrow_min_distance: 60.0,
            min_distance: 3.0,
            clip_extent: 2048.0,
            coalescing_delay_ms: 0,
        }
    }
}

impl TrackConfig {
    /// Largest clip extent whose scaled coordinates fit in an `i16`.
    const MAX_CLIP_EXTENT: f32 = 4095.0;

    /// Reads a track configuration from the given JSON file.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| {
            format!(
                "Failed to read track configuration from: {}",
                path.display()
            )
        })?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader).with_context(|| {
            format!(
                "Failed to parse track configuration from: {}",
                path.display()
            )
        })?;

        Ok(config.sanitized())
    }

    /// Clamps out-of-range tuning values.
    pub fn sanitized(mut self) -> Self {
        self.clip_extent = self.clip_extent.clamp(1.0, Self::MAX_CLIP_EXTENT);
        self.min_distance = self.min_distance.max(0.0);
        self.arrow_min_distance = self.arrow_min_distance.max(0.0);
        self.line_width = self.line_width.max(0.0);
        self
    }

    /// Packs the line color and opacity as ARGB.
    pub fn line_argb(&self) -> u32 {
        let [r, g, b] = self.line_color;
        u32::from_be_bytes([self.line_opacity, r, g, b])
    }
}

/// Helper struct to parse a [`TrackConfig`] directly from a Clap argument.
#[derive(Clone)]
pub struct TrackConfigParser;

impl builder::TypedValueParser for TrackConfigParser {
    type Value = TrackConfig;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        TrackConfig::read_from_file(value).map_err(|e| {
            let arg_str = arg.map(|a| a.to_string());
            let msg = format!(
                "Failed to parse track configuration{}{}: {}\n",
                arg_str.map(|a| format!(" ({})", a)).unwrap_or_default(),
                value
                    .to_str()
                    .map(|f| format!(" from file `{}`", f))
                    .unwrap_or_default(),
                e
            );
            clap::Error::raw(ErrorKind::Io, msg).with_cmd(cmd)
        })
    }
}

impl builder::ValueParserFactory for TrackConfig {
    type Parser = TrackConfigParser;

    fn value_parser() -> Self::Parser {
        TrackConfigParser
    }
}
