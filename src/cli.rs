//! Command-line interface.

use clap::{Parser, Subcommand};
use tourtrack::tracks::TrackFormat;
use tourtrack::TrackConfig;

/// Draw your tours on a map.
#[derive(Parser, Debug)]
#[command(name = "Tourtrack")]
#[command(version)]
#[command(author)]
#[command(about = "Draw your tours on a map", long_about = None)]
pub struct Cli {
    /// Sub-command to load tracks.
    #[command(subcommand)]
    pub track_params: TrackParams,

    /// JSON file containing the track appearance configuration.
    #[arg(long = "track-config", value_parser = clap::value_parser!(TrackConfig))]
    pub track_config: Option<TrackConfig>,

    /// Zoom level of the map.
    #[arg(
        long,
        short = 'z',
        default_value_t = 12,
        value_parser = clap::value_parser!(u8).range(0..=24)
    )]
    pub zoom: u8,

    /// Number of frames to render while panning.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=100000))]
    pub frames: u32,

    /// Horizontal pan between two frames, in pixels.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub pan_x: f64,

    /// Vertical pan between two frames, in pixels.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub pan_y: f64,

    /// Duration of a frame, in milliseconds.
    #[arg(long, default_value_t = 16)]
    pub frame_millis: u64,

    /// Width of the output image.
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u32).range(16..=8192))]
    pub width: u32,

    /// Height of the output image.
    #[arg(long, default_value_t = 768, value_parser = clap::value_parser!(u32).range(16..=8192))]
    pub height: u32,

    /// Path of the PNG image to write.
    #[arg(long, short = 'o', default_value = "tours.png")]
    pub output: String,

    /// Maximum number of files to read in parallel.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub parallel_requests: u32,
}

/// Parameters to load tracks.
#[derive(Subcommand, Debug)]
pub enum TrackParams {
    /// Read tours from GPX file(s).
    Gpx(FileParams),

    /// Read tours from GeoJSON file(s).
    Geojson(FileParams),
}

/// Parameters to load track files.
#[derive(Parser, Debug)]
pub struct FileParams {
    /// File(s) to read.
    #[arg(long = "file", short = 'f', required = true, value_delimiter = ',')]
    pub files: Vec<String>,
}

impl TrackParams {
    /// Returns the format and the list of files to read.
    pub fn source(&self) -> (TrackFormat, &[String]) {
        match self {
            TrackParams::Gpx(params) => (TrackFormat::Gpx, &params.files),
            TrackParams::Geojson(params) => (TrackFormat::GeoJson, &params.files),
        }
    }
}
