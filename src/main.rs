//! Tourtrack - draw your tours on a map.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cli;
mod snapshot;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use log::{info, trace, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tourtrack::geometry::projection::{project, unproject};
use tourtrack::geometry::Point;
use tourtrack::render::style::Color;
use tourtrack::tracks::load_tours_parallel;
use tourtrack::{GeoPoint, LayerState, MapPosition, TourLayer, Tour, TrackData};

/// Maximum time to wait for the final geometry.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Cli {
        track_params,
        track_config,
        zoom,
        frames,
        pan_x,
        pan_y,
        frame_millis,
        width,
        height,
        output,
        parallel_requests,
    } = Cli::parse();

    let (format, files) = track_params.source();
    let rt = Runtime::new().context("Failed to create Tokio runtime")?;
    let tours = rt.block_on(load_tours_parallel(
        format,
        files,
        parallel_requests as usize,
    ));
    info!("Loaded {} tours", tours.len());

    let tours: Vec<Tour> = tours
        .into_iter()
        .map(|points| Tour::with_color(points, Color::new_random().0))
        .collect();
    let data = TrackData::from_tours(&tours).context("Failed to assemble tours")?;
    let center = track_center(&data).unwrap_or_else(|| {
        warn!("No track point to show");
        GeoPoint::default()
    });

    let mut layer = TourLayer::new(
        track_config.unwrap_or_default(),
        Arc::new(|| trace!("Redraw requested")),
    )
    .context("Failed to start tour layer")?;
    layer.set_track(data);

    let frame = Duration::from_millis(frame_millis);
    let mut viewport = MapPosition::from_geo(&center, zoom);
    for _ in 0..frames {
        layer.update(&viewport);
        viewport = viewport.pan_pixels(pan_x, pan_y);
        thread::sleep(frame);
    }

    // Keep rendering frames at the final position until its geometry is in.
    let start = Instant::now();
    loop {
        layer.update(&viewport);
        if layer.state() == LayerState::GeometryFresh {
            break;
        }
        if start.elapsed() > SETTLE_TIMEOUT {
            warn!("Timed out waiting for the track geometry");
            break;
        }
        thread::sleep(frame.max(Duration::from_millis(1)));
    }

    let stats = layer.worker_stats();
    info!(
        "Worker stats: {} submitted, {} completed, {} cancelled, {} discarded",
        stats.submitted, stats.completed, stats.cancelled, stats.discarded
    );
    if let Some(bucket) = layer.active_buckets().line_bucket() {
        info!(
            "Drawing {} lines with {} vertices",
            bucket.line_count(),
            bucket.vertex_count()
        );
    }

    snapshot::write_png(
        layer.active_buckets(),
        &layer.render_transform(&viewport),
        width,
        height,
        &output,
    )?;
    info!("Wrote {output}");

    Ok(())
}

/// Returns the center of the bounding box of all the track points.
fn track_center(data: &TrackData) -> Option<GeoPoint> {
    let mut points = data.points().iter().map(project);
    let first = points.next()?;
    let (min, max) = points.fold((first, first), |(min, max), p| {
        (
            Point::new(min.x.min(p.x), min.y.min(p.y)),
            Point::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    Some(unproject(Point::new(
        (min.x + max.x) / 2.0,
        (min.y + max.y) / 2.0,
    )))
}
