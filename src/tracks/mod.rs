//! Module to read tours from GPS track files.

pub mod geojson;
pub mod gpx;

use crate::geometry::projection::GeoPoint;
use anyhow::Context;
use futures::{future, stream, StreamExt};
use log::{debug, error};
use tokio::task;

/// Format of a track file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackFormat {
    /// GPX file: each track segment is a tour.
    Gpx,
    /// GeoJSON file: each line string is a tour.
    GeoJson,
}

/// Reads the tours contained in the given files.
///
/// This reads up to `parallel_requests` files in parallel. Files that fail to
/// load are logged and skipped. Tours are returned in the order of the files.
pub async fn load_tours_parallel(
    format: TrackFormat,
    files: &[String],
    parallel_requests: usize,
) -> Vec<Vec<GeoPoint>> {
    let mut loaded: Vec<(usize, Vec<Vec<GeoPoint>>)> = stream::iter(files)
        .enumerate()
        .map(|(i, path)| async move { load_tours(format, path.clone(), i).await.map(|t| (i, t)) })
        .buffer_unordered(parallel_requests.max(1))
        .filter_map(|result| {
            future::ready(match result {
                Ok(tours) => Some(tours),
                Err(e) => {
                    error!("Got an error: {e:?}");
                    None
                }
            })
        })
        .collect()
        .await;

    loaded.sort_unstable_by_key(|(i, _)| *i);
    loaded
        .into_iter()
        .flat_map(|(_, tours)| tours)
        .filter(|tour| !tour.is_empty())
        .collect()
}

/// Reads the tours contained in the given file, on a blocking thread.
async fn load_tours(
    format: TrackFormat,
    path: String,
    i: usize,
) -> anyhow::Result<Vec<Vec<GeoPoint>>> {
    debug!("Get tours {i} from {path}");
    let path2 = path.clone();
    let tours = task::spawn_blocking(move || match format {
        TrackFormat::Gpx => gpx::read_tours(&path),
        TrackFormat::GeoJson => geojson::read_tours(&path),
    })
    .await
    .with_context(|| format!("Failed to join background task to read tours: {path2}"))??;

    debug!("File {i} has {} tours", tours.len());
    Ok(tours)
}
