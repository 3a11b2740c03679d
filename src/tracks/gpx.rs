//! Module to extract tours from a GPX file.

use crate::geometry::projection::GeoPoint;
use anyhow::Context;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Schema for a GPX file.
#[derive(Deserialize)]
struct Gpx {
    #[serde(default)]
    trk: Vec<GpxTrack>,
}

/// Schema for a track in a GPX file.
#[derive(Deserialize)]
struct GpxTrack {
    #[serde(default)]
    trkseg: Vec<GpxTrackSegment>,
}

/// Schema for a segment within a GPX track.
#[derive(Deserialize)]
struct GpxTrackSegment {
    #[serde(default)]
    trkpt: Vec<GpxTrackPoint>,
}

/// Schema for a track point within a GPX track segment.
#[derive(Deserialize)]
struct GpxTrackPoint {
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
}

impl Gpx {
    /// Parses a GPX document.
    fn from_reader<R: Read>(reader: R) -> Result<Self, serde_xml_rs::Error> {
        serde_xml_rs::from_reader(reader)
    }

    /// Returns one tour per track segment.
    fn into_tours(self) -> Vec<Vec<GeoPoint>> {
        self.trk
            .into_iter()
            .flat_map(|track| track.trkseg)
            .map(|segment| {
                segment
                    .trkpt
                    .iter()
                    .map(|point| GeoPoint::new(point.lat, point.lon))
                    .collect()
            })
            .collect()
    }
}

/// Reads the tours contained in the given GPX file.
pub fn read_tours<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Vec<GeoPoint>>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open GPX file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let gpx = Gpx::from_reader(reader)
        .with_context(|| format!("Failed to parse GPX file: {}", path.display()))?;

    Ok(gpx.into_tours())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn one_tour_per_segment() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Morning ride</name>
    <trkseg>
      <trkpt lat="46.0" lon="7.0"><ele>500.0</ele></trkpt>
      <trkpt lat="46.1" lon="7.1"><ele>510.0</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="46.2" lon="7.2"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let tours = Gpx::from_reader(gpx.as_bytes()).unwrap().into_tours();
        assert_eq!(tours.len(), 2);
        assert_eq!(tours[0], vec![GeoPoint::new(46.0, 7.0), GeoPoint::new(46.1, 7.1)]);
        assert_eq!(tours[1], vec![GeoPoint::new(46.2, 7.2)]);
    }

    #[test]
    fn missing_file() {
        assert!(read_tours("/nonexistent/ride.gpx").is_err());
    }
}
