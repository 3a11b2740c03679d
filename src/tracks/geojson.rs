//! Module to extract tours from a GeoJSON file.

use crate::geometry::projection::GeoPoint;
use anyhow::Context;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, LineStringType, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Converts a GeoJSON line, in (longitude, latitude) order, into a tour.
fn tour_from_line(line: &LineStringType) -> Vec<GeoPoint> {
    line.iter()
        .map(|position| GeoPoint::new(position[1], position[0]))
        .collect()
}

/// Collects one tour per line string of the given GeoJSON object.
fn collect_tours(geojson: &GeoJson) -> Vec<Vec<GeoPoint>> {
    fn visit_feature_collection(collection: &FeatureCollection, tours: &mut Vec<Vec<GeoPoint>>) {
        for feature in &collection.features {
            visit_feature(feature, tours);
        }
    }

    fn visit_feature(feature: &Feature, tours: &mut Vec<Vec<GeoPoint>>) {
        if let Some(geometry) = &feature.geometry {
            visit_geometry(geometry, tours);
        }
    }

    fn visit_geometry(geometry: &Geometry, tours: &mut Vec<Vec<GeoPoint>>) {
        match &geometry.value {
            Value::LineString(line) => tours.push(tour_from_line(line)),
            Value::MultiLineString(lines) => tours.extend(lines.iter().map(tour_from_line)),
            Value::Point(_) | Value::MultiPoint(_) | Value::Polygon(_) | Value::MultiPolygon(_) => {
            }
            Value::GeometryCollection(collection) => {
                for geometry in collection {
                    visit_geometry(geometry, tours);
                }
            }
        }
    }

    let mut tours = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(collection) => visit_feature_collection(collection, &mut tours),
        GeoJson::Feature(feature) => visit_feature(feature, &mut tours),
        GeoJson::Geometry(geometry) => visit_geometry(geometry, &mut tours),
    }
    tours
}

/// Reads the tours contained in the given GeoJSON file.
pub fn read_tours<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Vec<GeoPoint>>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON file: {}", path.display()))?;

    Ok(collect_tours(&geojson))
}
