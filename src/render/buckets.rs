//! Render buckets: the renderer-facing output of the geometry computation.

use super::style::{ColorMode, LineStyle};
use crate::geometry::Point;

/// Factor applied to pixel coordinates when compiling them to integers.
pub const COORD_SCALE: f32 = 8.0;

/// A batch of geometry of one kind, drawn with one style.
#[derive(Clone, Debug)]
pub enum RenderBucket {
    /// Polylines with per-vertex colors.
    Line(LineBucket),
}

/// Ordered list of buckets produced for one map position.
#[derive(Clone, Debug, Default)]
pub struct RenderBuckets {
    buckets: Vec<RenderBucket>,
}

impl RenderBuckets {
    /// Removes all the buckets.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Checks whether there is any bucket.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns an iterator over the buckets, in drawing order.
    pub fn iter(&self) -> impl Iterator<Item = &RenderBucket> {
        self.buckets.iter()
    }

    /// Returns the line bucket, if any.
    pub fn line_bucket(&self) -> Option<&LineBucket> {
        self.buckets.first().map(|bucket| match bucket {
            RenderBucket::Line(line) => line,
        })
    }

    /// Returns the line bucket, creating it if needed.
    pub fn line_bucket_mut(&mut self) -> &mut LineBucket {
        if self.buckets.is_empty() {
            self.buckets
                .push(RenderBucket::Line(LineBucket::new(LineStyle::default())));
        }
        match &mut self.buckets[0] {
            RenderBucket::Line(line) => line,
        }
    }

    /// Applies the given style to all the buckets, without touching their
    /// geometry.
    pub fn set_style(&mut self, style: &LineStyle) {
        for bucket in &mut self.buckets {
            match bucket {
                RenderBucket::Line(line) => line.style.clone_from(style),
            }
        }
    }
}

/// One polyline of a [`LineBucket`].
#[derive(Clone, Copy, Debug)]
pub struct LineRun<'a> {
    /// Vertices, in pixels relative to the map center.
    pub points: &'a [Point<f32>],
    /// Packed ARGB color of each vertex.
    pub colors: &'a [u32],
}

/// Independent polylines sharing one vertex buffer, plus direction arrows.
#[derive(Clone, Debug)]
pub struct LineBucket {
    /// Style of all the lines in this bucket.
    pub style: LineStyle,
    /// Vertices of all the lines, concatenated.
    vertices: Vec<Point<f32>>,
    /// Color of each vertex.
    colors: Vec<u32>,
    /// End offset (exclusive) of each line in `vertices`.
    line_ends: Vec<usize>,
    /// Positions where direction arrows are drawn.
    arrows: Vec<Point<f32>>,
}

impl LineBucket {
    /// Creates an empty bucket with the given style.
    pub fn new(style: LineStyle) -> Self {
        Self {
            style,
            vertices: Vec::new(),
            colors: Vec::new(),
            line_ends: Vec::new(),
            arrows: Vec::new(),
        }
    }

    /// Removes all the geometry, keeping the allocated buffers.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.colors.clear();
        self.line_ends.clear();
        self.arrows.clear();
    }

    /// Appends a polyline. Lines of fewer than 2 vertices are ignored.
    pub fn add_line(&mut self, points: &[Point<f32>], colors: &[u32]) {
        debug_assert_eq!(points.len(), colors.len());
        if points.len() < 2 {
            return;
        }
        self.vertices.extend_from_slice(points);
        self.colors.extend_from_slice(colors);
        self.line_ends.push(self.vertices.len());
    }

    /// Replaces the direction arrow positions.
    pub fn set_direction_arrows(&mut self, arrows: &[Point<f32>]) {
        self.arrows.clear();
        self.arrows.extend_from_slice(arrows);
    }

    /// Returns the positions of the direction arrows.
    pub fn direction_arrows(&self) -> &[Point<f32>] {
        &self.arrows
    }

    /// Returns the number of polylines.
    pub fn line_count(&self) -> usize {
        self.line_ends.len()
    }

    /// Returns the total number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the vertices of all the lines, concatenated.
    pub fn vertices(&self) -> &[Point<f32>] {
        &self.vertices
    }

    /// Returns an iterator over the polylines.
    pub fn lines(&self) -> impl Iterator<Item = LineRun<'_>> {
        let starts = std::iter::once(0).chain(self.line_ends.iter().copied());
        starts.zip(self.line_ends.iter().copied()).map(|(start, end)| LineRun {
            points: &self.vertices[start..end],
            colors: &self.colors[start..end],
        })
    }

    /// Compiles the bucket into fixed-point vertex data for the GPU.
    ///
    /// Vertices must lie within the clip region, so that the scaled
    /// coordinates fit in 16 bits.
    pub fn compile(&self) -> CompiledLines {
        let solid = match self.style.color_mode {
            ColorMode::Solid => Some(self.style.color.0),
            ColorMode::Gradient => None,
        };

        CompiledLines {
            positions: self.vertices.iter().map(to_fixed_point).collect(),
            colors: match solid {
                Some(color) => vec![color; self.colors.len()],
                None => self.colors.clone(),
            },
            line_ends: self.line_ends.iter().map(|&end| end as u32).collect(),
            arrows: self.arrows.iter().map(to_fixed_point).collect(),
        }
    }
}

/// Scales a pixel into fixed-point coordinates.
fn to_fixed_point(p: &Point<f32>) -> [i16; 2] {
    let scale = |v: f32| {
        (v * COORD_SCALE)
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16
    };
    [scale(p.x), scale(p.y)]
}

/// Vertex data of a [`LineBucket`], ready to upload to the GPU.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledLines {
    /// Vertex positions, scaled by [`COORD_SCALE`].
    pub positions: Vec<[i16; 2]>,
    /// ARGB color of each vertex, resolved according to the color mode.
    pub colors: Vec<u32>,
    /// End offset (exclusive) of each line in `positions`.
    pub line_ends: Vec<u32>,
    /// Direction arrow positions, scaled by [`COORD_SCALE`].
    pub arrows: Vec<[i16; 2]>,
}
