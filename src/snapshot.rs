//! Rasterization of the tour geometry into an image.

use anyhow::Context as _;
use cairo::{Context, Format, ImageSurface, LineCap, LineJoin, LinearGradient};
use image::{ImageFormat, Rgba, RgbaImage};
use log::debug;
use std::f64::consts::TAU;
use std::path::Path;
use tourtrack::geometry::Point;
use tourtrack::map::position::RenderTransform;
use tourtrack::render::buckets::{LineBucket, RenderBucket, RenderBuckets};
use tourtrack::render::style::{Cap, Color, ColorMode};

/// Background color of the image.
const BACKGROUND: Rgba<u8> = Rgba([0xF0, 0xF0, 0xE8, 0xFF]);

/// Color of the direction arrows.
const ARROW_COLOR: Color = Color(0xFF20_2020);

/// Draws the buckets onto a new image, with the given transform from bucket
/// pixels to pixels relative to the image center.
pub fn rasterize(
    buckets: &RenderBuckets,
    transform: &RenderTransform,
    width: u32,
    height: u32,
) -> anyhow::Result<RgbaImage> {
    let mut surface = ImageSurface::create(Format::ARgb32, width as i32, height as i32)
        .context("Failed to create image surface")?;
    {
        let context = Context::new(&surface).context("Failed to create drawing context")?;
        let [r, g, b, a] = BACKGROUND.0;
        context.set_source_rgba(channel(r), channel(g), channel(b), channel(a));
        context.paint().context("Failed to draw background")?;

        let canvas = Canvas {
            context: &context,
            transform,
            center: Point::new(width as f64 / 2.0, height as f64 / 2.0),
        };
        for bucket in buckets.iter() {
            match bucket {
                RenderBucket::Line(line) => canvas.draw_line_bucket(line)?,
            }
        }
    }
    surface.flush();
    to_image(&mut surface, width, height)
}

/// Rasterizes the buckets and writes them as a PNG file.
pub fn write_png<P: AsRef<Path>>(
    buckets: &RenderBuckets,
    transform: &RenderTransform,
    width: u32,
    height: u32,
    path: P,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let image = rasterize(buckets, transform, width, height)?;
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write image to: {}", path.display()))?;
    debug!("Wrote {width}x{height} image to {}", path.display());
    Ok(())
}

fn channel(value: u8) -> f64 {
    value as f64 / 255.0
}

/// Converts the premultiplied native-endian ARGB pixels of the surface.
fn to_image(surface: &mut ImageSurface, width: u32, height: u32) -> anyhow::Result<RgbaImage> {
    let stride = surface.stride() as usize;
    let data = surface.data().context("Failed to read image surface")?;

    let mut image = RgbaImage::new(width, height);
    for (y, row) in data.chunks(stride).take(height as usize).enumerate() {
        for (x, pixel) in row.chunks_exact(4).take(width as usize).enumerate() {
            let argb = u32::from_ne_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
            let [a, r, g, b] = argb.to_be_bytes();
            let unmultiply = |c: u8| {
                if a == 0 {
                    0
                } else {
                    ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8
                }
            };
            image.put_pixel(
                x as u32,
                y as u32,
                Rgba([unmultiply(r), unmultiply(g), unmultiply(b), a]),
            );
        }
    }
    Ok(image)
}

struct Canvas<'a> {
    context: &'a Context,
    transform: &'a RenderTransform,
    center: Point<f64>,
}

impl Canvas<'_> {
    fn draw_line_bucket(&self, bucket: &LineBucket) -> anyhow::Result<()> {
        let style = &bucket.style;
        let width = if style.fixed {
            style.width as f64
        } else {
            style.width as f64 * self.transform.scale
        };
        let opacity = channel(style.color.to_rgba()[3]);

        self.context.set_line_width(width);
        self.context.set_line_join(LineJoin::Round);
        self.context.set_line_cap(match style.cap {
            Cap::Butt => LineCap::Butt,
            Cap::Round => LineCap::Round,
            Cap::Square => LineCap::Square,
        });

        match style.color_mode {
            ColorMode::Solid => {
                self.set_color(style.color, opacity);
                for line in bucket.lines() {
                    let mut points = line.points.iter().map(|&p| self.to_image(p));
                    if let Some(first) = points.next() {
                        self.context.move_to(first.x, first.y);
                    }
                    for p in points {
                        self.context.line_to(p.x, p.y);
                    }
                }
                self.context.stroke().context("Failed to draw lines")?;
            }
            ColorMode::Gradient => {
                for line in bucket.lines() {
                    for (points, colors) in line.points.windows(2).zip(line.colors.windows(2)) {
                        let from = self.to_image(points[0]);
                        let to = self.to_image(points[1]);
                        if colors[0] == colors[1] {
                            self.set_color(Color(colors[0]), opacity);
                        } else {
                            let gradient = LinearGradient::new(from.x, from.y, to.x, to.y);
                            for (offset, color) in [(0.0, colors[0]), (1.0, colors[1])] {
                                let [r, g, b, _] = Color(color).to_rgba();
                                gradient.add_color_stop_rgba(
                                    offset,
                                    channel(r),
                                    channel(g),
                                    channel(b),
                                    opacity,
                                );
                            }
                            self.context
                                .set_source(&gradient)
                                .context("Failed to set line gradient")?;
                        }
                        self.context.move_to(from.x, from.y);
                        self.context.line_to(to.x, to.y);
                        self.context.stroke().context("Failed to draw segment")?;
                    }
                }
            }
        }

        let arrows = bucket.direction_arrows();
        if !arrows.is_empty() {
            self.set_color(ARROW_COLOR, 1.0);
            for &arrow in arrows {
                let p = self.to_image(arrow);
                self.context.new_sub_path();
                self.context.arc(p.x, p.y, width / 2.0 + 1.0, 0.0, TAU);
            }
            self.context.fill().context("Failed to draw direction arrows")?;
        }
        Ok(())
    }

    fn set_color(&self, color: Color, opacity: f64) {
        let [r, g, b, _] = color.to_rgba();
        self.context
            .set_source_rgba(channel(r), channel(g), channel(b), opacity);
    }

    fn to_image(&self, p: Point<f32>) -> Point<f64> {
        let p = self.transform.apply(p);
        Point::new(p.x + self.center.x, p.y + self.center.y)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tourtrack::render::style::LineStyle;

    #[test]
    fn draws_visible_lines() {
        let mut buckets = RenderBuckets::default();
        let bucket = buckets.line_bucket_mut();
        bucket.style = LineStyle {
            width: 2.0,
            color: Color::rgb(0xFF, 0, 0),
            color_mode: ColorMode::Solid,
            ..LineStyle::default()
        };
        bucket.add_line(
            &[Point::new(-20.0, 0.0), Point::new(20.0, 0.0)],
            &[0xFF00_FF00, 0xFF00_FF00],
        );

        let image = rasterize(&buckets, &RenderTransform::IDENTITY, 64, 64).unwrap();
        assert_eq!(image.get_pixel(32, 32), &Rgba([0xFF, 0, 0, 0xFF]));
        assert_eq!(image.get_pixel(0, 0), &BACKGROUND);
        assert_eq!(image.get_pixel(32, 50), &BACKGROUND);
    }

    #[test]
    fn butt_cap_ends_at_last_vertex() {
        let mut buckets = RenderBuckets::default();
        let bucket = buckets.line_bucket_mut();
        bucket.style = LineStyle {
            width: 6.0,
            color: Color::rgb(0xFF, 0, 0),
            cap: Cap::Butt,
            color_mode: ColorMode::Solid,
            ..LineStyle::default()
        };
        bucket.add_line(
            &[Point::new(-10.0, 0.0), Point::new(10.0, 0.0)],
            &[0xFF00_FF00, 0xFF00_FF00],
        );

        let image = rasterize(&buckets, &RenderTransform::IDENTITY, 64, 64).unwrap();
        assert_eq!(image.get_pixel(41, 32), &Rgba([0xFF, 0, 0, 0xFF]));
        assert_eq!(image.get_pixel(43, 32), &BACKGROUND);
    }

    #[test]
    fn gradient_uses_vertex_colors() {
        let mut buckets = RenderBuckets::default();
        let bucket = buckets.line_bucket_mut();
        bucket.style = LineStyle {
            width: 2.0,
            color_mode: ColorMode::Gradient,
            color: Color::rgb(0xFF, 0, 0),
            ..LineStyle::default()
        };
        bucket.add_line(
            &[Point::new(0.0, -10.0), Point::new(0.0, 10.0)],
            &[0xFF00_00FF, 0xFF00_00FF],
        );

        let image = rasterize(&buckets, &RenderTransform::IDENTITY, 32, 32).unwrap();
        assert_eq!(image.get_pixel(16, 16), &Rgba([0, 0, 0xFF, 0xFF]));
    }

    #[test]
    fn empty_buckets_give_blank_image() {
        let image =
            rasterize(&RenderBuckets::default(), &RenderTransform::IDENTITY, 16, 16).unwrap();
        assert!(image.pixels().all(|p| *p == BACKGROUND));
    }
}
