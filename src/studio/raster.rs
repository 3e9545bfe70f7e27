use crate::studio::surface::{DesignObject, DesignSurface, Shape};
use crate::studio::{RASTER_MULTIPLIER_CAP, RASTER_REFERENCE_WIDTH};
use image::{Pixel, Rgba, RgbaImage};
use std::collections::HashSet;

/// Resolution multiplier for texture baking: scales with viewport width for
/// print sharpness, capped to bound memory use.
pub fn raster_multiplier(viewport_width: f32) -> f32 {
    (viewport_width / RASTER_REFERENCE_WIDTH).min(RASTER_MULTIPLIER_CAP)
}

/// Rasterizes the design surface to an RGBA bitmap on a white background.
/// Objects flagged exclude-from-export (the safe zone and guides) and
/// hidden objects are left out.
pub fn rasterize(surface: &DesignSurface, multiplier: f32) -> RgbaImage {
    let width = scaled_dim(surface.config.canvas_width, multiplier);
    let height = scaled_dim(surface.config.canvas_height, multiplier);
    let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    for object in surface
        .objects
        .iter()
        .filter(|o| o.visible && !o.exclude_from_export)
    {
        draw_object(&mut image, object, multiplier);
    }
    image
}

fn scaled_dim(value: f32, multiplier: f32) -> u32 {
    ((value * multiplier).round() as i64).max(1) as u32
}

fn draw_object(image: &mut RgbaImage, object: &DesignObject, m: f32) {
    match object.shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
        } => {
            if let Some(fill) = object.fill {
                fill_rect(image, x * m, y * m, (x + width) * m, (y + height) * m, fill);
            }
        }
        Shape::Ellipse { cx, cy, rx, ry } => {
            if let Some(fill) = object.fill {
                fill_ellipse(image, cx * m, cy * m, rx * m, ry * m, fill);
            }
        }
        Shape::Line { x1, y1, x2, y2 } => {
            if let Some(stroke) = object.stroke {
                stamp_line(
                    image,
                    (x1 * m, y1 * m),
                    (x2 * m, y2 * m),
                    (stroke.width * m).max(1.0),
                    stroke.color,
                );
            }
        }
    }
}

fn blend_px(image: &mut RgbaImage, x: i64, y: i64, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let px = image.get_pixel_mut(x as u32, y as u32);
    px.blend(&Rgba(color));
}

fn fill_rect(image: &mut RgbaImage, x0: f32, y0: f32, x1: f32, y1: f32, color: [u8; 4]) {
    let left = x0.min(x1).round() as i64;
    let right = x0.max(x1).round() as i64;
    let top = y0.min(y1).round() as i64;
    let bottom = y0.max(y1).round() as i64;
    for y in top..bottom {
        for x in left..right {
            blend_px(image, x, y, color);
        }
    }
}

fn fill_ellipse(image: &mut RgbaImage, cx: f32, cy: f32, rx: f32, ry: f32, color: [u8; 4]) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let left = (cx - rx).floor() as i64;
    let right = (cx + rx).ceil() as i64;
    let top = (cy - ry).floor() as i64;
    let bottom = (cy + ry).ceil() as i64;
    for y in top..=bottom {
        for x in left..=right {
            let dx = (x as f32 + 0.5 - cx) / rx;
            let dy = (y as f32 + 0.5 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                blend_px(image, x, y, color);
            }
        }
    }
}

/// Stamps a thick line as overlapping discs; each pixel is blended once so
/// translucent strokes do not compound.
fn stamp_line(
    image: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    width: f32,
    color: [u8; 4],
) {
    let (x1, y1) = from;
    let (x2, y2) = to;
    let length = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
    let steps = (length * 2.0).ceil().max(1.0) as u32;
    let radius = width / 2.0;
    let r_ceil = radius.ceil() as i64;

    let mut touched: HashSet<(i64, i64)> = HashSet::new();
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let px = x1 + (x2 - x1) * t;
        let py = y1 + (y2 - y1) * t;
        for dy in -r_ceil..=r_ceil {
            for dx in -r_ceil..=r_ceil {
                let fx = px + dx as f32;
                let fy = py + dy as f32;
                if (fx - px).powi(2) + (fy - py).powi(2) > radius * radius {
                    continue;
                }
                touched.insert((fx.round() as i64, fy.round() as i64));
            }
        }
    }
    for (x, y) in touched {
        blend_px(image, x, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::catalog::{PartKind, default_outer_part};
    use crate::studio::surface::{DesignSurface, Stroke};
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case(500.0, 1.0)]
    #[case(1000.0, 2.0)]
    #[case(3000.0, 4.0)]
    #[case(2000.0, 4.0)]
    #[case(750.0, 1.5)]
    fn multiplier_is_viewport_width_over_reference_capped(
        #[case] width: f32,
        #[case] expected: f32,
    ) {
        assert_relative_eq!(raster_multiplier(width), expected);
    }

    fn surface() -> DesignSurface {
        DesignSurface::new(PartKind::Outer, default_outer_part())
    }

    #[test]
    fn output_dimensions_honor_the_multiplier() {
        let s = surface();
        let image = rasterize(&s, 2.0);
        assert_eq!(image.width(), (s.config.canvas_width * 2.0) as u32);
        assert_eq!(image.height(), (s.config.canvas_height * 2.0) as u32);
    }

    #[test]
    fn empty_surface_rasterizes_to_white() {
        let s = surface();
        let image = rasterize(&s, 1.0);
        // Overlays are present on the surface but must not reach the print.
        assert!(image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn user_objects_reach_the_print() {
        let mut s = surface();
        s.add_rect();
        let image = rasterize(&s, 1.0);
        let cx = image.width() / 2;
        let cy = image.height() / 2;
        assert_eq!(image.get_pixel(cx, cy).0, s.fill_color);
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn hidden_user_objects_are_skipped() {
        let mut s = surface();
        s.add_rect();
        if let Some(obj) = s.objects.last_mut() {
            obj.visible = false;
        }
        let image = rasterize(&s, 1.0);
        assert!(image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn ellipse_fills_inside_but_not_corners() {
        let mut s = surface();
        s.add_ellipse();
        let image = rasterize(&s, 1.0);
        let cx = image.width() / 2;
        let cy = image.height() / 2;
        assert_eq!(image.get_pixel(cx, cy).0, s.fill_color);

        // Corner of the ellipse's bounding box lies outside the ellipse.
        let rx = s.config.canvas_width * 0.125;
        let ry = s.config.canvas_height * 0.125;
        let corner_x = (s.config.canvas_width / 2.0 - rx) as u32;
        let corner_y = (s.config.canvas_height / 2.0 - ry) as u32;
        assert_eq!(image.get_pixel(corner_x, corner_y).0, [255, 255, 255, 255]);
    }

    #[test]
    fn translucent_line_stroke_blends_each_pixel_once() {
        let mut s = surface();
        let y = s.config.canvas_height / 2.0;
        let color = [0, 0, 255, 128];
        s.objects.push(DesignObject {
            id: Uuid::new_v4(),
            shape: Shape::Line {
                x1: 100.0,
                y1: y,
                x2: 700.0,
                y2: y,
            },
            fill: None,
            stroke: Some(Stroke {
                color,
                width: 6.0,
                dash: None,
            }),
            visible: true,
            selectable: true,
            exclude_from_export: false,
        });
        let image = rasterize(&s, 1.0);

        let mut expected = Rgba([255u8, 255, 255, 255]);
        expected.blend(&Rgba(color));
        assert_ne!(expected.0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(400, y as u32).0, expected.0);

        // The disc stamps overlap heavily along the line; every touched
        // pixel must equal a single blend of the stroke over white.
        for p in image.pixels() {
            assert!(p.0 == [255, 255, 255, 255] || p.0 == expected.0);
        }
    }

    #[test]
    fn degenerate_multiplier_still_yields_an_image() {
        let s = surface();
        let image = rasterize(&s, 0.0001);
        assert!(image.width() >= 1 && image.height() >= 1);
    }
}
