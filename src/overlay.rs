use kurbo::{Affine, Point};
use rusttype::{Font, Scale, point};
use tracing::warn;

use crate::assets::AssetLoader;
use crate::error::{PhotostripError, PhotostripResult};
use crate::layout::OverlaySpec;
use crate::surface::{PremulRgba8, Surface, mul_div255};

/// Apply a decorative stamp after all slots are filled.
///
/// Purely cosmetic: any failure (missing or unparsable font, text with no
/// drawable glyphs) is absorbed with a warning and the render succeeds
/// without the stamp.
pub fn apply(surface: &mut Surface, overlay: &OverlaySpec, loader: &dyn AssetLoader) {
    if let Err(err) = try_apply(surface, overlay, loader) {
        warn!(error = %err, text = %overlay.text, "overlay skipped");
    }
}

fn try_apply(
    surface: &mut Surface,
    overlay: &OverlaySpec,
    loader: &dyn AssetLoader,
) -> PhotostripResult<()> {
    let font_bytes = loader
        .load(&overlay.font_asset)
        .map_err(|e| PhotostripError::overlay(format!("stamp font unavailable: {e}")))?;
    let font = Font::try_from_vec(font_bytes)
        .ok_or_else(|| PhotostripError::overlay("stamp font failed to parse"))?;

    let stamp = rasterize_stamp(&font, overlay)?;
    blit_rotated(surface, &stamp, overlay.anchor, overlay.rotation);
    Ok(())
}

/// Pre-rendered stamp text, stroke and fill composited, premultiplied RGBA8.
struct StampRaster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl StampRaster {
    fn fetch(&self, x: i64, y: i64) -> PremulRgba8 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return [0, 0, 0, 0];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Bilinear sample with transparent padding outside the raster.
    fn sample(&self, x: f64, y: f64) -> PremulRgba8 {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let ix = fx.floor();
        let iy = fy.floor();
        let wx = (((fx - ix) * 255.0).round() as i64).clamp(0, 255) as u16;
        let wy = (((fy - iy) * 255.0).round() as i64).clamp(0, 255) as u16;
        let (x0, y0) = (ix as i64, iy as i64);

        let p00 = self.fetch(x0, y0);
        let p10 = self.fetch(x0 + 1, y0);
        let p01 = self.fetch(x0, y0 + 1);
        let p11 = self.fetch(x0 + 1, y0 + 1);

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = u16::from(mul_div255(u16::from(p00[c]), 255 - wx))
                + u16::from(mul_div255(u16::from(p10[c]), wx));
            let bot = u16::from(mul_div255(u16::from(p01[c]), 255 - wx))
                + u16::from(mul_div255(u16::from(p11[c]), wx));
            let v = u16::from(mul_div255(top.min(255), 255 - wy))
                + u16::from(mul_div255(bot.min(255), wy));
            out[c] = v.min(255) as u8;
        }
        out
    }
}

fn rasterize_stamp(font: &Font<'_>, overlay: &OverlaySpec) -> PhotostripResult<StampRaster> {
    if overlay.text.is_empty() {
        return Err(PhotostripError::overlay("stamp text is empty"));
    }
    if !overlay.font_px.is_finite() || overlay.font_px <= 0.0 {
        return Err(PhotostripError::overlay("stamp font size must be > 0"));
    }

    let scale = Scale::uniform(overlay.font_px as f32);
    let v_metrics = font.v_metrics(scale);
    let pad = overlay.stroke_px.max(0.0).ceil();

    let glyphs: Vec<_> = font
        .layout(
            &overlay.text,
            scale,
            point(pad as f32, pad as f32 + v_metrics.ascent),
        )
        .collect();

    let text_width = glyphs
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0) as f64;
    let text_height = f64::from(v_metrics.ascent - v_metrics.descent);
    if text_width <= 0.0 || text_height <= 0.0 {
        return Err(PhotostripError::overlay("stamp text has no extent"));
    }

    let width = (text_width + pad).ceil() as u32;
    let height = (text_height + 2.0 * pad).ceil() as u32;
    let npx = (width as usize) * (height as usize);

    // Glyph coverage for the fill pass; the stroke pass is a dilation of it.
    let mut coverage = vec![0u8; npx];
    let mut any = false;
    for g in &glyphs {
        let Some(bb) = g.pixel_bounding_box() else {
            continue;
        };
        any = true;
        g.draw(|gx, gy, v| {
            let x = i64::from(bb.min.x) + i64::from(gx);
            let y = i64::from(bb.min.y) + i64::from(gy);
            if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                return;
            }
            let idx = (y as usize) * (width as usize) + (x as usize);
            let v8 = ((v * 255.0).round() as i64).clamp(0, 255) as u8;
            coverage[idx] = coverage[idx].max(v8);
        });
    }
    if !any {
        return Err(PhotostripError::overlay("no drawable glyphs in stamp text"));
    }

    let stroke = dilate_mask(&coverage, width, height, overlay.stroke_px.max(0.0) as u32);

    // Stroke underneath, fill on top.
    let mut data = vec![0u8; npx * 4];
    for i in 0..npx {
        let mut px = premul(overlay.stroke, stroke[i]);
        px = over_premul(px, premul(overlay.fill, coverage[i]));
        data[i * 4..i * 4 + 4].copy_from_slice(&px);
    }

    Ok(StampRaster {
        width,
        height,
        data,
    })
}

/// Max-dilate a coverage mask by a square structuring element of the given
/// radius. Radius 0 returns the mask unchanged.
fn dilate_mask(mask: &[u8], width: u32, height: u32, radius: u32) -> Vec<u8> {
    if radius == 0 {
        return mask.to_vec();
    }
    let r = i64::from(radius);
    let (w, h) = (i64::from(width), i64::from(height));
    let mut out = vec![0u8; mask.len()];
    for y in 0..h {
        for x in 0..w {
            let mut best = 0u8;
            for dy in -r..=r {
                let ny = y + dy;
                if ny < 0 || ny >= h {
                    continue;
                }
                for dx in -r..=r {
                    let nx = x + dx;
                    if nx < 0 || nx >= w {
                        continue;
                    }
                    best = best.max(mask[(ny * w + nx) as usize]);
                }
            }
            out[(y * w + x) as usize] = best;
        }
    }
    out
}

fn premul(rgb: [u8; 3], alpha: u8) -> PremulRgba8 {
    [
        mul_div255(u16::from(rgb[0]), u16::from(alpha)),
        mul_div255(u16::from(rgb[1]), u16::from(alpha)),
        mul_div255(u16::from(rgb[2]), u16::from(alpha)),
        alpha,
    ]
}

fn over_premul(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    crate::surface::over(dst, src)
}

/// Composite a stamp raster so its bottom-right corner sits at `anchor`,
/// rotated by `rotation` radians about that corner. Inverse-mapped so the
/// rotated quad has no sampling holes.
fn blit_rotated(surface: &mut Surface, stamp: &StampRaster, anchor: Point, rotation: f64) {
    let (sw, sh) = (f64::from(stamp.width), f64::from(stamp.height));
    let transform =
        Affine::translate(anchor.to_vec2()) * Affine::rotate(rotation) * Affine::translate((-sw, -sh));
    let inverse = transform.inverse();

    // Canvas-space bounding box of the transformed stamp, padded one pixel
    // for the bilinear footprint.
    let corners = [
        transform * Point::new(0.0, 0.0),
        transform * Point::new(sw, 0.0),
        transform * Point::new(0.0, sh),
        transform * Point::new(sw, sh),
    ];
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min) - 1.0;
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min) - 1.0;
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max) + 1.0;
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max) + 1.0;

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().min(f64::from(surface.width()))).max(0.0) as u32;
    let y1 = (max_y.ceil().min(f64::from(surface.height()))).max(0.0) as u32;

    for py in y0..y1 {
        for px in x0..x1 {
            let canvas_pt = Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
            let src_pt = inverse * canvas_pt;
            if src_pt.x < -1.0 || src_pt.y < -1.0 || src_pt.x > sw + 1.0 || src_pt.y > sh + 1.0 {
                continue;
            }
            let sample = stamp.sample(src_pt.x, src_pt.y);
            if sample[3] == 0 {
                continue;
            }
            surface.blend_pixel(px, py, sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryLoader;
    use crate::layout::{LayoutName, resolve};

    fn collage_overlay() -> OverlaySpec {
        resolve(LayoutName::Collage, 1.0).unwrap().overlay.unwrap()
    }

    #[test]
    fn missing_font_is_absorbed() {
        let mut surface = Surface::new(8, 8).unwrap();
        surface.fill([1, 2, 3]);
        let before = surface.data().to_vec();

        apply(&mut surface, &collage_overlay(), &MemoryLoader::new());
        assert_eq!(surface.data(), &before[..], "canvas must be untouched");
    }

    #[test]
    fn corrupt_font_is_absorbed() {
        let mut loader = MemoryLoader::new();
        loader.insert("stamp.ttf", b"this is not a font".to_vec());

        let mut surface = Surface::new(8, 8).unwrap();
        surface.fill([9, 9, 9]);
        let before = surface.data().to_vec();

        apply(&mut surface, &collage_overlay(), &loader);
        assert_eq!(surface.data(), &before[..]);
    }

    #[test]
    fn dilate_grows_single_pixel() {
        let mut mask = vec![0u8; 25];
        mask[12] = 200; // center of 5x5
        let out = dilate_mask(&mask, 5, 5, 1);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                assert_eq!(out[((2 + dy) * 5 + (2 + dx)) as usize], 200);
            }
        }
        assert_eq!(out[0], 0);
        assert_eq!(dilate_mask(&mask, 5, 5, 0), mask);
    }

    #[test]
    fn blit_without_rotation_lands_at_anchor() {
        // A solid 2x2 stamp anchored at (4,4) covers pixels (2..4, 2..4).
        let stamp = StampRaster {
            width: 2,
            height: 2,
            data: [200, 0, 0, 255].repeat(4),
        };
        let mut surface = Surface::new(6, 6).unwrap();
        blit_rotated(&mut surface, &stamp, Point::new(4.0, 4.0), 0.0);

        assert_eq!(surface.pixel(2, 2).unwrap(), [200, 0, 0, 255]);
        assert_eq!(surface.pixel(3, 3).unwrap(), [200, 0, 0, 255]);
        assert_eq!(surface.pixel(5, 5).unwrap(), [0, 0, 0, 0]);
        assert_eq!(surface.pixel(0, 0).unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn rotated_blit_stays_near_anchor() {
        let stamp = StampRaster {
            width: 4,
            height: 2,
            data: [0, 0, 250, 255].repeat(8),
        };
        let mut surface = Surface::new(16, 16).unwrap();
        blit_rotated(&mut surface, &stamp, Point::new(14.0, 14.0), -0.1);

        let touched = (0..16u32)
            .flat_map(|y| (0..16u32).map(move |x| (x, y)))
            .filter(|&(x, y)| surface.pixel(x, y).unwrap()[3] != 0)
            .count();
        assert!(touched >= 6, "rotated stamp should cover several pixels");
        // Nothing lands far from the bottom-right corner.
        assert_eq!(surface.pixel(2, 2).unwrap(), [0, 0, 0, 0]);
    }
}
