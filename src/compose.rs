use kurbo::Rect;

use crate::assets::SourceImage;
use crate::geom::{aspect, cover_crop};
use crate::layout::Slot;
use crate::surface::{PremulRgba8, Surface, mul_div255};

/// Fill a placement slot with its source photo under cover semantics.
///
/// The crop absorbs all aspect mismatch; the slot rectangle is always fully
/// covered with no letterboxing and no distortion. The same routine serves
/// every layout.
pub fn draw_slot(surface: &mut Surface, slot: &Slot, source: &SourceImage) {
    let crop = cover_crop(source.width(), source.height(), aspect(&slot.rect));
    draw_region(surface, &slot.rect, source, &crop);
}

/// Draw the `src_crop` region of `source`, scaled to exactly fill `dest`.
///
/// Destination pixels are mapped back into the crop and sampled bilinearly;
/// the destination is clipped to the canvas. Also used by the background
/// renderer for aspect-ignoring stretch fills (crop == full source).
pub fn draw_region(surface: &mut Surface, dest: &Rect, source: &SourceImage, src_crop: &Rect) {
    if dest.width() <= 0.0 || dest.height() <= 0.0 {
        return;
    }

    let x0 = dest.x0.round().max(0.0) as u32;
    let y0 = dest.y0.round().max(0.0) as u32;
    let x1 = (dest.x1.round().min(f64::from(surface.width()))).max(0.0) as u32;
    let y1 = (dest.y1.round().min(f64::from(surface.height()))).max(0.0) as u32;
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    for py in y0..y1 {
        let v = (f64::from(py) + 0.5 - dest.y0) / dest.height();
        let sy = src_crop.y0 + v * src_crop.height();
        for px in x0..x1 {
            let u = (f64::from(px) + 0.5 - dest.x0) / dest.width();
            let sx = src_crop.x0 + u * src_crop.width();
            surface.blend_pixel(px, py, sample_bilinear(source, sx, sy));
        }
    }
}

/// Bilinear sample at a point in source pixel space (pixel centers at
/// integer + 0.5). Interpolation happens in premultiplied space, so edges of
/// transparent regions do not bleed color.
fn sample_bilinear(source: &SourceImage, x: f64, y: f64) -> PremulRgba8 {
    let fx = x - 0.5;
    let fy = y - 0.5;
    let ix = fx.floor();
    let iy = fy.floor();
    let tx = fx - ix;
    let ty = fy - iy;

    let x0 = ix as i64;
    let y0 = iy as i64;
    let p00 = source.pixel_clamped(x0, y0);
    let p10 = source.pixel_clamped(x0 + 1, y0);
    let p01 = source.pixel_clamped(x0, y0 + 1);
    let p11 = source.pixel_clamped(x0 + 1, y0 + 1);

    let wx = ((tx * 255.0).round() as i64).clamp(0, 255) as u16;
    let wy = ((ty * 255.0).round() as i64).clamp(0, 255) as u16;
    let ix_ = 255 - wx;
    let iy_ = 255 - wy;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = u16::from(mul_div255(u16::from(p00[c]), ix_))
            + u16::from(mul_div255(u16::from(p10[c]), wx));
        let bot = u16::from(mul_div255(u16::from(p01[c]), ix_))
            + u16::from(mul_div255(u16::from(p11[c]), wx));
        let v = u16::from(mul_div255(top.min(255), iy_)) + u16::from(mul_div255(bot.min(255), wy));
        out[c] = v.min(255) as u8;
    }
    out
}
