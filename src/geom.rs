use kurbo::Rect;

/// Centered "cover" crop of a source image against a target aspect ratio.
///
/// Returns the sub-rectangle of the source (in source pixel coordinates)
/// whose aspect equals `target_aspect` and which spans the full extent of
/// the source in one dimension. The crop absorbs all aspect mismatch; the
/// destination rectangle is always fully covered, never letterboxed.
pub fn cover_crop(src_width: u32, src_height: u32, target_aspect: f64) -> Rect {
    let sw = f64::from(src_width);
    let sh = f64::from(src_height);
    let src_aspect = sw / sh;

    if src_aspect > target_aspect {
        // Source is relatively wider: full height, centered horizontal band.
        let crop_w = sh * target_aspect;
        let x = (sw - crop_w) / 2.0;
        Rect::new(x, 0.0, x + crop_w, sh)
    } else {
        // Source is relatively taller (or equal): full width, centered
        // vertical band.
        let crop_h = sw / target_aspect;
        let y = (sh - crop_h) / 2.0;
        Rect::new(0.0, y, sw, y + crop_h)
    }
}

/// Aspect ratio (width / height) of a rectangle.
pub fn aspect(rect: &Rect) -> f64 {
    rect.width() / rect.height()
}

/// `true` when `inner` lies within `outer`, allowing `tol` units of slack
/// for accumulated floating-point rounding.
pub fn contains_with_tolerance(outer: &Rect, inner: &Rect, tol: f64) -> bool {
    inner.x0 >= outer.x0 - tol
        && inner.y0 >= outer.y0 - tol
        && inner.x1 <= outer.x1 + tol
        && inner.y1 <= outer.y1 + tol
}
