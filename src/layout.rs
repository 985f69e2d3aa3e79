use std::fmt;
use std::str::FromStr;

use kurbo::{Point, Rect};

use crate::error::{PhotostripError, PhotostripResult};

/// Canvas units are print inches, rasterized at this many dots per unit
/// before `resolution_scale` is applied.
pub const DOTS_PER_UNIT: f64 = 300.0;

/// Supported layout templates. A closed set with no default and no
/// fallback; unknown identifiers fail at the string boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutName {
    /// Narrow 2×6-unit strip, four landscape photos stacked vertically.
    Strip,
    /// 8×8-unit square, 2×2 grid of square photos.
    Grid,
    /// 6×6-unit square, one big photo over three small columns, stamped.
    Collage,
}

impl LayoutName {
    pub const ALL: [LayoutName; 3] = [LayoutName::Strip, LayoutName::Grid, LayoutName::Collage];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutName::Strip => "strip",
            LayoutName::Grid => "grid",
            LayoutName::Collage => "collage",
        }
    }
}

impl fmt::Display for LayoutName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutName {
    type Err = PhotostripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strip" => Ok(LayoutName::Strip),
            "grid" => Ok(LayoutName::Grid),
            "collage" => Ok(LayoutName::Collage),
            other => Err(PhotostripError::UnsupportedLayout(other.to_string())),
        }
    }
}

/// One destination rectangle on the canvas, filled from the source photo at
/// `source_index`.
#[derive(Clone, Debug)]
pub struct Slot {
    pub source_index: usize,
    pub rect: Rect,
}

/// Decorative stamp drawn after all slots are filled. Purely cosmetic; the
/// overlay pass may skip it without failing the render.
#[derive(Clone, Debug)]
pub struct OverlaySpec {
    pub text: String,
    /// Asset reference for the stamp font, resolved through the render's
    /// asset loader.
    pub font_asset: String,
    /// Bottom-right text anchor in canvas pixels.
    pub anchor: Point,
    /// Rotation in radians about the anchor.
    pub rotation: f64,
    pub font_px: f64,
    pub fill: [u8; 3],
    pub stroke: [u8; 3],
    pub stroke_px: f64,
}

/// A fully resolved template: canvas size in pixels plus placement slots.
#[derive(Clone, Debug)]
pub struct LayoutSpec {
    pub name: LayoutName,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub slots: Vec<Slot>,
    pub overlay: Option<OverlaySpec>,
}

impl LayoutSpec {
    /// Number of source photos the template consumes.
    pub fn required_sources(&self) -> usize {
        self.slots
            .iter()
            .map(|s| s.source_index + 1)
            .max()
            .unwrap_or(0)
    }
}

// Template constants, all in canvas units so every dimension scales
// uniformly with `resolution_scale`.

const STRIP_CANVAS_W: f64 = 2.0;
const STRIP_CANVAS_H: f64 = 6.0;
const STRIP_PHOTO_W: f64 = 1.7;
const STRIP_PHOTO_ASPECT: f64 = 4.0 / 3.0;
const STRIP_SPACING: f64 = 0.1;

const GRID_CANVAS: f64 = 8.0;
const GRID_PADDING: f64 = 0.5;
const GRID_SPACING: f64 = 0.2;

const COLLAGE_CANVAS: f64 = 6.0;
const COLLAGE_PADDING: f64 = 0.5;
const COLLAGE_SPACING: f64 = 0.2;
/// Share of the interior height taken by the big photo.
const COLLAGE_BIG_SHARE: f64 = 0.6;

const STAMP_TEXT: &str = "BOOTH APPROVED";
const STAMP_FONT_ASSET: &str = "stamp.ttf";
const STAMP_ROTATION: f64 = -0.1;
const STAMP_FONT_UNITS: f64 = 0.15;
const STAMP_NUDGE: f64 = 20.0 / DOTS_PER_UNIT;
const STAMP_STROKE_UNITS: f64 = 3.0 / DOTS_PER_UNIT;
const STAMP_FILL: [u8; 3] = [255, 215, 0];
const STAMP_STROKE: [u8; 3] = [0, 0, 0];

/// Resolve a layout template at the given resolution scale.
///
/// Pure: same inputs, same spec. Fails only on a non-positive or non-finite
/// scale; unknown layout names never reach this point (see [`LayoutName`]).
pub fn resolve(name: LayoutName, resolution_scale: f64) -> PhotostripResult<LayoutSpec> {
    if !resolution_scale.is_finite() || resolution_scale <= 0.0 {
        return Err(PhotostripError::validation(
            "resolution_scale must be finite and > 0",
        ));
    }

    let px = |units: f64| units * DOTS_PER_UNIT * resolution_scale;

    let spec = match name {
        LayoutName::Strip => {
            let photo_w = px(STRIP_PHOTO_W);
            let photo_h = photo_w / STRIP_PHOTO_ASPECT;
            let spacing = px(STRIP_SPACING);
            let canvas_w = px(STRIP_CANVAS_W);
            let canvas_h = px(STRIP_CANVAS_H);

            // Photos centered horizontally, the four-slot group centered
            // vertically.
            let x = (canvas_w - photo_w) / 2.0;
            let top = (canvas_h - 4.0 * photo_h - 3.0 * spacing) / 2.0;

            let slots = (0..4)
                .map(|i| {
                    let y = top + (i as f64) * (photo_h + spacing);
                    Slot {
                        source_index: i,
                        rect: Rect::new(x, y, x + photo_w, y + photo_h),
                    }
                })
                .collect();

            LayoutSpec {
                name,
                canvas_width: round_dim(canvas_w)?,
                canvas_height: round_dim(canvas_h)?,
                slots,
                overlay: None,
            }
        }
        LayoutName::Grid => {
            let canvas = px(GRID_CANVAS);
            let padding = px(GRID_PADDING);
            let spacing = px(GRID_SPACING);
            let cell = (canvas - 2.0 * padding - spacing) / 2.0;

            let slots = (0..4)
                .map(|i| {
                    let row = (i / 2) as f64;
                    let col = (i % 2) as f64;
                    let x = padding + col * (cell + spacing);
                    let y = padding + row * (cell + spacing);
                    Slot {
                        source_index: i,
                        rect: Rect::new(x, y, x + cell, y + cell),
                    }
                })
                .collect();

            LayoutSpec {
                name,
                canvas_width: round_dim(canvas)?,
                canvas_height: round_dim(canvas)?,
                slots,
                overlay: None,
            }
        }
        LayoutName::Collage => {
            let canvas = px(COLLAGE_CANVAS);
            let padding = px(COLLAGE_PADDING);
            let spacing = px(COLLAGE_SPACING);

            let interior_w = canvas - 2.0 * padding;
            let usable_h = canvas - 2.0 * padding - spacing;
            let big_h = usable_h * COLLAGE_BIG_SHARE;
            let small_h = usable_h * (1.0 - COLLAGE_BIG_SHARE);
            let small_w = (interior_w - 2.0 * spacing) / 3.0;
            let small_y = padding + big_h + spacing;

            let mut slots = Vec::with_capacity(4);
            slots.push(Slot {
                source_index: 0,
                rect: Rect::new(padding, padding, padding + interior_w, padding + big_h),
            });
            for i in 0..3 {
                let x = padding + (i as f64) * (small_w + spacing);
                slots.push(Slot {
                    source_index: i + 1,
                    rect: Rect::new(x, small_y, x + small_w, small_y + small_h),
                });
            }

            let overlay = OverlaySpec {
                text: STAMP_TEXT.to_string(),
                font_asset: STAMP_FONT_ASSET.to_string(),
                anchor: Point::new(
                    canvas - padding - px(STAMP_NUDGE),
                    canvas - padding - px(STAMP_NUDGE),
                ),
                rotation: STAMP_ROTATION,
                font_px: px(STAMP_FONT_UNITS),
                fill: STAMP_FILL,
                stroke: STAMP_STROKE,
                stroke_px: px(STAMP_STROKE_UNITS),
            };

            LayoutSpec {
                name,
                canvas_width: round_dim(canvas)?,
                canvas_height: round_dim(canvas)?,
                slots,
                overlay: Some(overlay),
            }
        }
    };

    Ok(spec)
}

fn round_dim(px: f64) -> PhotostripResult<u32> {
    let r = px.round();
    if !(1.0..=f64::from(u32::MAX)).contains(&r) {
        return Err(PhotostripError::validation(format!(
            "canvas dimension {px} out of range"
        )));
    }
    Ok(r as u32)
}
