use kurbo::Rect;
use tracing::warn;

use crate::assets::{AssetLoader, SourceImage};
use crate::compose::draw_region;
use crate::error::{PhotostripError, PhotostripResult};
use crate::surface::{Surface, opaque};

/// Deterministic fill used when a background image asset cannot be loaded.
/// A broken wall asset must never abort photo compositing.
pub const FALLBACK_FILL: [u8; 3] = [255, 255, 255];

pub const SOLID_LIGHT: [u8; 3] = [255, 255, 255];
pub const SOLID_DARK: [u8; 3] = [0, 0, 0];

/// The fixed neon gradient: stop offsets and colors are not user-tunable.
pub const GRADIENT_STOPS: [(f64, [u8; 3]); 5] = [
    (0.0, [255, 0, 255]),
    (0.25, [0, 255, 255]),
    (0.5, [255, 0, 255]),
    (0.75, [255, 255, 0]),
    (1.0, [255, 0, 255]),
];

/// Background choice for a render. Resolved once per render, never mutated
/// mid-render.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackgroundSpec {
    Solid { color: [u8; 3] },
    Gradient,
    Image { asset: String },
}

impl BackgroundSpec {
    pub fn solid_light() -> Self {
        Self::Solid { color: SOLID_LIGHT }
    }

    pub fn solid_dark() -> Self {
        Self::Solid { color: SOLID_DARK }
    }

    pub fn image(asset: impl Into<String>) -> Self {
        Self::Image {
            asset: asset.into(),
        }
    }
}

/// Paint the full canvas before any photo is drawn.
///
/// The image path fails soft: any load or decode error is absorbed here with
/// a deterministic [`FALLBACK_FILL`] and the render proceeds.
pub fn paint(surface: &mut Surface, spec: &BackgroundSpec, loader: &dyn AssetLoader) {
    match spec {
        BackgroundSpec::Solid { color } => surface.fill(*color),
        BackgroundSpec::Gradient => paint_gradient(surface),
        BackgroundSpec::Image { asset } => {
            if let Err(err) = paint_image(surface, asset, loader) {
                warn!(asset = %asset, error = %err, "background asset failed; using fallback fill");
                surface.fill(FALLBACK_FILL);
            }
        }
    }
}

fn paint_image(
    surface: &mut Surface,
    asset: &str,
    loader: &dyn AssetLoader,
) -> PhotostripResult<()> {
    let bytes = loader
        .load(asset)
        .map_err(|e| PhotostripError::background_asset(asset, e.to_string()))?;
    let img = SourceImage::decode(&bytes)
        .map_err(|e| PhotostripError::background_asset(asset, e.to_string()))?;

    // Stretch to cover the whole canvas; the wall asset's aspect ratio is
    // intentionally not preserved.
    let full_src = Rect::new(0.0, 0.0, f64::from(img.width()), f64::from(img.height()));
    let full_dest = Rect::new(
        0.0,
        0.0,
        f64::from(surface.width()),
        f64::from(surface.height()),
    );
    draw_region(surface, &full_dest, &img, &full_src);
    Ok(())
}

fn paint_gradient(surface: &mut Surface) {
    let w = f64::from(surface.width());
    let h = f64::from(surface.height());
    // Linear gradient along the top-left to bottom-right diagonal: project
    // each pixel center onto the diagonal direction.
    let denom = w * w + h * h;
    for y in 0..surface.height() {
        let fy = (f64::from(y) + 0.5) * h;
        for x in 0..surface.width() {
            let t = ((f64::from(x) + 0.5) * w + fy) / denom;
            surface.put_pixel(x, y, opaque(gradient_color(t.clamp(0.0, 1.0))));
        }
    }
}

/// Color of the fixed gradient at parameter `t` in `[0, 1]`.
pub fn gradient_color(t: f64) -> [u8; 3] {
    let stops = &GRADIENT_STOPS;
    if t <= stops[0].0 {
        return stops[0].1;
    }
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            let mut out = [0u8; 3];
            for (i, slot) in out.iter_mut().enumerate() {
                let v = f64::from(c0[i]) + (f64::from(c1[i]) - f64::from(c0[i])) * f;
                *slot = v.round().clamp(0.0, 255.0) as u8;
            }
            return out;
        }
    }
    stops[stops.len() - 1].1
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::assets::MemoryLoader;

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img =
            image::RgbaImage::from_raw(width, height, rgba.repeat((width * height) as usize))
                .unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn solid_fills_every_pixel() {
        let mut surface = Surface::new(3, 3).unwrap();
        paint(
            &mut surface,
            &BackgroundSpec::solid_dark(),
            &MemoryLoader::new(),
        );
        assert_eq!(surface.pixel(1, 1).unwrap(), [0, 0, 0, 255]);
    }

    #[test]
    fn gradient_endpoints_and_midpoints_hit_stops() {
        assert_eq!(gradient_color(0.0), [255, 0, 255]);
        assert_eq!(gradient_color(0.25), [0, 255, 255]);
        assert_eq!(gradient_color(0.5), [255, 0, 255]);
        assert_eq!(gradient_color(0.75), [255, 255, 0]);
        assert_eq!(gradient_color(1.0), [255, 0, 255]);
    }

    #[test]
    fn gradient_paints_full_canvas() {
        let mut surface = Surface::new(16, 16).unwrap();
        paint(&mut surface, &BackgroundSpec::Gradient, &MemoryLoader::new());
        // Every pixel opaque, and the two corners land near the magenta
        // endpoints of the stop list.
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(surface.pixel(x, y).unwrap()[3], 255);
            }
        }
        let tl = surface.pixel(0, 0).unwrap();
        let br = surface.pixel(15, 15).unwrap();
        assert!(tl[0] > 200 && tl[2] > 200, "top-left ~magenta: {tl:?}");
        assert!(br[0] > 200 && br[2] > 200, "bottom-right ~magenta: {br:?}");
    }

    #[test]
    fn image_background_stretches_to_cover() {
        let mut loader = MemoryLoader::new();
        loader.insert("wall.png", png_bytes(2, 2, [10, 200, 30, 255]));

        let mut surface = Surface::new(8, 4).unwrap();
        paint(&mut surface, &BackgroundSpec::image("wall.png"), &loader);
        assert_eq!(surface.pixel(0, 0).unwrap(), [10, 200, 30, 255]);
        assert_eq!(surface.pixel(7, 3).unwrap(), [10, 200, 30, 255]);
    }

    #[test]
    fn missing_image_falls_back_to_named_fill() {
        let mut surface = Surface::new(4, 4).unwrap();
        paint(
            &mut surface,
            &BackgroundSpec::image("nope.jpg"),
            &MemoryLoader::new(),
        );
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(surface.pixel(x, y).unwrap(), opaque(FALLBACK_FILL));
            }
        }
    }

    #[test]
    fn corrupt_image_falls_back_to_named_fill() {
        let mut loader = MemoryLoader::new();
        loader.insert("wall.png", b"definitely not a png".to_vec());

        let mut surface = Surface::new(4, 4).unwrap();
        paint(&mut surface, &BackgroundSpec::image("wall.png"), &loader);
        assert_eq!(surface.pixel(2, 2).unwrap(), opaque(FALLBACK_FILL));
    }

    #[test]
    fn background_spec_serde_round_trip() {
        let specs = [
            BackgroundSpec::solid_light(),
            BackgroundSpec::Gradient,
            BackgroundSpec::image("walls/brick.jpg"),
        ];
        for spec in specs {
            let json = serde_json::to_string(&spec).unwrap();
            let back: BackgroundSpec = serde_json::from_str(&json).unwrap();
            assert_eq!(back, spec);
        }
        let json = serde_json::to_string(&BackgroundSpec::Gradient).unwrap();
        assert_eq!(json, r#"{"kind":"gradient"}"#);
    }
}
