use std::io::Cursor;

use anyhow::Context as _;

use crate::error::{PhotostripError, PhotostripResult};

/// One pixel in premultiplied RGBA8 form (r,g,b already multiplied by a).
pub type PremulRgba8 = [u8; 4];

/// Per-render canvas buffer in row-major premultiplied RGBA8.
///
/// Every render allocates its own `Surface`; nothing is shared across
/// renders, so concurrent callers need no locking.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> PhotostripResult<Self> {
        if width == 0 || height == 0 {
            return Err(PhotostripError::validation(
                "surface width/height must be > 0",
            ));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| PhotostripError::validation("surface byte size overflows usize"))?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Flood-fill the whole canvas with an opaque color.
    pub fn fill(&mut self, rgb: [u8; 3]) {
        let px = opaque(rgb);
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Overwrite one pixel. Out-of-bounds coordinates are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, px: PremulRgba8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data[idx..idx + 4].copy_from_slice(&px);
    }

    /// Source-over blend one pixel. Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: u32, y: u32, src: PremulRgba8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let dst = [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ];
        self.data[idx..idx + 4].copy_from_slice(&over(dst, src));
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    pub fn into_rendered(self) -> RenderedImage {
        RenderedImage {
            width: self.width,
            height: self.height,
            data: self.data,
        }
    }
}

/// Finalized render output: pixel buffer, dimensions, suggested MIME type.
///
/// The engine keeps no reference after returning one of these.
#[derive(Clone, Debug)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8. Every template paints the full canvas opaque, so
    /// premultiplied and straight alpha coincide.
    pub data: Vec<u8>,
}

impl RenderedImage {
    pub fn mime_type(&self) -> &'static str {
        "image/png"
    }

    /// Serialize to PNG bytes on demand.
    pub fn encode_png(&self) -> PhotostripResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| {
                PhotostripError::validation("rendered buffer does not match its dimensions")
            })?;
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .context("encode rendered image as png")?;
        Ok(out)
    }
}

/// Promote an opaque RGB color to a premultiplied pixel.
pub fn opaque(rgb: [u8; 3]) -> PremulRgba8 {
    [rgb[0], rgb[1], rgb[2], 255]
}

/// Source-over for premultiplied RGBA8.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 255 {
        return src;
    }
    if src[3] == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
