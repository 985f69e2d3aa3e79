use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::error::{PhotostripError, PhotostripResult};
use crate::surface::PremulRgba8;

/// A decoded source photo: immutable premultiplied RGBA8 pixels.
///
/// Owned by the caller; the compositor only reads it. Cloning is cheap (the
/// pixel buffer is shared).
#[derive(Clone, Debug)]
pub struct SourceImage {
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl SourceImage {
    /// Decode an encoded image (PNG, JPEG, ...) into premultiplied RGBA8.
    ///
    /// This is the engine's only I/O-shaped suspension point.
    pub fn decode(bytes: &[u8]) -> PhotostripResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgba8_premul = rgba.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);

        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Wrap straight-alpha RGBA8 pixels already in memory.
    pub fn from_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> PhotostripResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        if width == 0 || height == 0 || expected != Some(rgba.len()) {
            return Err(PhotostripError::validation(
                "rgba buffer does not match width*height*4",
            ));
        }
        premultiply_rgba8_in_place(&mut rgba);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fetch a pixel, clamping coordinates to the image edge.
    pub fn pixel_clamped(&self, x: i64, y: i64) -> PremulRgba8 {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        let idx = (y * self.width as usize + x) * 4;
        let d = &self.rgba8_premul;
        [d[idx], d[idx + 1], d[idx + 2], d[idx + 3]]
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        if a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Resolves asset references (background walls, the stamp font) to raw
/// bytes. The engine treats this as its only external collaborator; loader
/// failures at the background boundary are absorbed, never propagated.
pub trait AssetLoader {
    fn load(&self, asset: &str) -> PhotostripResult<Vec<u8>>;
}

/// Filesystem loader rooted at a directory.
///
/// References are normalized to forward slashes and must stay inside the
/// root: absolute paths and `..` traversals are rejected.
#[derive(Clone, Debug)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLoader for DirLoader {
    fn load(&self, asset: &str) -> PhotostripResult<Vec<u8>> {
        let rel = normalize_rel_path(asset)?;
        let path = self.root.join(rel);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read asset '{}'", path.display()))?;
        Ok(bytes)
    }
}

/// In-memory loader for tests and embedded assets.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(asset.into(), bytes);
    }
}

impl AssetLoader for MemoryLoader {
    fn load(&self, asset: &str) -> PhotostripResult<Vec<u8>> {
        self.entries
            .get(asset)
            .cloned()
            .ok_or_else(|| PhotostripError::validation(format!("unknown asset '{asset}'")))
    }
}

/// Normalize and validate loader-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> PhotostripResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(PhotostripError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(PhotostripError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(PhotostripError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(PhotostripError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}
