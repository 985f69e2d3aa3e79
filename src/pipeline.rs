use tracing::{debug, instrument};

use crate::assets::{AssetLoader, SourceImage};
use crate::background::{self, BackgroundSpec};
use crate::compose::draw_slot;
use crate::error::{PhotostripError, PhotostripResult};
use crate::layout::{self, LayoutName};
use crate::overlay;
use crate::surface::{RenderedImage, Surface};

/// Aggregate input for one render. Created fresh per call; the engine keeps
/// no state between renders and never memoizes.
///
/// The request must be fully specified; there is no implicit layout or
/// background fallback inside the engine. `resolution_scale` carries a
/// documented default of `1.0`, resolved at the JSON parse boundary only.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderRequest {
    pub layout: LayoutName,
    pub background: BackgroundSpec,
    #[serde(default = "default_resolution_scale")]
    pub resolution_scale: f64,
}

fn default_resolution_scale() -> f64 {
    1.0
}

/// Compose one finished photo print.
///
/// `photos` are encoded image byte sources (PNG, JPEG, ...), ordered; the
/// resolved template dictates how many are required (four for every current
/// template). Stages run in strict sequence: resolve layout, validate the
/// source count, decode sources, paint the background, composite every slot,
/// apply the overlay.
///
/// Fatal failures (unknown layout, wrong source count, undecodable source)
/// abort with no partial output. Background-asset and overlay failures are
/// absorbed with deterministic fallbacks; the caller only ever sees success
/// or a fatal error.
#[instrument(skip_all, fields(layout = %request.layout))]
pub fn render(
    request: &RenderRequest,
    photos: &[Vec<u8>],
    loader: &dyn AssetLoader,
) -> PhotostripResult<RenderedImage> {
    let spec = layout::resolve(request.layout, request.resolution_scale)?;
    check_source_count(spec.name, spec.required_sources(), photos.len())?;

    let mut sources = Vec::with_capacity(photos.len());
    for (slot, bytes) in photos.iter().enumerate() {
        let img = SourceImage::decode(bytes)
            .map_err(|e| PhotostripError::source_decode(slot, e.to_string()))?;
        sources.push(img);
    }

    render_decoded(request, &sources, loader)
}

/// Like [`render`], for callers that already hold decoded pixels.
pub fn render_decoded(
    request: &RenderRequest,
    sources: &[SourceImage],
    loader: &dyn AssetLoader,
) -> PhotostripResult<RenderedImage> {
    let spec = layout::resolve(request.layout, request.resolution_scale)?;
    check_source_count(spec.name, spec.required_sources(), sources.len())?;

    let mut surface = Surface::new(spec.canvas_width, spec.canvas_height)?;
    debug!(
        width = spec.canvas_width,
        height = spec.canvas_height,
        "canvas allocated"
    );

    background::paint(&mut surface, &request.background, loader);
    debug!("background painted");

    // Slots write disjoint canvas regions; order among them is free, but
    // all must land after the background and before the overlay.
    for slot in &spec.slots {
        draw_slot(&mut surface, slot, &sources[slot.source_index]);
    }
    debug!(slots = spec.slots.len(), "slots composited");

    if let Some(ov) = &spec.overlay {
        overlay::apply(&mut surface, ov, loader);
    }

    Ok(surface.into_rendered())
}

fn check_source_count(layout: LayoutName, expected: usize, actual: usize) -> PhotostripResult<()> {
    if expected != actual {
        return Err(PhotostripError::SourceCountMismatch {
            layout: layout.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
