#![forbid(unsafe_code)]

pub mod assets;
pub mod background;
pub mod compose;
pub mod error;
pub mod geom;
pub mod layout;
pub mod overlay;
pub mod pipeline;
pub mod store;
pub mod surface;

pub use assets::{AssetLoader, DirLoader, MemoryLoader, SourceImage};
pub use background::{BackgroundSpec, FALLBACK_FILL};
pub use error::{PhotostripError, PhotostripResult};
pub use layout::{LayoutName, LayoutSpec, OverlaySpec, Slot, resolve};
pub use pipeline::{RenderRequest, render, render_decoded};
pub use store::{PhotoStore, StoredFormat, StoredPhoto};
pub use surface::{RenderedImage, Surface};
