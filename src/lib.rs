#![forbid(unsafe_code)]
//! Editor core for social preview cards (Open Graph / Twitter Card images).
//!
//! A card is an [`EditorState`]: a canvas background plus an ordered stack of text, logo and
//! image layers. [`Document`] owns the state and applies mutations, [`InteractionController`]
//! turns pointer input into selection and drags, [`Compositor`] paints the state onto a
//! [`Surface`], and [`export_surface`] encodes a painted surface as PNG or JPEG.

pub mod assets;
pub mod config;
pub mod export;
pub mod foundation;
pub mod interact;
pub mod layout;
pub mod model;
pub mod persist;
pub mod render;
pub mod store;

pub use assets::{
    blob::{BlobStore, DirBlobStore, MemoryBlobStore},
    cache::{ImageCache, ImageStatus},
    decode::DecodedImage,
    source::ImageResolver,
};
pub use config::EditorConfig;
pub use export::{
    ExportEncoding, ExportOptions, ExportPreset, ExportedImage, export_file_name, export_surface,
};
pub use foundation::{
    color::Color,
    core::{Affine, Point, Rect, Rgba8Premul, Size, Surface, Vec2},
    error::{CardError, CardResult},
};
pub use interact::controller::{InteractionController, PointerAction, SnapMode};
pub use layout::{
    metrics::{FixedAdvanceMeasure, ImageDimensions, NoImages, TextMeasure},
    text::TextEngine,
};
pub use model::{
    canvas::{BackgroundType, CanvasState},
    layer::{Layer, LayerId, LayerKind},
    state::{BrandKit, EditorState},
};
pub use persist::template::TemplateStore;
pub use render::{Compositor, CompositorOpts, FrameSignature, RenderOutcome};
pub use store::{document::Document, reconcile::reconcile};
