pub mod compositor;
pub mod fingerprint;
pub mod raster;

pub use compositor::{CanvasListener, Compositor, CompositorOpts, RenderOutcome};
pub use fingerprint::FrameSignature;
