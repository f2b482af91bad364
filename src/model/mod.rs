pub mod canvas;
pub mod defaults;
pub mod layer;
pub(crate) mod lenient;
pub mod state;
