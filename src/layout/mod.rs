pub mod metrics;
pub mod text;
