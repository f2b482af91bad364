pub mod blob;
pub mod cache;
pub mod decode;
pub mod source;
