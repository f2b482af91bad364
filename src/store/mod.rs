pub mod document;
pub mod mutator;
pub mod reconcile;
