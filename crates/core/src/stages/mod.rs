//! Pipeline stage management

pub mod registry;

pub use registry::{renumber, StageRegistry};
