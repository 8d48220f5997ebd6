//! Application commands - the surface a board UI drives

mod board;
mod opportunities;
mod stages;

pub use board::*;
pub use opportunities::*;
pub use stages::*;
