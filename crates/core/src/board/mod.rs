//! Pipeline board: grouping, drag-and-drop and draft lifecycle

pub mod commands;
pub mod controller;
pub mod grouping;
pub mod notices;

pub use commands::{DeleteRequest, LineItemLoad, ProductLookup, SaveRequest, StageEdit, StageMove};
pub use controller::{BoardController, MoveOutcome};
pub use grouping::{BoardColumn, BoardView};
pub use notices::{Notice, NoticeLevel};
