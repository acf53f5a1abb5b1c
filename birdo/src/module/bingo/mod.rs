//! Bingo card selection, layout and rendering

pub mod composer;
pub mod renderer;
pub mod selection;

pub use composer::{BingoCard, CardCell, CardComposer};
pub use renderer::{card_filename, CardRenderer};
pub use selection::generate_selections;
