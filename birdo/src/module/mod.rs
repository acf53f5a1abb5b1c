pub mod bingo;
pub mod ebird;
pub mod images;
pub mod location;
pub mod pipeline;
