pub mod color;
pub mod types;

pub use color::DisplayColor;
pub use types::ChatMessage;
