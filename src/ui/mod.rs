mod commands;
mod text;

pub use commands::{MapCommand, MapSink, NoticeLevel, PinMarker, SharedMarker};
pub use text::{describe, TextRenderer};
