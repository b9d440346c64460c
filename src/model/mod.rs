pub mod engine;
pub mod message;
pub mod node;
pub mod room;
pub mod style;

pub use engine::Engine;
pub use message::Message;
pub use node::{Node, is_valid_name};
pub use room::{Room, RoomKey, RoomTable};
pub use style::{Palette, StyleAllocator, StyleToken};
