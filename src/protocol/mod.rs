pub mod broadcast;
pub mod codec;

pub use broadcast::BroadcastSelector;
pub use codec::{Codec, Command, DecodeError, Frame, decode};
