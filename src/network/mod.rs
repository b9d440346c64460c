pub mod listener;
pub mod transport;

pub use listener::{DEFAULT_PORT, Listener};
pub use transport::{UdpWire, Wire, local_address};
