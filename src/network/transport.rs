//! Outbound UDP transport.
//!
//! Sends are fire-and-forget datagram writes from a single socket bound to
//! an ephemeral port. The engine talks to the wire through a trait so the
//! transition logic stays synchronous and testable.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Outbound side of the transport: deliver one frame to one address.
pub trait Wire: Send + Sync {
    fn send(&self, payload: &str, to: IpAddr) -> io::Result<()>;
}

/// Real UDP wire. One socket covers unicast and broadcast sends; every
/// frame targets the well-known chat port.
pub struct UdpWire {
    socket: UdpSocket,
    port: u16,
}

impl UdpWire {
    pub fn new(port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;
        Ok(Self { socket, port })
    }
}

impl Wire for UdpWire {
    fn send(&self, payload: &str, to: IpAddr) -> io::Result<()> {
        self.socket.send_to(payload.as_bytes(), (to, self.port))?;
        Ok(())
    }
}

/// Best-effort guess of this machine's outward-facing address, read off a
/// probe socket "connected" to a public address. No traffic is sent.
pub fn local_address() -> io::Result<IpAddr> {
    let probe = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    probe.connect(("8.8.8.8", 10002))?;
    Ok(probe.local_addr()?.ip())
}
