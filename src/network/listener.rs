//! The UDP receive loop.
//!
//! One task owns the inbound socket. Each iteration waits for a datagram
//! with a bounded timeout so the stop flag is observed periodically even
//! if the network goes quiet; shutdown additionally fires a sentinel
//! datagram at the socket's own address to cut the wait short.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::ChatError;
use crate::model::Engine;
use crate::protocol;

/// Well-known chat port.
pub const DEFAULT_PORT: u16 = 41315;

/// Upper bound on one receive wait; also the worst-case shutdown latency.
const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest accepted datagram payload.
const MAX_FRAME: usize = 2000;

/// Handle to the running receive loop.
pub struct Listener {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    local_port: u16,
}

impl Listener {
    /// Binds the inbound socket and spawns the receive loop. A bind
    /// failure is fatal and propagates; nothing is spawned in that case.
    pub async fn bind(port: u16, engine: Arc<Mutex<Engine>>) -> Result<Self, ChatError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        let local_port = socket.local_addr()?.port();
        let stop = Arc::new(AtomicBool::new(false));
        log::info!("Listening for chat frames on port {local_port}");
        let handle = tokio::spawn(receive_loop(socket, engine, Arc::clone(&stop)));
        Ok(Self {
            stop,
            handle,
            local_port,
        })
    }

    pub fn port(&self) -> u16 {
        self.local_port
    }

    /// Cooperative shutdown: raise the stop flag, then wake a pending
    /// receive with a sentinel datagram so the loop exits promptly.
    pub async fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Ok(socket) = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)) {
            let _ = socket.send_to(b"STOP", (Ipv4Addr::LOCALHOST, self.local_port));
        }
        if let Err(err) = self.handle.await {
            log::warn!("Listener task did not shut down cleanly: {err}");
        }
    }
}

async fn receive_loop(socket: UdpSocket, engine: Arc<Mutex<Engine>>, stop: Arc<AtomicBool>) {
    let own_token = engine.lock().await.token().to_string();
    let mut buf = vec![0u8; MAX_FRAME];

    while !stop.load(Ordering::Relaxed) {
        let (len, from) = match timeout(RECV_TIMEOUT, socket.recv_from(&mut buf)).await {
            // timeout: loop around and check the stop flag
            Err(_) => continue,
            Ok(Err(err)) => {
                log::error!("Receive loop terminated by I/O error: {err}");
                engine.lock().await.listener_failed(&err.to_string());
                break;
            }
            Ok(Ok(received)) => received,
        };

        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            log::debug!("Dropping non-UTF-8 datagram from {from}");
            continue;
        };

        // one bad frame must never stop the loop
        match protocol::decode(text) {
            Err(err) => log::debug!("Dropping frame from {from}: {err}"),
            Ok(frame) if frame.token == own_token => {
                log::trace!("Dropping our own broadcast echo from {from}");
            }
            Ok(frame) => engine.lock().await.apply(frame.command, from.ip()),
        }
    }
    log::info!("Receive loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EngineEvent;
    use crate::model::{Palette, RoomKey};
    use crate::network::transport::testing::MemoryWire;
    use crate::protocol::BroadcastSelector;
    use std::net::IpAddr;
    use tokio::sync::mpsc;

    fn test_engine() -> (Arc<Mutex<Engine>>, mpsc::UnboundedReceiver<EngineEvent>) {
        let local: IpAddr = "10.0.0.1".parse().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(
            local,
            Some("A"),
            Box::new(MemoryWire::new()),
            BroadcastSelector::new(local),
            tx,
            Box::new(Palette::default()),
        );
        (Arc::new(Mutex::new(engine)), rx)
    }

    #[tokio::test]
    async fn datagram_becomes_an_engine_transition() {
        let (engine, mut rx) = test_engine();
        let listener = Listener::bind(0, Arc::clone(&engine)).await.unwrap();

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(
                b"sometoken JOIN NAME=Alice",
                ("127.0.0.1", listener.port()),
            )
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(event @ EngineEvent::NodeEntered { .. }) = rx.recv().await {
                    return event;
                }
            }
        })
        .await
        .expect("join should surface as an event");
        assert!(matches!(
            event,
            EngineEvent::NodeEntered {
                room: RoomKey::Public,
                ..
            }
        ));

        listener.stop().await;
    }

    #[tokio::test]
    async fn malformed_frames_do_not_stop_the_loop() {
        let (engine, mut rx) = test_engine();
        let listener = Listener::bind(0, Arc::clone(&engine)).await.unwrap();
        let port = listener.port();

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"garbage", ("127.0.0.1", port)).unwrap();
        sender.send_to(&[0xff, 0xfe, 0x01], ("127.0.0.1", port)).unwrap();
        sender
            .send_to(b"tok JOIN NAME=Survivor", ("127.0.0.1", port))
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(event @ EngineEvent::NodeEntered { .. }) = rx.recv().await {
                    return event;
                }
            }
        })
        .await
        .expect("valid frame after garbage still lands");
        assert!(matches!(event, EngineEvent::NodeEntered { .. }));

        listener.stop().await;
    }

    #[tokio::test]
    async fn own_token_frames_are_suppressed() {
        let (engine, mut rx) = test_engine();
        let token = engine.lock().await.token().to_string();
        let listener = Listener::bind(0, Arc::clone(&engine)).await.unwrap();
        while rx.try_recv().is_ok() {} // discard startup events

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let echo = format!("{token} JOIN NAME=Me");
        sender
            .send_to(echo.as_bytes(), ("127.0.0.1", listener.port()))
            .unwrap();
        // chase it with a frame that should land, to bound the wait
        sender
            .send_to(b"other JOIN NAME=Peer", ("127.0.0.1", listener.port()))
            .unwrap();

        // the echo must be suppressed, so the next event comes from "Peer"
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            EngineEvent::NodeEntered { name, .. } => assert_eq!(name, "Peer"),
            other => panic!("unexpected event {other:?}"),
        }

        listener.stop().await;
    }

    #[tokio::test]
    async fn shutdown_completes_promptly() {
        let (engine, _rx) = test_engine();
        let listener = Listener::bind(0, engine).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), listener.stop())
            .await
            .expect("wake datagram should unblock the pending receive");
    }
}
