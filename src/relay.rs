//! # VISCA Relay Module
//!
//! Transparent UDP forwarder that lets a VISCA controller on one network
//! reach a camera on another through this host.
//!
//! ## Routing
//!
//! One socket receives from both sides:
//!
//! - a packet from the camera address is a reply and goes to the last
//!   controller address seen; the controller address is kept, since one
//!   command may get several replies (ACK then completion)
//! - any other packet comes from a controller: its sender becomes the
//!   controller address and the packet goes to the camera
//!
//! Packets are never inspected or modified. With no camera destination set
//! (or no controller learned yet) a packet is dropped.
//!
//! The camera destination can be changed at any time through a
//! [`RelayHandle`], while the forwarding loop is running. Host names are
//! resolved with [`resolve`] on the runtime; callers that must not wait
//! (input handlers) resolve ahead of time and use
//! [`RelayHandle::set_destination_addr`].
//!
//! ## Usage
//!
//! ```no_run
//! use tokio::sync::watch;
//! use visca_joystick::relay::ViscaRelay;
//!
//! # async fn example() -> visca_joystick::error::Result<()> {
//! let relay = ViscaRelay::bind(52381).await?;
//! let handle = relay.handle();
//! handle.set_destination("10.100.1.202", 52381).await;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let task = tokio::spawn(relay.run(shutdown_rx));
//! // ...
//! let _ = shutdown_tx.send(true);
//! task.await.ok();
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Result, ViscaJoystickError};

/// Largest datagram relayed; VISCA-over-IP packets are far smaller.
pub const MAX_PACKET_SIZE: usize = 1024;

/// Bound on each receive wait, so shutdown is noticed.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Whether a controller peer has been learned yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Learning,
    Active,
}

/// The two peer addresses the relay routes between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayPeers {
    pub camera: Option<SocketAddr>,
    pub controller: Option<SocketAddr>,
}

impl RelayPeers {
    #[must_use]
    pub fn state(&self) -> RelayState {
        if self.controller.is_some() {
            RelayState::Active
        } else {
            RelayState::Learning
        }
    }

    /// Picks the destination for a packet from `src`, learning the
    /// controller address when `src` is not the camera.
    pub fn route(&mut self, src: SocketAddr) -> Option<SocketAddr> {
        if self.camera == Some(src) {
            self.controller
        } else {
            self.controller = Some(src);
            self.camera
        }
    }
}

/// Resolves `host:port` without blocking the runtime, preferring IPv4.
///
/// Returns `None` when the lookup fails or yields nothing.
pub async fn resolve(host: &str, port: u16) -> Option<SocketAddr> {
    match lookup_host((host, port)).await {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            addrs
                .iter()
                .find(|a| a.is_ipv4())
                .or_else(|| addrs.first())
                .copied()
        }
        Err(e) => {
            debug!("Cannot resolve {}: {}", host, e);
            None
        }
    }
}

/// Shared access to the relay's peer addresses.
#[derive(Debug, Clone, Default)]
pub struct RelayHandle {
    peers: Arc<Mutex<RelayPeers>>,
}

impl RelayHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `host` and makes it the camera destination.
    ///
    /// IPv4 results are preferred. If resolution fails the previous
    /// destination is kept and `false` is returned.
    pub async fn set_destination(&self, host: &str, port: u16) -> bool {
        match resolve(host, port).await {
            Some(addr) => {
                self.set_destination_addr(addr);
                true
            }
            None => {
                warn!("Relay destination {}:{} not resolved, keeping previous", host, port);
                false
            }
        }
    }

    pub fn set_destination_addr(&self, addr: SocketAddr) {
        self.lock().camera = Some(addr);
        info!("Relay destination set to {}", addr);
    }

    /// Removes the camera destination; controller packets are dropped
    /// until a new one is set.
    pub fn clear_destination(&self) {
        if self.lock().camera.take().is_some() {
            info!("Relay destination cleared");
        }
    }

    #[must_use]
    pub fn destination(&self) -> Option<SocketAddr> {
        self.lock().camera
    }

    /// Last controller address learned.
    #[must_use]
    pub fn controller(&self) -> Option<SocketAddr> {
        self.lock().controller
    }

    #[must_use]
    pub fn state(&self) -> RelayState {
        self.lock().state()
    }

    #[must_use]
    pub fn peers(&self) -> RelayPeers {
        *self.lock()
    }

    fn route(&self, src: SocketAddr) -> Option<SocketAddr> {
        self.lock().route(src)
    }

    // Peers are plain addresses; a panic elsewhere cannot leave them half-written.
    fn lock(&self) -> std::sync::MutexGuard<'_, RelayPeers> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receive errors that do not stop the relay.
///
/// A peer that has gone away surfaces as a reset or refused error on the
/// next receive after an ICMP port-unreachable.
#[must_use]
pub fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
    )
}

/// UDP relay bound to a local port.
#[derive(Debug)]
pub struct ViscaRelay {
    socket: UdpSocket,
    handle: RelayHandle,
}

impl ViscaRelay {
    /// Binds on all IPv4 interfaces.
    ///
    /// # Errors
    ///
    /// Returns `Relay` if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        Self::bind_addr(SocketAddr::from(([0, 0, 0, 0], port))).await
    }

    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| ViscaJoystickError::Relay(format!("Failed to bind {}: {}", addr, e)))?;
        info!("VISCA relay listening on {}", socket.local_addr().unwrap_or(addr));
        Ok(Self {
            socket,
            handle: RelayHandle::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Handle for changing the destination while the relay runs.
    #[must_use]
    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Forwards packets until `shutdown` turns true (or its sender is dropped).
    ///
    /// # Errors
    ///
    /// Returns `Relay` on a receive error other than a peer reset.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                break;
            }

            let (len, src) = match timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buffer)).await {
                Err(_) => continue,
                Ok(Ok(received)) => received,
                Ok(Err(e)) if is_transient(&e) => {
                    debug!("Relay receive: {}", e);
                    continue;
                }
                Ok(Err(e)) => {
                    error!("VISCA relay stopped: {}", e);
                    return Err(ViscaJoystickError::Relay(format!("Receive failed: {}", e)));
                }
            };

            let Some(dst) = self.handle.route(src) else {
                trace!("Dropping {} bytes from {}, no peer", len, src);
                continue;
            };

            trace!("Relaying {} bytes {} -> {}", len, src, dst);
            if let Err(e) = self.socket.send_to(&buffer[..len], dst).await {
                warn!("Relay send to {} failed: {}", dst, e);
            }
        }

        info!("VISCA relay stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    async fn local_socket() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    async fn recv(socket: &UdpSocket) -> (Vec<u8>, SocketAddr) {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let (len, src) = timeout(WAIT, socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for packet")
            .unwrap();
        (buf[..len].to_vec(), src)
    }

    // ==================== Routing Tests ====================

    #[test]
    fn test_route_learns_controller() {
        let mut peers = RelayPeers {
            camera: Some(addr("10.0.0.2:52381")),
            controller: None,
        };
        assert_eq!(peers.state(), RelayState::Learning);

        let a = addr("192.168.1.10:40000");
        assert_eq!(peers.route(a), Some(addr("10.0.0.2:52381")));
        assert_eq!(peers.controller, Some(a));
        assert_eq!(peers.state(), RelayState::Active);
    }

    #[test]
    fn test_route_replies_keep_controller() {
        let camera = addr("10.0.0.2:52381");
        let a = addr("192.168.1.10:40000");
        let mut peers = RelayPeers {
            camera: Some(camera),
            controller: None,
        };
        peers.route(a);
        assert_eq!(peers.route(camera), Some(a));
        assert_eq!(peers.route(camera), Some(a));
        assert_eq!(peers.controller, Some(a));
    }

    #[test]
    fn test_route_new_controller_overwrites() {
        let camera = addr("10.0.0.2:52381");
        let mut peers = RelayPeers {
            camera: Some(camera),
            controller: None,
        };
        peers.route(addr("192.168.1.10:40000"));
        peers.route(addr("192.168.1.11:40001"));
        assert_eq!(peers.route(camera), Some(addr("192.168.1.11:40001")));
    }

    #[test]
    fn test_route_without_peers() {
        let mut peers = RelayPeers::default();
        assert_eq!(peers.route(addr("192.168.1.10:40000")), None);
        assert_eq!(peers.state(), RelayState::Active);

        let camera = addr("10.0.0.2:52381");
        let mut peers = RelayPeers {
            camera: Some(camera),
            controller: None,
        };
        assert_eq!(peers.route(camera), None, "camera reply before any controller");
        assert_eq!(peers.state(), RelayState::Learning);
    }

    #[test]
    fn test_camera_port_distinguishes_peers() {
        let camera = addr("10.0.0.2:52381");
        let mut peers = RelayPeers {
            camera: Some(camera),
            controller: None,
        };
        let same_host = addr("10.0.0.2:40000");
        assert_eq!(peers.route(same_host), Some(camera));
        assert_eq!(peers.controller, Some(same_host));
    }

    // ==================== Handle Tests ====================

    #[tokio::test]
    async fn test_set_destination_resolves_ip_literal() {
        let handle = RelayHandle::new();
        assert!(handle.set_destination("127.0.0.1", 52381).await);
        assert_eq!(handle.destination(), Some(addr("127.0.0.1:52381")));
    }

    #[tokio::test]
    async fn test_set_destination_failure_keeps_previous() {
        let handle = RelayHandle::new();
        handle.set_destination_addr(addr("10.0.0.2:52381"));
        assert!(!handle.set_destination("no-such-camera.invalid", 52381).await);
        assert_eq!(handle.destination(), Some(addr("10.0.0.2:52381")));
    }

    #[tokio::test]
    async fn test_resolve() {
        assert_eq!(resolve("127.0.0.1", 1259).await, Some(addr("127.0.0.1:1259")));
        assert_eq!(resolve("no-such-camera.invalid", 1259).await, None);
    }

    #[test]
    fn test_clear_destination_drops_controller_packets() {
        let handle = RelayHandle::new();
        handle.set_destination_addr(addr("10.0.0.2:52381"));
        handle.clear_destination();
        assert_eq!(handle.destination(), None);
        assert_eq!(handle.route(addr("10.0.0.9:40000")), None);
        assert_eq!(handle.controller(), Some(addr("10.0.0.9:40000")));

        // Clearing twice is harmless.
        handle.clear_destination();
        assert_eq!(handle.destination(), None);
    }

    #[test]
    fn test_handle_clones_share_state() {
        let handle = RelayHandle::new();
        let other = handle.clone();
        other.set_destination_addr(addr("10.0.0.3:1259"));
        assert_eq!(handle.destination(), Some(addr("10.0.0.3:1259")));
        assert_eq!(handle.controller(), None);
        assert_eq!(handle.state(), RelayState::Learning);
        assert_eq!(handle.peers().camera, Some(addr("10.0.0.3:1259")));
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionRefused)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    // ==================== Socket Tests ====================

    #[tokio::test]
    async fn test_relay_round_trip() {
        let relay = ViscaRelay::bind_addr(addr("127.0.0.1:0")).await.unwrap();
        let relay_addr = relay.local_addr().unwrap();
        let handle = relay.handle();

        let camera = local_socket().await;
        let controller = local_socket().await;
        handle.set_destination_addr(camera.local_addr().unwrap());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(relay.run(shutdown_rx));

        controller.send_to(b"\x81\x01\x06\x01", relay_addr).await.unwrap();
        let (payload, from) = recv(&camera).await;
        assert_eq!(payload, b"\x81\x01\x06\x01");
        assert_eq!(from, relay_addr);
        assert_eq!(handle.controller(), Some(controller.local_addr().unwrap()));
        assert_eq!(handle.state(), RelayState::Active);

        // ACK then completion, both back to the controller.
        camera.send_to(b"\x90\x41\xff", relay_addr).await.unwrap();
        camera.send_to(b"\x90\x51\xff", relay_addr).await.unwrap();
        assert_eq!(recv(&controller).await.0, b"\x90\x41\xff");
        assert_eq!(recv(&controller).await.0, b"\x90\x51\xff");
        assert_eq!(handle.controller(), Some(controller.local_addr().unwrap()));

        shutdown_tx.send(true).unwrap();
        let result = timeout(WAIT, task).await.unwrap().unwrap();
        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn test_relay_retarget_while_running() {
        let relay = ViscaRelay::bind_addr(addr("127.0.0.1:0")).await.unwrap();
        let relay_addr = relay.local_addr().unwrap();
        let handle = relay.handle();

        let first = local_socket().await;
        let second = local_socket().await;
        let controller = local_socket().await;
        handle.set_destination_addr(first.local_addr().unwrap());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(relay.run(shutdown_rx));

        controller.send_to(b"one", relay_addr).await.unwrap();
        assert_eq!(recv(&first).await.0, b"one");

        handle.set_destination_addr(second.local_addr().unwrap());
        controller.send_to(b"two", relay_addr).await.unwrap();
        assert_eq!(recv(&second).await.0, b"two");

        second.send_to(b"reply", relay_addr).await.unwrap();
        assert_eq!(recv(&controller).await.0, b"reply");

        shutdown_tx.send(true).unwrap();
        tokio_test::assert_ok!(timeout(WAIT, task).await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_relay_stops_when_sender_dropped() {
        let relay = ViscaRelay::bind_addr(addr("127.0.0.1:0")).await.unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(relay.run(shutdown_rx));
        drop(shutdown_tx);
        tokio_test::assert_ok!(timeout(WAIT, task).await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_relay_error() {
        let taken = local_socket().await;
        let result = ViscaRelay::bind_addr(taken.local_addr().unwrap()).await;
        match result {
            Err(ViscaJoystickError::Relay(msg)) => assert!(msg.contains("Failed to bind")),
            other => panic!("Expected Relay error, got: {:?}", other),
        }
    }
}
