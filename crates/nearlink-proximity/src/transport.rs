//! Proximity transport
//!
//! Bridges a push-style native driver into the overlay's dial/listen world.
//! Discovery events elect a dialer deterministically, payloads that outrun
//! connection setup are absorbed by bounded caches, and the overlay sees a
//! plain transport with well-formed addresses.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::{smallvec, SmallVec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use nearlink_core::{
    AddrTtl, CapableConn, Connectedness, DialOptions, Direction, LogLevel, PeerId, ProximityAddr,
    ProximityDriver, Result, Swarm, TransportError, Upgrader,
};

use crate::config::ProximityConfig;
use crate::conn::Conn;
use crate::listener::{ConnReq, Listener};
use crate::registry;
use crate::ring_buffer::RingBufferMap;

// ----------------------------------------------------------------------------
// Proximity Transport
// ----------------------------------------------------------------------------

/// Transport plugging a native proximity driver into the overlay.
///
/// Lock order, outermost first: registry, listener slot, connection map,
/// per-connection state. No lock is held across a call that can block.
pub struct ProximityTransport {
    driver: Arc<dyn ProximityDriver>,
    swarm: Arc<dyn Swarm>,
    upgrader: Arc<dyn Upgrader<Arc<Conn>>>,
    config: ProximityConfig,
    /// At most one listener per transport instance
    listener: RwLock<Option<Arc<Listener>>>,
    conn_map: RwLock<HashMap<String, Arc<Conn>>>,
    /// Payloads received for peers that have no connection yet
    cache: RingBufferMap,
    cancel: CancellationToken,
    /// Self-reference handed to conns, listeners and detached tasks
    weak_self: Weak<ProximityTransport>,
}

impl ProximityTransport {
    /// Create a transport around `driver`, serving `swarm` through
    /// `upgrader`
    pub fn new(
        driver: Arc<dyn ProximityDriver>,
        swarm: Arc<dyn Swarm>,
        upgrader: Arc<dyn Upgrader<Arc<Conn>>>,
        config: ProximityConfig,
    ) -> Arc<Self> {
        debug!(driver = driver.protocol_name(), "new proximity transport");
        Arc::new_cyclic(|weak_self| Self {
            driver,
            swarm,
            upgrader,
            cache: RingBufferMap::new(config.cache_capacity),
            config,
            listener: RwLock::new(None),
            conn_map: RwLock::new(HashMap::new()),
            cancel: CancellationToken::new(),
            weak_self: weak_self.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Overlay-facing surface
    // ------------------------------------------------------------------

    /// Dial the peer at `remote_addr`.
    ///
    /// Proximity links only form through discovery, so dialing succeeds only
    /// while the native driver is already linked to the target, and only
    /// while a listener is running (the driver is initialized with the
    /// listener).
    pub async fn dial(
        &self,
        remote_addr: &ProximityAddr,
        remote_peer: PeerId,
    ) -> Result<Arc<dyn CapableConn>> {
        if self.listener.read().is_none() {
            return Err(TransportError::NoListener);
        }

        let key = remote_peer.to_string();
        if remote_addr.protocol() != self.driver.protocol_name() || remote_addr.value() != key {
            return Err(TransportError::InvalidMultiaddr {
                addr: remote_addr.to_string(),
                reason: format!("expected /{}/{}", self.driver.protocol_name(), key),
            });
        }

        if !self.driver.dial_peer(&key) {
            return Err(TransportError::PeerNotLinked { peer_id: key });
        }

        if self.conn_map.read().contains_key(&key) {
            return Err(TransportError::AlreadyConnected { peer_id: key });
        }

        self.upgrade_new_conn(remote_addr.clone(), remote_peer, Direction::Outbound)
            .await
    }

    /// Whether `addr` matches this transport's address grammar
    pub fn can_dial(&self, addr: &ProximityAddr) -> bool {
        addr.protocol() == self.driver.protocol_name() && addr.peer_id().is_ok()
    }

    /// Install the transport's single listener.
    ///
    /// `local_addr` must be the driver's default-address sentinel, which is
    /// rewritten to `/<protocol>/<local-peer-id>`, or already carry the
    /// local peer id.
    pub fn listen(&self, local_addr: &str) -> Result<Arc<Listener>> {
        let local_peer = self.swarm.local_peer();
        let protocol = self.driver.protocol_name().to_string();

        let local_addr = if local_addr == self.driver.default_addr() {
            ProximityAddr::from_peer(&protocol, local_peer)
        } else {
            let parsed = ProximityAddr::parse(local_addr)?;
            if parsed.protocol() != protocol || parsed.value() != local_peer.to_string() {
                return Err(TransportError::InvalidMultiaddr {
                    addr: local_addr.to_string(),
                    reason: "listen address must carry the local peer id".to_string(),
                });
            }
            parsed
        };

        // One listener per protocol name process-wide and per transport
        // instance, checked in a single registry critical section.
        let registered = registry::global().register_with(&protocol, self.weak_self.clone(), || {
            self.listener.read().is_none()
        });
        if !registered {
            return Err(TransportError::ListenerExists { protocol });
        }

        let listener = Listener::new(self, local_addr);
        *self.listener.write() = Some(listener.clone());

        // Start the driver only once the listener is visible, so a reentrant
        // discovery callback finds it instead of deadlocking on the slot.
        self.driver.start(&local_peer.to_string());
        info!(protocol = %protocol, addr = %listener.local_addr(), "proximity listener installed");
        Ok(listener)
    }

    /// The single protocol code handled by this transport
    pub fn protocols(&self) -> SmallVec<[i32; 1]> {
        smallvec![self.driver.protocol_code()]
    }

    /// Proximity transports never proxy
    pub fn proxy(&self) -> bool {
        false
    }

    /// Shut the transport down: close the listener (stopping the driver),
    /// close every live connection and cancel all derived contexts.
    pub fn close(&self) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener.close();
        }
        let conns: Vec<Arc<Conn>> = self.conn_map.read().values().cloned().collect();
        for conn in conns {
            conn.close();
        }
        self.cancel.cancel();
    }

    // ------------------------------------------------------------------
    // Driver callbacks
    // ------------------------------------------------------------------

    /// Driver callback: a payload arrived from `remote_peer_id`.
    ///
    /// Routed to the connection's input pipe when one is ready, to its
    /// pre-ready cache when it is still upgrading, or to the transport-level
    /// cache when no connection exists at all.
    pub async fn receive_from_peer(&self, remote_peer_id: &str, payload: &[u8]) {
        debug!(remote = remote_peer_id, len = payload.len(), "receive_from_peer");

        // Copy out of the driver-owned buffer before anything can suspend.
        let data = payload.to_vec();

        let conn = self.conn_map.read().get(remote_peer_id).cloned();
        match conn {
            Some(conn) => conn.deliver(data).await,
            None => {
                debug!(remote = remote_peer_id, "no conn for payload, caching at transport level");
                self.cache.add(remote_peer_id, &data);
            }
        }
    }

    /// Driver callback: a nearby peer was discovered.
    ///
    /// The side with the lexicographically smaller peer id dials; the other
    /// side routes a connection request to its listener. Returns false when
    /// the event could not be handled (malformed id, no running listener,
    /// listener shut down mid-handoff).
    pub async fn handle_found_peer(&self, remote_peer_id: &str) -> bool {
        debug!(remote = remote_peer_id, "handle_found_peer");
        let remote_peer = match PeerId::decode(remote_peer_id) {
            Ok(peer) => peer,
            Err(_) => {
                error!(remote = remote_peer_id, "handle_found_peer: malformed peer id");
                return false;
            }
        };
        let remote_addr = ProximityAddr::from_peer(self.driver.protocol_name(), remote_peer);

        // Snapshot the listener and release the slot lock before any
        // blocking work.
        let listener = {
            let slot = self.listener.read();
            match slot.as_ref() {
                Some(listener) if !listener.is_cancelled() => listener.clone(),
                _ => {
                    warn!(remote = remote_peer_id, "handle_found_peer: no running listener");
                    return false;
                }
            }
        };

        self.swarm
            .peerstore()
            .add_addr(remote_peer, &remote_addr, AddrTtl::Temporary);

        // Payloads cached for a previous session must not leak into this
        // one.
        self.cache.delete(remote_peer_id);

        let local = self.swarm.local_peer().to_string();
        if local.as_str() < remote_peer_id {
            debug!(remote = remote_peer_id, "election: dialing side");
            let Some(transport) = self.weak_self.upgrade() else {
                return false;
            };
            // Detached so the driver callback is not held for the duration
            // of the dial handshake.
            tokio::spawn(async move {
                let outcome = transport
                    .connect(remote_peer, &[remote_addr.clone()], DialOptions::default())
                    .await;
                if let Err(err) = outcome {
                    error!(remote = %remote_peer, %err, "post-discovery dial failed");
                    transport
                        .swarm
                        .peerstore()
                        .set_addr(remote_peer, &remote_addr, AddrTtl::Forget);
                    transport
                        .driver
                        .close_conn_with_peer(&remote_peer.to_string());
                }
            });
            return true;
        }

        debug!(remote = remote_peer_id, "election: accepting side");
        listener
            .enqueue(ConnReq {
                remote_addr,
                remote_peer,
            })
            .await
    }

    /// Driver callback: the native link to a peer dropped.
    ///
    /// Forgets the peer's proximity address and closes every overlay
    /// connection that was using it.
    pub fn handle_lost_peer(&self, remote_peer_id: &str) {
        debug!(remote = remote_peer_id, "handle_lost_peer");
        let remote_peer = match PeerId::decode(remote_peer_id) {
            Ok(peer) => peer,
            Err(_) => {
                error!(remote = remote_peer_id, "handle_lost_peer: malformed peer id");
                return;
            }
        };
        let remote_addr = ProximityAddr::from_peer(self.driver.protocol_name(), remote_peer);

        self.swarm
            .peerstore()
            .set_addr(remote_peer, &remote_addr, AddrTtl::Forget);

        for conn in self.swarm.conns_to_peer(remote_peer) {
            if conn.remote_multiaddr() == remote_addr {
                conn.close();
            }
        }
    }

    /// Driver callback: forward a native log line to the tracing sink
    pub fn log(&self, level: LogLevel, message: &str) {
        let driver = self.driver.protocol_name();
        match level {
            LogLevel::Verbose | LogLevel::Debug => debug!(driver, "{message}"),
            LogLevel::Info => info!(driver, "{message}"),
            LogLevel::Warn => warn!(driver, "{message}"),
            LogLevel::Error => error!(driver, "{message}"),
        }
    }

    // ------------------------------------------------------------------
    // Dialing internals
    // ------------------------------------------------------------------

    /// Absorb `addrs` into the peerstore and dial unless the overlay
    /// already reaches the peer
    pub async fn connect(
        &self,
        peer: PeerId,
        addrs: &[ProximityAddr],
        opts: DialOptions,
    ) -> Result<()> {
        self.swarm.peerstore().add_addrs(peer, addrs, AddrTtl::Temporary);

        if !opts.force_direct {
            match self.swarm.connectedness(peer) {
                Connectedness::Connected => return Ok(()),
                Connectedness::Limited if opts.allow_limited => return Ok(()),
                _ => {}
            }
        }

        self.swarm.dial_peer(peer).await
    }

    pub(crate) async fn upgrade_new_conn(
        &self,
        remote_addr: ProximityAddr,
        remote_peer: PeerId,
        direction: Direction,
    ) -> Result<Arc<dyn CapableConn>> {
        let conn = Conn::new(self, remote_addr, remote_peer, direction)?;
        match self.upgrader.upgrade(conn.clone(), direction).await {
            Ok(upgraded) => {
                conn.set_ready().await;
                Ok(upgraded)
            }
            Err(err) => {
                conn.close();
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Internal accessors
    // ------------------------------------------------------------------

    pub(crate) fn driver(&self) -> &Arc<dyn ProximityDriver> {
        &self.driver
    }

    pub(crate) fn weak_self(&self) -> &Weak<ProximityTransport> {
        &self.weak_self
    }

    pub(crate) fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub(crate) fn cache(&self) -> &RingBufferMap {
        &self.cache
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn conn_map(&self) -> &RwLock<HashMap<String, Arc<Conn>>> {
        &self.conn_map
    }

    pub(crate) fn remove_conn(&self, key: &str) {
        self.conn_map.write().remove(key);
    }

    pub(crate) fn listener_addr(&self) -> Option<ProximityAddr> {
        self.listener
            .read()
            .as_ref()
            .map(|listener| listener.local_addr().clone())
    }

    pub(crate) fn clear_listener(&self) {
        *self.listener.write() = None;
    }
}

impl fmt::Display for ProximityTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.driver.protocol_name())
    }
}
