//! Test doubles for the proximity transport
//!
//! Mock implementations of the native driver and the overlay capabilities,
//! plus a small harness wiring them into a transport instance.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use nearlink_proximity::{
    AddrTtl, CapableConn, Conn, Connectedness, Direction, OverlayConn, PeerId, Peerstore,
    ProximityAddr, ProximityConfig, ProximityDriver, ProximityTransport, Result, Swarm,
    TransportError, Upgrader,
};

// ----------------------------------------------------------------------------
// Mock Driver
// ----------------------------------------------------------------------------

/// Scriptable native driver: tests decide which peers are linked and whether
/// sends succeed, and observe every call the transport makes.
pub struct MockDriver {
    protocol: String,
    default_addr: String,
    linked: Mutex<HashSet<String>>,
    send_ok: AtomicBool,
    pub started_with: Mutex<Option<String>>,
    pub stopped: AtomicBool,
    pub sent: Mutex<Vec<(String, Vec<u8>)>>,
    pub closed_links: Mutex<Vec<String>>,
}

impl MockDriver {
    pub fn new(protocol: &str) -> Arc<Self> {
        Arc::new(Self {
            protocol: protocol.to_string(),
            default_addr: format!("/{protocol}/local"),
            linked: Mutex::new(HashSet::new()),
            send_ok: AtomicBool::new(true),
            started_with: Mutex::new(None),
            stopped: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            closed_links: Mutex::new(Vec::new()),
        })
    }

    /// Pretend the radio formed a link with `peer`
    pub fn link(&self, peer: PeerId) {
        self.linked.lock().insert(peer.to_string());
    }

    pub fn unlink(&self, peer: PeerId) {
        self.linked.lock().remove(&peer.to_string());
    }

    pub fn set_send_ok(&self, ok: bool) {
        self.send_ok.store(ok, Ordering::SeqCst);
    }

    pub fn closed_links(&self) -> Vec<String> {
        self.closed_links.lock().clone()
    }

    pub fn sent_to(&self, peer: PeerId) -> Vec<Vec<u8>> {
        let key = peer.to_string();
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| *to == key)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl ProximityDriver for MockDriver {
    fn protocol_name(&self) -> &str {
        &self.protocol
    }

    fn protocol_code(&self) -> i32 {
        4242
    }

    fn default_addr(&self) -> &str {
        &self.default_addr
    }

    fn start(&self, local_peer_id: &str) {
        *self.started_with.lock() = Some(local_peer_id.to_string());
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn dial_peer(&self, remote_peer_id: &str) -> bool {
        self.linked.lock().contains(remote_peer_id)
    }

    fn send_to_peer(&self, remote_peer_id: &str, payload: &[u8]) -> bool {
        if !self.send_ok.load(Ordering::SeqCst) {
            return false;
        }
        self.sent
            .lock()
            .push((remote_peer_id.to_string(), payload.to_vec()));
        true
    }

    fn close_conn_with_peer(&self, remote_peer_id: &str) {
        self.closed_links.lock().push(remote_peer_id.to_string());
    }
}

// ----------------------------------------------------------------------------
// Mock Overlay
// ----------------------------------------------------------------------------

/// Records every peerstore mutation
#[derive(Default)]
pub struct MockPeerstore {
    pub added: Mutex<Vec<(PeerId, ProximityAddr, AddrTtl)>>,
    pub set: Mutex<Vec<(PeerId, ProximityAddr, AddrTtl)>>,
}

impl MockPeerstore {
    /// Whether `addr` was dropped via a Forget-TTL set
    pub fn forgot(&self, peer: PeerId, addr: &ProximityAddr) -> bool {
        self.set
            .lock()
            .iter()
            .any(|(p, a, ttl)| *p == peer && a == addr && *ttl == AddrTtl::Forget)
    }

    pub fn added_temporary(&self, peer: PeerId, addr: &ProximityAddr) -> bool {
        self.added
            .lock()
            .iter()
            .any(|(p, a, ttl)| *p == peer && a == addr && *ttl == AddrTtl::Temporary)
    }
}

impl Peerstore for MockPeerstore {
    fn add_addr(&self, peer: PeerId, addr: &ProximityAddr, ttl: AddrTtl) {
        self.added.lock().push((peer, addr.clone(), ttl));
    }

    fn set_addr(&self, peer: PeerId, addr: &ProximityAddr, ttl: AddrTtl) {
        self.set.lock().push((peer, addr.clone(), ttl));
    }
}

/// Overlay connection stub with an observable closed flag
pub struct MockOverlayConn {
    pub peer: PeerId,
    pub addr: ProximityAddr,
    pub closed: AtomicBool,
}

impl MockOverlayConn {
    pub fn new(peer: PeerId, addr: ProximityAddr) -> Arc<Self> {
        Arc::new(Self {
            peer,
            addr,
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl OverlayConn for MockOverlayConn {
    fn remote_multiaddr(&self) -> ProximityAddr {
        self.addr.clone()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Scriptable swarm: connectedness and dial outcomes are set by the test
pub struct MockSwarm {
    local: PeerId,
    pub peerstore: Arc<MockPeerstore>,
    pub connectedness: Mutex<HashMap<PeerId, Connectedness>>,
    pub dialed: Mutex<Vec<PeerId>>,
    dial_ok: AtomicBool,
    pub conns: Mutex<Vec<Arc<MockOverlayConn>>>,
}

impl MockSwarm {
    pub fn new(local: PeerId) -> Arc<Self> {
        Arc::new(Self {
            local,
            peerstore: Arc::new(MockPeerstore::default()),
            connectedness: Mutex::new(HashMap::new()),
            dialed: Mutex::new(Vec::new()),
            dial_ok: AtomicBool::new(true),
            conns: Mutex::new(Vec::new()),
        })
    }

    pub fn set_dial_ok(&self, ok: bool) {
        self.dial_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_connectedness(&self, peer: PeerId, state: Connectedness) {
        self.connectedness.lock().insert(peer, state);
    }

    pub fn add_conn(&self, conn: Arc<MockOverlayConn>) {
        self.conns.lock().push(conn);
    }

    pub fn dialed_peers(&self) -> Vec<PeerId> {
        self.dialed.lock().clone()
    }
}

#[async_trait]
impl Swarm for MockSwarm {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn peerstore(&self) -> Arc<dyn Peerstore> {
        self.peerstore.clone()
    }

    fn connectedness(&self, peer: PeerId) -> Connectedness {
        *self
            .connectedness
            .lock()
            .get(&peer)
            .unwrap_or(&Connectedness::NotConnected)
    }

    async fn dial_peer(&self, peer: PeerId) -> Result<()> {
        self.dialed.lock().push(peer);
        if self.dial_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::DialFailed {
                peer_id: peer.to_string(),
                reason: "mock swarm refused".to_string(),
            })
        }
    }

    fn conns_to_peer(&self, peer: PeerId) -> Vec<Arc<dyn OverlayConn>> {
        self.conns
            .lock()
            .iter()
            .filter(|conn| conn.peer == peer)
            .map(|conn| conn.clone() as Arc<dyn OverlayConn>)
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Recording Upgrader
// ----------------------------------------------------------------------------

/// Upgrader that records every raw conn it sees and wraps it unmodified.
///
/// The gated variant parks each upgrade until the test releases a permit,
/// letting tests observe a connection in its pre-ready state.
pub struct RecordingUpgrader {
    pub upgraded: Mutex<Vec<Arc<Conn>>>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingUpgrader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            upgraded: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Upgrades block until the returned semaphore receives a permit
    pub fn gated() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let upgrader = Arc::new(Self {
            upgraded: Mutex::new(Vec::new()),
            gate: Some(gate.clone()),
        });
        (upgrader, gate)
    }

    pub fn upgraded_conns(&self) -> Vec<Arc<Conn>> {
        self.upgraded.lock().clone()
    }
}

#[async_trait]
impl Upgrader<Arc<Conn>> for RecordingUpgrader {
    async fn upgrade(&self, conn: Arc<Conn>, direction: Direction) -> Result<Arc<dyn CapableConn>> {
        self.upgraded.lock().push(conn.clone());
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| TransportError::UpgradeFailed {
                    reason: "upgrade gate closed".to_string(),
                })?;
            permit.forget();
        }
        Ok(Arc::new(UpgradedConn { conn, direction }))
    }
}

/// What the recording upgrader hands back to the transport
#[derive(Debug)]
pub struct UpgradedConn {
    pub conn: Arc<Conn>,
    direction: Direction,
}

impl CapableConn for UpgradedConn {
    fn remote_peer(&self) -> PeerId {
        self.conn.remote_peer()
    }

    fn remote_multiaddr(&self) -> ProximityAddr {
        self.conn.remote_multiaddr().clone()
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn close(&self) {
        self.conn.close()
    }
}

// ----------------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------------

/// A transport wired to fresh mocks
pub struct TestNet {
    pub transport: Arc<ProximityTransport>,
    pub driver: Arc<MockDriver>,
    pub swarm: Arc<MockSwarm>,
    pub peerstore: Arc<MockPeerstore>,
    pub upgrader: Arc<RecordingUpgrader>,
}

/// Build a transport on its own protocol name.
///
/// The registry is process-wide, so every test must pick a unique protocol
/// name to stay isolated from its neighbours.
pub fn build(protocol: &str, local: PeerId) -> TestNet {
    build_with(protocol, local, RecordingUpgrader::new(), ProximityConfig::default())
}

pub fn build_with(
    protocol: &str,
    local: PeerId,
    upgrader: Arc<RecordingUpgrader>,
    config: ProximityConfig,
) -> TestNet {
    let driver = MockDriver::new(protocol);
    let swarm = MockSwarm::new(local);
    let peerstore = swarm.peerstore.clone();
    let transport = ProximityTransport::new(
        driver.clone(),
        swarm.clone(),
        upgrader.clone(),
        config,
    );
    TestNet {
        transport,
        driver,
        swarm,
        peerstore,
        upgrader,
    }
}

/// Short peer ids that sort by their last byte
pub fn pid(n: u8) -> PeerId {
    PeerId::new([0, 0, 0, 0, 0, 0, 0, n])
}

/// Poll `cond` until it holds or two seconds elapse
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within deadline"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Install a test subscriber once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
