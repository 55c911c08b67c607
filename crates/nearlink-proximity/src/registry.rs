//! Process-wide transport registry
//!
//! At most one transport instance may listen per protocol name across the
//! whole process. The registry is a lazily initialized static with explicit
//! locking; entries are weak references so a dropped transport never wedges
//! its protocol name.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use crate::transport::ProximityTransport;

static REGISTRY: OnceLock<TransportRegistry> = OnceLock::new();

/// The process-wide registry instance
pub fn global() -> &'static TransportRegistry {
    REGISTRY.get_or_init(TransportRegistry::new)
}

// ----------------------------------------------------------------------------
// Transport Registry
// ----------------------------------------------------------------------------

/// Maps protocol names to the transport currently listening on them
pub struct TransportRegistry {
    transports: RwLock<HashMap<String, Weak<ProximityTransport>>>,
}

impl TransportRegistry {
    fn new() -> Self {
        Self {
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Register `transport` under `protocol` if the name is free and
    /// `also_vacant` holds, all under the registry lock.
    ///
    /// `also_vacant` lets the caller fold its own singleton check (the
    /// listener slot) into the same critical section; it runs below the
    /// registry lock in the lock hierarchy.
    pub(crate) fn register_with(
        &self,
        protocol: &str,
        transport: Weak<ProximityTransport>,
        also_vacant: impl FnOnce() -> bool,
    ) -> bool {
        let mut transports = self.transports.write();
        let occupied = transports
            .get(protocol)
            .map(|existing| existing.strong_count() > 0)
            .unwrap_or(false);
        if occupied || !also_vacant() {
            return false;
        }
        transports.insert(protocol.to_string(), transport);
        true
    }

    /// Remove the entry for `protocol`
    pub(crate) fn deregister(&self, protocol: &str) {
        self.transports.write().remove(protocol);
    }

    /// Look up the transport currently listening on `protocol`
    pub fn get(&self, protocol: &str) -> Option<Arc<ProximityTransport>> {
        self.transports.read().get(protocol).and_then(Weak::upgrade)
    }
}
