use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::BeaconError;

/// An opaque handle to one outstanding unit of work.
///
/// Obtained from [`BeaconRegistry::create`]; shutdown waits until every
/// outstanding beacon has been retired via [`Beacon::die`] before running
/// shutdown handlers.
#[derive(Debug, Clone)]
pub struct Beacon {
    id: u64,
    registry: Arc<Inner>,
}

impl Beacon {
    /// Retires this beacon. Fails with [`BeaconError::AlreadyRetired`] if
    /// called a second time on the same beacon.
    pub fn die(&self) -> Result<(), BeaconError> {
        self.registry.retire(self.id)
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

struct Inner {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, Option<String>>>,
    finalized: AtomicBool,
    drained: Notify,
}

impl Inner {
    fn retire(&self, id: u64) -> Result<(), BeaconError> {
        let mut live = self.live.lock().expect("beacon registry mutex poisoned");
        if live.remove(&id).is_none() {
            return Err(BeaconError::AlreadyRetired);
        }
        debug!(beacon = id, "beacon-retired");
        if live.is_empty() {
            self.drained.notify_waiters();
        }
        Ok(())
    }
}

/// The set of beacons currently outstanding.
///
/// Every entity in a [`crate::Lifecycle`] is instance-owned: there is no
/// process-wide registry, each `Lifecycle` holds its own.
#[derive(Clone)]
pub struct BeaconRegistry {
    inner: Arc<Inner>,
}

impl BeaconRegistry {
    pub fn new() -> Self {
        BeaconRegistry {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(0),
                live: Mutex::new(HashMap::new()),
                finalized: AtomicBool::new(false),
                drained: Notify::new(),
            }),
        }
    }

    /// Creates a new beacon. Succeeds unconditionally until
    /// [`BeaconRegistry::finalize`] has been called (i.e. until the
    /// shutdown coordinator has begun invoking handlers); after that it
    /// fails with [`BeaconError::LifecycleFinalized`], even during the
    /// grace period.
    pub fn create(&self, context: Option<String>) -> Result<Beacon, BeaconError> {
        if self.inner.finalized.load(Ordering::SeqCst) {
            return Err(BeaconError::LifecycleFinalized);
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .live
            .lock()
            .expect("beacon registry mutex poisoned")
            .insert(id, context);
        debug!(beacon = id, "beacon-created");
        Ok(Beacon {
            id,
            registry: self.inner.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .live
            .lock()
            .expect("beacon registry mutex poisoned")
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner
            .live
            .lock()
            .expect("beacon registry mutex poisoned")
            .len()
    }

    /// Marks the registry finalized: no further beacons can be created.
    /// Called by the coordinator right before it snapshots and runs
    /// shutdown handlers.
    pub fn finalize(&self) {
        self.inner.finalized.store(true, Ordering::SeqCst);
    }

    /// Resolves immediately if already empty; otherwise waits for the last
    /// outstanding beacon to retire.
    ///
    /// `notified()` only registers interest once polled, which happens at
    /// the `.await` below; without `enable()` first, a `retire()` landing
    /// between the `is_empty()` check and that `.await` notifies no one
    /// and is lost, hanging the drain until the watchdog forces
    /// `terminate`. `enable()` registers interest up front so that race
    /// can't drop a wakeup.
    pub async fn await_empty(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                return;
            }
            notified.await;
            if self.is_empty() {
                return;
            }
            warn!("beacon registry woke with beacons still outstanding, retrying wait");
        }
    }
}

impl Default for BeaconRegistry {
    fn default() -> Self {
        BeaconRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn create_and_die() {
        let registry = BeaconRegistry::new();
        assert!(registry.is_empty());

        let beacon = registry.create(Some("unit-test".to_string())).unwrap();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);

        beacon.die().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn double_die_fails() {
        let registry = BeaconRegistry::new();
        let beacon = registry.create(None).unwrap();
        beacon.die().unwrap();
        assert_eq!(beacon.die(), Err(BeaconError::AlreadyRetired));
    }

    #[test]
    fn create_after_finalize_fails() {
        let registry = BeaconRegistry::new();
        registry.finalize();
        assert_eq!(
            registry.create(None).unwrap_err(),
            BeaconError::LifecycleFinalized
        );
    }

    #[tokio::test]
    async fn await_empty_resolves_immediately_when_already_empty() {
        let registry = BeaconRegistry::new();
        tokio::time::timeout(Duration::from_millis(100), registry.await_empty())
            .await
            .expect("await_empty should resolve immediately");
    }

    #[tokio::test]
    async fn await_empty_waits_for_last_beacon() {
        let registry = BeaconRegistry::new();
        let beacon = registry.create(None).unwrap();

        let registry_clone = registry.clone();
        let waiter = tokio::spawn(async move {
            registry_clone.await_empty().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        beacon.die().unwrap();

        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("await_empty should resolve after the last beacon dies")
            .unwrap();
    }
}
