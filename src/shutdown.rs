use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::beacon::BeaconRegistry;
use crate::handler::HandlerRegistry;
use crate::probe::ProbeServer;
use crate::state::StateCell;

/// A collaborator invoked to force process exit as the final step of
/// shutdown, or immediately if the watchdog timeout fires first.
pub type Terminate = Arc<dyn Fn() + Send + Sync>;

/// Drives the shutdown sequence: grace delay, beacon drain, sequential
/// handler invocation, probe server close, then `terminate`. Idempotent —
/// only the first call to [`ShutdownCoordinator::run`] does anything; later
/// calls wait for that first call to reach the same completion point.
pub struct ShutdownCoordinator {
    state: Arc<StateCell>,
    beacons: BeaconRegistry,
    handlers: HandlerRegistry,
    grace_period: Duration,
    timeout: Duration,
    terminate: Terminate,
    started: AtomicBool,
    in_grace: Arc<AtomicBool>,
    done: Notify,
    finished: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(
        state: Arc<StateCell>,
        beacons: BeaconRegistry,
        handlers: HandlerRegistry,
        grace_period: Duration,
        timeout: Duration,
        terminate: Terminate,
        in_grace: Arc<AtomicBool>,
    ) -> Self {
        ShutdownCoordinator {
            state,
            beacons,
            handlers,
            grace_period,
            timeout,
            terminate,
            started: AtomicBool::new(false),
            in_grace,
            done: Notify::new(),
            finished: AtomicBool::new(false),
        }
    }

    /// Initiates shutdown and waits until either the probe server has been
    /// closed (step 6) or the watchdog timeout has forced `terminate`,
    /// whichever comes first. Idempotent: a second call waits for the
    /// first call's sequence to reach that point instead of re-running it.
    pub async fn run(self: &Arc<Self>, probe: &ProbeServer) {
        if self.started.swap(true, Ordering::SeqCst) {
            self.wait_until_finished().await;
            return;
        }

        info!("shutdown-requested");
        tokio::select! {
            _ = self.sequence(probe) => {}
            _ = tokio::time::sleep(self.timeout) => {
                warn!("timeout-exceeded");
                (self.terminate)();
                info!("terminated");
            }
        }

        self.finished.store(true, Ordering::SeqCst);
        self.done.notify_waiters();
    }

    async fn wait_until_finished(&self) {
        let notified = self.done.notified();
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }

    async fn sequence(&self, probe: &ProbeServer) {
        // Step 2: grace delay. State is left untouched; the grace-period
        // predicate leak (isServerReady()/isServerShuttingDown() reporting
        // false regardless of the prior public State) is implemented via
        // `in_grace`, consulted by the façade's predicates, not by the
        // probe HTTP handlers.
        if !self.grace_period.is_zero() {
            self.in_grace.store(true, Ordering::SeqCst);
            info!(ms = ?self.grace_period, "grace-period-started");
            tokio::time::sleep(self.grace_period).await;
            info!("grace-period-ended");
        }

        // Step 3: transition, then clear the grace marker so the façade's
        // predicates resume reading the real, now-SHUTTING_DOWN state.
        self.state.enter_shutting_down();
        self.in_grace.store(false, Ordering::SeqCst);

        // Step 4: drain beacons. Handlers must not run while any are
        // outstanding.
        self.beacons.await_empty().await;

        // Step 5: snapshot once, then invoke sequentially. A handler's
        // failure is logged and swallowed; it never aborts the sequence.
        self.beacons.finalize();
        for handler in self.handlers.snapshot() {
            info!("handler-invoked");
            if let Err(err) = handler.run().await {
                warn!(error = %err, "handler-failed");
            }
        }

        // Step 6: close the probe server.
        probe.close();

        // Step 7: terminate. `run()` (and therefore `Lifecycle::shutdown()`)
        // is documented to resolve once step 6 completes, so this is
        // spawned detached rather than awaited here: callers observe the
        // probe server closing without their `shutdown().await` also
        // waiting on — or racing — the terminate collaborator itself.
        let terminate = self.terminate.clone();
        tokio::spawn(async move {
            terminate();
            info!("terminated");
        });
    }
}
