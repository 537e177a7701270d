//! Kubernetes-style liveness/readiness/health probes and a disciplined
//! graceful-shutdown protocol for a long-running service process.
//!
//! A [`Lifecycle`] owns a tiny HTTP server answering `/health`, `/live` and
//! `/ready` for a container orchestrator, plus the state machine and
//! shutdown coordinator that back those probes. User code calls
//! [`Lifecycle::signal_ready`] once startup work is done,
//! [`Lifecycle::create_beacon`] to mark outstanding units of work that
//! shutdown should wait on, and [`Lifecycle::register_shutdown_handler`] to
//! register cleanup callbacks. A signal handler, a test, or any other
//! caller then drives [`Lifecycle::shutdown`] to run the sequence: a grace
//! delay, a beacon drain, the registered handlers in order, closing the
//! probe server, and finally invoking the `terminate` collaborator.
//!
//! Process-signal wiring is deliberately not baked into the core; see
//! [`signals`] for an opt-in adapter.

pub mod beacon;
pub mod config;
pub mod error;
pub mod handler;
pub mod probe;
pub mod signals;
pub mod shutdown;
pub mod state;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use beacon::{Beacon, BeaconRegistry};
pub use config::LifecycleConfig;
pub use error::{BeaconError, HandlerError, LifecycleError};
pub use handler::{HandlerRegistry, ShutdownHandler};
pub use state::State;

use probe::ProbeServer;
use shutdown::{ShutdownCoordinator, Terminate};

/// The lifecycle façade: composes the state cell, the beacon and handler
/// registries, the probe server, and the shutdown coordinator into the
/// single entity user code interacts with.
///
/// Every `Lifecycle` instance is self-contained — there is no process-wide
/// singleton, so a process may run more than one, each bound to its own
/// port.
pub struct Lifecycle {
    state: Arc<state::StateCell>,
    beacons: BeaconRegistry,
    handlers: HandlerRegistry,
    probe: ProbeServer,
    coordinator: Arc<ShutdownCoordinator>,
    in_grace: Arc<AtomicBool>,
}

impl Lifecycle {
    /// Binds the probe server and returns a ready-to-use `Lifecycle`. The
    /// probe server is listening by the time this returns.
    pub async fn new(config: LifecycleConfig) -> Result<Self, LifecycleError> {
        Self::with_terminate(config, Arc::new(default_terminate)).await
    }

    /// Like [`Lifecycle::new`], but with a custom `terminate` collaborator.
    /// Tests use this to install a recording stub instead of exiting the
    /// process.
    pub async fn with_terminate(
        config: LifecycleConfig,
        terminate: Terminate,
    ) -> Result<Self, LifecycleError> {
        let state = Arc::new(state::StateCell::new(State::NotReady));
        let beacons = BeaconRegistry::new();
        let handlers = HandlerRegistry::new();
        let in_grace = Arc::new(AtomicBool::new(false));

        let probe = ProbeServer::bind(&config.bind_addr(), state.clone()).await?;

        let coordinator = Arc::new(ShutdownCoordinator::new(
            state.clone(),
            beacons.clone(),
            handlers.clone(),
            config.grace_period.0,
            config.timeout.0,
            terminate,
            in_grace.clone(),
        ));

        Ok(Lifecycle {
            state,
            beacons,
            handlers,
            probe,
            coordinator,
            in_grace,
        })
    }

    /// The probe server's bound address; tests that use an ephemeral port
    /// (`config.port == 0`) need this to drive HTTP requests.
    pub fn local_addr(&self) -> SocketAddr {
        self.probe.local_addr()
    }

    /// NOT_READY -> READY. A no-op once SHUTTING_DOWN has been entered.
    pub fn signal_ready(&self) {
        self.state.signal_ready();
    }

    /// READY -> NOT_READY. A no-op once SHUTTING_DOWN has been entered.
    pub fn signal_not_ready(&self) {
        self.state.signal_not_ready();
    }

    /// Appends a shutdown handler. Always succeeds, even mid-shutdown; see
    /// [`HandlerRegistry`]'s snapshot-once contract.
    pub fn register_shutdown_handler<H: ShutdownHandler>(&self, handler: H) {
        self.handlers.register(handler);
    }

    /// Creates a new beacon, an outstanding-work token that defers shutdown
    /// until it (and every other live beacon) is retired via
    /// [`Beacon::die`].
    pub fn create_beacon(&self, context: Option<String>) -> Result<Beacon, BeaconError> {
        self.beacons.create(context)
    }

    /// True iff the state machine is READY or SHUTTING_DOWN, and the
    /// pre-SHUTTING_DOWN grace delay is not currently running.
    ///
    /// This mirrors `/ready`'s body, not a strict `State == READY` check:
    /// readiness flips back to true the instant `SHUTTING_DOWN` is entered,
    /// a preserved upstream quirk (see the design notes), and is forced
    /// false for the duration of the grace delay regardless of the prior
    /// state.
    pub fn is_server_ready(&self) -> bool {
        if self.in_grace.load(Ordering::SeqCst) {
            return false;
        }
        self.state.get() != State::NotReady
    }

    /// True iff the state machine has entered SHUTTING_DOWN and the grace
    /// delay (if any) has already elapsed.
    pub fn is_server_shutting_down(&self) -> bool {
        if self.in_grace.load(Ordering::SeqCst) {
            return false;
        }
        self.state.is_shutting_down()
    }

    /// Initiates shutdown: grace delay, beacon drain, handlers in order,
    /// probe server close, then `terminate`. Resolves once the probe
    /// server is closed; `terminate` fires just after, detached from this
    /// returned future, so a caller awaiting `shutdown()` observes the
    /// probe server going down without also waiting on the `terminate`
    /// collaborator itself. Idempotent — a second call waits for the
    /// first call's sequence to reach the same point instead of
    /// repeating it.
    pub async fn shutdown(&self) {
        self.coordinator.run(&self.probe).await;
    }
}

fn default_terminate() {
    std::process::exit(0);
}
