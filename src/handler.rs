use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::error::HandlerError;

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// A registered shutdown handler: a callable that returns an asynchronous
/// completion signal.
pub trait ShutdownHandler: Send + Sync + 'static {
    fn run(&self) -> BoxFuture;
}

impl<F, Fut> ShutdownHandler for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn run(&self) -> BoxFuture {
        Box::pin(self())
    }
}

/// Appends-only, ordered list of shutdown handlers.
///
/// `register` always succeeds, even after shutdown has begun: the
/// coordinator takes exactly one [`HandlerRegistry::snapshot`] right before
/// invoking handlers, so a handler registered after that point is simply
/// never invoked. This is the "snapshot-once" contract; see the Open
/// Question in the design notes.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<Mutex<Vec<Arc<dyn ShutdownHandler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry::default()
    }

    pub fn register<H: ShutdownHandler>(&self, handler: H) {
        self.handlers
            .lock()
            .expect("handler registry mutex poisoned")
            .push(Arc::new(handler));
    }

    /// Returns the handlers registered so far, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn ShutdownHandler>> {
        self.handlers
            .lock()
            .expect("handler registry mutex poisoned")
            .clone()
    }
}
