/// Errors that can occur while constructing or binding a [`crate::Lifecycle`].
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("failed to bind probe server")]
    Bind(#[from] std::io::Error),
}

/// Errors related to beacon creation and retirement.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconError {
    #[error("beacon was already retired")]
    AlreadyRetired,
    #[error("lifecycle has already begun running shutdown handlers")]
    LifecycleFinalized,
}

/// The error type a shutdown handler's completion future resolves with.
///
/// Handler failures are never surfaced to callers of `Lifecycle::shutdown`;
/// they are logged (`handler-failed`) and the sequence proceeds regardless.
/// Using `anyhow::Error` here lets handler authors `?`-propagate whatever
/// concrete error their cleanup logic produces without the coordinator
/// needing to know its shape.
pub type HandlerError = anyhow::Error;
