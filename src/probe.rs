use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::LifecycleError;
use crate::state::{State, StateCell};

/// A tiny wrapper so the three probe handlers can render a
/// `(status, body)` pair as an axum response without allocating a JSON
/// envelope: bodies are the bare state literal, `Content-Type:
/// text/plain`.
struct ProbeResponse {
    status: StatusCode,
    body: &'static str,
}

impl IntoResponse for ProbeResponse {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

/// Shared, read-only view the probe handlers consult. Always reads the
/// last public `State`; the grace-period predicate leak
/// (`isServerReady()`/`isServerShuttingDown()` reporting false during the
/// grace delay regardless of the prior state) is a façade-only concern
/// (see [`crate::Lifecycle`]) and never visible here.
#[derive(Clone)]
pub(crate) struct ProbeView {
    pub state: Arc<StateCell>,
}

async fn health(view: axum::extract::State<ProbeView>) -> ProbeResponse {
    match view.state.get() {
        State::NotReady => ProbeResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "SERVER_IS_NOT_READY",
        },
        State::Ready => ProbeResponse {
            status: StatusCode::OK,
            body: "SERVER_IS_READY",
        },
        State::ShuttingDown => ProbeResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "SERVER_IS_SHUTTING_DOWN",
        },
    }
}

async fn live(view: axum::extract::State<ProbeView>) -> ProbeResponse {
    match view.state.get() {
        State::NotReady | State::Ready => ProbeResponse {
            status: StatusCode::OK,
            body: "SERVER_IS_NOT_SHUTTING_DOWN",
        },
        State::ShuttingDown => ProbeResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "SERVER_IS_SHUTTING_DOWN",
        },
    }
}

async fn ready(view: axum::extract::State<ProbeView>) -> ProbeResponse {
    match view.state.get() {
        State::NotReady => ProbeResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "SERVER_IS_NOT_READY",
        },
        // Deliberately kept at 200 during SHUTTING_DOWN: readiness here
        // means "still routable from the orchestrator's perspective", and
        // flipping it the instant shutdown is requested causes kube-proxy
        // to rewrite endpoints right when the process most needs in-flight
        // connections left alone. `/health` carries the "unhealthy" signal
        // instead.
        State::Ready | State::ShuttingDown => ProbeResponse {
            status: StatusCode::OK,
            body: "SERVER_IS_READY",
        },
    }
}

/// Used both as the router's path-level fallback (unknown path) and as
/// each route's method-level fallback (known path, wrong method), so
/// `POST /health` 404s instead of axum's default 405 — the spec only
/// distinguishes the three known `GET` paths from "any other path/method".
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn router(view: ProbeView) -> Router {
    Router::new()
        .route("/health", get(health).fallback(not_found))
        .route("/live", get(live).fallback(not_found))
        .route("/ready", get(ready).fallback(not_found))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(view)
}

/// The running probe HTTP server. Holds the `JoinHandle` for the serving
/// task so [`ProbeServer::close`] can stop it as the final
/// `ShutdownCoordinator` step before `terminate` is invoked.
pub struct ProbeServer {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ProbeServer {
    /// Binds the configured address and starts serving immediately. This
    /// is synchronous from the caller's point of view: by the time
    /// `ProbeServer::bind` returns, the listener is already accepting
    /// connections.
    pub async fn bind(addr: &str, state: Arc<StateCell>) -> Result<Self, LifecycleError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let router = router(ProbeView { state });

        info!(%local_addr, "probe server listening");
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(error = %err, "probe server exited with an error");
            }
        });

        Ok(ProbeServer { local_addr, task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections. By the time this runs (step 6 of
    /// the shutdown sequence) the grace delay and beacon drain have
    /// already given the orchestrator's proxy time to stop routing new
    /// traffic, so an abrupt stop here is sufficient.
    pub fn close(&self) {
        self.task.abort();
        info!("probe-server-closed");
    }
}
