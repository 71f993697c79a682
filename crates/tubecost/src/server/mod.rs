//! HTTP JSON API over the production ledger.
//!
//! | Method | Path            | Action                          |
//! |--------|-----------------|---------------------------------|
//! | GET    | `/records`      | list all records, newest first  |
//! | POST   | `/records`      | calculate and store a new day   |
//! | GET    | `/records/{id}` | fetch one record                |
//! | PUT    | `/records/{id}` | recalculate and overwrite       |
//! | DELETE | `/records/{id}` | delete (idempotent)             |
//! | POST   | `/calculate`    | calculate without storing       |
//! | GET    | `/health`       | liveness and active backend     |

pub mod error;
pub mod handlers;

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::Result;
use crate::ledger::Ledger;

pub use error::ApiError;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The ledger every handler works against.
    pub ledger: Ledger,
}

/// Build the application router.
pub fn router(ledger: Ledger) -> Router {
    let state = AppState { ledger };

    Router::new()
        .route(
            "/records",
            get(handlers::list_records)
                .post(handlers::create_record)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/records/{id}",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record)
                .fallback(handlers::method_not_allowed),
        )
        .route("/calculate", post(handlers::calculate))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl-C, then close the store.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(ledger: Ledger, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(
        addr = %local,
        backend = %ledger.store().backend(),
        "Listening for HTTP requests"
    );

    let app = router(ledger.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, closing record store");
    ledger.close().await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
