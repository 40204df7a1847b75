//! nimbus-api — HTTP surface for the weather aggregation service.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Liveness JSON |
//! | GET | `/weather?q=<location>` | Coalesced temperature lookup |
//! | GET | `/queries` | Persisted aggregations, newest first (debug mode only) |

pub mod handlers;

use axum::routing::get;
use axum::Router;

use nimbus_coalescer::Coalescer;
use nimbus_store::QueryStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub coalescer: Coalescer,
    pub store: QueryStore,
}

/// Build the service router. The `/queries` inspection route only exists
/// when `debug_mode` is set.
pub fn build_router(state: ApiState, debug_mode: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::liveness))
        .route("/weather", get(handlers::get_weather));
    if debug_mode {
        router = router.route("/queries", get(handlers::list_queries));
    }
    router.with_state(state)
}
