//! HTTP API over a [`FlagService`].
//!
//! | Route | Methods |
//! |---|---|
//! | `/healthz` | `GET` |
//! | `/flags` | `GET` |
//! | `/flags/{name}` | `GET` (evaluate), `POST`, `PUT`, `DELETE` (admin token) |

mod error;
mod flags;
mod health;

use std::sync::Arc;

use axum::{
    routing::{any, get},
    Router,
};

use crate::{FlagService, ServerConfig};

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub(crate) struct AppState {
    pub service: Arc<FlagService>,
    pub config: Arc<ServerConfig>,
}

/// Build the router serving flag evaluation and management.
pub fn router(service: Arc<FlagService>, config: ServerConfig) -> Router {
    let state = AppState {
        service,
        config: Arc::new(config),
    };

    Router::new()
        .route("/healthz", get(health::health))
        .route("/flags", get(flags::list_flags))
        .route("/flags/", any(flags::missing_flag_name))
        .route(
            "/flags/{name}",
            get(flags::evaluate_flag)
                .post(flags::create_flag)
                .put(flags::update_flag)
                .delete(flags::delete_flag),
        )
        .with_state(state)
}
