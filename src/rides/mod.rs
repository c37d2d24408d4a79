use axum::{middleware, Router};

use crate::{auth::extractors::authenticate, state::AppState};

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

/// Every ride route sits behind the bearer-token authenticator; the role
/// gates run inside it. `layer` rather than `route_layer` so a wrong method
/// on a known path is still a 401 for anonymous callers.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::rider_routes())
        .merge(handlers::driver_routes())
        .merge(handlers::shared_routes())
        .layer(middleware::from_fn_with_state(state, authenticate))
}
