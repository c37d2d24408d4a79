use crate::state::AppState;
use axum::Router;

pub mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
mod repo_types;
pub mod services;

pub use repo_types::Account;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
