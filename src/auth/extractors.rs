use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::{
    claims::{Identity, Role},
    jwt::{JwtKeys, TokenError},
};
use crate::error::AppError;

fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(TokenError::Invalid)?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(TokenError::Invalid)
}

/// Verifies the bearer token of every request routed through it and stores
/// the caller's [`Identity`] in the request extensions. Requests without a
/// valid token never reach the handler.
pub async fn authenticate(
    State(keys): State<Arc<JwtKeys>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = bearer_token(req.headers())
        .and_then(|token| keys.verify(token))
        .map_err(|e| {
            warn!(error = %e, uri = %req.uri(), "rejected request");
            AppError::from(e)
        })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Role gate. Must be layered inside [`authenticate`].
pub async fn require_role(role: Role, req: Request, next: Next) -> Result<Response, AppError> {
    let Some(identity) = req.extensions().get::<Identity>() else {
        return Err(TokenError::Invalid.into());
    };
    if identity.role != role {
        warn!(username = %identity.username, role = %identity.role, required = %role, "access denied");
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(next.run(req).await)
}

pub async fn require_rider(req: Request, next: Next) -> Result<Response, AppError> {
    require_role(Role::Rider, req, next).await
}

pub async fn require_driver(req: Request, next: Next) -> Result<Response, AppError> {
    require_role(Role::Driver, req, next).await
}

/// The authenticated caller, as established by [`authenticate`].
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| TokenError::Invalid.into())
    }
}

/// `Json` whose rejection is reported through [`AppError`].
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(ApiJson(value))
    }
}
