use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{parse_ride_id, CreateRideRequest},
    repo_types::Ride,
    services::RideService,
};
use crate::{
    auth::extractors::{require_driver, require_rider, ApiJson, AuthUser},
    error::AppResult,
    state::AppState,
};

pub fn rider_routes() -> Router<AppState> {
    Router::new()
        .route("/rides", post(create_ride))
        .route_layer(middleware::from_fn(require_rider))
}

pub fn driver_routes() -> Router<AppState> {
    Router::new()
        .route("/driver/rides/requests", get(list_pending_rides))
        .route("/driver/rides/:ride_id/accept", post(accept_ride))
        .route_layer(middleware::from_fn(require_driver))
}

pub fn shared_routes() -> Router<AppState> {
    Router::new()
        .route("/user/rides", get(list_user_rides))
        .route("/rides/:ride_id/complete", post(complete_ride))
}

#[instrument(skip(rides, payload))]
pub async fn create_ride(
    State(rides): State<RideService>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<CreateRideRequest>,
) -> AppResult<Json<Ride>> {
    payload.validate()?;
    let ride = rides
        .create_ride(&caller, payload.pickup_location, payload.drop_location)
        .await?;
    Ok(Json(ride))
}

#[instrument(skip(rides))]
pub async fn list_user_rides(
    State(rides): State<RideService>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<Vec<Ride>>> {
    Ok(Json(rides.list_user_rides(&caller).await?))
}

#[instrument(skip(rides))]
pub async fn list_pending_rides(State(rides): State<RideService>) -> AppResult<Json<Vec<Ride>>> {
    Ok(Json(rides.list_pending_rides().await?))
}

#[instrument(skip(rides))]
pub async fn accept_ride(
    State(rides): State<RideService>,
    AuthUser(caller): AuthUser,
    Path(ride_id): Path<String>,
) -> AppResult<Json<Ride>> {
    let ride_id = parse_ride_id(&ride_id)?;
    Ok(Json(rides.accept_ride(&caller, ride_id).await?))
}

#[instrument(skip(rides))]
pub async fn complete_ride(
    State(rides): State<RideService>,
    AuthUser(caller): AuthUser,
    Path(ride_id): Path<String>,
) -> AppResult<Json<Ride>> {
    let ride_id = parse_ride_id(&ride_id)?;
    Ok(Json(rides.complete_ride(ride_id).await?))
}
