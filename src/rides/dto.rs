use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    #[serde(default)]
    pub pickup_location: String,
    #[serde(default)]
    pub drop_location: String,
}

impl CreateRideRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.pickup_location.trim().is_empty() {
            return Err(AppError::Validation("Pickup location is required".into()));
        }
        if self.drop_location.trim().is_empty() {
            return Err(AppError::Validation("Drop location is required".into()));
        }
        Ok(())
    }
}

/// Ride ids come in as path text; anything that is not a UUID cannot name a ride.
pub fn parse_ride_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Ride not found".into()))
}
