use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Requested,
    Accepted,
    Completed,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Requested => "REQUESTED",
            RideStatus::Accepted => "ACCEPTED",
            RideStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(RideStatus::Requested),
            "ACCEPTED" => Ok(RideStatus::Accepted),
            "COMPLETED" => Ok(RideStatus::Completed),
            other => anyhow::bail!("unknown ride status {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: Uuid,
    pub user_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup_location: String,
    pub drop_location: String,
    pub status: RideStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Ride {
    pub fn new(user_id: Uuid, pickup_location: String, drop_location: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            driver_id: None,
            pickup_location,
            drop_location,
            status: RideStatus::Requested,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// REQUESTED -> ACCEPTED, assigning the driver.
    pub fn accept(&mut self, driver_id: Uuid) -> AppResult<()> {
        if self.status != RideStatus::Requested {
            return Err(not_requested());
        }
        self.driver_id = Some(driver_id);
        self.status = RideStatus::Accepted;
        Ok(())
    }

    /// ACCEPTED -> COMPLETED.
    pub fn complete(&mut self) -> AppResult<()> {
        if self.status != RideStatus::Accepted {
            return Err(not_accepted());
        }
        self.status = RideStatus::Completed;
        Ok(())
    }
}

pub(crate) fn not_requested() -> AppError {
    AppError::InvalidState("Ride is not in REQUESTED state".into())
}

pub(crate) fn not_accepted() -> AppError {
    AppError::InvalidState("Ride must be ACCEPTED to complete".into())
}

#[derive(Debug, FromRow)]
pub struct RideRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup_location: String,
    pub drop_location: String,
    pub status: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<RideRow> for Ride {
    type Error = anyhow::Error;

    fn try_from(r: RideRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            driver_id: r.driver_id,
            pickup_location: r.pickup_location,
            drop_location: r.drop_location,
            status: r.status.parse()?,
            created_at: r.created_at,
        })
    }
}
