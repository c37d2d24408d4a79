use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    repo::RideStore,
    repo_types::{not_accepted, not_requested, Ride, RideStatus},
};
use crate::{
    auth::{
        claims::{Identity, Role},
        repo::AccountStore,
        Account,
    },
    error::{AppError, AppResult},
    state::AppState,
};

/// Ride lifecycle: `REQUESTED --accept--> ACCEPTED --complete--> COMPLETED`.
///
/// By default accept and complete read the ride, check its status and save
/// it back, so two concurrent accepts of the same ride can both succeed and
/// the later write wins. With `atomic_transitions` the status check and the
/// write happen in one conditional update and the loser gets `InvalidState`.
#[derive(Clone)]
pub struct RideService {
    accounts: Arc<dyn AccountStore>,
    rides: Arc<dyn RideStore>,
    atomic_transitions: bool,
}

impl FromRef<AppState> for RideService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.accounts.clone(),
            state.rides.clone(),
            state.config.rides.atomic_transitions,
        )
    }
}

impl RideService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        rides: Arc<dyn RideStore>,
        atomic_transitions: bool,
    ) -> Self {
        Self {
            accounts,
            rides,
            atomic_transitions,
        }
    }

    async fn caller_account(&self, caller: &Identity) -> AppResult<Account> {
        self.accounts
            .find_by_username(&caller.username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn find_ride(&self, ride_id: Uuid) -> AppResult<Ride> {
        self.rides
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ride not found".into()))
    }

    pub async fn create_ride(
        &self,
        caller: &Identity,
        pickup_location: String,
        drop_location: String,
    ) -> AppResult<Ride> {
        if caller.role != Role::Rider {
            return Err(AppError::Forbidden("Only ROLE_USER can request rides".into()));
        }
        let user = self.caller_account(caller).await?;

        let ride = self
            .rides
            .save(&Ride::new(user.id, pickup_location, drop_location))
            .await?;
        info!(ride_id = %ride.id, username = %caller.username, "ride requested");
        Ok(ride)
    }

    pub async fn list_pending_rides(&self) -> AppResult<Vec<Ride>> {
        Ok(self.rides.find_by_status(RideStatus::Requested).await?)
    }

    pub async fn list_user_rides(&self, caller: &Identity) -> AppResult<Vec<Ride>> {
        let user = self.caller_account(caller).await?;
        Ok(self.rides.find_by_user(user.id).await?)
    }

    pub async fn accept_ride(&self, caller: &Identity, ride_id: Uuid) -> AppResult<Ride> {
        if caller.role != Role::Driver {
            return Err(AppError::Forbidden("Only ROLE_DRIVER can accept rides".into()));
        }
        let driver = self.caller_account(caller).await?;

        let ride = if self.atomic_transitions {
            self.transition(ride_id, RideStatus::Requested, RideStatus::Accepted, Some(driver.id))
                .await?
        } else {
            let mut ride = self.find_ride(ride_id).await?;
            ride.accept(driver.id)?;
            self.rides.save(&ride).await?
        };
        info!(ride_id = %ride.id, driver = %caller.username, "ride accepted");
        Ok(ride)
    }

    /// Any authenticated caller may complete any accepted ride.
    pub async fn complete_ride(&self, ride_id: Uuid) -> AppResult<Ride> {
        let ride = if self.atomic_transitions {
            self.transition(ride_id, RideStatus::Accepted, RideStatus::Completed, None)
                .await?
        } else {
            let mut ride = self.find_ride(ride_id).await?;
            ride.complete()?;
            self.rides.save(&ride).await?
        };
        info!(ride_id = %ride.id, "ride completed");
        Ok(ride)
    }

    async fn transition(
        &self,
        ride_id: Uuid,
        from: RideStatus,
        to: RideStatus,
        driver_id: Option<Uuid>,
    ) -> AppResult<Ride> {
        if let Some(ride) = self.rides.transition(ride_id, from, to, driver_id).await? {
            return Ok(ride);
        }
        // distinguish a missing ride from a lost race or wrong state
        let current = self.find_ride(ride_id).await?;
        warn!(ride_id = %ride_id, status = %current.status, expected = %from, "conditional transition refused");
        Err(match from {
            RideStatus::Requested => not_requested(),
            _ => not_accepted(),
        })
    }
}
