use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{Ride, RideRow, RideStatus};

/// Ride store, keyed by ride id.
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ride>>;
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Ride>>;
    async fn find_by_status(&self, status: RideStatus) -> anyhow::Result<Vec<Ride>>;

    /// Inserts or overwrites the ride (last write wins).
    async fn save(&self, ride: &Ride) -> anyhow::Result<Ride>;

    /// Moves the ride from `from` to `to` only if it is currently in `from`,
    /// setting the driver when one is given. `None` if the ride is missing
    /// or in another state.
    async fn transition(
        &self,
        id: Uuid,
        from: RideStatus,
        to: RideStatus,
        driver_id: Option<Uuid>,
    ) -> anyhow::Result<Option<Ride>>;
}

const RIDE_COLUMNS: &str =
    "id, user_id, driver_id, pickup_location, drop_location, status, created_at";

#[derive(Clone)]
pub struct PgRideStore {
    db: PgPool,
}

impl PgRideStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_rides(rows: Vec<RideRow>) -> anyhow::Result<Vec<Ride>> {
    rows.into_iter().map(Ride::try_from).collect()
}

#[async_trait]
impl RideStore for PgRideStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ride>> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find ride by id")?;
        row.map(Ride::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Ride>> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list rides by user")?;
        into_rides(rows)
    }

    async fn find_by_status(&self, status: RideStatus) -> anyhow::Result<Vec<Ride>> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE status = $1 ORDER BY created_at ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await
        .context("list rides by status")?;
        into_rides(rows)
    }

    async fn save(&self, ride: &Ride) -> anyhow::Result<Ride> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            r#"
            INSERT INTO rides (id, user_id, driver_id, pickup_location, drop_location, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
               SET driver_id = EXCLUDED.driver_id,
                   status = EXCLUDED.status
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .bind(ride.id)
        .bind(ride.user_id)
        .bind(ride.driver_id)
        .bind(&ride.pickup_location)
        .bind(&ride.drop_location)
        .bind(ride.status.as_str())
        .bind(ride.created_at)
        .fetch_one(&self.db)
        .await
        .context("save ride")?;
        Ride::try_from(row)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: RideStatus,
        to: RideStatus,
        driver_id: Option<Uuid>,
    ) -> anyhow::Result<Option<Ride>> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            r#"
            UPDATE rides
               SET status = $1,
                   driver_id = COALESCE($2, driver_id)
             WHERE id = $3 AND status = $4
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .bind(to.as_str())
        .bind(driver_id)
        .bind(id)
        .bind(from.as_str())
        .fetch_optional(&self.db)
        .await
        .context("conditional ride transition")?;
        row.map(Ride::try_from).transpose()
    }
}

/// Process-local store for tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryRideStore {
    rides: RwLock<HashMap<Uuid, Ride>>,
}

impl MemoryRideStore {
    async fn filtered(&self, keep: impl Fn(&Ride) -> bool) -> Vec<Ride> {
        let mut out: Vec<Ride> = self
            .rides
            .read()
            .await
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        out
    }
}

#[async_trait]
impl RideStore for MemoryRideStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ride>> {
        Ok(self.rides.read().await.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Ride>> {
        Ok(self.filtered(|r| r.user_id == user_id).await)
    }

    async fn find_by_status(&self, status: RideStatus) -> anyhow::Result<Vec<Ride>> {
        Ok(self.filtered(|r| r.status == status).await)
    }

    async fn save(&self, ride: &Ride) -> anyhow::Result<Ride> {
        self.rides.write().await.insert(ride.id, ride.clone());
        Ok(ride.clone())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: RideStatus,
        to: RideStatus,
        driver_id: Option<Uuid>,
    ) -> anyhow::Result<Option<Ride>> {
        let mut rides = self.rides.write().await;
        let Some(ride) = rides.get_mut(&id).filter(|r| r.status == from) else {
            return Ok(None);
        };
        ride.status = to;
        if driver_id.is_some() {
            ride.driver_id = driver_id;
        }
        Ok(Some(ride.clone()))
    }
}
