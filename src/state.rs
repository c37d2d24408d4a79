use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{AccountStore, MemoryAccountStore, PgAccountStore};
use crate::config::{AppConfig, StoreBackend};
use crate::rides::repo::{MemoryRideStore, PgRideStore, RideStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub accounts: Arc<dyn AccountStore>,
    pub rides: Arc<dyn RideStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (accounts, rides) = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }

                (
                    Arc::new(PgAccountStore::new(db.clone())) as Arc<dyn AccountStore>,
                    Arc::new(PgRideStore::new(db)) as Arc<dyn RideStore>,
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory stores; data is lost on restart");
                (
                    Arc::new(MemoryAccountStore::default()) as Arc<dyn AccountStore>,
                    Arc::new(MemoryRideStore::default()) as Arc<dyn RideStore>,
                )
            }
        };

        Ok(Self::from_parts(config, accounts, rides))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        accounts: Arc<dyn AccountStore>,
        rides: Arc<dyn RideStore>,
    ) -> Self {
        let keys = Arc::new(JwtKeys::new(&config.jwt));
        Self {
            config,
            keys,
            accounts,
            rides,
        }
    }

    #[cfg(test)]
    pub fn fake(atomic_transitions: bool) -> Self {
        use crate::config::{JwtConfig, RidesConfig};

        let config = Arc::new(AppConfig {
            store: StoreBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            rides: RidesConfig { atomic_transitions },
        });

        Self::from_parts(
            config,
            Arc::new(MemoryAccountStore::default()),
            Arc::new(MemoryRideStore::default()),
        )
    }
}
