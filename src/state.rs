// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::{Config, StoreKind},
    error::AppError,
    models::user::{NewUser, Role, normalize_email},
    store::{MemoryStore, PgStore, PortfolioStore, StoreError, UserStore},
    utils::hash::hash_password,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub portfolios: Arc<dyn PortfolioStore>,
    pub config: Config,
}

impl AppState {
    /// Builds the state on the store selected by `config`.
    pub async fn connect(config: Config) -> Result<Self, StoreError> {
        match config.store {
            StoreKind::Postgres => {
                let url = config.database_url.clone().unwrap_or_default();
                let store = Arc::new(PgStore::connect(&url).await?);
                Ok(Self {
                    users: store.clone(),
                    portfolios: store,
                    config,
                })
            }
            StoreKind::Memory => Ok(Self::in_memory(config)),
        }
    }

    /// State over a fresh, empty in-memory store.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            portfolios: store,
            config,
        }
    }

    /// Creates the configured admin account unless the username already
    /// exists. Does nothing when no admin is configured.
    pub async fn seed_admin(&self) -> Result<(), AppError> {
        let Some(admin) = &self.config.admin else {
            return Ok(());
        };

        if self.users.find_by_username(&admin.username).await?.is_some() {
            return Ok(());
        }

        tracing::info!("Seeding admin user: {}", admin.username);
        let password_hash = hash_password(&admin.password)?;
        self.users
            .create(NewUser {
                username: admin.username.clone(),
                email: normalize_email(&admin.email),
                password_hash,
                role: Role::Admin,
            })
            .await?;
        tracing::info!("Admin user created successfully.");

        Ok(())
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserStore> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<dyn PortfolioStore> {
    fn from_ref(state: &AppState) -> Self {
        state.portfolios.clone()
    }
}
