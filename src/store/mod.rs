//! Record store ports.
//!
//! Handlers talk to persistence only through [`UserStore`] and
//! [`PortfolioStore`]. [`PgStore`] backs production; [`MemoryStore`] backs
//! tests and `STORE=memory` local runs. Every write touches a single record,
//! so neither adapter needs multi-record transactions.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    portfolio::{Page, Portfolio, PortfolioFilter, PortfolioInput},
    user::{NewUser, ProfileChanges, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A unique constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// A stored value could not be mapped back to its domain type.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub(crate) const DUPLICATE_USER: &str = "User already exists with this email or username";

/// Port for account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with [`StoreError::Conflict`] on a taken
    /// username or email.
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find the owner of `key`, provided both the key and the account are
    /// active.
    async fn find_by_api_key(&self, key: &str) -> Result<Option<User>>;

    async fn record_login(&self, id: i64) -> Result<()>;

    /// Apply profile edits, returning the updated user if it exists.
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<User>>;

    /// `Some` stores and activates a key, `None` clears and deactivates it.
    async fn set_api_key(&self, id: i64, key: Option<String>) -> Result<()>;

    /// Deactivates or reactivates an account. No route exposes this; it is
    /// the hook for operator tooling and the test harness. An inactive
    /// account fails login and every credential check.
    async fn set_active(&self, id: i64, active: bool) -> Result<()>;
}

/// Port for portfolio persistence. Every `*_owned` call is scoped to the
/// owner, so a foreign record looks exactly like a missing one.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn create(&self, owner: i64, input: PortfolioInput) -> Result<Portfolio>;

    async fn find_owned(&self, id: i64, owner: i64) -> Result<Option<Portfolio>>;

    /// Newest first, honoring the filter's offset and limit.
    async fn list(&self, filter: &PortfolioFilter) -> Result<Page<Portfolio>>;

    /// Replace every editable field. `featured` and `owner` are preserved.
    async fn update_owned(
        &self,
        id: i64,
        owner: i64,
        input: PortfolioInput,
    ) -> Result<Option<Portfolio>>;

    /// Returns whether a record was removed.
    async fn delete_owned(&self, id: i64, owner: i64) -> Result<bool>;

    /// Set the featured flag regardless of owner.
    async fn set_featured(&self, id: i64, featured: bool) -> Result<Option<Portfolio>>;
}
