//! PostgreSQL adapter for the record store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

use super::{DUPLICATE_USER, PortfolioStore, Result, StoreError, UserStore};
use crate::models::{
    portfolio::{Page, Portfolio, PortfolioFilter, PortfolioInput},
    user::{NewUser, ProfileChanges, User},
};

const USER_COLUMNS: &str = "id, username, email, password, role, is_active, api_key, \
     api_key_active, last_login, created_at, updated_at";

/// Portfolio columns, selected from alias `p` joined with owner alias `u`.
const PORTFOLIO_COLUMNS: &str = "p.id, p.title, p.description, p.category, p.technologies, \
     p.image_url, p.project_url, p.github_url, p.status, p.featured, p.visibility, \
     p.owner_id, u.username AS owner_username, p.created_at, p.updated_at";

const PORTFOLIO_FILTER: &str = "($1::BIGINT IS NULL OR p.owner_id = $1) \
     AND ($2::TEXT IS NULL OR p.category = $2) \
     AND ($3::TEXT IS NULL OR p.status = $3) \
     AND ($4::BOOLEAN IS NULL OR p.featured = $4) \
     AND ($5::TEXT IS NULL OR p.visibility = $5)";

/// Row of the `users` table.
#[derive(Debug, FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    email: String,
    password: String,
    role: String,
    is_active: bool,
    api_key: Option<String>,
    api_key_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = StoreError;

    fn try_from(r: UserRecord) -> Result<Self> {
        Ok(User {
            id: r.id,
            username: r.username,
            email: r.email,
            password: r.password,
            role: r.role.parse().map_err(StoreError::Corrupt)?,
            is_active: r.is_active,
            api_key: r.api_key,
            api_key_active: r.api_key_active,
            last_login: r.last_login,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Row of `portfolios` joined with the owner's username.
#[derive(Debug, FromRow)]
struct PortfolioRecord {
    id: i64,
    title: String,
    description: String,
    category: String,
    technologies: Vec<String>,
    image_url: Option<String>,
    project_url: Option<String>,
    github_url: Option<String>,
    status: String,
    featured: bool,
    visibility: String,
    owner_id: i64,
    owner_username: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PortfolioRecord> for Portfolio {
    type Error = StoreError;

    fn try_from(r: PortfolioRecord) -> Result<Self> {
        Ok(Portfolio {
            id: r.id,
            title: r.title,
            description: r.description,
            category: r.category.parse().map_err(StoreError::Corrupt)?,
            technologies: r.technologies,
            image_url: r.image_url,
            project_url: r.project_url,
            github_url: r.github_url,
            status: r.status.parse().map_err(StoreError::Corrupt)?,
            featured: r.featured,
            visibility: r.visibility.parse().map_err(StoreError::Corrupt)?,
            owner: r.owner_id,
            owner_username: r.owner_username,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

fn into_user(record: Option<UserRecord>) -> Result<Option<User>> {
    record.map(User::try_from).transpose()
}

fn into_portfolio(record: Option<PortfolioRecord>) -> Result<Option<Portfolio>> {
    record.map(Portfolio::try_from).transpose()
}

/// Maps unique-constraint violations on `users` to a conflict.
fn user_write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(DUPLICATE_USER.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retry, since the database container may still be
    /// starting, then applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > 5 {
                        return Err(e.into());
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (username, email, password, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(user_write_error)?;

        record.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        into_user(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        into_user(record)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        into_user(record)
    }

    async fn find_by_api_key(&self, key: &str) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE api_key = $1 AND api_key_active AND is_active"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        into_user(record)
    }

    async fn record_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                password = COALESCE($4, password), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(user_write_error)?;

        into_user(record)
    }

    async fn set_api_key(&self, id: i64, key: Option<String>) -> Result<()> {
        let active = key.is_some();
        sqlx::query(
            "UPDATE users SET api_key = $2, api_key_active = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(key)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<()> {
        sqlx::query("UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn create(&self, owner: i64, input: PortfolioInput) -> Result<Portfolio> {
        let record = sqlx::query_as::<_, PortfolioRecord>(&format!(
            "WITH p AS ( \
                INSERT INTO portfolios \
                    (title, description, category, technologies, image_url, project_url, \
                     github_url, status, visibility, owner_id) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                RETURNING * \
             ) \
             SELECT {PORTFOLIO_COLUMNS} FROM p JOIN users u ON u.id = p.owner_id"
        ))
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.category.as_str())
        .bind(&input.technologies)
        .bind(&input.image_url)
        .bind(&input.project_url)
        .bind(&input.github_url)
        .bind(input.status.as_str())
        .bind(input.visibility.as_str())
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        record.try_into()
    }

    async fn find_owned(&self, id: i64, owner: i64) -> Result<Option<Portfolio>> {
        let record = sqlx::query_as::<_, PortfolioRecord>(&format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios p JOIN users u ON u.id = p.owner_id \
             WHERE p.id = $1 AND p.owner_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        into_portfolio(record)
    }

    async fn list(&self, filter: &PortfolioFilter) -> Result<Page<Portfolio>> {
        let records = sqlx::query_as::<_, PortfolioRecord>(&format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios p JOIN users u ON u.id = p.owner_id \
             WHERE {PORTFOLIO_FILTER} \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $6 OFFSET $7"
        ))
        .bind(filter.owner)
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.featured)
        .bind(filter.visibility.map(|v| v.as_str()))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM portfolios p WHERE {PORTFOLIO_FILTER}"
        ))
        .bind(filter.owner)
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.featured)
        .bind(filter.visibility.map(|v| v.as_str()))
        .fetch_one(&self.pool)
        .await?;

        let items = records
            .into_iter()
            .map(Portfolio::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page { items, total })
    }

    async fn update_owned(
        &self,
        id: i64,
        owner: i64,
        input: PortfolioInput,
    ) -> Result<Option<Portfolio>> {
        let record = sqlx::query_as::<_, PortfolioRecord>(&format!(
            "WITH p AS ( \
                UPDATE portfolios SET \
                    title = $3, description = $4, category = $5, technologies = $6, \
                    image_url = $7, project_url = $8, github_url = $9, \
                    status = $10, visibility = $11, updated_at = NOW() \
                WHERE id = $1 AND owner_id = $2 \
                RETURNING * \
             ) \
             SELECT {PORTFOLIO_COLUMNS} FROM p JOIN users u ON u.id = p.owner_id"
        ))
        .bind(id)
        .bind(owner)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.category.as_str())
        .bind(&input.technologies)
        .bind(&input.image_url)
        .bind(&input.project_url)
        .bind(&input.github_url)
        .bind(input.status.as_str())
        .bind(input.visibility.as_str())
        .fetch_optional(&self.pool)
        .await?;

        into_portfolio(record)
    }

    async fn delete_owned(&self, id: i64, owner: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM portfolios WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_featured(&self, id: i64, featured: bool) -> Result<Option<Portfolio>> {
        let record = sqlx::query_as::<_, PortfolioRecord>(&format!(
            "WITH p AS ( \
                UPDATE portfolios SET featured = $2, updated_at = NOW() \
                WHERE id = $1 \
                RETURNING * \
             ) \
             SELECT {PORTFOLIO_COLUMNS} FROM p JOIN users u ON u.id = p.owner_id"
        ))
        .bind(id)
        .bind(featured)
        .fetch_optional(&self.pool)
        .await?;

        into_portfolio(record)
    }
}
