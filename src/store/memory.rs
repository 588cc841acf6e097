//! In-memory adapter for the record store.
//!
//! Tables live behind one `RwLock`, so each call observes and mutates a
//! consistent snapshot, matching the single-row atomicity of the database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{DUPLICATE_USER, PortfolioStore, Result, StoreError, UserStore};
use crate::models::{
    portfolio::{Page, Portfolio, PortfolioFilter, PortfolioInput},
    user::{NewUser, ProfileChanges, User},
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    portfolios: BTreeMap<i64, Portfolio>,
    next_user_id: i64,
    next_portfolio_id: i64,
}

impl Tables {
    fn taken(&self, username: Option<&str>, email: Option<&str>, except: Option<i64>) -> bool {
        self.users.values().any(|u| {
            Some(u.id) != except
                && (username == Some(u.username.as_str()) || email == Some(u.email.as_str()))
        })
    }

    /// Copy of a stored portfolio with the owner's current username.
    fn hydrate(&self, portfolio: &Portfolio) -> Portfolio {
        let mut out = portfolio.clone();
        if let Some(owner) = self.users.get(&portfolio.owner) {
            out.owner_username = owner.username.clone();
        }
        out
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.taken(Some(user.username.as_str()), Some(user.email.as_str()), None) {
            return Err(StoreError::Conflict(DUPLICATE_USER.to_string()));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.next_user_id,
            username: user.username,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            is_active: true,
            api_key: None,
            api_key_active: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_api_key(&self, key: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.api_key.as_deref() == Some(key) && u.api_key_active && u.is_active)
            .cloned())
    }

    async fn record_login(&self, id: i64) -> Result<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if tables.taken(changes.username.as_deref(), changes.email.as_deref(), Some(id)) {
            return Err(StoreError::Conflict(DUPLICATE_USER.to_string()));
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password) = changes.password_hash {
            user.password = password;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_api_key(&self, id: i64, key: Option<String>) -> Result<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.api_key_active = key.is_some();
            user.api_key = key;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.is_active = active;
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn create(&self, owner: i64, input: PortfolioInput) -> Result<Portfolio> {
        let mut tables = self.tables.write().await;
        let owner_username = tables
            .users
            .get(&owner)
            .map(|u| u.username.clone())
            .ok_or_else(|| StoreError::Corrupt(format!("owner {owner} does not exist")))?;

        tables.next_portfolio_id += 1;
        let now = Utc::now();
        let portfolio = Portfolio {
            id: tables.next_portfolio_id,
            title: input.title,
            description: input.description,
            category: input.category,
            technologies: input.technologies,
            image_url: input.image_url,
            project_url: input.project_url,
            github_url: input.github_url,
            status: input.status,
            featured: false,
            visibility: input.visibility,
            owner,
            owner_username,
            created_at: now,
            updated_at: now,
        };
        tables.portfolios.insert(portfolio.id, portfolio.clone());
        Ok(portfolio)
    }

    async fn find_owned(&self, id: i64, owner: i64) -> Result<Option<Portfolio>> {
        let tables = self.tables.read().await;
        Ok(tables
            .portfolios
            .get(&id)
            .filter(|p| p.owner == owner)
            .map(|p| tables.hydrate(p)))
    }

    async fn list(&self, filter: &PortfolioFilter) -> Result<Page<Portfolio>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&Portfolio> = tables
            .portfolios
            .values()
            .filter(|p| filter.matches(p))
            .collect();
        matched.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(0))
            .take(usize::try_from(filter.limit).unwrap_or(0))
            .map(|p| tables.hydrate(p))
            .collect();

        Ok(Page { items, total })
    }

    async fn update_owned(
        &self,
        id: i64,
        owner: i64,
        input: PortfolioInput,
    ) -> Result<Option<Portfolio>> {
        let mut tables = self.tables.write().await;
        let Some(portfolio) = tables.portfolios.get_mut(&id).filter(|p| p.owner == owner) else {
            return Ok(None);
        };

        portfolio.title = input.title;
        portfolio.description = input.description;
        portfolio.category = input.category;
        portfolio.technologies = input.technologies;
        portfolio.image_url = input.image_url;
        portfolio.project_url = input.project_url;
        portfolio.github_url = input.github_url;
        portfolio.status = input.status;
        portfolio.visibility = input.visibility;
        portfolio.updated_at = Utc::now();

        let updated = portfolio.clone();
        Ok(Some(tables.hydrate(&updated)))
    }

    async fn delete_owned(&self, id: i64, owner: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.portfolios.get(&id).is_some_and(|p| p.owner == owner) {
            tables.portfolios.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn set_featured(&self, id: i64, featured: bool) -> Result<Option<Portfolio>> {
        let mut tables = self.tables.write().await;
        let Some(portfolio) = tables.portfolios.get_mut(&id) else {
            return Ok(None);
        };
        portfolio.featured = featured;
        portfolio.updated_at = Utc::now();

        let updated = portfolio.clone();
        Ok(Some(tables.hydrate(&updated)))
    }
}
