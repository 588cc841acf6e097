// src/models/portfolio.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::error::AppError;

/// Defines a closed set of string-valued variants that are stored as TEXT
/// and exchanged on the wire in kebab-case.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), " '{}'"), other)),
                }
            }
        }
    };
}

text_enum!(
    /// Project category.
    Category {
        WebDevelopment => "web-development",
        MobileApp => "mobile-app",
        Design => "design",
        DataScience => "data-science",
        Other => "other",
    }
);

text_enum!(
    /// Project progress.
    Status {
        Completed => "completed",
        InProgress => "in-progress",
        Planned => "planned",
    }
);

text_enum!(
    /// Public records appear in the gallery; private ones are owner-only.
    Visibility {
        Public => "public",
        Private => "private",
    }
);

impl Default for Status {
    fn default() -> Self {
        Status::Completed
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}

/// A stored portfolio record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub status: Status,
    pub featured: bool,
    pub visibility: Visibility,

    /// Owning user id. Fixed at creation.
    pub owner: i64,
    pub owner_username: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating or fully replacing a portfolio.
///
/// `featured` is not accepted here; it only changes through the admin toggle.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title length must be between 1 and 100 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 1000,
        message = "Description length must be between 1 and 1000 chars"
    ))]
    pub description: String,

    pub category: Category,

    #[serde(default)]
    pub technologies: Vec<String>,

    #[validate(custom(function = validate_url_string))]
    pub image_url: Option<String>,
    #[validate(custom(function = validate_url_string))]
    pub project_url: Option<String>,
    #[validate(custom(function = validate_url_string))]
    pub github_url: Option<String>,

    pub status: Option<Status>,
    pub visibility: Option<Visibility>,
}

/// Validated, normalized portfolio fields ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioInput {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub status: Status,
    pub visibility: Visibility,
}

impl PortfolioRequest {
    /// Trims and validates the payload. The description is stored as given.
    /// Empty link fields are treated as absent.
    pub fn into_input(mut self) -> Result<PortfolioInput, AppError> {
        self.title = self.title.trim().to_string();
        self.image_url = blank_to_none(self.image_url);
        self.project_url = blank_to_none(self.project_url);
        self.github_url = blank_to_none(self.github_url);

        if let Err(validation_errors) = self.validate() {
            return Err(AppError::BadRequest(validation_errors.to_string()));
        }

        let technologies = self
            .technologies
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(PortfolioInput {
            title: self.title,
            description: self.description,
            category: self.category,
            technologies,
            image_url: self.image_url,
            project_url: self.project_url,
            github_url: self.github_url,
            status: self.status.unwrap_or_default(),
            visibility: self.visibility.unwrap_or_default(),
        })
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates that a string is a correctly formatted absolute URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if url.len() > 500 {
        return Err(validator::ValidationError::new("url_too_long"));
    }
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

/// Body of the admin featured toggle.
#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub featured: bool,
}

/// Query parameters for listing the current user's portfolios.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<Category>,
    pub status: Option<Status>,
    pub featured: Option<bool>,
    pub visibility: Option<Visibility>,

    /// 1-based page number (default: 1).
    pub page: Option<i64>,

    /// Number of items per page (default: 10, max: 100).
    pub limit: Option<i64>,
}

/// Query parameters for the public gallery.
#[derive(Debug, Default, Deserialize)]
pub struct PublicListParams {
    pub category: Option<Category>,
    pub featured: Option<bool>,
    pub limit: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamps a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Store-level selection, shared by owner listings and the public gallery.
#[derive(Debug, Clone, Default)]
pub struct PortfolioFilter {
    pub owner: Option<i64>,
    pub category: Option<Category>,
    pub status: Option<Status>,
    pub featured: Option<bool>,
    pub visibility: Option<Visibility>,
    pub offset: i64,
    pub limit: i64,
}

impl PortfolioFilter {
    /// Whether a record satisfies every set criterion. Ignores paging.
    pub fn matches(&self, portfolio: &Portfolio) -> bool {
        self.owner.is_none_or(|owner| portfolio.owner == owner)
            && self.category.is_none_or(|c| portfolio.category == c)
            && self.status.is_none_or(|s| portfolio.status == s)
            && self.featured.is_none_or(|f| portfolio.featured == f)
            && self.visibility.is_none_or(|v| portfolio.visibility == v)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Pagination block returned alongside owner listings.
#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(current: i64, total: i64, limit: i64) -> Self {
        Self {
            current,
            pages: (total + limit - 1) / limit,
            total,
            limit,
        }
    }
}
