// src/handlers/portfolio.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::{AppError, AppJson, AppPath, AppQuery},
    models::portfolio::{
        FeatureRequest, ListParams, Pagination, PortfolioFilter, PortfolioRequest,
        PublicListParams, Visibility, clamp_limit,
    },
    store::PortfolioStore,
    utils::auth::AuthUser,
};

fn not_found() -> AppError {
    AppError::NotFound("Portfolio item not found".to_string())
}

/// List the current user's portfolios (newest first), with optional
/// category/status/featured/visibility filters and page-based pagination.
pub async fn list_portfolios(
    State(portfolios): State<Arc<dyn PortfolioStore>>,
    Extension(auth): Extension<AuthUser>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = clamp_limit(params.limit);
    let page = params.page.unwrap_or(1).max(1);

    let result = portfolios
        .list(&PortfolioFilter {
            owner: Some(auth.id()),
            category: params.category,
            status: params.status,
            featured: params.featured,
            visibility: params.visibility,
            offset: (page - 1).saturating_mul(limit),
            limit,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to list portfolios: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(json!({
        "portfolios": result.items,
        "pagination": Pagination::new(page, result.total, limit),
    })))
}

/// Get a single portfolio owned by the current user.
/// A record owned by someone else is reported as missing.
pub async fn get_portfolio(
    State(portfolios): State<Arc<dyn PortfolioStore>>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let portfolio = portfolios
        .find_owned(id, auth.id())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({ "portfolio": portfolio })))
}

/// Create a new portfolio owned by the current user.
pub async fn create_portfolio(
    State(portfolios): State<Arc<dyn PortfolioStore>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(payload): AppJson<PortfolioRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = payload.into_input()?;

    let portfolio = portfolios.create(auth.id(), input).await.map_err(|e| {
        tracing::error!("Failed to create portfolio: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(
        portfolio_id = portfolio.id,
        owner = auth.id(),
        "Portfolio created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Portfolio item created successfully",
            "portfolio": portfolio,
        })),
    ))
}

/// Replace a portfolio owned by the current user.
/// The payload is validated in full; omitted optional fields reset to their defaults.
pub async fn update_portfolio(
    State(portfolios): State<Arc<dyn PortfolioStore>>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<PortfolioRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = payload.into_input()?;

    let portfolio = portfolios
        .update_owned(id, auth.id(), input)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update portfolio: {:?}", e);
            AppError::from(e)
        })?
        .ok_or_else(not_found)?;

    Ok(Json(json!({
        "message": "Portfolio item updated successfully",
        "portfolio": portfolio,
    })))
}

/// Delete a portfolio owned by the current user.
pub async fn delete_portfolio(
    State(portfolios): State<Arc<dyn PortfolioStore>>,
    Extension(auth): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = portfolios.delete_owned(id, auth.id()).await.map_err(|e| {
        tracing::error!("Failed to delete portfolio: {:?}", e);
        AppError::from(e)
    })?;

    if !deleted {
        return Err(not_found());
    }

    tracing::info!(portfolio_id = id, owner = auth.id(), "Portfolio deleted");

    Ok(Json(json!({ "message": "Portfolio item deleted successfully" })))
}

/// Public gallery: every `public` portfolio, newest first.
/// Reachable with either a bearer token or an API key.
pub async fn list_public(
    State(portfolios): State<Arc<dyn PortfolioStore>>,
    Extension(auth): Extension<AuthUser>,
    AppQuery(params): AppQuery<PublicListParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(user_id = auth.id(), method = ?auth.method, "Public listing");

    let result = portfolios
        .list(&PortfolioFilter {
            category: params.category,
            featured: params.featured,
            visibility: Some(Visibility::Public),
            limit: clamp_limit(params.limit),
            ..Default::default()
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to list public portfolios: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(json!({ "portfolios": result.items })))
}

/// Set or clear the featured flag on any portfolio.
/// Admin only; the role gate runs as middleware before this handler.
pub async fn set_featured(
    State(portfolios): State<Arc<dyn PortfolioStore>>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<FeatureRequest>,
) -> Result<impl IntoResponse, AppError> {
    let portfolio = portfolios
        .set_featured(id, payload.featured)
        .await?
        .ok_or_else(not_found)?;

    let verb = if payload.featured { "featured" } else { "unfeatured" };

    Ok(Json(json!({
        "message": format!("Portfolio item {verb} successfully"),
        "portfolio": portfolio,
    })))
}
