use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use model::{
    CreateLink, LinkPatch, Profile, ReorderRequest, UserPatch, UsernameAvailability,
};

use crate::{
    auth::OwnerId,
    error::AppError,
    rate_limit::{client_key, RateLimit},
    state::AppState,
};

pub async fn create_link_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(req): Json<CreateLink>,
) -> Result<impl IntoResponse, AppError> {
    let link = state.engine.append(&owner, req).await?;
    info!("Link created: {}", link.id);
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn links_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    let links = state.engine.list(&owner).await?;
    Ok(Json(links))
}

pub async fn patch_link_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
    Json(patch): Json<LinkPatch>,
) -> Result<impl IntoResponse, AppError> {
    let link = state.engine.patch(&owner, &id, patch).await?;
    Ok(Json(link))
}

pub async fn delete_link_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.engine.delete(&owner, &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn toggle_link_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let link = state.engine.toggle_active(&owner, &id).await?;
    Ok(Json(link))
}

pub async fn reorder_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(req): Json<ReorderRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.engine.reorder(&owner, &req.link_ids).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct UsernameQuery {
    username: String,
}

pub async fn username_check_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UsernameQuery>,
) -> Result<impl IntoResponse, AppError> {
    if !state.username_limiter.check(&client_key(&headers)).allowed {
        return Err(AppError::RateLimited);
    }

    let username = query.username.to_lowercase();
    let taken = state.users.username_taken(&username).await?;
    Ok(Json(UsernameAvailability {
        available: !taken,
        username,
    }))
}

#[derive(Deserialize)]
pub struct ClaimUsername {
    username: String,
}

pub async fn claim_username_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(req): Json<ClaimUsername>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.to_lowercase();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }

    let user = state.users.claim_username(&owner, &username).await?;
    info!("Username claimed: {username}");
    Ok(Json(user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    display_name: Option<String>,
    bio: Option<String>,
}

pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(req): Json<ProfileFields>,
) -> Result<impl IntoResponse, AppError> {
    let patch = UserPatch {
        display_name: Some(none_if_empty(req.display_name)),
        bio: Some(none_if_empty(req.bio)),
        ..Default::default()
    };
    state.users.update_user(&owner, &patch).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorFields {
    bg_color: Option<String>,
    text_color: Option<String>,
    accent_color: Option<String>,
}

pub async fn colors_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
    Json(req): Json<ColorFields>,
) -> Result<impl IntoResponse, AppError> {
    let patch = UserPatch {
        bg_color: Some(none_if_empty(req.bg_color)),
        text_color: Some(none_if_empty(req.text_color)),
        accent_color: Some(none_if_empty(req.accent_color)),
        ..Default::default()
    };
    state.users.update_user(&owner, &patch).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn background_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    let patch = UserPatch {
        background_url: Some(None),
        ..Default::default()
    };
    state.users.update_user(&owner, &patch).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn cursor_handler(
    State(state): State<Arc<AppState>>,
    OwnerId(owner): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    let patch = UserPatch {
        cursor_url: Some(None),
        ..Default::default()
    };
    state.users.update_user(&owner, &patch).await?;
    Ok(Json(json!({ "success": true })))
}

/// Public page payload: visible profile fields plus active links in
/// display order. Never includes inactive links.
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let username = username.to_lowercase();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    let links = state.engine.public_links(&user.id).await?;
    Ok(Json(Profile::new(user, links)))
}

/// View tracking is fire-and-forget: a failed increment is logged and
/// never surfaced to the visitor.
pub async fn views_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.views_limiter.check(&client_key(&headers)).allowed {
        return Err(AppError::RateLimited);
    }

    let username = username.to_lowercase();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(e) = state.users.bump_views(&user.id).await {
        warn!("Failed to track view for {username}: {e}");
    }
    Ok(Json(json!({ "success": true })))
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
