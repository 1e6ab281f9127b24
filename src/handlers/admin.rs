// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::{error::AppError, models::user::User, trending};

/// Lists all users in the system, including their lockout state.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(users))
}

/// Query parameters for the trending refresh pass.
#[derive(Debug, Deserialize)]
pub struct RefreshTrendingParams {
    /// When present, re-flag this many top events as trending after the
    /// recompute. When absent, only scores are touched and any curated
    /// flags stay as they are.
    pub flag_top: Option<i64>,
}

/// Maintenance pass: recomputes every event's trending score and
/// optionally re-flags the computed top N.
/// Admin only.
pub async fn refresh_trending(
    State(pool): State<PgPool>,
    Query(params): Query<RefreshTrendingParams>,
) -> Result<impl IntoResponse, AppError> {
    let updated = trending::refresh_scores(&pool, chrono::Utc::now()).await?;

    let flagged = match params.flag_top {
        Some(n) => Some(trending::flag_top_trending(&pool, n.clamp(0, 50)).await?),
        None => None,
    };

    Ok(Json(json!({
        "updated": updated,
        "flagged": flagged,
    })))
}

/// DTO for curating the trending flag on one event.
#[derive(Debug, Deserialize)]
pub struct SetTrendingRequest {
    pub is_trending: bool,
}

/// Curation override: force the trending flag on or off for one event,
/// independent of its computed score. Holds until the next re-flag pass.
/// Admin only.
pub async fn set_event_trending(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<SetTrendingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE events SET is_trending = $1, updated_at = NOW() WHERE id = $2 RETURNING id",
    )
    .bind(payload.is_trending)
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    if updated.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    Ok(Json(json!({ "id": id, "is_trending": payload.is_trending })))
}
