use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{UpdateProfileRequest, User, UserResponse},
    utils::jwt::Claims,
};

/// Get current user's profile.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(&user)))
}

/// Partially update the current user's profile (names only).
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(&user)))
}
