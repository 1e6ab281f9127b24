// src/handlers/auth.rs

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RefreshRequest, RegisterRequest, User, UserResponse},
    security,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{TOKEN_TYPE_REFRESH, sign_token_pair, verify_jwt},
        net::client_ip,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with the profile and a token pair.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.password != payload.password_confirm {
        return Err(AppError::BadRequest("Passwords don't match.".to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let role = payload.role.as_deref().unwrap_or("buyer");
    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password, first_name, last_name, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(&hashed_password)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Email '{}' already registered", email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    security::log_security_event(
        "REGISTRATION_SUCCESS",
        &user.email,
        &client_ip(&headers, peer),
    );

    let (access, refresh) = sign_token_pair(user.id, &user.role, &config)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": UserResponse::from(&user),
            "access": access,
            "refresh": refresh,
        })),
    ))
}

/// Authenticates a user and returns a JWT token pair.
///
/// Consults the lockout guard BEFORE verifying the password, and returns
/// the same generic 401 for every failure: the response must not reveal
/// whether the email exists, the password was wrong, or the account is
/// locked or disabled. The specifics go to the security log only.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let ip = client_ip(&headers, peer);

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let Some(user) = user else {
        security::log_security_event("LOGIN_FAILED", &email, &ip);
        return Err(AppError::InvalidCredentials);
    };

    let now = chrono::Utc::now();
    if security::is_locked(user.failed_login_attempts, user.last_failed_login, now) {
        security::log_security_event("LOGIN_LOCKED", &email, &ip);
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        security::log_security_event("LOGIN_FAILED", &email, &ip);
        return Err(AppError::InvalidCredentials);
    }

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        security::record_failure(&pool, user.id).await?;
        security::log_security_event("LOGIN_FAILED", &email, &ip);
        return Err(AppError::InvalidCredentials);
    }

    security::record_success(&pool, user.id).await?;
    security::log_security_event("LOGIN_SUCCESS", &email, &ip);

    let (access, refresh) = sign_token_pair(user.id, &user.role, &config)?;

    Ok(Json(json!({
        "user": UserResponse::from(&user),
        "access": access,
        "refresh": refresh,
    })))
}

/// Exchanges a valid refresh token for a fresh token pair.
///
/// Access tokens are rejected here; the account must still be active.
pub async fn refresh(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = verify_jwt(&payload.refresh, &config.jwt_secret)?;

    if claims.typ != TOKEN_TYPE_REFRESH {
        return Err(AppError::AuthError("Invalid token".to_string()));
    }

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::AuthError("Invalid token".to_string()))?;

    let (access, refresh) = sign_token_pair(user.id, &user.role, &config)?;

    Ok(Json(json!({
        "access": access,
        "refresh": refresh,
    })))
}
