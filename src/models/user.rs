// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique email address, stored lowercased.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// User role: 'buyer', 'seller' or 'admin'.
    pub role: String,

    /// Whether the user has verified their email address.
    pub is_verified: bool,

    /// Whether the user has completed identity verification.
    pub identity_verified: bool,

    pub is_active: bool,

    /// Consecutive failed login attempts. Reset to 0 on success.
    /// Updated together with `last_failed_login`, never independently.
    pub failed_login_attempts: i32,

    /// Timestamp of the last failed login attempt, if any.
    pub last_failed_login: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Public profile data returned by auth and profile endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub identity_verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            is_verified: user.is_verified,
            identity_verified: user.identity_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    pub password_confirm: String,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    /// Optional: 'buyer' (default) or 'seller'. Admins are seeded, never registered.
    #[validate(custom(function = validate_register_role))]
    pub role: Option<String>,
}

fn validate_register_role(role: &str) -> Result<(), validator::ValidationError> {
    if role != "buyer" && role != "seller" {
        return Err(validator::ValidationError::new("invalid_role"));
    }
    Ok(())
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for refreshing a token pair.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// DTO for partial profile updates.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
}
