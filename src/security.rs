// src/security.rs
//
// Login security guard. Tracks consecutive failed authentication attempts
// per account and locks the account out for a fixed window once the
// threshold is reached. The lock check runs BEFORE password verification,
// and every failure path surfaces the same generic error to the caller;
// the distinction between "unknown email", "wrong password" and "locked"
// only exists in the internal security log.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::error::AppError;

/// Failed attempts after which the account locks.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Length of the lockout window, in minutes.
pub const LOCKOUT_WINDOW_MINUTES: i64 = 15;

pub fn lockout_window() -> Duration {
    Duration::minutes(LOCKOUT_WINDOW_MINUTES)
}

/// Whether an account is currently locked.
///
/// True iff the counter has reached the threshold AND the last failure is
/// still inside the lockout window. Once the window elapses the account is
/// implicitly unlocked; the counter is NOT reset until the next successful
/// login, so a single post-expiry failure re-arms a full lockout with no
/// grace period.
pub fn is_locked(
    failed_attempts: i32,
    last_failed_login: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if failed_attempts < MAX_FAILED_ATTEMPTS {
        return false;
    }
    match last_failed_login {
        Some(last) => now - last < lockout_window(),
        None => false,
    }
}

/// Records a failed login attempt.
///
/// Single atomic UPDATE: the counter increment and the timestamp move
/// together, and two racing failures cannot lose an increment the way a
/// read-modify-write would. Persisted immediately so the lock state is
/// visible to the very next attempt.
pub async fn record_failure(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET failed_login_attempts = failed_login_attempts + 1,
            last_failed_login = NOW(),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Resets the lockout state after a fully verified login.
pub async fn record_success(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET failed_login_attempts = 0,
            last_failed_login = NULL,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Emits a structured security event to the tracing subscriber.
///
/// Failures are logged at WARN, successes at INFO. The account email and
/// source address stay internal; they are never echoed to the client.
pub fn log_security_event(event_type: &str, email: &str, ip: &str) {
    match event_type {
        "LOGIN_FAILED" | "LOGIN_LOCKED" => {
            tracing::warn!(security_event = event_type, email, ip);
        }
        _ => {
            tracing::info!(security_event = event_type, email, ip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_ago(now: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
        Some(now - Duration::minutes(minutes))
    }

    #[test]
    fn not_locked_below_threshold() {
        let now = Utc::now();
        assert!(!is_locked(0, None, now));
        assert!(!is_locked(4, minutes_ago(now, 1), now));
    }

    #[test]
    fn locked_at_threshold_within_window() {
        let now = Utc::now();
        assert!(is_locked(5, minutes_ago(now, 1), now));
        assert!(is_locked(9, minutes_ago(now, 14), now));
    }

    #[test]
    fn unlocked_once_window_elapses() {
        let now = Utc::now();
        assert!(!is_locked(5, minutes_ago(now, 15), now));
        assert!(!is_locked(100, minutes_ago(now, 16), now));
    }

    #[test]
    fn high_counter_without_timestamp_is_not_locked() {
        // The two fields always move together, but a missing timestamp
        // must fail open rather than lock forever.
        let now = Utc::now();
        assert!(!is_locked(10, None, now));
    }

    #[test]
    fn lock_boundary_is_exclusive() {
        let now = Utc::now();
        let exactly_window = Some(now - lockout_window());
        assert!(!is_locked(5, exactly_window, now));
    }
}
