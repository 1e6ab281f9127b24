// src/trending.rs
//
// Trending score engine. Computes a popularity score per event from its
// view/search/sale counters and ranks the hottest upcoming events.
//
// The score is never recomputed on counter increments (that would turn
// every page view into an event-row write); instead `refresh_scores` is
// run as a maintenance pass, on demand via the admin API or at seed time.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{error::AppError, models::event::Event};

/// Fixed policy weights.
pub const VIEW_WEIGHT: f64 = 1.0;
pub const SEARCH_WEIGHT: f64 = 2.0;
pub const SALES_WEIGHT: f64 = 5.0;

/// Multiplier applied to events that are upcoming (status + future date).
pub const UPCOMING_BOOST: f64 = 1.5;

/// Default number of events returned by the trending endpoint.
pub const DEFAULT_TRENDING_LIMIT: i64 = 3;

/// Computes the trending score from raw counters.
///
/// Pure and deterministic: identical inputs always produce the identical
/// score. Negative counters cannot occur through normal operation (the
/// schema forbids them) and are clamped to zero.
pub fn compute_score(views: i64, searches: i64, sales: i64, upcoming: bool) -> f64 {
    let views = views.max(0) as f64;
    let searches = searches.max(0) as f64;
    let sales = sales.max(0) as f64;

    let mut score = views * VIEW_WEIGHT + searches * SEARCH_WEIGHT + sales * SALES_WEIGHT;

    if upcoming {
        score *= UPCOMING_BOOST;
    }

    score
}

/// Scores an event at a given instant.
pub fn score_event(event: &Event, now: DateTime<Utc>) -> f64 {
    compute_score(
        event.view_count,
        event.search_count,
        event.ticket_sales_count,
        event.is_upcoming(now),
    )
}

/// Returns the top `limit` upcoming events by persisted trending score.
///
/// Ties are broken by ascending id, so equal scores rank the older event
/// first and the ordering is reproducible.
pub async fn rank_trending(pool: &PgPool, limit: i64) -> Result<Vec<Event>, AppError> {
    let events = sqlx::query_as::<_, Event>(
        r#"
        SELECT * FROM events
        WHERE status = 'upcoming'
        ORDER BY trending_score DESC, id ASC
        LIMIT $1
        "#,
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Maintenance pass: recomputes and persists the trending score of every
/// event. Returns the number of events touched.
///
/// Only `trending_score` is written here; the `is_trending` flag has its
/// own write paths (`flag_top_trending` and admin curation) and the two
/// stay independent.
pub async fn refresh_scores(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, AppError> {
    let events = sqlx::query_as::<_, Event>("SELECT * FROM events")
        .fetch_all(pool)
        .await?;

    let mut updated = 0u64;
    for event in &events {
        let score = score_event(event, now);
        sqlx::query("UPDATE events SET trending_score = $1, updated_at = NOW() WHERE id = $2")
            .bind(score)
            .bind(event.id)
            .execute(pool)
            .await?;
        updated += 1;
    }

    tracing::info!(updated, "trending scores refreshed");
    Ok(updated)
}

/// Re-flags the computed top `limit` upcoming events as trending and
/// clears the flag everywhere else. Returns the flagged ids.
///
/// This deliberately overwrites curated flags: curation via the admin
/// endpoint holds only until the next explicit re-flag pass.
pub async fn flag_top_trending(pool: &PgPool, limit: i64) -> Result<Vec<i64>, AppError> {
    let mut tx = pool.begin().await?;

    let top_ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM events
        WHERE status = 'upcoming'
        ORDER BY trending_score DESC, id ASC
        LIMIT $1
        "#,
    )
    .bind(limit.max(0))
    .fetch_all(&mut *tx)
    .await?;

    sqlx::query("UPDATE events SET is_trending = FALSE WHERE is_trending")
        .execute(&mut *tx)
        .await?;

    if !top_ids.is_empty() {
        sqlx::query("UPDATE events SET is_trending = TRUE WHERE id = ANY($1)")
            .bind(&top_ids)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(flagged = top_ids.len(), "trending flags updated");
    Ok(top_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_weights_views_searches_and_sales() {
        assert_eq!(compute_score(10, 0, 0, false), 10.0);
        assert_eq!(compute_score(0, 10, 0, false), 20.0);
        assert_eq!(compute_score(0, 0, 10, false), 50.0);
        assert_eq!(compute_score(10, 10, 10, false), 80.0);
    }

    #[test]
    fn upcoming_boost_multiplies_by_one_point_five() {
        // (100*1 + 50*2 + 10*5) * 1.5 = 250 * 1.5
        assert_eq!(compute_score(100, 50, 10, true), 375.0);
        assert_eq!(compute_score(100, 50, 10, false), 250.0);
    }

    #[test]
    fn zero_counters_score_zero() {
        assert_eq!(compute_score(0, 0, 0, false), 0.0);
        assert_eq!(compute_score(0, 0, 0, true), 0.0);
    }

    #[test]
    fn negative_counters_are_clamped() {
        assert_eq!(compute_score(-5, -1, -100, false), 0.0);
        assert_eq!(compute_score(-5, 10, 0, false), 20.0);
    }

    #[test]
    fn score_is_deterministic() {
        let a = compute_score(12345, 678, 90, true);
        let b = compute_score(12345, 678, 90, true);
        assert_eq!(a, b);
    }
}
