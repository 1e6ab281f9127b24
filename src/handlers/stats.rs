// src/handlers/stats.rs

use axum::{Json, extract::State, response::IntoResponse};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;

use crate::error::AppError;

/// Marketplace-wide statistics: live inventory counts, average asking
/// price, and the most popular categories.
pub async fn market_stats(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let total_events: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE status = 'upcoming'")
            .fetch_one(&pool)
            .await?;

    let total_tickets: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE status = 'available'")
            .fetch_one(&pool)
            .await?;

    let avg_price: Option<Decimal> =
        sqlx::query_scalar("SELECT AVG(listing_price) FROM tickets WHERE status = 'available'")
            .fetch_one(&pool)
            .await?;

    let popular_categories: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT category, COUNT(*) AS count
        FROM events
        WHERE status = 'upcoming'
        GROUP BY category
        ORDER BY count DESC, category ASC
        LIMIT 5
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let categories: Vec<_> = popular_categories
        .into_iter()
        .map(|(category, count)| json!({ "category": category, "count": count }))
        .collect();

    Ok(Json(json!({
        "total_events": total_events,
        "total_tickets": total_tickets,
        "average_ticket_price": avg_price.map(|p| p.round_dp(2)),
        "popular_categories": categories,
    })))
}
