// src/handlers/event.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::event::{CreateEventRequest, Event, EventListParams, UpdateEventRequest},
    trending,
    utils::{html::clean_text, jwt::Claims},
};

/// Lists upcoming events, optionally filtered by category, city and a
/// free-text search over name/description/lineup.
///
/// A search query counts as interest: the matched events get their
/// `search_count` bumped (read later by the trending maintenance pass).
pub async fn list_events(
    State(pool): State<PgPool>,
    Query(params): Query<EventListParams>,
) -> Result<impl IntoResponse, AppError> {
    let city_pattern = params.city.as_ref().map(|c| format!("%{}%", c));
    let search_pattern = params.search.as_ref().map(|s| format!("%{}%", s));
    let limit = params.limit.unwrap_or(50).clamp(1, 100);

    let events = sqlx::query_as::<_, Event>(
        r#"
        SELECT * FROM events
        WHERE status = 'upcoming'
          AND ($1::TEXT IS NULL OR category = $1)
          AND ($2::TEXT IS NULL OR city ILIKE $2)
          AND ($3::TEXT IS NULL
               OR name ILIKE $3
               OR description ILIKE $3
               OR artist_lineup::TEXT ILIKE $3)
        ORDER BY event_date ASC
        LIMIT $4
        "#,
    )
    .bind(&params.category)
    .bind(&city_pattern)
    .bind(&search_pattern)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    // Counter bump only; scores are recomputed by the maintenance pass.
    if search_pattern.is_some() && !events.is_empty() {
        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        sqlx::query("UPDATE events SET search_count = search_count + 1 WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&pool)
            .await?;
    }

    Ok(Json(events))
}

/// Creates a new event. Authenticated users only; the caller is recorded
/// as the creator.
pub async fn create_event(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);
    let description = clean_text(&payload.description);
    let lineup = SqlJson(payload.artist_lineup.unwrap_or_default());

    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events
            (name, description, category, venue_name, venue_address, city, state,
             country, event_date, doors_open, event_end, image_url, artist_lineup, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&description)
    .bind(&payload.category)
    .bind(&payload.venue_name)
    .bind(&payload.venue_address)
    .bind(&payload.city)
    .bind(&payload.state)
    .bind(payload.country.as_deref().unwrap_or("US"))
    .bind(payload.event_date)
    .bind(payload.doors_open)
    .bind(payload.event_end)
    .bind(payload.image_url.as_deref().unwrap_or(""))
    .bind(lineup)
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// Retrieves a single event by ID and counts the view.
pub async fn get_event(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let event = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events SET view_count = view_count + 1
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Event not found".to_string()))?;

    Ok(Json(event))
}

/// Updates an event. Authenticated users only.
pub async fn update_event(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let description = payload.description.as_deref().map(clean_text);
    let lineup = payload.artist_lineup.map(SqlJson);

    let event = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            category = COALESCE($3, category),
            status = COALESCE($4, status),
            venue_name = COALESCE($5, venue_name),
            venue_address = COALESCE($6, venue_address),
            city = COALESCE($7, city),
            state = COALESCE($8, state),
            event_date = COALESCE($9, event_date),
            doors_open = COALESCE($10, doors_open),
            event_end = COALESCE($11, event_end),
            image_url = COALESCE($12, image_url),
            artist_lineup = COALESCE($13, artist_lineup),
            updated_at = NOW()
        WHERE id = $14
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&description)
    .bind(&payload.category)
    .bind(&payload.status)
    .bind(&payload.venue_name)
    .bind(&payload.venue_address)
    .bind(&payload.city)
    .bind(&payload.state)
    .bind(payload.event_date)
    .bind(payload.doors_open)
    .bind(payload.event_end)
    .bind(&payload.image_url)
    .bind(lineup)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Event not found".to_string()))?;

    Ok(Json(event))
}

/// Deletes an event. Authenticated users only.
pub async fn delete_event(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted: Option<i64> = sqlx::query_scalar("DELETE FROM events WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    if deleted.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for the trending endpoint.
#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub limit: Option<i64>,
}

/// Top trending upcoming events, highest persisted score first.
pub async fn trending_events(
    State(pool): State<PgPool>,
    Query(params): Query<TrendingParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(trending::DEFAULT_TRENDING_LIMIT)
        .clamp(1, 50);

    let events = trending::rank_trending(&pool, limit).await?;

    Ok(Json(json!({
        "count": events.len(),
        "trending_events": events,
    })))
}

#[derive(Debug, sqlx::FromRow)]
struct PriceStats {
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    avg_price: Option<Decimal>,
}

async fn available_price_stats(pool: &PgPool, event_id: i64) -> Result<PriceStats, AppError> {
    let stats = sqlx::query_as::<_, PriceStats>(
        r#"
        SELECT MIN(listing_price) AS min_price,
               MAX(listing_price) AS max_price,
               AVG(listing_price) AS avg_price
        FROM tickets
        WHERE event_id = $1 AND status = 'available'
        "#,
    )
    .bind(event_id)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

/// All available tickets for an event, cheapest first, with price stats.
pub async fn event_tickets(
    State(pool): State<PgPool>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Event not found".to_string()))?;

    let tickets = sqlx::query_as::<_, crate::models::ticket::Ticket>(
        r#"
        SELECT * FROM tickets
        WHERE event_id = $1 AND status = 'available'
        ORDER BY listing_price ASC
        "#,
    )
    .bind(event_id)
    .fetch_all(&pool)
    .await?;

    let stats = available_price_stats(&pool, event_id).await?;
    let total_available = tickets.len();

    Ok(Json(json!({
        "event": event,
        "tickets": tickets,
        "stats": {
            "total_available": total_available,
            "min_price": stats.min_price,
            "max_price": stats.max_price,
            "avg_price": stats.avg_price.map(|p| p.round_dp(2)),
        }
    })))
}

/// Marketplace statistics for a single event.
pub async fn event_stats(
    State(pool): State<PgPool>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&pool)
        .await?;

    if exists.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    let total_tickets: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'available'",
    )
    .bind(event_id)
    .fetch_one(&pool)
    .await?;

    let stats = available_price_stats(&pool, event_id).await?;

    Ok(Json(json!({
        "total_tickets": total_tickets,
        "min_price": stats.min_price,
        "max_price": stats.max_price,
        "avg_price": stats.avg_price.map(|p| p.round_dp(2)),
    })))
}
