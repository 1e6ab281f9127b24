// src/handlers/ticket.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::ticket::{
        CreateTicketRequest, Ticket, TicketListParams, TicketListing, UpdateTicketRequest,
    },
    utils::{html::clean_text, jwt::Claims},
};

/// Browses available tickets with optional filters and sorting.
pub async fn list_tickets(
    State(pool): State<PgPool>,
    Query(params): Query<TicketListParams>,
) -> Result<impl IntoResponse, AppError> {
    let section_pattern = params.section.as_ref().map(|s| format!("%{}%", s));

    // Fixed ORDER BY variants; never interpolates user input.
    let order_by = match params.sort.as_deref() {
        Some("date") => "listed_at ASC",
        Some("section") => r#"section ASC, "row" ASC"#,
        _ => "listing_price ASC",
    };

    let sql = format!(
        r#"
        SELECT * FROM tickets
        WHERE status = 'available'
          AND ($1::BIGINT IS NULL OR event_id = $1)
          AND ($2::NUMERIC IS NULL OR listing_price >= $2)
          AND ($3::NUMERIC IS NULL OR listing_price <= $3)
          AND ($4::TEXT IS NULL OR section ILIKE $4)
        ORDER BY {order_by}
        "#
    );

    let tickets = sqlx::query_as::<_, Ticket>(&sql)
        .bind(params.event)
        .bind(params.min_price)
        .bind(params.max_price)
        .bind(&section_pattern)
        .fetch_all(&pool)
        .await?;

    Ok(Json(tickets))
}

/// Lists a ticket for sale. The caller becomes the seller; a listing row
/// (fee configuration) is created in the same transaction.
pub async fn create_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let seller_id = claims.sub.parse::<i64>().unwrap_or(0);

    let mut tx = pool.begin().await?;

    let event: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
        .bind(payload.event_id)
        .fetch_optional(&mut *tx)
        .await?;

    if event.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    let notes = payload.notes.as_deref().map(clean_text).unwrap_or_default();

    let ticket = sqlx::query_as::<_, Ticket>(
        r#"
        INSERT INTO tickets
            (event_id, seller_id, section, "row", seat_number, quantity,
             original_price, listing_price, condition, notes, transfer_method, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(payload.event_id)
    .bind(seller_id)
    .bind(payload.section.as_deref().unwrap_or(""))
    .bind(payload.row.as_deref().unwrap_or(""))
    .bind(payload.seat_number.as_deref().unwrap_or(""))
    .bind(payload.quantity.unwrap_or(1))
    .bind(payload.original_price)
    .bind(payload.listing_price)
    .bind(payload.condition.as_deref().unwrap_or("digital"))
    .bind(&notes)
    .bind(payload.transfer_method.as_deref().unwrap_or(""))
    .bind(payload.expires_at)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO ticket_listings (ticket_id) VALUES ($1)")
        .bind(ticket.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Ticket detail including the listing fee breakdown.
pub async fn get_ticket(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Ticket not found".to_string()))?;

    let listing =
        sqlx::query_as::<_, TicketListing>("SELECT * FROM ticket_listings WHERE ticket_id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

    let fees = listing.as_ref().map(|l| {
        json!({
            "platform_fee_percentage": l.platform_fee_percentage,
            "payment_processing_fee": l.payment_processing_fee,
            "total_fees": l.total_fees(ticket.listing_price).round_dp(2),
            "seller_payout": l.seller_payout(ticket.listing_price).round_dp(2),
        })
    });

    Ok(Json(json!({
        "ticket": ticket,
        "markup_percentage": ticket.markup_percentage().round_dp(2),
        "listing": listing,
        "fees": fees,
    })))
}

/// Fetches a ticket and enforces that the caller is its seller.
async fn owned_ticket(pool: &PgPool, ticket_id: i64, user_id: i64) -> Result<Ticket, AppError> {
    let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Ticket not found".to_string()))?;

    if ticket.seller_id != user_id {
        return Err(AppError::Forbidden(
            "You can only modify your own tickets.".to_string(),
        ));
    }

    Ok(ticket)
}

/// Updates a ticket. Seller only.
pub async fn update_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);
    owned_ticket(&pool, id, user_id).await?;

    let notes = payload.notes.as_deref().map(clean_text);

    let ticket = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET section = COALESCE($1, section),
            "row" = COALESCE($2, "row"),
            seat_number = COALESCE($3, seat_number),
            quantity = COALESCE($4, quantity),
            listing_price = COALESCE($5, listing_price),
            condition = COALESCE($6, condition),
            notes = COALESCE($7, notes),
            transfer_method = COALESCE($8, transfer_method),
            expires_at = COALESCE($9, expires_at),
            updated_at = NOW()
        WHERE id = $10
        RETURNING *
        "#,
    )
    .bind(&payload.section)
    .bind(&payload.row)
    .bind(&payload.seat_number)
    .bind(payload.quantity)
    .bind(payload.listing_price)
    .bind(&payload.condition)
    .bind(&notes)
    .bind(&payload.transfer_method)
    .bind(payload.expires_at)
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ticket))
}

/// Deletes a ticket. Seller only.
pub async fn delete_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);
    owned_ticket(&pool, id, user_id).await?;

    sqlx::query("DELETE FROM tickets WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Purchases a ticket: marks the ticket and its listing sold and bumps the
/// event's sales counter, all in one transaction.
///
/// The ticket row is locked (`FOR UPDATE`) so two concurrent purchases of
/// the same ticket cannot both succeed.
pub async fn purchase_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let buyer_id = claims.sub.parse::<i64>().unwrap_or(0);

    let mut tx = pool.begin().await?;

    let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Ticket not found".to_string()))?;

    if ticket.seller_id == buyer_id {
        return Err(AppError::BadRequest(
            "You cannot buy your own ticket.".to_string(),
        ));
    }

    if !ticket.is_available(chrono::Utc::now()) {
        return Err(AppError::Conflict("Ticket is no longer available".to_string()));
    }

    sqlx::query("UPDATE tickets SET status = 'sold', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE ticket_listings SET status = 'sold', updated_at = NOW() WHERE ticket_id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE events SET ticket_sales_count = ticket_sales_count + 1 WHERE id = $1")
        .bind(ticket.event_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "purchased": true, "ticket_id": id })))
}

/// Get current user's tickets, newest first, with payout per ticket.
pub async fn my_tickets(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE seller_id = $1 ORDER BY listed_at DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(tickets))
}
