// src/models/ticket.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const CONDITIONS: &[&str] = &["digital", "physical", "pdf"];

/// Represents the 'tickets' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub seller_id: i64,

    pub section: String,
    pub row: String,
    pub seat_number: String,
    pub quantity: i32,

    /// Face value of the ticket.
    pub original_price: Decimal,
    /// Asking price on the marketplace.
    pub listing_price: Decimal,

    /// 'digital', 'physical' or 'pdf'.
    pub condition: String,

    /// 'available', 'pending', 'sold', 'transferred' or 'cancelled'.
    pub status: String,

    pub notes: String,
    pub transfer_method: String,

    pub listed_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Ticket {
    pub fn is_available(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.status == "available" && self.expires_at.map_or(true, |e| e > now)
    }

    /// Markup over face value, as a percentage. Zero when face value is zero.
    pub fn markup_percentage(&self) -> Decimal {
        if self.original_price > Decimal::ZERO {
            (self.listing_price - self.original_price) / self.original_price
                * Decimal::from(100)
        } else {
            Decimal::ZERO
        }
    }
}

/// Represents the 'ticket_listings' table: one row per ticket,
/// carrying marketplace fee configuration and engagement counters.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TicketListing {
    pub id: i64,
    pub ticket_id: i64,
    pub status: String,
    pub views: i64,
    pub saves: i64,
    pub platform_fee_percentage: Decimal,
    pub payment_processing_fee: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl TicketListing {
    /// Total platform fees for a given listing price.
    pub fn total_fees(&self, listing_price: Decimal) -> Decimal {
        listing_price * self.platform_fee_percentage / Decimal::from(100)
            + self.payment_processing_fee
    }

    /// What the seller receives after fees.
    pub fn seller_payout(&self, listing_price: Decimal) -> Decimal {
        listing_price - self.total_fees(listing_price)
    }
}

/// DTO for listing a ticket for sale.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    pub event_id: i64,
    #[validate(length(max = 100))]
    pub section: Option<String>,
    #[validate(length(max = 20))]
    pub row: Option<String>,
    #[validate(length(max = 20))]
    pub seat_number: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub quantity: Option<i32>,
    #[validate(custom(function = validate_price))]
    pub original_price: Decimal,
    #[validate(custom(function = validate_price))]
    pub listing_price: Decimal,
    #[validate(custom(function = validate_condition))]
    pub condition: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub transfer_method: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for updating a ticket. Seller only; all fields optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTicketRequest {
    #[validate(length(max = 100))]
    pub section: Option<String>,
    #[validate(length(max = 20))]
    pub row: Option<String>,
    #[validate(length(max = 20))]
    pub seat_number: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub quantity: Option<i32>,
    #[validate(custom(function = validate_price))]
    pub listing_price: Option<Decimal>,
    #[validate(custom(function = validate_condition))]
    pub condition: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub transfer_method: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for browsing tickets.
#[derive(Debug, Deserialize)]
pub struct TicketListParams {
    pub event: Option<i64>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub section: Option<String>,
    /// 'price' (default), 'date' or 'section'.
    pub sort: Option<String>,
}

fn validate_price(price: &Decimal) -> Result<(), validator::ValidationError> {
    if *price < Decimal::ZERO {
        return Err(validator::ValidationError::new("negative_price"));
    }
    Ok(())
}

fn validate_condition(condition: &str) -> Result<(), validator::ValidationError> {
    if !CONDITIONS.contains(&condition) {
        return Err(validator::ValidationError::new("invalid_condition"));
    }
    Ok(())
}
