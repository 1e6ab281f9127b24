// src/models/event.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use validator::Validate;

pub const CATEGORIES: &[&str] = &[
    "concert", "festival", "rave", "theater", "sports", "comedy", "other",
];

pub const STATUSES: &[&str] = &["upcoming", "live", "completed", "cancelled"];

/// Represents the 'events' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,

    pub name: String,

    pub description: String,

    /// Event category (e.g., "concert", "rave").
    pub category: String,

    /// Lifecycle status: 'upcoming', 'live', 'completed' or 'cancelled'.
    pub status: String,

    pub venue_name: String,
    pub venue_address: String,
    pub city: String,
    pub state: String,
    pub country: String,

    pub event_date: chrono::DateTime<chrono::Utc>,
    pub doors_open: Option<chrono::DateTime<chrono::Utc>>,
    pub event_end: Option<chrono::DateTime<chrono::Utc>>,

    pub image_url: String,

    /// List of artist names.
    /// Stored as a JSON array in the database.
    /// `sqlx::types::Json` handles automatic serialization/deserialization.
    pub artist_lineup: Json<Vec<String>>,

    /// Popularity counters, incremented by the view/search/purchase
    /// handlers. Only read by the trending engine.
    pub view_count: i64,
    pub search_count: i64,
    pub ticket_sales_count: i64,

    /// Trending flag. Written by the ranking pass or by admin curation,
    /// never derived from `trending_score` at read time.
    pub is_trending: bool,

    /// Computed popularity score. Persisted by the maintenance pass;
    /// always a pure function of the counters, status and event date.
    pub trending_score: f64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub created_by: Option<i64>,
}

impl Event {
    /// An event is upcoming when its status says so AND its date is still
    /// in the future. Both conditions gate the trending boost.
    pub fn is_upcoming(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.status == "upcoming" && self.event_date > now
    }
}

/// DTO for creating a new event.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    #[validate(custom(function = validate_category))]
    pub category: String,
    #[validate(length(min = 1, max = 200))]
    pub venue_name: String,
    #[validate(length(min = 1, max = 500))]
    pub venue_address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 50))]
    pub state: String,
    #[validate(length(max = 50))]
    pub country: Option<String>,
    pub event_date: chrono::DateTime<chrono::Utc>,
    pub doors_open: Option<chrono::DateTime<chrono::Utc>>,
    pub event_end: Option<chrono::DateTime<chrono::Utc>>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub artist_lineup: Option<Vec<String>>,
}

/// DTO for updating an event. All fields optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_category))]
    pub category: Option<String>,
    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub venue_name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub venue_address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub state: Option<String>,
    pub event_date: Option<chrono::DateTime<chrono::Utc>>,
    pub doors_open: Option<chrono::DateTime<chrono::Utc>>,
    pub event_end: Option<chrono::DateTime<chrono::Utc>>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub artist_lineup: Option<Vec<String>>,
}

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
pub struct EventListParams {
    pub category: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

fn validate_category(category: &str) -> Result<(), validator::ValidationError> {
    if !CATEGORIES.contains(&category) {
        return Err(validator::ValidationError::new("invalid_category"));
    }
    Ok(())
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    if !STATUSES.contains(&status) {
        return Err(validator::ValidationError::new("invalid_status"));
    }
    Ok(())
}

/// Validates that a string is a correctly formatted URL.
/// Empty strings are allowed (no image).
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if !url.is_empty() && Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
