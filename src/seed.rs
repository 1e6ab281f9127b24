// src/seed.rs
//
// Startup seeding: an optional admin account from the environment, and an
// optional demo dataset (sellers, events, tickets) for local development.
// Demo seeding finishes with the trending maintenance pass so the
// /api/events/trending endpoint has meaningful data from the first request.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{config::Config, error::AppError, trending, utils::hash::hash_password};

/// Creates the admin account if ADMIN_EMAIL/ADMIN_PASSWORD are set and
/// the account does not exist yet.
pub async fn seed_admin_user(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let email = email.trim().to_lowercase();

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?;

        if exists.is_none() {
            tracing::info!("Seeding admin user: {}", email);
            let hashed_password = hash_password(password)?;

            sqlx::query(
                "INSERT INTO users (email, password, role, is_verified) VALUES ($1, $2, 'admin', TRUE)",
            )
            .bind(&email)
            .bind(&hashed_password)
            .execute(pool)
            .await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}

struct DemoEvent {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    venue_name: &'static str,
    city: &'static str,
    state: &'static str,
    days_out: i64,
    lineup: &'static [&'static str],
    views: i64,
    searches: i64,
    sales: i64,
}

const DEMO_EVENTS: &[DemoEvent] = &[
    DemoEvent {
        name: "Electric Nights Festival",
        description: "Three days of electronic music with top DJs from around the world.",
        category: "festival",
        venue_name: "Brooklyn Mirage",
        city: "Brooklyn",
        state: "NY",
        days_out: 30,
        lineup: &["Calvin Harris", "Skrillex", "Deadmau5"],
        views: 3500,
        searches: 650,
        sales: 120,
    },
    DemoEvent {
        name: "Neon Rave Underground",
        description: "Underground techno in a warehouse. Location revealed 24h before doors.",
        category: "rave",
        venue_name: "Secret Warehouse",
        city: "Los Angeles",
        state: "CA",
        days_out: 15,
        lineup: &["Charlotte de Witte", "Ben Klock"],
        views: 2800,
        searches: 520,
        sales: 95,
    },
    DemoEvent {
        name: "Summer Vibes Concert",
        description: "Chill outdoor concert with indie and alternative rock bands.",
        category: "concert",
        venue_name: "Central Park SummerStage",
        city: "New York",
        state: "NY",
        days_out: 45,
        lineup: &["Arctic Monkeys", "Tame Impala"],
        views: 400,
        searches: 80,
        sales: 12,
    },
    DemoEvent {
        name: "Comedy Night Extravaganza",
        description: "Stand-up showcase featuring the hottest comedians in town.",
        category: "comedy",
        venue_name: "The Comedy Cellar",
        city: "New York",
        state: "NY",
        days_out: 20,
        lineup: &["Dave Chappelle", "Amy Schumer"],
        views: 250,
        searches: 40,
        sales: 8,
    },
    DemoEvent {
        name: "EDM Warehouse Party",
        description: "High-energy dance party with a massive sound system and light show.",
        category: "rave",
        venue_name: "Industrial Complex",
        city: "Chicago",
        state: "IL",
        days_out: 25,
        lineup: &["Martin Garrix", "Zedd"],
        views: 2200,
        searches: 380,
        sales: 75,
    },
];

/// Seeds demo sellers, events and tickets. No-op when events already exist.
pub async fn seed_demo_data(pool: &PgPool) -> Result<(), AppError> {
    let event_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;
    if event_count > 0 {
        return Ok(());
    }

    tracing::info!("Seeding demo marketplace data...");

    let seller_password = hash_password("DemoPass123!")?;
    let mut seller_ids = Vec::new();
    for (email, first_name) in [
        ("seller1@crowdbolt.test", "Alice"),
        ("seller2@crowdbolt.test", "Bob"),
    ] {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password, first_name, role, is_verified)
            VALUES ($1, $2, $3, 'seller', TRUE)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(&seller_password)
        .bind(first_name)
        .fetch_one(pool)
        .await?;
        seller_ids.push(id);
    }

    let now = Utc::now();
    for (i, demo) in DEMO_EVENTS.iter().enumerate() {
        let lineup: Vec<String> = demo.lineup.iter().map(|s| s.to_string()).collect();
        let event_date = now + Duration::days(demo.days_out);

        let event_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO events
                (name, description, category, venue_name, venue_address, city, state,
                 event_date, doors_open, artist_lineup,
                 view_count, search_count, ticket_sales_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(demo.name)
        .bind(demo.description)
        .bind(demo.category)
        .bind(demo.venue_name)
        .bind(format!("{}, {}, {}", demo.venue_name, demo.city, demo.state))
        .bind(demo.city)
        .bind(demo.state)
        .bind(event_date)
        .bind(event_date - Duration::hours(2))
        .bind(sqlx::types::Json(lineup))
        .bind(demo.views)
        .bind(demo.searches)
        .bind(demo.sales)
        .fetch_one(pool)
        .await?;

        // A couple of tickets per event, alternating sellers and sections.
        for (j, (section, face, asking)) in [
            ("GA", 90, 120),
            ("VIP", 200, 320),
            ("Balcony", 110, 95),
        ]
        .iter()
        .enumerate()
        {
            let seller = seller_ids[(i + j) % seller_ids.len()];
            let ticket_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO tickets
                    (event_id, seller_id, section, quantity,
                     original_price, listing_price, transfer_method)
                VALUES ($1, $2, $3, 1, $4, $5, 'Mobile Transfer')
                RETURNING id
                "#,
            )
            .bind(event_id)
            .bind(seller)
            .bind(section)
            .bind(Decimal::from(*face))
            .bind(Decimal::from(*asking))
            .fetch_one(pool)
            .await?;

            sqlx::query("INSERT INTO ticket_listings (ticket_id) VALUES ($1)")
                .bind(ticket_id)
                .execute(pool)
                .await?;
        }
    }

    // Maintenance pass: persist scores and flag the initial top three.
    trending::refresh_scores(pool, now).await?;
    trending::flag_top_trending(pool, trending::DEFAULT_TRENDING_LIMIT).await?;

    tracing::info!("Demo data created successfully.");
    Ok(())
}
