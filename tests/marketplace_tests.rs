// tests/marketplace_tests.rs

use crowdbolt::{config::Config, routes, state::AppState, trending, utils::hash::hash_password};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::net::SocketAddr;

/// Spawns the app on a random port, returning (base_url, pool), or None
/// when no test database is configured (the test then skips).
async fn spawn_app() -> Option<(String, PgPool)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        jwt_refresh_expiration: 3600,
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
        seed_demo_data: false,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some((address, pool))
}

fn unique_email() -> String {
    format!("m_{}@test.crowdbolt", &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a fresh user and returns their access token.
async fn register_and_token(client: &reqwest::Client, address: &str) -> String {
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": unique_email(),
            "password": "password123",
            "password_confirm": "password123",
            "role": "seller"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["access"].as_str().unwrap().to_string()
}

/// Inserts an event row directly, bypassing the API. Counters are chosen
/// so that a score refresh recomputes exactly `trending_score`.
async fn insert_event(pool: &PgPool, name: &str, status: &str, views: i64) -> i64 {
    // Upcoming events get the 1.5x boost; others score views * 1.0.
    let score = if status == "upcoming" {
        views as f64 * 1.5
    } else {
        views as f64
    };

    sqlx::query_scalar(
        r#"
        INSERT INTO events
            (name, description, category, status, venue_name, venue_address,
             city, state, event_date, view_count, trending_score)
        VALUES ($1, 'test event', 'concert', $2, 'Test Hall', '1 Test St',
                'Testville', 'TS', NOW() + INTERVAL '30 days', $3, $4)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(status)
    .bind(views)
    .bind(score)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn create_event_via_api(client: &reqwest::Client, address: &str, token: &str) -> i64 {
    let response = client
        .post(format!("{}/api/events", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": "API Created Event",
            "description": "An event created through the API.",
            "category": "concert",
            "venue_name": "Test Hall",
            "venue_address": "1 Test St",
            "city": "Testville",
            "state": "TS",
            "event_date": "2031-06-01T20:00:00Z",
            "artist_lineup": ["Some Artist"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn create_ticket_via_api(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    event_id: i64,
) -> i64 {
    let response = client
        .post(format!("{}/api/tickets", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "event_id": event_id,
            "section": "GA",
            "original_price": "100.00",
            "listing_price": "150.00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn trending_returns_upcoming_events_in_score_order() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // Scores far above anything other tests create, so global ordering
    // is stable no matter what else is in the database.
    let base = 1_000_000_000i64;
    let a = insert_event(&pool, "trend-a", "upcoming", base + 300).await;
    let b = insert_event(&pool, "trend-b", "upcoming", base + 200).await;
    let c = insert_event(&pool, "trend-c", "upcoming", base + 100).await;
    let d = insert_event(&pool, "trend-d", "upcoming", base + 100).await; // tie with c
    let completed = insert_event(&pool, "trend-done", "completed", base * 2).await;

    let response = client
        .get(format!("{}/api/events/trending?limit=50", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();

    let events = body["trending_events"].as_array().unwrap();
    assert_eq!(body["count"].as_u64().unwrap() as usize, events.len());
    assert!(events.len() <= 50);

    // All returned events are upcoming; the completed one never appears
    let ids: Vec<i64> = events.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    for event in events {
        assert_eq!(event["status"], "upcoming");
    }
    assert!(!ids.contains(&completed));

    // Scores descend
    let scores: Vec<f64> = events
        .iter()
        .map(|e| e["trending_score"].as_f64().unwrap())
        .collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }

    // Our events in relative order, with the tie broken by ascending id
    let pos = |id: i64| ids.iter().position(|&x| x == id).unwrap();
    assert!(pos(a) < pos(b));
    assert!(pos(b) < pos(c));
    assert!(pos(c) < pos(d));
}

#[tokio::test]
async fn trending_default_limit_is_three() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    for i in 0..4 {
        insert_event(&pool, &format!("default-limit-{i}"), "upcoming", 10 + i).await;
    }

    let response = client
        .get(format!("{}/api/events/trending", address))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["trending_events"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn search_queries_bump_search_count_on_matches_only() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // A token no other event name or description contains
    let token = format!("zq{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let matched = insert_event(&pool, &format!("Night of {token}"), "upcoming", 0).await;
    let unmatched = insert_event(&pool, "search-bystander", "upcoming", 0).await;

    let response = client
        .get(format!("{}/api/events?search={}", address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![matched]);

    let matched_count: i64 = sqlx::query_scalar("SELECT search_count FROM events WHERE id = $1")
        .bind(matched)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(matched_count, 1);

    let unmatched_count: i64 = sqlx::query_scalar("SELECT search_count FROM events WHERE id = $1")
        .bind(unmatched)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(unmatched_count, 0);

    // Listing without a search term is browsing, not searching
    let response = client
        .get(format!("{}/api/events", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let matched_count: i64 = sqlx::query_scalar("SELECT search_count FROM events WHERE id = $1")
        .bind(matched)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(matched_count, 1);
}

#[tokio::test]
async fn creating_events_requires_auth() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/events", address))
        .json(&serde_json::json!({ "name": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn event_detail_counts_views() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let id = insert_event(&pool, "view-counter", "upcoming", 0).await;

    for _ in 0..3 {
        let response = client
            .get(format!("{}/api/events/{}", address, id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let views: i64 = sqlx::query_scalar("SELECT view_count FROM events WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(views, 3);
}

#[tokio::test]
async fn purchase_flow_marks_sold_and_bumps_sales_counter() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let seller_token = register_and_token(&client, &address).await;
    let event_id = create_event_via_api(&client, &address, &seller_token).await;
    let ticket_id = create_ticket_via_api(&client, &address, &seller_token, event_id).await;

    let sales_before: i64 =
        sqlx::query_scalar("SELECT ticket_sales_count FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&pool)
            .await
            .unwrap();

    // Sellers cannot buy their own tickets
    let response = client
        .post(format!("{}/api/tickets/{}/purchase", address, ticket_id))
        .header("Authorization", format!("Bearer {}", seller_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // A different user can
    let buyer_token = register_and_token(&client, &address).await;
    let response = client
        .post(format!("{}/api/tickets/{}/purchase", address, ticket_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let status: String = sqlx::query_scalar("SELECT status FROM tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "sold");

    let sales_after: i64 =
        sqlx::query_scalar("SELECT ticket_sales_count FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(sales_after, sales_before + 1);

    // Second purchase attempt conflicts
    let response = client
        .post(format!("{}/api/tickets/{}/purchase", address, ticket_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn only_the_seller_can_modify_a_ticket() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let seller_token = register_and_token(&client, &address).await;
    let event_id = create_event_via_api(&client, &address, &seller_token).await;
    let ticket_id = create_ticket_via_api(&client, &address, &seller_token, event_id).await;

    let other_token = register_and_token(&client, &address).await;
    let response = client
        .put(format!("{}/api/tickets/{}", address, ticket_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .json(&serde_json::json!({ "listing_price": "1.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // The seller succeeds
    let response = client
        .put(format!("{}/api/tickets/{}", address, ticket_id))
        .header("Authorization", format!("Bearer {}", seller_token))
        .json(&serde_json::json!({ "listing_price": "99.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn market_stats_reports_counts() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/stats", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["total_events"].is_i64() || body["total_events"].is_u64());
    assert!(body["popular_categories"].is_array());
}

#[tokio::test]
async fn admin_refresh_recomputes_scores_and_curation_overrides() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // Seed an admin account directly; admins are never self-registered
    let admin_email = unique_email();
    let hashed = hash_password("password123").unwrap();
    sqlx::query("INSERT INTO users (email, password, role) VALUES ($1, $2, 'admin')")
        .bind(&admin_email)
        .bind(&hashed)
        .execute(&pool)
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": admin_email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    let admin_token = response.json::<serde_json::Value>().await.unwrap()["access"]
        .as_str()
        .unwrap()
        .to_string();

    // Counters huge enough to dominate any other test's events
    let big = 3_000_000_000_000i64;
    let first = insert_event(&pool, "admin-top-1", "upcoming", big + 10).await;
    let second = insert_event(&pool, "admin-top-2", "upcoming", big).await;
    // Stale persisted score, to prove the refresh recomputes it
    sqlx::query("UPDATE events SET trending_score = 0 WHERE id = $1")
        .bind(first)
        .execute(&pool)
        .await
        .unwrap();

    // Non-admins are rejected
    let user_token = register_and_token(&client, &address).await;
    let response = client
        .post(format!("{}/api/admin/trending/refresh", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // The maintenance pass recomputes and re-flags the top two
    let response = client
        .post(format!("{}/api/admin/trending/refresh?flag_top=2", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let (score, flagged): (f64, bool) =
        sqlx::query_as("SELECT trending_score, is_trending FROM events WHERE id = $1")
            .bind(first)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(score, trending::compute_score(big + 10, 0, 0, true));
    assert!(flagged);

    let flagged_second: bool =
        sqlx::query_scalar("SELECT is_trending FROM events WHERE id = $1")
            .bind(second)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(flagged_second);

    // Curation: force the flag off, score untouched
    let response = client
        .put(format!("{}/api/admin/events/{}/trending", address, first))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "is_trending": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let (score_after, flagged_after): (f64, bool) =
        sqlx::query_as("SELECT trending_score, is_trending FROM events WHERE id = $1")
            .bind(first)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!flagged_after);
    assert_eq!(score_after, score);
}
