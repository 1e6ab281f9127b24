// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, event, profile, stats, ticket},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, events, tickets, stats, admin).
/// * Applies global middleware (Trace, CORS) and rate limiting on auth.
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Brute-force protection on the credential endpoints, on top of the
    // per-account lockout. Generous burst so normal clients never hit it.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(30)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .layer(GovernorLayer::new(governor_conf))
        .merge(
            Router::new()
                .route("/me", get(profile::get_me).patch(profile::update_me))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let event_routes = Router::new()
        .route("/", get(event::list_events))
        .route("/trending", get(event::trending_events))
        .route("/{id}", get(event::get_event))
        .route("/{id}/tickets", get(event::event_tickets))
        .route("/{id}/stats", get(event::event_stats))
        .merge(
            Router::new()
                .route("/", post(event::create_event))
                .route(
                    "/{id}",
                    put(event::update_event).delete(event::delete_event),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let ticket_routes = Router::new()
        .route("/", get(ticket::list_tickets))
        .route("/{id}", get(ticket::get_ticket))
        .merge(
            Router::new()
                .route("/", post(ticket::create_ticket))
                .route("/mine", get(ticket::my_tickets))
                .route(
                    "/{id}",
                    put(ticket::update_ticket).delete(ticket::delete_ticket),
                )
                .route("/{id}/purchase", post(ticket::purchase_ticket))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/trending/refresh", post(admin::refresh_trending))
        .route("/events/{id}/trending", put(admin::set_event_trending))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/events", event_routes)
        .nest("/api/tickets", ticket_routes)
        .route("/api/stats", get(stats::market_stats))
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
