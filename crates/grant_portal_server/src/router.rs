//! Router construction for the grant portal server.

use std::sync::Arc;

use axum::{
    http::Method,
    middleware as axum_mw,
    routing::{delete, get, post, put},
    Extension, Router,
};
use grant_portal_core::PortalService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::identity;
use crate::handlers;

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<PortalService>) -> Router {
    // Routes that need a resolved caller
    let protected = Router::new()
        // Cycles
        .route("/cycles", get(handlers::cycles::list_cycles))
        .route("/cycles/current", get(handlers::cycles::current_cycle))
        .route("/cycles/current/stage", put(handlers::cycles::update_stage))
        .route(
            "/cycles/current/deadlines",
            put(handlers::cycles::set_deadlines),
        )
        .route("/cycles/rollover", post(handlers::cycles::rollover))
        // Applications
        .route(
            "/applications",
            post(handlers::applications::submit).get(handlers::applications::list),
        )
        .route("/applications/mine", get(handlers::applications::mine))
        .route("/applications/:id", get(handlers::applications::get))
        // Reviews
        .route(
            "/applications/:id/reviewers",
            post(handlers::reviews::assign),
        )
        .route(
            "/applications/:id/reviewers/:review_id",
            delete(handlers::reviews::unassign),
        )
        .route("/applications/:id/reviews", get(handlers::reviews::summary))
        .route(
            "/applications/:id/reviews/:review_id",
            put(handlers::reviews::save_progress),
        )
        .route(
            "/applications/:id/reviews/:review_id/submit",
            post(handlers::reviews::submit),
        )
        .route("/reviews/board", get(handlers::reviews::board))
        .route("/reviews/mine", get(handlers::reviews::mine))
        // Decisions
        .route(
            "/applications/:id/decision",
            put(handlers::decisions::record).get(handlers::decisions::get),
        )
        .route(
            "/applications/:id/decision/comments",
            put(handlers::decisions::update_comments),
        )
        .route("/results/mine", get(handlers::decisions::my_results))
        // Post-grant reports
        .route(
            "/applications/:id/report",
            post(handlers::reports::submit).get(handlers::reports::get),
        )
        .route("/reports", get(handlers::reports::tracking))
        // Whitelist
        .route(
            "/whitelist",
            get(handlers::whitelist::list).post(handlers::whitelist::add),
        )
        .route(
            "/whitelist/:id/status",
            put(handlers::whitelist::set_status),
        )
        .route(
            "/whitelist/:id",
            delete(handlers::whitelist::remove),
        )
        // Accounts
        .route(
            "/accounts/applicant",
            post(handlers::accounts::register_applicant),
        )
        .route(
            "/accounts/reviewer",
            post(handlers::accounts::register_reviewer),
        )
        .route("/accounts/admin", post(handlers::accounts::grant_admin))
        // FAQ administration
        .route("/faqs", put(handlers::faq::upsert))
        .route("/faqs/:id", delete(handlers::faq::delete))
        .layer(axum_mw::from_fn(identity));

    // Public routes (no identity)
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/faqs", get(handlers::faq::list))
        .route(
            "/whitelist/affiliations",
            get(handlers::whitelist::affiliations),
        );

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    // Combine and add shared state
    public
        .merge(protected)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
