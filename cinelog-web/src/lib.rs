//! cinelog-web library - movie catalog HTTP service
//!
//! Public routes serve the catalog read-only; everything that changes data
//! (and the per-movie analytics) sits behind the session login.

use axum::{
    http::{Method, Uri},
    Router,
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod session;

pub use error::{ApiError, ApiResult};
use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(db: SqlitePool, session_timeout_secs: u64) -> Self {
        Self {
            db,
            sessions: SessionStore::new(session_timeout_secs),
        }
    }
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {} {}", method, uri.path()))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    // Protected routes (require a session)
    let protected = Router::new()
        .route("/api/logout", post(api::logout))
        .route("/api/settings", post(api::update_settings))
        .route("/api/movies", post(api::create_movie))
        .route(
            "/api/movies/:id",
            put(api::update_movie).delete(api::delete_movie),
        )
        .route("/api/movies/:id/analysis", get(api::analyse_movie))
        .route("/api/movies/:id/prediction", get(api::predict_movie))
        .route("/api/actors", post(api::create_actor))
        .route(
            "/api/actors/:id",
            put(api::update_actor).delete(api::delete_actor),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_login,
        ));

    // Public routes
    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/index", get(api::get_index))
        .route("/api/session", get(api::session_status))
        .route("/api/login", post(api::login))
        .route("/api/movies/search", get(api::search_movies))
        .route("/api/movies/:id", get(api::get_movie_detail))
        .route("/api/actors/search", get(api::search_actors))
        .route("/api/actors/:id", get(api::get_actor_detail))
        .route("/api/analytics/boxplot", get(api::boxplot_stats))
        .route("/analytics/boxplot.svg", get(api::boxplot_svg))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
