//! iqac-server library - IQAC portal REST backend
//!
//! Role-based JSON API over a SQLite database: accounts and departments,
//! activity records with a review workflow, documents, announcements,
//! feedback, timetables, an audit trail and downloadable reports.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use iqac_common::config::{RootFolder, ServerSettings};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod activity;
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod error;
pub mod pagination;
pub mod reports;
pub mod scope;
pub mod uploads;

use auth::JwtKeys;
use uploads::UploadStore;

/// Room for multipart boundaries and text fields on top of the file limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub settings: Arc<ServerSettings>,
    /// Token signing keys
    pub jwt: Arc<JwtKeys>,
    /// Uploaded file storage under the root folder
    pub uploads: Arc<UploadStore>,
    /// bcrypt hash checked when a login names no known account
    pub login_decoy: Arc<str>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, settings: ServerSettings, jwt_secret: &str, root: &RootFolder) -> Self {
        let jwt = JwtKeys::new(jwt_secret, settings.token_ttl_hours);
        let uploads = UploadStore::new(root.path(), settings.max_upload_bytes);
        let login_decoy = iqac_common::password::decoy_hash(settings.bcrypt_cost);
        Self {
            db,
            settings: Arc::new(settings),
            jwt: Arc::new(jwt),
            uploads: Arc::new(uploads),
            login_decoy: Arc::from(login_decoy),
        }
    }
}

/// Build application router
///
/// Health, build info, registration, login and the public department list
/// are open; everything else under `/api` requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    // Protected routes (require authentication)
    let protected = Router::new()
        .merge(api::auth::protected_routes())
        .merge(api::users::routes())
        .merge(api::departments::routes())
        .merge(api::records::routes())
        .merge(api::documents::routes())
        .merge(api::announcements::routes())
        .merge(api::feedback::routes())
        .merge(api::timetables::routes())
        .merge(api::activity::routes())
        .merge(api::dashboard::routes())
        .merge(api::reports::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .merge(api::auth::public_routes())
        .merge(api::departments::public_routes())
        .merge(api::health::health_routes());

    let body_limit = state.settings.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
