//! Registration, login and the caller's own account

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use iqac_common::models::{normalize_email, Action, NewUser, ProfileUpdate, User};
use iqac_common::password::{
    hash_password_blocking, validate_password, verify_password_blocking,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::activity::log_activity;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Routes reachable without a token
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/profile", put(update_profile))
        .route("/api/auth/password", put(change_password))
}

/// POST /api/auth/register
///
/// Self sign-up for faculty, students and the sports department. The
/// account stays unapproved until an admin or coordinator approves it.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if !input.role.is_self_registrable() {
        return Err(ApiError::forbidden(format!(
            "Role {} cannot self-register",
            input.role
        )));
    }
    let input = input.validate()?;

    if let Some(department_id) = input.department_id {
        if !db::departments::exists(&state.db, department_id).await? {
            return Err(ApiError::Validation("Department does not exist".to_string()));
        }
    }
    if db::users::find_by_email(&state.db, &input.email).await?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let hash = hash_password_blocking(input.password.clone(), state.settings.bcrypt_cost).await?;
    let user = db::users::insert(&state.db, &input, &hash, false).await?;

    log_activity(
        &state.db,
        &user,
        Action::Create,
        "user",
        Some(user.id),
        format!("Registered as {}", user.role),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let email = normalize_email(&request.email).map_err(|_| invalid())?;
    let found = db::users::find_by_email(&state.db, &email).await?;
    // Unknown accounts still pay for a bcrypt check
    let hash = match &found {
        Some(user) => user.password_hash.clone(),
        None => state.login_decoy.to_string(),
    };
    let matches = verify_password_blocking(request.password, hash).await?;

    let user = match found {
        Some(user) if matches => user,
        _ => {
            warn!("Failed login for {}", email);
            return Err(invalid());
        }
    };

    if !user.is_approved {
        return Err(ApiError::forbidden("Account is awaiting approval"));
    }

    let token = state
        .jwt
        .issue(&user)
        .map_err(|e| ApiError::Internal(format!("Token signing failed: {}", e)))?;
    info!("User {} logged in as {}", user.email, user.role);

    Ok(Json(LoginResponse {
        token,
        user,
        expires_in: state.jwt.ttl_secs(),
    }))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let mut updated = user.clone();
    update.apply(&mut updated)?;
    db::users::save(&state.db, &updated).await?;

    log_activity(
        &state.db,
        &user,
        Action::Update,
        "user",
        Some(user.id),
        "Updated own profile",
        None,
    )
    .await;

    let user = db::users::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(user))
}

/// PUT /api/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(change): Json<PasswordChange>,
) -> ApiResult<StatusCode> {
    let current_ok =
        verify_password_blocking(change.current_password, user.password_hash.clone())
            .await?;
    if !current_ok {
        return Err(ApiError::Validation("Current password is incorrect".to_string()));
    }
    validate_password(&change.new_password)?;

    let hash = hash_password_blocking(change.new_password, state.settings.bcrypt_cost).await?;
    db::users::set_password(&state.db, user.id, &hash).await?;

    log_activity(
        &state.db,
        &user,
        Action::Update,
        "user",
        Some(user.id),
        "Changed password",
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
