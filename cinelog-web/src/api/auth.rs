//! Login, logout, account settings and the login guard

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
    Extension, Json,
};
use cinelog_common::auth::verify_password;
use cinelog_common::db::users;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{required, MessageResponse};
use crate::error::{ApiError, ApiResult};
use crate::session::{clear_cookie, session_cookie, token_from_headers, CurrentUser};
use crate::AppState;

const NAME_MAX: usize = 20;
const BAD_CREDENTIALS: &str = "Invalid username or password.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub username: Option<String>,
}

/// Middleware for protected routes
///
/// Looks the session cookie up and hands the account to the handler as an
/// `Extension<CurrentUser>`. Returns 401 when there is no live session.
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = token_from_headers(request.headers()) else {
        return Err(ApiError::Unauthorized("Login required.".to_string()));
    };
    let Some(user) = state.sessions.get(token).await else {
        return Err(ApiError::Unauthorized("Session expired.".to_string()));
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::invalid_input());
    }

    let account = users::first_user(&state.db).await?;
    let verified = account.as_ref().and_then(|user| {
        let username = user.username.as_deref()?;
        let hash = user.password_hash.as_deref()?;
        (username == payload.username && verify_password(&payload.password, hash)).then_some(user)
    });

    let Some(user) = verified else {
        warn!("Failed login attempt for {}", payload.username);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    state.sessions.purge_expired().await;
    let token = state.sessions.create(user.id, &payload.username).await;
    info!("{} logged in", payload.username);

    Ok((
        AppendHeaders([(header::SET_COOKIE, session_cookie(token))]),
        Json(MessageResponse::new("Login success.")),
    )
        .into_response())
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    state.sessions.remove(user.token).await;
    info!("{} logged out", user.username);

    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie())]),
        Json(MessageResponse::new("Goodbye.")),
    )
        .into_response()
}

/// POST /api/settings
///
/// Changes the display name shown on the index page.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<SettingsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let name = required(&payload.name, NAME_MAX)?;
    if !users::update_user_name(&state.db, user.user_id, &name).await? {
        return Err(ApiError::NotFound("Account no longer exists".to_string()));
    }

    info!("{} changed display name to {}", user.username, name);
    Ok(Json(MessageResponse::new("Settings updated.")))
}

/// GET /api/session
pub async fn session_status(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionStatus> {
    let user = match token_from_headers(&headers) {
        Some(token) => state.sessions.get(token).await,
        None => None,
    };

    Json(SessionStatus {
        authenticated: user.is_some(),
        username: user.map(|u| u.username),
    })
}
