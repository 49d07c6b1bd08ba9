//! Handlers for the `/auth` resource (register, login, logout, account).

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use roadmap_core::device::DeviceInfo;
use roadmap_core::error::CoreError;
use roadmap_core::roles::ROLE_USER;
use roadmap_core::types::DbId;
use roadmap_core::user::{
    normalize_email, validate_email, validate_password, validate_username, ProfileChanges,
};
use roadmap_db::models::session::CreateSession;
use roadmap_db::models::user::{CreateUser, UserResponse};
use roadmap_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<PreferencesRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub dark_mode: Option<bool>,
    pub email_notifications: Option<bool>,
    pub public_profile: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: Option<String>,
}

/// Body returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/register
///
/// Create an account, open its first session and return a token.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = input.username.trim();
    let email = normalize_email(&input.email);
    validate_username(username)?;
    validate_email(&email)?;
    validate_password(&input.password, state.config.min_password_length)?;

    if UserRepo::exists_by_email_or_username(&state.pool, &email, username).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "User with this email or username already exists".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let display_name = input
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(username)
        .to_string();

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            email,
            password_hash,
            display_name,
            role: ROLE_USER.to_string(),
        },
    )
    .await?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    let token = open_session(&state, &headers, user.id, &user.role).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login
///
/// Authenticate with email + password. Bad credentials and inactive
/// accounts both answer 401; the password is checked first.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid credentials".into()));

    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email))
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(invalid());
    }

    // Only reveal the account state to someone holding the password.
    if !user.is_active {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Account is deactivated".into(),
        )));
    }

    UserRepo::record_login(&state.pool, user.id).await?;
    let token = open_session(&state, &headers, user.id, &user.role).await?;
    tracing::info!(user_id = user.id, "User logged in");

    // Re-read so `lastLoginAt` reflects this login.
    let user = UserRepo::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", user.id)))?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

/// POST /api/auth/logout
///
/// End the caller's active session, if any.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    if let Some(session) = SessionRepo::get_active_session(&state.pool, auth.user_id).await? {
        SessionRepo::end_session(&state.pool, session.id).await?;
        tracing::info!(user_id = auth.user_id, session_id = session.id, "Session ended on logout");
    }
    Ok(Json(ApiResponse::message("Logged out successfully")))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", auth.user_id)))?;
    Ok(Json(ApiResponse::data(user.into())))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let prefs = input.preferences.unwrap_or_default();
    let changes = ProfileChanges {
        display_name: input.display_name.map(|n| n.trim().to_string()),
        bio: input.bio,
        location: input.location,
        website: input.website,
        github: input.github,
        linkedin: input.linkedin,
        avatar: input.avatar,
        dark_mode: prefs.dark_mode,
        email_notifications: prefs.email_notifications,
        public_profile: prefs.public_profile,
    };
    changes.validate()?;

    let user = UserRepo::update_profile(&state.pool, auth.user_id, &changes)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", auth.user_id)))?;
    Ok(Json(
        ApiResponse::data(UserResponse::from(user)).with_message("Profile updated successfully"),
    ))
}

/// PUT /api/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", auth.user_id)))?;

    let matches = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !matches {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    validate_password(&input.new_password, state.config.min_password_length)?;

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &password_hash).await?;
    tracing::info!(user_id = user.id, "Password changed");

    Ok(Json(ApiResponse::message("Password updated successfully")))
}

/// DELETE /api/auth/account
///
/// Requires the current password. Progress, sessions and bookmarks are
/// removed with the account.
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<DeleteAccountRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let password = input.password.filter(|p| !p.is_empty()).ok_or_else(|| {
        AppError::BadRequest("Please provide password to confirm account deletion".into())
    })?;

    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", auth.user_id)))?;

    let matches = verify_password(&password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !matches {
        return Err(AppError::BadRequest("Password is incorrect".into()));
    }

    UserRepo::delete(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "Account deleted");
    Ok(Json(ApiResponse::message("Account deleted successfully")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Start a session described by the request headers and issue a token.
async fn open_session(
    state: &AppState,
    headers: &HeaderMap,
    user_id: DbId,
    role: &str,
) -> AppResult<String> {
    let session = SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id,
            device: device_from_headers(headers),
        },
    )
    .await?;
    tracing::debug!(user_id, session_id = session.id, device = session.device_type.as_str(), "Session opened");

    generate_token(user_id, role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))
}

/// Device metadata from `User-Agent` and the first `X-Forwarded-For` hop.
fn device_from_headers(headers: &HeaderMap) -> DeviceInfo {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let ip_address = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    DeviceInfo::detect(user_agent, ip_address)
}
