//! LinkedIn OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with LinkedIn.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use super::middleware::{MaybeUser, SESSION_COOKIE};
use super::session::{Session, create_session_token};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::OAUTH_LOGINS_TOTAL;

/// Name of the CSRF state cookie
const STATE_COOKIE: &str = "oauth_state";
/// Cookie path covering the callback route
const AUTH_COOKIE_PATH: &str = "/auth";
/// How long a login attempt may take before its state expires
const STATE_COOKIE_TTL: time::Duration = time::Duration::minutes(10);

/// Create authentication router
///
/// Routes:
/// - GET /auth/login - Redirect to LinkedIn
/// - GET /auth/callback - OAuth callback
/// - GET /auth/check - Session probe for the frontend
/// - POST /auth/logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_redirect))
        .route("/auth/callback", get(oauth_callback))
        .route("/auth/check", get(auth_check))
        .route("/auth/logout", post(logout))
}

// =============================================================================
// Initiate
// =============================================================================

/// GET /auth/login
///
/// Redirects user to the LinkedIn authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in a short-lived cookie scoped to /auth
/// 3. Redirect to LinkedIn with client_id, redirect_uri, scope, state
async fn login_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let linkedin = &state.config.auth.linkedin;

    let csrf_state = generate_csrf_state();

    let mut auth_url = url::Url::parse(&linkedin.auth_url).map_err(|error| {
        tracing::error!(%error, "LinkedIn authorization URL is invalid");
        AppError::Config("LinkedIn OAuth not configured".to_string())
    })?;
    auth_url
        .query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &linkedin.client_id)
        .append_pair("redirect_uri", &linkedin.redirect_uri)
        .append_pair("state", &csrf_state)
        .append_pair("scope", &linkedin.scope);

    let jar = jar.add(state_cookie(
        &csrf_state,
        state.config.should_use_secure_cookies(),
    ));

    Ok((jar, Redirect::to(auth_url.as_str())))
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the LinkedIn callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// LinkedIn token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// LinkedIn userinfo profile
#[derive(Debug, Deserialize)]
struct LinkedInProfile {
    /// LinkedIn subject identifier
    sub: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

/// GET /auth/callback
///
/// Handles the OAuth callback from LinkedIn.
///
/// # Steps
/// 1. Bail out to the error page on a provider error or missing code
/// 2. Verify the echoed state against the CSRF cookie
/// 3. Exchange code for access token (server-to-server)
/// 4. Fetch user profile from LinkedIn
/// 5. Check the profile email against the configured allow-list
/// 6. Resolve or create the user record
/// 7. Create session and set cookie
/// 8. Redirect to the landing page
async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let expected_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());

    // Whatever happens, this login attempt's state is consumed.
    let jar = jar.remove(removal_cookie(STATE_COOKIE, AUTH_COOKIE_PATH));

    if let Some(error) = query.error {
        let message = query.error_description.unwrap_or(error);
        tracing::warn!(error = %message, "LinkedIn reported an OAuth error");
        OAUTH_LOGINS_TOTAL.with_label_values(&["provider_error"]).inc();
        return Ok((jar, error_redirect(&state, &message)));
    }

    let Some(code) = query.code else {
        OAUTH_LOGINS_TOTAL.with_label_values(&["missing_code"]).inc();
        return Ok((jar, error_redirect(&state, "No authorization code received")));
    };

    // CSRF binding: the state echoed by the provider must match the value
    // set when the login attempt was initiated.
    if expected_state.is_none()
        || query.state.as_deref() != expected_state.as_deref()
    {
        tracing::warn!("OAuth callback state mismatch");
        OAUTH_LOGINS_TOTAL.with_label_values(&["state_mismatch"]).inc();
        return Ok((
            jar,
            error_redirect(&state, "Invalid login attempt. Please try again."),
        ));
    }

    let access_token = match exchange_code_for_token(&state, &code).await {
        Ok(token) => token,
        Err(error) => {
            tracing::error!(%error, "LinkedIn code exchange failed");
            OAUTH_LOGINS_TOTAL.with_label_values(&["exchange_failed"]).inc();
            return Ok((
                jar,
                error_redirect(&state, "Authentication failed. Please try again."),
            ));
        }
    };

    let profile = match fetch_user_profile(&state, &access_token).await {
        Ok(profile) => profile,
        Err(error) => {
            tracing::error!(%error, "LinkedIn profile fetch failed");
            OAUTH_LOGINS_TOTAL.with_label_values(&["profile_failed"]).inc();
            return Ok((
                jar,
                error_redirect(&state, "Authentication failed. Please try again."),
            ));
        }
    };

    if !state.config.auth.is_email_allowed(&profile.email) {
        tracing::warn!(email = %profile.email, "Login denied by allow-list");
        OAUTH_LOGINS_TOTAL.with_label_values(&["denied"]).inc();
        return Ok((jar, error_redirect(&state, "Access denied")));
    }

    let user = state
        .db
        .find_or_create_user(
            &profile.email,
            &profile.sub,
            profile.name.as_deref(),
            profile.picture.as_deref(),
        )
        .await?;

    let now = Utc::now();
    let session = Session {
        user_id: user.id,
        email: profile.email,
        name: profile.name,
        linkedin_access_token: access_token,
        created_at: now,
        expires_at: now + Duration::seconds(state.config.auth.session_max_age),
    };
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    let jar = jar.add(session_cookie(
        &token,
        state.config.auth.session_max_age,
        state.config.should_use_secure_cookies(),
    ));

    OAUTH_LOGINS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!(email = %session.email, "Login completed");

    Ok((jar, Redirect::to(&state.config.server.landing_path)))
}

// =============================================================================
// Session probe
// =============================================================================

/// GET /auth/check
///
/// Always responds 200; the body says whether the caller holds a valid
/// session. Used by the frontend to decide between login and dashboard.
async fn auth_check(MaybeUser(session): MaybeUser) -> Json<serde_json::Value> {
    match session {
        Some(session) => Json(json!({
            "authenticated": true,
            "user": {
                "email": session.email,
                "name": session.name,
            },
        })),
        None => Json(json!({ "authenticated": false })),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// POST /auth/logout
///
/// Clears the session cookie and redirects to the origin page.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(removal_cookie(SESSION_COOKIE, "/"))
        .remove(removal_cookie(STATE_COOKIE, AUTH_COOKIE_PATH));

    (jar, Redirect::to(&state.config.server.error_path))
}

// =============================================================================
// Provider calls
// =============================================================================

/// Exchange an authorization code for an access token.
///
/// Server-to-server form POST; the client secret never reaches the browser.
async fn exchange_code_for_token(state: &AppState, code: &str) -> Result<String, AppError> {
    let linkedin = &state.config.auth.linkedin;

    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", linkedin.client_id.as_str()),
        ("client_secret", linkedin.client_secret.as_str()),
        ("redirect_uri", linkedin.redirect_uri.as_str()),
    ];

    let response = state
        .http_client
        .post(&linkedin.token_url)
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "token endpoint returned {}",
            response.status()
        )));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

/// Fetch the authenticated user's profile from the userinfo endpoint.
async fn fetch_user_profile(
    state: &AppState,
    access_token: &str,
) -> Result<LinkedInProfile, AppError> {
    let response = state
        .http_client
        .get(&state.config.auth.linkedin.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "userinfo endpoint returned {}",
            response.status()
        )));
    }

    let profile: LinkedInProfile = response.json().await?;
    Ok(profile)
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token (32 bytes, base64url)
fn generate_csrf_state() -> String {
    use base64::{Engine as _, engine::general_purpose};
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Build a redirect to the error page carrying a human-readable message
fn error_redirect(state: &AppState, message: &str) -> Redirect {
    let target = format!(
        "{}?error={}",
        state.config.server.error_path,
        urlencoding::encode(message)
    );
    Redirect::to(&target)
}

fn state_cookie(value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(AUTH_COOKIE_PATH)
        .max_age(STATE_COOKIE_TTL)
        .build()
}

fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

fn removal_cookie(name: &str, path: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path(path.to_string())
        .max_age(time::Duration::ZERO)
        .build()
}
