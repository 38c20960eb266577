//! Action proxy endpoints
//!
//! Validates caller requests, forwards them to the automation webhook,
//! and records post lifecycle state. Both endpoints sit behind the
//! authentication middleware; preflight OPTIONS requests are answered by
//! the CORS layer before they reach the router.

use axum::{Json, Router, extract::State, middleware, routing::post};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::auth::{CurrentUser, require_auth};
use crate::data::{EntityId, Post, PostStatus};
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::webhook::{GeneratePayload, PublishPayload};

/// Create the actions router
///
/// Routes (all POST, all authenticated):
/// - POST /actions/generate - Generate post text
/// - POST /actions/publish - Publish post text to LinkedIn
pub fn actions_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/actions/generate", post(generate))
        .route("/actions/publish", post(publish))
        .layer(middleware::from_fn_with_state(state, require_auth))
}

// =============================================================================
// Generate
// =============================================================================

/// Generate request body
///
/// Fields are optional at the serde level so validation can enumerate
/// everything that is missing instead of failing on the first field.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub theme: Option<String>,
    pub post_type: Option<String>,
    pub length: Option<String>,
    pub tone: Option<String>,
    pub brand_context: Option<String>,
}

fn validate_generate(
    request: GenerateRequest,
    default_brand_context: &str,
) -> Result<GeneratePayload, AppError> {
    fn non_empty(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }

    let theme = non_empty(request.theme);
    let post_type = non_empty(request.post_type);
    let length = non_empty(request.length);
    let tone = non_empty(request.tone);

    match (theme, post_type, length, tone) {
        (Some(theme), Some(post_type), Some(length), Some(tone)) => Ok(GeneratePayload {
            theme,
            post_type,
            length,
            tone,
            brand_context: non_empty(request.brand_context)
                .unwrap_or_else(|| default_brand_context.to_string()),
        }),
        (theme, post_type, length, tone) => {
            let missing: Vec<&str> = [
                ("theme", theme.is_none()),
                ("post_type", post_type.is_none()),
                ("length", length.is_none()),
                ("tone", tone.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, is_missing)| is_missing.then_some(name))
            .collect();

            Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// POST /actions/generate
///
/// Validates the request, forwards it to the generate webhook, and saves
/// the result as a draft post. Persistence is best-effort: the generated
/// text is returned even when the save fails.
async fn generate(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = validate_generate(request, state.webhooks.default_brand_context())?;

    let post_text = state.webhooks.generate(&payload).await?;

    let post_id = match save_draft(&state, &session.user_id, &payload, &post_text).await {
        Ok(id) => Some(id),
        Err(error) => {
            tracing::warn!(%error, user_id = %session.user_id, "Failed to persist draft post");
            None
        }
    };

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/actions/generate", "200"])
        .inc();

    Ok(Json(json!({
        "post_text": post_text,
        "post_id": post_id,
    })))
}

async fn save_draft(
    state: &AppState,
    user_id: &str,
    payload: &GeneratePayload,
    post_text: &str,
) -> Result<String, AppError> {
    let post = Post {
        id: EntityId::new().0,
        user_id: user_id.to_string(),
        theme: payload.theme.clone(),
        post_type: payload.post_type.clone(),
        length: payload.length.clone(),
        tone: payload.tone.clone(),
        brand_context: payload.brand_context.clone(),
        post_text: post_text.to_string(),
        status: PostStatus::Draft.as_str().to_string(),
        external_post_id: None,
        created_at: Utc::now(),
        published_at: None,
    };

    state.db.insert_post(&post).await?;

    Ok(post.id)
}

// =============================================================================
// Publish
// =============================================================================

/// Publish request body
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub post_text: Option<String>,
    pub post_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// POST /actions/publish
///
/// Forwards the post text to the publish webhook and relays its result.
/// When a post id is supplied, the stored record is marked published —
/// conditioned on the caller owning it. An upstream failure leaves
/// persisted state untouched.
async fn publish(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<PublishRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post_text = request
        .post_text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Post text is required".to_string()))?;

    let payload = PublishPayload {
        post_text,
        metadata: request.metadata.unwrap_or_else(|| json!({})),
    };

    let result = state.webhooks.publish(&payload).await?;

    if let Some(post_id) = request.post_id {
        let external_id = result
            .get("post_urn")
            .or_else(|| result.get("id"))
            .and_then(|value| value.as_str());

        match state
            .db
            .mark_post_published(&post_id, &session.user_id, external_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    post_id = %post_id,
                    user_id = %session.user_id,
                    "Publish succeeded upstream but no owned post record matched"
                );
                return Err(AppError::PostNotFound);
            }
            Err(error) => {
                tracing::error!(%error, post_id = %post_id, "Post record update failed after publish");
                return Err(AppError::PublishState(
                    "post record was not updated".to_string(),
                ));
            }
        }
    }

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/actions/publish", "200"])
        .inc();

    Ok(Json(result))
}
