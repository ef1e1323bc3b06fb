//! HubSpot integration endpoints.
//!
//! Fulfills the inbound contract for the hosting web layer:
//! authorize -> authorization URL, oauth2callback -> window-closing HTML,
//! credentials -> token bundle (single use), load -> integration items.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::cache::Cache;
use crate::config::HubLinkConfig;
use crate::hubspot::{self, CallbackParams, IntegrationItem, OAuthError, TokenBundle};

/// Shared application state for the integration API
#[derive(Clone)]
pub struct IntegrationAppState {
    pub config: Arc<HubLinkConfig>,
    pub cache: Arc<dyn Cache>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for integration endpoints
enum AppError {
    BadRequest(String),
    NotFound(String),
    ServerError(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<OAuthError> for AppError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::ExchangeFailed(_) => AppError::BadGateway(e.to_string()),
            OAuthError::NoCredentials => AppError::NotFound(e.to_string()),
            OAuthError::Cache(_) => AppError::ServerError(e.to_string()),
            _ => AppError::BadRequest(e.to_string()),
        }
    }
}

/// Request body identifying the acting user and organization
#[derive(Deserialize)]
pub struct UserOrgRequest {
    pub user_id: String,
    pub org_id: String,
}

/// Response for POST /integrations/hubspot/authorize
#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub url: String,
}

/// Page served after a successful callback; closes the popup window.
const CLOSE_WINDOW_PAGE: &str = "<html><script>window.close();</script></html>";

/// Create the integration API router
pub fn create_integration_router(state: IntegrationAppState) -> Router {
    Router::new()
        .route("/integrations/hubspot/authorize", post(authorize))
        .route("/integrations/hubspot/oauth2callback", get(oauth2callback))
        .route("/integrations/hubspot/credentials", post(credentials))
        .route("/integrations/hubspot/load", post(load_items))
        .with_state(Arc::new(state))
}

/// POST /integrations/hubspot/authorize - Start the popup authorization flow
async fn authorize(
    State(state): State<Arc<IntegrationAppState>>,
    Json(body): Json<UserOrgRequest>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    let url = hubspot::authorize(
        &state.config,
        state.cache.as_ref(),
        &body.user_id,
        &body.org_id,
    )
    .await
    .map_err(|e| AppError::ServerError(e.to_string()))?;

    Ok(Json(AuthorizeResponse { url }))
}

/// GET /integrations/hubspot/oauth2callback - Provider redirect target
async fn oauth2callback(
    State(state): State<Arc<IntegrationAppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>, AppError> {
    hubspot::handle_callback(&state.config, state.cache.as_ref(), params).await?;
    Ok(Html(CLOSE_WINDOW_PAGE))
}

/// POST /integrations/hubspot/credentials - Single-use token bundle pickup
async fn credentials(
    State(state): State<Arc<IntegrationAppState>>,
    Json(body): Json<UserOrgRequest>,
) -> Result<Json<TokenBundle>, AppError> {
    let bundle =
        hubspot::take_credentials(state.cache.as_ref(), &body.user_id, &body.org_id).await?;
    Ok(Json(bundle))
}

/// POST /integrations/hubspot/load - List CRM records as integration items
async fn load_items(
    State(state): State<Arc<IntegrationAppState>>,
    Json(bundle): Json<TokenBundle>,
) -> Json<Vec<IntegrationItem>> {
    let listing = hubspot::list_items(&state.config, &bundle).await;
    if !listing.skipped.is_empty() {
        info!(
            skipped = listing.skipped.len(),
            "Item listing completed with skipped resource types"
        );
    }
    Json(listing.items)
}
