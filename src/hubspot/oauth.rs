//! OAuth 2.0 authorization flow against HubSpot.
//!
//! CSRF protection follows the provider round-trip pattern: a random state
//! token is cached under (provider, org, user) and also carried inside the
//! base64-url-encoded state parameter, so the callback can recover the cache
//! key and compare tokens before trusting the code exchange. Sessions and
//! token bundles are single-use and expire after [`super::CACHE_TTL_SECONDS`].

use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::exchange::{self, TokenBundle};
use super::{AUTH_URL, CACHE_TTL_SECONDS};
use crate::cache::Cache;
use crate::config::{HubLinkConfig, SCOPES};

/// Pending authorization session, cached until the provider redirects back
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub state: String,
    pub user_id: String,
    pub org_id: String,
}

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Errors surfaced by the OAuth flow
#[derive(Debug)]
pub enum OAuthError {
    /// Provider reported denial on the redirect
    Denied { error: String, description: String },
    /// No state parameter on the callback
    MissingState,
    /// State parameter could not be decoded
    InvalidState,
    /// No code parameter on the callback
    MissingCode,
    /// No cached session, or the echoed state token does not equal the stored one
    StateMismatch,
    /// Token endpoint returned a non-success status
    ExchangeFailed(String),
    /// Nothing cached for (org, user): never authorized, or already consumed
    NoCredentials,
    /// Cache read/write failed
    Cache(anyhow::Error),
}

impl std::fmt::Display for OAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OAuthError::Denied { description, .. } => {
                write!(f, "Authorization denied: {}", description)
            }
            OAuthError::MissingState => write!(f, "Missing state parameter"),
            OAuthError::InvalidState => write!(f, "Invalid state parameter"),
            OAuthError::MissingCode => write!(f, "Missing code parameter"),
            OAuthError::StateMismatch => write!(f, "State does not match"),
            OAuthError::ExchangeFailed(msg) => {
                write!(f, "Failed to exchange code for token: {}", msg)
            }
            OAuthError::NoCredentials => write!(f, "No credentials found"),
            OAuthError::Cache(e) => write!(f, "Cache operation failed: {}", e),
        }
    }
}

impl std::error::Error for OAuthError {}

fn state_key(org_id: &str, user_id: &str) -> String {
    format!("hubspot:state:{}:{}", org_id, user_id)
}

fn credentials_key(org_id: &str, user_id: &str) -> String {
    format!("hubspot:credentials:{}:{}", org_id, user_id)
}

/// Generate an unguessable URL-safe state token (256 bits of randomness).
fn generate_state_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Encode a session for the authorization URL's state parameter.
///
/// The whole session rides along so the callback can recover the cache key
/// from the redirect alone.
fn encode_state(session: &AuthSession) -> String {
    let json = serde_json::to_string(session).expect("Failed to serialize auth session");
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_state(encoded: &str) -> Result<AuthSession, OAuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| OAuthError::InvalidState)?;
    serde_json::from_slice(&bytes).map_err(|_| OAuthError::InvalidState)
}

/// Build the provider authorization URL for (user, org) and cache the
/// pending session under the key the callback will look up.
///
/// Cache-write failures propagate; a URL is never handed out without a
/// stored session behind it.
pub async fn authorize(
    config: &HubLinkConfig,
    cache: &dyn Cache,
    user_id: &str,
    org_id: &str,
) -> anyhow::Result<String> {
    let session = AuthSession {
        state: generate_state_token(),
        user_id: user_id.to_string(),
        org_id: org_id.to_string(),
    };

    let session_json =
        serde_json::to_string(&session).context("Failed to serialize auth session")?;
    cache
        .set_with_expiry(
            &state_key(org_id, user_id),
            &session_json,
            CACHE_TTL_SECONDS,
        )
        .await
        .context("Failed to cache auth session")?;

    let auth_url = format!(
        "{}?client_id={}&response_type=code&scope={}&redirect_uri={}&state={}",
        AUTH_URL,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(SCOPES),
        urlencoding::encode(&config.redirect_uri),
        encode_state(&session),
    );

    debug!(user_id = %user_id, org_id = %org_id, "Issued authorization URL");
    Ok(auth_url)
}

/// Process the provider redirect: validate state, consume the session, and
/// exchange the code for a token bundle cached for a single pickup.
pub async fn handle_callback(
    config: &HubLinkConfig,
    cache: &dyn Cache,
    params: CallbackParams,
) -> Result<(), OAuthError> {
    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_else(|| error.clone());
        warn!(error = %error, "HubSpot authorization denied");
        return Err(OAuthError::Denied { error, description });
    }

    let encoded_state = params.state.ok_or(OAuthError::MissingState)?;
    let session = decode_state(&encoded_state)?;
    let code = params.code.ok_or(OAuthError::MissingCode)?;

    let key = state_key(&session.org_id, &session.user_id);
    let saved = cache.get(&key).await.map_err(OAuthError::Cache)?;
    let saved: AuthSession = match saved {
        Some(json) => serde_json::from_str(&json).map_err(|_| OAuthError::StateMismatch)?,
        None => return Err(OAuthError::StateMismatch),
    };
    if saved.state != session.state {
        warn!(org_id = %session.org_id, user_id = %session.user_id, "OAuth state mismatch");
        return Err(OAuthError::StateMismatch);
    }

    // No ordering dependency between the exchange and the session delete;
    // both must complete before the bundle is stored.
    let (exchanged, deleted) = tokio::join!(
        exchange::exchange_code_for_token(
            &config.api_base_url,
            &code,
            &config.redirect_uri,
            &config.client_id,
            &config.client_secret,
        ),
        cache.delete(&key),
    );
    deleted.map_err(OAuthError::Cache)?;
    let mut bundle = exchanged.map_err(|e| OAuthError::ExchangeFailed(e.to_string()))?;

    // Enrichment is best-effort and must not block persisting the bundle.
    match exchange::introspect_token(&config.api_base_url, &bundle.access_token).await {
        Ok(token_info) => {
            bundle.hub_id = token_info.hub_id;
            bundle.hub_domain = token_info.hub_domain;
            bundle.scopes = token_info.scopes;
        }
        Err(e) => warn!(error = %e, "Token introspection failed"),
    }

    let bundle_json = serde_json::to_string(&bundle)
        .map_err(|e| OAuthError::Cache(anyhow::Error::from(e)))?;
    cache
        .set_with_expiry(
            &credentials_key(&session.org_id, &session.user_id),
            &bundle_json,
            CACHE_TTL_SECONDS,
        )
        .await
        .map_err(OAuthError::Cache)?;

    info!(
        org_id = %session.org_id,
        user_id = %session.user_id,
        has_refresh_token = bundle.refresh_token.is_some(),
        "HubSpot authorization completed"
    );

    Ok(())
}

/// Fetch and delete the cached token bundle for (user, org).
///
/// Single-use: a second call fails with `NoCredentials`, which also covers
/// the never-authorized case — the two are indistinguishable here.
pub async fn take_credentials(
    cache: &dyn Cache,
    user_id: &str,
    org_id: &str,
) -> Result<TokenBundle, OAuthError> {
    let key = credentials_key(org_id, user_id);

    let cached = cache.get(&key).await.map_err(OAuthError::Cache)?;
    let Some(json) = cached else {
        return Err(OAuthError::NoCredentials);
    };
    let bundle: TokenBundle =
        serde_json::from_str(&json).map_err(|e| OAuthError::Cache(anyhow::Error::from(e)))?;

    cache.delete(&key).await.map_err(OAuthError::Cache)?;

    Ok(bundle)
}
