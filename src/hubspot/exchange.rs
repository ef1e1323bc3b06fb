//! HubSpot token endpoint interactions.
//!
//! Handles the authorization-code and refresh-token grants, plus the
//! optional access-token introspection used to enrich stored bundles.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token response from HubSpot (standard OAuth 2.0)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Token bundle cached for a single pickup and handed to the downstream
/// consumer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    /// When the access token expires (UTC), derived from the provider's
    /// expires_in hint at exchange time
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub scope: Option<String>,

    /// HubSpot account id, filled by introspection when available
    #[serde(default)]
    pub hub_id: Option<u64>,

    #[serde(default)]
    pub hub_domain: Option<String>,

    /// Granted scopes, filled by introspection when available
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Access-token metadata from GET /oauth/v1/access-tokens/{token}
#[derive(Deserialize, Debug)]
pub struct TokenInfo {
    #[serde(default)]
    pub hub_id: Option<u64>,
    #[serde(default)]
    pub hub_domain: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Exchange an authorization code for a token bundle.
pub async fn exchange_code_for_token(
    api_base_url: &str,
    code: &str,
    redirect_uri: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenBundle> {
    let mut form_data = HashMap::new();
    form_data.insert("grant_type", "authorization_code");
    form_data.insert("code", code);
    form_data.insert("redirect_uri", redirect_uri);
    form_data.insert("client_id", client_id);
    form_data.insert("client_secret", client_secret);

    tracing::debug!("Exchanging authorization code for token");
    request_token(api_base_url, form_data).await
}

/// Obtain a fresh access token via the refresh-token grant.
pub async fn refresh_access_token(
    api_base_url: &str,
    refresh_token: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenBundle> {
    let mut form_data = HashMap::new();
    form_data.insert("grant_type", "refresh_token");
    form_data.insert("refresh_token", refresh_token);
    form_data.insert("client_id", client_id);
    form_data.insert("client_secret", client_secret);

    tracing::debug!("Refreshing access token");
    request_token(api_base_url, form_data).await
}

/// Form-encoded POST to the token endpoint, shared by both grants.
async fn request_token(
    api_base_url: &str,
    form_data: HashMap<&str, &str>,
) -> Result<TokenBundle> {
    let client = reqwest::Client::new();
    let token_url = format!("{}/oauth/v1/token", api_base_url);

    let response = client
        .post(&token_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await
        .context("Failed to send token request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!(
            "Token request failed with status {}: {}",
            status,
            body
        ));
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    tracing::debug!(
        has_refresh_token = token_response.refresh_token.is_some(),
        expires_in = ?token_response.expires_in,
        "Token request successful"
    );

    let expires_at = token_response
        .expires_in
        .map(|seconds| Utc::now() + Duration::seconds(seconds));

    Ok(TokenBundle {
        access_token: token_response.access_token,
        refresh_token: token_response.refresh_token,
        token_type: token_response.token_type,
        expires_at,
        scope: token_response.scope,
        hub_id: None,
        hub_domain: None,
        scopes: Vec::new(),
    })
}

/// Fetch account and scope metadata for an access token.
///
/// Callers treat failures as non-fatal; the bundle is stored either way.
pub async fn introspect_token(api_base_url: &str, access_token: &str) -> Result<TokenInfo> {
    let client = reqwest::Client::new();
    let url = format!("{}/oauth/v1/access-tokens/{}", api_base_url, access_token);

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send introspection request")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Introspection request failed with status {}",
            response.status()
        ));
    }

    response
        .json::<TokenInfo>()
        .await
        .context("Failed to parse introspection response")
}
