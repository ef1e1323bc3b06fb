//! Process-wide configuration.
//!
//! Built once at startup from environment variables and passed by reference
//! into each component; read-only after construction. Missing HubSpot
//! credentials are a fatal error surfaced before any OAuth flow can begin.

use anyhow::{bail, Result};

use crate::hubspot::API_BASE_URL;

/// OAuth scopes requested from HubSpot (fixed, process-wide).
pub const SCOPES: &str =
    "crm.objects.contacts.read crm.objects.companies.read crm.objects.deals.read";

/// Complete hublink configuration
#[derive(Debug, Clone)]
pub struct HubLinkConfig {
    /// HubSpot OAuth client ID (HUBSPOT_CLIENT_ID)
    pub client_id: String,

    /// HubSpot OAuth client secret (HUBSPOT_CLIENT_SECRET)
    pub client_secret: String,

    /// Redirect target registered with HubSpot, derived from the callback
    /// base URL. Fixed for the process lifetime.
    pub redirect_uri: String,

    /// HubSpot API base URL (overridable for tests with a mock server)
    pub api_base_url: String,

    /// Redis connection URL
    pub redis_url: String,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Origin of the popup-initiating frontend (CORS)
    pub frontend_origin: String,
}

impl HubLinkConfig {
    /// Load configuration from environment variables.
    ///
    /// Required: HUBSPOT_CLIENT_ID, HUBSPOT_CLIENT_SECRET.
    /// Optional (with defaults): HUBLINK_CALLBACK_BASE_URL, REDIS_URL,
    /// HUBLINK_BIND_ADDR, HUBLINK_FRONTEND_ORIGIN.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let client_id = get("HUBSPOT_CLIENT_ID").filter(|v| !v.is_empty());
        let client_secret = get("HUBSPOT_CLIENT_SECRET").filter(|v| !v.is_empty());
        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            bail!(
                "Missing HubSpot credentials. Set HUBSPOT_CLIENT_ID and \
                 HUBSPOT_CLIENT_SECRET environment variables."
            );
        };

        let callback_base_url = get("HUBLINK_CALLBACK_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string());
        let redirect_uri = format!(
            "{}/integrations/hubspot/oauth2callback",
            callback_base_url.trim_end_matches('/')
        );

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            api_base_url: API_BASE_URL.to_string(),
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            bind_addr: get("HUBLINK_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            frontend_origin: get("HUBLINK_FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }
}
