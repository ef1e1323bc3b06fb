//! HTTP client for the HubSpot CRM v3 object APIs.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::exchange::{self, TokenBundle};
use crate::config::HubLinkConfig;

/// One CRM collection fetched by the item lister.
#[derive(Debug)]
pub struct CrmResource {
    /// Path segment under /crm/v3/objects/
    pub collection: &'static str,
    /// Singular type tag used on mapped items
    pub item_type: &'static str,
}

/// Resource types fetched by the item lister, in listing order.
pub const CRM_RESOURCES: &[CrmResource] = &[
    CrmResource {
        collection: "contacts",
        item_type: "contact",
    },
    CrmResource {
        collection: "companies",
        item_type: "company",
    },
    CrmResource {
        collection: "deals",
        item_type: "deal",
    },
];

/// First-page size for list requests.
const PAGE_LIMIT: u32 = 100;

/// Property projection requested for every resource type.
const LIST_PROPERTIES: &str = "firstname,lastname,email,name,dealname,createdate,lastmodifieddate";

/// One CRM record as returned by a list endpoint.
///
/// Properties are dynamic: HubSpot returns null for requested properties
/// the record does not have.
#[derive(Debug, Deserialize)]
pub struct CrmObject {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
}

impl CrmObject {
    /// Property value, treating absent, null, and blank as missing.
    pub fn prop(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|value| value.as_deref())
            .filter(|value| !value.trim().is_empty())
    }
}

/// First page of a CRM list response. Paging cursors are ignored: the
/// lister deliberately fetches only the first page per resource type.
#[derive(Debug, Deserialize)]
struct ObjectPage {
    #[serde(default)]
    results: Vec<CrmObject>,
}

/// Bearer-authenticated client for the CRM list endpoints.
///
/// Holds the token bundle in memory; an expired access token triggers at
/// most one refresh-and-retry per list call.
pub struct HubSpotClient {
    http_client: Client,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    access_token: String,
    refresh_token: Option<String>,
}

impl HubSpotClient {
    /// Create a client from the process configuration and a token bundle.
    pub fn new(config: &HubLinkConfig, bundle: &TokenBundle) -> Self {
        let http_client = Client::builder()
            .user_agent("hublink/1.0")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http_client,
            api_base_url: config.api_base_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            access_token: bundle.access_token.clone(),
            refresh_token: bundle.refresh_token.clone(),
        }
    }

    /// Fetch the first page of a CRM collection.
    ///
    /// On 401 with a refresh token available: one refresh-token grant,
    /// update the in-memory bearer token, retry the same request once.
    /// Any remaining failure is an error for the caller to handle per
    /// resource type.
    pub async fn list_objects(&mut self, resource: &CrmResource) -> Result<Vec<CrmObject>> {
        let mut response = self.fetch_page(resource).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let Some(refresh_token) = self.refresh_token.clone() else {
                return Err(anyhow!(
                    "HubSpot access token expired and no refresh token available"
                ));
            };

            debug!(collection = %resource.collection, "Access token expired, refreshing");
            let refreshed = exchange::refresh_access_token(
                &self.api_base_url,
                &refresh_token,
                &self.client_id,
                &self.client_secret,
            )
            .await
            .context("Token refresh failed")?;

            self.access_token = refreshed.access_token;
            if refreshed.refresh_token.is_some() {
                self.refresh_token = refreshed.refresh_token;
            }

            response = self.fetch_page(resource).await?;
        }

        if !response.status().is_success() {
            return Err(anyhow!(
                "HubSpot API error for {}: {}",
                resource.collection,
                response.status()
            ));
        }

        let page: ObjectPage = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", resource.collection))?;
        Ok(page.results)
    }

    async fn fetch_page(&self, resource: &CrmResource) -> Result<Response> {
        let url = format!(
            "{}/crm/v3/objects/{}?limit={}&properties={}",
            self.api_base_url, resource.collection, PAGE_LIMIT, LIST_PROPERTIES
        );
        self.http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Failed to send {} list request", resource.collection))
    }
}
