//! HubSpot CRM integration.
//!
//! Implements the popup-based authorization flow:
//! 1. Frontend requests an authorization URL for a (user, org) pair
//! 2. User authorizes in the popup on app.hubspot.com
//! 3. HubSpot redirects to /integrations/hubspot/oauth2callback
//! 4. Exchange code for tokens, cache the bundle briefly for a single pickup
//! 5. Frontend collects the bundle and loads CRM items with it

pub mod client;
pub mod exchange;
pub mod items;
pub mod oauth;

pub use client::HubSpotClient;
pub use exchange::TokenBundle;
pub use items::{list_items, IntegrationItem, ItemListing};
pub use oauth::{authorize, handle_callback, take_credentials, CallbackParams, OAuthError};

/// HubSpot authorization endpoint (redirect target for the popup).
pub const AUTH_URL: &str = "https://app.hubspot.com/oauth/authorize";

/// Base URL for the token and CRM APIs.
pub const API_BASE_URL: &str = "https://api.hubapi.com";

/// TTL for cached sessions and token bundles, in seconds.
pub const CACHE_TTL_SECONDS: u64 = 600;
