// Process-wide configuration
pub mod config;

// Transient key-value cache (Redis in production, in-memory in tests)
pub mod cache;

// HubSpot OAuth flow and CRM item mapping
pub mod hubspot;

// HTTP API exposed to the hosting web layer
pub mod api;
