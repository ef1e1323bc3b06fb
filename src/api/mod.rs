// HTTP API for the hosting web layer

pub mod integrations;

pub use integrations::{create_integration_router, IntegrationAppState};
