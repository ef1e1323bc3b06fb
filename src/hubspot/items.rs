//! Uniform integration items and the CRM item-listing routine.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::{CrmObject, HubSpotClient, CRM_RESOURCES};
use super::exchange::TokenBundle;
use crate::config::HubLinkConfig;

/// Uniform representation of one CRM record for the downstream consumer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntegrationItem {
    /// "{type}_{provider id}"
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub item_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path_or_name: Option<String>,
}

/// A resource type skipped during listing, with the reason.
#[derive(Debug)]
pub struct SkippedResource {
    pub collection: String,
    pub reason: String,
}

/// Aggregated listing outcome.
///
/// Partial results are a normal outcome, not a failure; `skipped` records
/// which resource types could not be fetched.
#[derive(Debug, Default)]
pub struct ItemListing {
    pub items: Vec<IntegrationItem>,
    pub skipped: Vec<SkippedResource>,
}

/// Map one CRM record into the uniform item shape.
///
/// Name resolution: contacts prefer "first last", then email, then
/// "Contact {id}"; companies use the name property, deals the dealname
/// property, each falling back to "{Type} {id}".
pub fn item_from_object(object: &CrmObject, item_type: &str) -> IntegrationItem {
    let name = match item_type {
        "contact" => {
            let full_name = match (object.prop("firstname"), object.prop("lastname")) {
                (Some(first), Some(last)) => format!("{} {}", first, last),
                (Some(first), None) => first.to_string(),
                (None, Some(last)) => last.to_string(),
                (None, None) => String::new(),
            };
            if !full_name.is_empty() {
                full_name
            } else if let Some(email) = object.prop("email") {
                email.to_string()
            } else {
                format!("Contact {}", object.id)
            }
        }
        "company" => object
            .prop("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Company {}", object.id)),
        "deal" => object
            .prop("dealname")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Deal {}", object.id)),
        other => format!("{} {}", title_case(other), object.id),
    };

    IntegrationItem {
        id: format!("{}_{}", item_type, object.id),
        name,
        item_type: item_type.to_string(),
        creation_time: object.prop("createdate").map(str::to_string),
        last_modified_time: object.prop("lastmodifieddate").map(str::to_string),
        parent_id: None,
        parent_path_or_name: None,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Fetch the first page of each CRM resource type and map the records into
/// integration items.
///
/// Resource types that fail are skipped and logged; the listing always
/// returns whatever could be gathered, even if empty.
pub async fn list_items(config: &HubLinkConfig, bundle: &TokenBundle) -> ItemListing {
    let mut client = HubSpotClient::new(config, bundle);
    let mut listing = ItemListing::default();

    for resource in CRM_RESOURCES {
        match client.list_objects(resource).await {
            Ok(objects) => {
                debug!(
                    collection = %resource.collection,
                    count = objects.len(),
                    "Fetched CRM objects"
                );
                listing.items.extend(
                    objects
                        .iter()
                        .map(|object| item_from_object(object, resource.item_type)),
                );
            }
            Err(e) => {
                // Non-fatal: log and continue with the remaining resource types.
                warn!(collection = %resource.collection, error = %e, "Skipping resource type");
                listing.skipped.push(SkippedResource {
                    collection: resource.collection.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    listing
}
