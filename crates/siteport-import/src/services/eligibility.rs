//! Destination eligibility
//!
//! A destination may receive an import only while it is a site whose lifecycle
//! record says DRAFT. Lookups are best-effort: any failure counts as not eligible.

use std::collections::HashSet;
use std::sync::Arc;

use siteport_import_types::{Destination, DestinationDirectory, DestinationId};
use tracing::{debug, error, warn};

pub struct EligibilityFilter {
    directory: Arc<dyn DestinationDirectory>,
}

impl EligibilityFilter {
    pub fn new(directory: Arc<dyn DestinationDirectory>) -> Self {
        Self { directory }
    }

    /// Destinations that may currently receive an import, in directory order.
    ///
    /// A failing directory yields an empty list.
    pub async fn list_eligible_destinations(&self) -> Vec<Destination> {
        let destinations = match self.directory.list_destinations().await {
            Ok(destinations) => destinations,
            Err(e) => {
                error!("Failed to list destinations: {}", e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut eligible = Vec::new();
        for destination in destinations {
            if !destination.is_site || !seen.insert(destination.id) {
                continue;
            }
            if self.is_draft(destination.id).await {
                eligible.push(destination);
            }
        }

        debug!("{} destinations eligible for import", eligible.len());
        eligible
    }

    /// Same predicate as the listing, for a single destination
    pub async fn is_eligible(&self, destination_id: DestinationId) -> bool {
        let destinations = match self.directory.list_destinations().await {
            Ok(destinations) => destinations,
            Err(e) => {
                error!("Failed to list destinations: {}", e);
                return false;
            }
        };

        let is_site = destinations
            .iter()
            .any(|d| d.id == destination_id && d.is_site);

        is_site && self.is_draft(destination_id).await
    }

    async fn is_draft(&self, destination_id: DestinationId) -> bool {
        match self.directory.get_content_state(destination_id).await {
            Ok(Some(state)) => {
                debug!(
                    "Destination {} has content state '{}' ({})",
                    destination_id, state.name, state.lifecycle_status
                );
                state.lifecycle_status.is_draft()
            }
            Ok(None) => {
                debug!("Destination {} has no content state", destination_id);
                false
            }
            Err(e) => {
                warn!(
                    "Content state lookup failed for destination {}: {}",
                    destination_id, e
                );
                false
            }
        }
    }
}
