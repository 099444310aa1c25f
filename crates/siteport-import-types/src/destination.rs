//! Destinations and their lifecycle records
//!
//! A destination is a site that may receive an imported bundle. Whether it may
//! receive one right now depends on the `ContentState` the lifecycle service keeps
//! for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::ImportResult;

/// Opaque destination identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct DestinationId(pub i64);

impl DestinationId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Parse a caller-supplied identifier. Blank or malformed input yields `None`.
    pub fn parse_selection(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse().ok()
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DestinationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(DestinationId)
    }
}

impl From<i64> for DestinationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Read-only view of a destination from the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Destination {
    /// Destination identifier
    pub id: DestinationId,
    /// Human-readable name
    pub display_name: String,
    /// Only sites can receive an import
    pub is_site: bool,
}

/// Publication lifecycle of a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Published,
    Pending,
    Draft,
    Expired,
    Denied,
    Inactive,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Published => "PUBLISHED",
            LifecycleStatus::Pending => "PENDING",
            LifecycleStatus::Draft => "DRAFT",
            LifecycleStatus::Expired => "EXPIRED",
            LifecycleStatus::Denied => "DENIED",
            LifecycleStatus::Inactive => "INACTIVE",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, LifecycleStatus::Draft)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle record associated with a destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentState {
    pub destination_id: DestinationId,
    pub name: String,
    pub lifecycle_status: LifecycleStatus,
}

/// Directory of destinations and their lifecycle records
#[async_trait]
pub trait DestinationDirectory: Send + Sync {
    /// Every known destination, unpaginated
    async fn list_destinations(&self) -> ImportResult<Vec<Destination>>;

    /// Lifecycle record for a destination, `None` when it has none
    async fn get_content_state(
        &self,
        destination_id: DestinationId,
    ) -> ImportResult<Option<ContentState>>;
}
