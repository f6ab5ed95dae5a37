use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use super::container::PackingContainer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackListStatus {
    Draft,
    InProgress,
    Completed,
}

impl PackListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackListStatus::Draft => "draft",
            PackListStatus::InProgress => "in_progress",
            PackListStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Courier,
    Tour,
}

#[derive(Debug, Error)]
#[error("cannot move shipment from {from} to {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Shipment lifecycle. Every state carries the timestamps that are
/// meaningful for it, so an arrived shipment always has a shipped date and a
/// pending one cannot have any.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShipmentState {
    Pending,
    Dispatched {
        dispatched_at: DateTime<Utc>,
    },
    InTransit {
        #[serde(default)]
        dispatched_at: Option<DateTime<Utc>>,
        shipped_at: DateTime<Utc>,
    },
    Arrived {
        #[serde(default)]
        dispatched_at: Option<DateTime<Utc>>,
        shipped_at: DateTime<Utc>,
        arrived_at: DateTime<Utc>,
    },
    Lost {
        reported_at: DateTime<Utc>,
    },
}

impl ShipmentState {
    pub fn label(&self) -> &'static str {
        match self {
            ShipmentState::Pending => "pending",
            ShipmentState::Dispatched { .. } => "dispatched",
            ShipmentState::InTransit { .. } => "in_transit",
            ShipmentState::Arrived { .. } => "arrived",
            ShipmentState::Lost { .. } => "lost",
        }
    }

    pub fn dispatch(&self, at: DateTime<Utc>) -> Result<ShipmentState, TransitionError> {
        match self {
            ShipmentState::Pending => Ok(ShipmentState::Dispatched { dispatched_at: at }),
            other => Err(TransitionError {
                from: other.label(),
                to: "dispatched",
            }),
        }
    }

    pub fn ship(&self, at: DateTime<Utc>) -> Result<ShipmentState, TransitionError> {
        match self {
            ShipmentState::Pending => Ok(ShipmentState::InTransit {
                dispatched_at: None,
                shipped_at: at,
            }),
            ShipmentState::Dispatched { dispatched_at } => Ok(ShipmentState::InTransit {
                dispatched_at: Some(*dispatched_at),
                shipped_at: at,
            }),
            other => Err(TransitionError {
                from: other.label(),
                to: "in_transit",
            }),
        }
    }

    pub fn arrive(&self, at: DateTime<Utc>) -> Result<ShipmentState, TransitionError> {
        match self {
            ShipmentState::InTransit {
                dispatched_at,
                shipped_at,
            } => Ok(ShipmentState::Arrived {
                dispatched_at: *dispatched_at,
                shipped_at: *shipped_at,
                arrived_at: at,
            }),
            other => Err(TransitionError {
                from: other.label(),
                to: "arrived",
            }),
        }
    }

    pub fn mark_lost(&self, at: DateTime<Utc>) -> Result<ShipmentState, TransitionError> {
        match self {
            ShipmentState::Dispatched { .. } | ShipmentState::InTransit { .. } => {
                Ok(ShipmentState::Lost { reported_at: at })
            }
            other => Err(TransitionError {
                from: other.label(),
                to: "lost",
            }),
        }
    }

    /// Once a shipment has left the building its pack list contents are
    /// frozen. Pending and dispatched shipments can still be repacked.
    pub fn freezes_contents(&self) -> bool {
        matches!(
            self,
            ShipmentState::InTransit { .. }
                | ShipmentState::Arrived { .. }
                | ShipmentState::Lost { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub method: ShippingMethod,
    #[serde(default)]
    pub origin_address: Option<String>,
    #[serde(default)]
    pub destination_address: Option<String>,
    #[serde(default)]
    pub expected_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub courier_name: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(flatten)]
    pub state: ShipmentState,
}

fn default_version() -> i64 {
    1
}

/// The whole pack list document, stored as one JSON blob per row. Containers
/// have no identity outside their owning pack list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackList {
    pub id: String,
    pub show_id: String,
    pub name: String,
    pub status: PackListStatus,
    #[serde(default)]
    pub containers: Vec<PackingContainer>,
    #[serde(default)]
    pub shipping: Option<ShippingInfo>,
    #[serde(default = "default_version")]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl PackList {
    pub fn is_mutable(&self) -> bool {
        match &self.shipping {
            None => true,
            Some(shipping) => !shipping.state.freezes_contents(),
        }
    }

    pub fn container(&self, container_id: &str) -> Option<&PackingContainer> {
        self.containers.iter().find(|c| c.id == container_id)
    }

    pub fn container_mut(&mut self, container_id: &str) -> Option<&mut PackingContainer> {
        self.containers.iter_mut().find(|c| c.id == container_id)
    }

    pub fn child_count(&self, container_id: &str) -> usize {
        self.containers
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(container_id))
            .count()
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePackListRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub show_id: String,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdatePackListRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub status: Option<PackListStatus>,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateShippingRequest {
    pub method: ShippingMethod,
    #[validate(length(max = 500))]
    pub origin_address: Option<String>,
    #[validate(length(max = 500))]
    pub destination_address: Option<String>,
    pub expected_delivery: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub courier_name: Option<String>,
    #[validate(length(max = 255))]
    pub tracking_number: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShipRequest {
    pub courier_name: Option<String>,
    pub tracking_number: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub actor: Option<String>,
}

/// Whole-document write of the containers array, the way tree editors save.
/// `version` must match the stored document or the write is rejected.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplaceContainersRequest {
    pub containers: Vec<PackingContainer>,
    pub version: i64,
    pub actor: Option<String>,
}
