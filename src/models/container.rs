use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::prop::Weight;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Empty,
    Partial,
    Full,
    Sealed,
}

impl Default for ContainerStatus {
    fn default() -> Self {
        ContainerStatus::Empty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedProp {
    pub prop_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One node of a pack list's container hierarchy. Containers live embedded in
/// the pack list document; `parent_id` points at another container in the same
/// document, or is `None` for top-level containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingContainer {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub container_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub max_weight: Option<Weight>,
    #[serde(default)]
    pub props: Vec<PackedProp>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub status: ContainerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl PackingContainer {
    pub fn prop_count(&self) -> u32 {
        self.props.iter().map(|entry| entry.quantity).sum()
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateContainerRequest {
    /// Defaults to a generated reference code when omitted.
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub container_type: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub max_weight: Option<Weight>,
    pub labels: Option<Vec<String>>,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateContainerRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub container_type: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub max_weight: Option<Weight>,
    pub labels: Option<Vec<String>>,
    pub status: Option<ContainerStatus>,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveContainerRequest {
    /// `None` moves the container to the top level.
    pub parent_id: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddPropRequest {
    #[validate(length(min = 1))]
    pub prop_id: String,
    /// Defaults to 1. Adding a prop that is already packed increments the
    /// existing entry instead of creating a duplicate.
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
    pub notes: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdatePropRequest {
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
    pub notes: Option<String>,
    pub actor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_count_sums_quantities() {
        let container = PackingContainer {
            id: "c1".to_string(),
            parent_id: None,
            name: "Road case".to_string(),
            container_type: None,
            description: None,
            location: None,
            dimensions: None,
            max_weight: None,
            props: vec![
                PackedProp {
                    prop_id: "p1".to_string(),
                    quantity: 2,
                    notes: None,
                },
                PackedProp {
                    prop_id: "p2".to_string(),
                    quantity: 3,
                    notes: None,
                },
            ],
            labels: vec![],
            status: ContainerStatus::Partial,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
            updated_by: None,
        };

        assert_eq!(container.prop_count(), 5);
    }

    #[test]
    fn container_document_defaults_missing_fields() {
        let raw = r#"{
            "id": "c1",
            "name": "Hamper",
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:00:00Z"
        }"#;

        let container: PackingContainer = serde_json::from_str(raw).unwrap();
        assert_eq!(container.parent_id, None);
        assert!(container.props.is_empty());
        assert_eq!(container.status, ContainerStatus::Empty);
    }

    #[test]
    fn dimensions_clone_through_the_document() {
        let raw = r#"{
            "id": "c1",
            "name": "Hamper",
            "dimensions": {"width": 120.0, "height": 80.0, "depth": 60.0, "unit": "cm"},
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:00:00Z"
        }"#;

        let container: PackingContainer = serde_json::from_str(raw).unwrap();
        let copy = container.clone();
        assert_eq!(copy.dimensions, container.dimensions);

        let dimensions = container.dimensions.unwrap();
        assert_eq!(dimensions.unit, "cm");
        assert_eq!(dimensions.width, 120.0);
    }
}
