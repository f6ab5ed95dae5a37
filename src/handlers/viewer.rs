use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::AppResult;
use crate::models::{ContainerStatus, Dimensions};
use crate::services::weight::{self, WeightSummary};

#[derive(Debug, Serialize)]
pub struct PackedPropView {
    pub prop_id: String,
    /// `None` when the prop has disappeared from the inventory.
    pub name: Option<String>,
    pub quantity: u32,
    pub notes: Option<String>,
}

/// What a QR label scan shows: enough to identify the container and check
/// its contents without access to the full pack list.
#[derive(Debug, Serialize)]
pub struct ContainerView {
    pub container_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub container_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: ContainerStatus,
    pub labels: Vec<String>,
    pub dimensions: Option<Dimensions>,
    pub pack_list_id: String,
    pub pack_list_name: String,
    pub show_id: String,
    pub props: Vec<PackedPropView>,
    pub total_weight: WeightSummary,
}

pub async fn view_container(
    State((pack_list_service, inventory_service, _label_service)): State<crate::AppState>,
    Path(container_id): Path<String>,
) -> AppResult<Json<ContainerView>> {
    let (pack_list, container) = pack_list_service.find_container(&container_id).await?;
    let catalog = inventory_service.props_by_id().await?;

    let total_weight = weight::container_weight(&container, &catalog);
    let props = container
        .props
        .iter()
        .map(|entry| PackedPropView {
            prop_id: entry.prop_id.clone(),
            name: catalog.get(&entry.prop_id).map(|p| p.name.clone()),
            quantity: entry.quantity,
            notes: entry.notes.clone(),
        })
        .collect();

    Ok(Json(ContainerView {
        container_id: container.id,
        name: container.name,
        container_type: container.container_type,
        description: container.description,
        location: container.location,
        status: container.status,
        labels: container.labels,
        dimensions: container.dimensions,
        pack_list_id: pack_list.id,
        pack_list_name: pack_list.name,
        show_id: pack_list.show_id,
        props,
        total_weight,
    }))
}
