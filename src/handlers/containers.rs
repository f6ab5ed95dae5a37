use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::error::AppResult;
use crate::models::{
    AddPropRequest, CreateContainerRequest, MoveContainerRequest, PackingContainer,
    UpdateContainerRequest, UpdatePropRequest,
};

pub async fn create_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(pack_list_id): Path<String>,
    Json(req): Json<CreateContainerRequest>,
) -> AppResult<(StatusCode, Json<PackingContainer>)> {
    req.validate()
        .map_err(|e| crate::error::AppError::ValidationError(e.to_string()))?;

    let container = pack_list_service.add_container(&pack_list_id, req).await?;
    Ok((StatusCode::CREATED, Json(container)))
}

pub async fn get_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path((pack_list_id, container_id)): Path<(String, String)>,
) -> AppResult<Json<PackingContainer>> {
    let container = pack_list_service
        .get_container(&pack_list_id, &container_id)
        .await?;
    Ok(Json(container))
}

pub async fn update_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path((pack_list_id, container_id)): Path<(String, String)>,
    Json(req): Json<UpdateContainerRequest>,
) -> AppResult<Json<PackingContainer>> {
    req.validate()
        .map_err(|e| crate::error::AppError::ValidationError(e.to_string()))?;

    let container = pack_list_service
        .update_container(&pack_list_id, &container_id, req)
        .await?;
    Ok(Json(container))
}

pub async fn move_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path((pack_list_id, container_id)): Path<(String, String)>,
    Json(req): Json<MoveContainerRequest>,
) -> AppResult<Json<PackingContainer>> {
    let container = pack_list_service
        .move_container(&pack_list_id, &container_id, req)
        .await?;
    Ok(Json(container))
}

pub async fn delete_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path((pack_list_id, container_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    pack_list_service
        .remove_container(&pack_list_id, &container_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_prop_to_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path((pack_list_id, container_id)): Path<(String, String)>,
    Json(req): Json<AddPropRequest>,
) -> AppResult<Json<PackingContainer>> {
    req.validate()
        .map_err(|e| crate::error::AppError::ValidationError(e.to_string()))?;

    let container = pack_list_service
        .add_prop_to_container(&pack_list_id, &container_id, req)
        .await?;
    Ok(Json(container))
}

pub async fn update_prop_in_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path((pack_list_id, container_id, prop_id)): Path<(String, String, String)>,
    Json(req): Json<UpdatePropRequest>,
) -> AppResult<Json<PackingContainer>> {
    req.validate()
        .map_err(|e| crate::error::AppError::ValidationError(e.to_string()))?;

    let container = pack_list_service
        .update_prop_in_container(&pack_list_id, &container_id, &prop_id, req)
        .await?;
    Ok(Json(container))
}

pub async fn remove_prop_from_container(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path((pack_list_id, container_id, prop_id)): Path<(String, String, String)>,
) -> AppResult<Json<PackingContainer>> {
    let container = pack_list_service
        .remove_prop_from_container(&pack_list_id, &container_id, &prop_id)
        .await?;
    Ok(Json(container))
}
