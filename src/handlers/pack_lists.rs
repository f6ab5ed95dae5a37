use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::models::{
    CreatePackListRequest, PackList, PackListStatus, ReplaceContainersRequest, ShipRequest,
    TransitionRequest, UpdatePackListRequest, UpdateShippingRequest,
};
use crate::services::ContainerTree;

#[derive(Deserialize)]
pub struct PackListsQuery {
    pub show_id: Option<String>,
    pub status: Option<PackListStatus>,
}

#[derive(Serialize)]
pub struct PackListsResponse {
    pub pack_lists: Vec<PackList>,
    pub total: usize,
}

pub async fn list_pack_lists(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Query(params): Query<PackListsQuery>,
) -> AppResult<Json<PackListsResponse>> {
    let pack_lists = pack_list_service
        .list_pack_lists(params.show_id.as_deref(), params.status)
        .await?;
    let total = pack_lists.len();
    Ok(Json(PackListsResponse { pack_lists, total }))
}

pub async fn create_pack_list(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Json(req): Json<CreatePackListRequest>,
) -> AppResult<(StatusCode, Json<PackList>)> {
    req.validate()
        .map_err(|e| crate::error::AppError::ValidationError(e.to_string()))?;

    let pack_list = pack_list_service.create_pack_list(req).await?;
    Ok((StatusCode::CREATED, Json(pack_list)))
}

pub async fn get_pack_list(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PackList>> {
    let pack_list = pack_list_service.get_pack_list(&id).await?;
    Ok(Json(pack_list))
}

pub async fn update_pack_list(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePackListRequest>,
) -> AppResult<Json<PackList>> {
    req.validate()
        .map_err(|e| crate::error::AppError::ValidationError(e.to_string()))?;

    let pack_list = pack_list_service.update_pack_list(&id, req).await?;
    Ok(Json(pack_list))
}

pub async fn delete_pack_list(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    pack_list_service.delete_pack_list(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_pack_list_tree(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ContainerTree>> {
    let tree = pack_list_service.container_tree(&id).await?;
    Ok(Json(tree))
}

pub async fn replace_containers(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReplaceContainersRequest>,
) -> AppResult<Json<PackList>> {
    let pack_list = pack_list_service.replace_containers(&id, req).await?;
    Ok(Json(pack_list))
}

pub async fn update_shipping(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateShippingRequest>,
) -> AppResult<Json<PackList>> {
    req.validate()
        .map_err(|e| crate::error::AppError::ValidationError(e.to_string()))?;

    let pack_list = pack_list_service.update_shipping(&id, req).await?;
    Ok(Json(pack_list))
}

pub async fn dispatch_shipment(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionRequest>>,
) -> AppResult<Json<PackList>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let pack_list = pack_list_service.dispatch_shipment(&id, req).await?;
    Ok(Json(pack_list))
}

pub async fn ship_shipment(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
    body: Option<Json<ShipRequest>>,
) -> AppResult<Json<PackList>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let pack_list = pack_list_service.ship_shipment(&id, req).await?;
    Ok(Json(pack_list))
}

pub async fn arrive_shipment(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionRequest>>,
) -> AppResult<Json<PackList>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let pack_list = pack_list_service.arrive_shipment(&id, req).await?;
    Ok(Json(pack_list))
}

pub async fn report_shipment_lost(
    State((pack_list_service, _inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
    body: Option<Json<TransitionRequest>>,
) -> AppResult<Json<PackList>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let pack_list = pack_list_service.report_shipment_lost(&id, req).await?;
    Ok(Json(pack_list))
}
