use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::AppResult;
use crate::models::PackingLabel;

#[derive(Debug, Serialize)]
pub struct GenerateLabelsResponse {
    pub pack_list_id: String,
    pub labels: Vec<PackingLabel>,
}

pub async fn generate_labels(
    State((pack_list_service, _inventory_service, label_service)): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<GenerateLabelsResponse>> {
    let pack_list = pack_list_service.get_pack_list(&id).await?;
    let labels = label_service.generate_labels(&pack_list).await?;
    Ok(Json(GenerateLabelsResponse {
        pack_list_id: pack_list.id,
        labels,
    }))
}
