use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::Prop;

#[derive(Deserialize)]
pub struct PropsQuery {
    pub show_id: Option<String>,
}

#[derive(Serialize)]
pub struct PropsResponse {
    pub props: Vec<Prop>,
    pub total: usize,
}

pub async fn list_props(
    State((_pack_list_service, inventory_service, _label_service)): State<crate::AppState>,
    Query(params): Query<PropsQuery>,
) -> AppResult<Json<PropsResponse>> {
    let props = inventory_service
        .list_props(params.show_id.as_deref())
        .await?;
    let total = props.len();
    Ok(Json(PropsResponse { props, total }))
}

pub async fn get_prop(
    State((_pack_list_service, inventory_service, _label_service)): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Prop>> {
    let prop = inventory_service.get_prop(&id).await?;
    Ok(Json(prop))
}
