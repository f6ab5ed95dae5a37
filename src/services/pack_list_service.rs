use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::Row;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::DatabasePool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AddPropRequest, ContainerStatus, CreateContainerRequest, CreatePackListRequest,
    MoveContainerRequest, PackList, PackListStatus, PackedProp, PackingContainer,
    ReplaceContainersRequest, ShipRequest, ShipmentState, ShippingInfo, TransitionError,
    TransitionRequest, UpdateContainerRequest, UpdatePackListRequest, UpdatePropRequest,
    UpdateShippingRequest,
};
use crate::services::container_tree::{self, ContainerTree};
use crate::services::inventory_service::InventoryService;
use crate::services::weight;

/// Pack lists are stored as whole JSON documents, one row per list, with the
/// filterable columns mirrored out of the document. Every mutation is a
/// read-modify-write of the full document guarded by a per-list lock and a
/// version check on the row.
pub struct PackListService {
    db: DatabasePool,
    inventory: InventoryService,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

fn ensure_mutable(pack_list: &PackList) -> AppResult<()> {
    if pack_list.is_mutable() {
        Ok(())
    } else {
        let state = pack_list
            .shipping
            .as_ref()
            .map(|s| s.state.label())
            .unwrap_or("unknown");
        Err(AppError::ReadOnly(format!(
            "Pack list {} is {} and can no longer be modified",
            pack_list.id, state
        )))
    }
}

fn container_not_found(container_id: &str, pack_list_id: &str) -> AppError {
    AppError::NotFound(format!(
        "Container {} not found in pack list {}",
        container_id, pack_list_id
    ))
}

impl PackListService {
    pub fn new(db: DatabasePool) -> Self {
        let inventory = InventoryService::new(db.clone());
        Self {
            db,
            inventory,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_pack_list(&self, req: CreatePackListRequest) -> AppResult<PackList> {
        let now = Utc::now();
        let pack_list = PackList {
            id: Uuid::new_v4().to_string(),
            show_id: req.show_id,
            name: req.name,
            status: PackListStatus::Draft,
            containers: Vec::new(),
            shipping: None,
            version: 1,
            created_at: now,
            updated_at: now,
            created_by: req.actor.clone(),
            updated_by: req.actor,
        };
        self.insert_document(&pack_list).await?;
        Ok(pack_list)
    }

    pub async fn list_pack_lists(
        &self,
        show_id: Option<&str>,
        status: Option<PackListStatus>,
    ) -> AppResult<Vec<PackList>> {
        let status = status.map(|s| s.as_str());
        let rows: Vec<(String, i64)> = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as(
                    "SELECT document, version FROM pack_lists \
                     WHERE ($1::text IS NULL OR show_id = $1) AND ($2::text IS NULL OR status = $2) \
                     ORDER BY updated_at DESC",
                )
                .bind(show_id)
                .bind(status)
                .fetch_all(pool)
                .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as(
                    "SELECT document, version FROM pack_lists \
                     WHERE (?1 IS NULL OR show_id = ?1) AND (?2 IS NULL OR status = ?2) \
                     ORDER BY updated_at DESC",
                )
                .bind(show_id)
                .bind(status)
                .fetch_all(pool)
                .await?
            }
        };
        rows.into_iter()
            .map(|(document, version)| self.parse_document(&document, version))
            .collect()
    }

    pub async fn get_pack_list(&self, id: &str) -> AppResult<PackList> {
        self.load_document(id).await
    }

    pub async fn update_pack_list(
        &self,
        id: &str,
        req: UpdatePackListRequest,
    ) -> AppResult<PackList> {
        self.mutate(id, move |pack_list| {
            ensure_mutable(pack_list)?;
            if let Some(name) = req.name {
                pack_list.name = name;
            }
            if let Some(status) = req.status {
                pack_list.status = status;
            }
            if req.actor.is_some() {
                pack_list.updated_by = req.actor;
            }
            Ok(())
        })
        .await
    }

    /// Removing a pack list is a lifecycle operation, so it works even after
    /// shipping has frozen the contents.
    pub async fn delete_pack_list(&self, id: &str) -> AppResult<()> {
        let lock = self.document_lock(id).await;
        let _guard = lock.lock().await;

        let rows_affected = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query("DELETE FROM pack_lists WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await?
                    .rows_affected()
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query("DELETE FROM pack_lists WHERE id = ?1")
                    .bind(id)
                    .execute(pool)
                    .await?
                    .rows_affected()
            }
        };
        if rows_affected == 0 {
            self.discard_lock_if_unused(id, &lock).await;
            return Err(AppError::NotFound(format!("Pack list {} not found", id)));
        }

        let mut locks = self.write_locks.lock().await;
        locks.remove(id);
        Ok(())
    }

    /// Whole-document save of the containers array, as tree editors do it.
    /// The caller's `version` must still match the stored row; a stale write
    /// is rejected with a conflict instead of silently clobbering.
    pub async fn replace_containers(
        &self,
        id: &str,
        req: ReplaceContainersRequest,
    ) -> AppResult<PackList> {
        let mut seen = HashSet::new();
        for container in &req.containers {
            if !seen.insert(container.id.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "Duplicate container id {}",
                    container.id
                )));
            }
        }
        // The submitted array must satisfy the same acyclicity the move
        // operation enforces.
        container_tree::validate_forest(&req.containers)?;

        let lock = self.document_lock(id).await;
        let _guard = lock.lock().await;

        let mut pack_list = match self.load_document(id).await {
            Ok(pack_list) => pack_list,
            Err(err) => {
                self.discard_lock_if_unused(id, &lock).await;
                return Err(err);
            }
        };
        ensure_mutable(&pack_list)?;

        pack_list.containers = req.containers;
        if req.actor.is_some() {
            pack_list.updated_by = req.actor;
        }
        pack_list.version = req.version + 1;
        pack_list.updated_at = Utc::now();
        self.save_document(&pack_list, req.version).await?;
        Ok(pack_list)
    }

    pub async fn container_tree(&self, id: &str) -> AppResult<ContainerTree> {
        let pack_list = self.load_document(id).await?;
        let props = self.inventory.props_by_id().await?;
        Ok(ContainerTree::build(&pack_list.containers, &props))
    }

    /// Looks a container up across all pack lists, for the public label
    /// viewer where only the container id is known.
    pub async fn find_container(
        &self,
        container_id: &str,
    ) -> AppResult<(PackList, PackingContainer)> {
        // The LIKE clause only narrows the scan. Ids carrying LIKE
        // metacharacters (or a backslash, which the document stores
        // JSON-escaped) check every row instead; the exact match below
        // decides either way.
        let pattern = if container_id.contains(['%', '_', '\\']) {
            "%".to_string()
        } else {
            format!("%{}%", container_id)
        };
        let rows: Vec<(String, i64)> = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as("SELECT document, version FROM pack_lists WHERE document LIKE $1")
                    .bind(&pattern)
                    .fetch_all(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as("SELECT document, version FROM pack_lists WHERE document LIKE ?1")
                    .bind(&pattern)
                    .fetch_all(pool)
                    .await?
            }
        };
        for (document, version) in rows {
            let pack_list = self.parse_document(&document, version)?;
            if let Some(container) = pack_list.container(container_id).cloned() {
                return Ok((pack_list, container));
            }
        }
        Err(AppError::NotFound(format!(
            "Container {} not found",
            container_id
        )))
    }

    pub async fn add_container(
        &self,
        pack_list_id: &str,
        req: CreateContainerRequest,
    ) -> AppResult<PackingContainer> {
        let CreateContainerRequest {
            name,
            parent_id,
            container_type,
            description,
            location,
            dimensions,
            max_weight,
            labels,
            actor,
        } = req;

        let lock = self.document_lock(pack_list_id).await;
        let _guard = lock.lock().await;

        let mut pack_list = match self.load_document(pack_list_id).await {
            Ok(pack_list) => pack_list,
            Err(err) => {
                self.discard_lock_if_unused(pack_list_id, &lock).await;
                return Err(err);
            }
        };
        ensure_mutable(&pack_list)?;
        if let Some(parent_id) = parent_id.as_deref() {
            if pack_list.container(parent_id).is_none() {
                return Err(AppError::NotFound(format!(
                    "Parent container {} not found",
                    parent_id
                )));
            }
        }

        // The code counter only advances for adds that passed validation.
        let name = match name {
            Some(name) => name,
            None => self.next_reference_code().await?,
        };
        let now = Utc::now();
        let container = PackingContainer {
            id: Uuid::new_v4().to_string(),
            parent_id,
            name,
            container_type,
            description,
            location,
            dimensions,
            max_weight,
            props: Vec::new(),
            labels: labels.unwrap_or_default(),
            status: ContainerStatus::Empty,
            created_at: now,
            updated_at: now,
            created_by: actor.clone(),
            updated_by: actor,
        };
        let created = container.clone();

        let expected_version = pack_list.version;
        pack_list.containers.push(container);
        pack_list.version = expected_version + 1;
        pack_list.updated_at = Utc::now();
        self.save_document(&pack_list, expected_version).await?;
        Ok(created)
    }

    pub async fn get_container(
        &self,
        pack_list_id: &str,
        container_id: &str,
    ) -> AppResult<PackingContainer> {
        let pack_list = self.load_document(pack_list_id).await?;
        pack_list
            .container(container_id)
            .cloned()
            .ok_or_else(|| container_not_found(container_id, pack_list_id))
    }

    pub async fn update_container(
        &self,
        pack_list_id: &str,
        container_id: &str,
        req: UpdateContainerRequest,
    ) -> AppResult<PackingContainer> {
        let updated = self
            .mutate(pack_list_id, move |pack_list| {
                ensure_mutable(pack_list)?;
                let Some(container) = pack_list.container_mut(container_id) else {
                    return Err(container_not_found(container_id, pack_list_id));
                };
                if let Some(name) = req.name {
                    container.name = name;
                }
                if let Some(container_type) = req.container_type {
                    container.container_type = Some(container_type);
                }
                if let Some(description) = req.description {
                    container.description = Some(description);
                }
                if let Some(location) = req.location {
                    container.location = Some(location);
                }
                if let Some(dimensions) = req.dimensions {
                    container.dimensions = Some(dimensions);
                }
                if let Some(max_weight) = req.max_weight {
                    container.max_weight = Some(max_weight);
                }
                if let Some(labels) = req.labels {
                    container.labels = labels;
                }
                if let Some(status) = req.status {
                    container.status = status;
                }
                container.updated_at = Utc::now();
                if req.actor.is_some() {
                    container.updated_by = req.actor;
                }
                Ok(())
            })
            .await?;
        updated
            .container(container_id)
            .cloned()
            .ok_or_else(|| container_not_found(container_id, pack_list_id))
    }

    pub async fn move_container(
        &self,
        pack_list_id: &str,
        container_id: &str,
        req: MoveContainerRequest,
    ) -> AppResult<PackingContainer> {
        let updated = self
            .mutate(pack_list_id, move |pack_list| {
                ensure_mutable(pack_list)?;
                container_tree::validate_reparent(
                    &pack_list.containers,
                    container_id,
                    req.parent_id.as_deref(),
                )?;
                let Some(container) = pack_list.container_mut(container_id) else {
                    return Err(container_not_found(container_id, pack_list_id));
                };
                container.parent_id = req.parent_id;
                container.updated_at = Utc::now();
                if req.actor.is_some() {
                    container.updated_by = req.actor;
                }
                Ok(())
            })
            .await?;
        updated
            .container(container_id)
            .cloned()
            .ok_or_else(|| container_not_found(container_id, pack_list_id))
    }

    pub async fn remove_container(
        &self,
        pack_list_id: &str,
        container_id: &str,
    ) -> AppResult<()> {
        self.mutate(pack_list_id, move |pack_list| {
            ensure_mutable(pack_list)?;
            if pack_list.container(container_id).is_none() {
                return Err(container_not_found(container_id, pack_list_id));
            }
            let child_count = pack_list.child_count(container_id);
            if child_count > 0 {
                return Err(AppError::HasChildren(format!(
                    "Container {} still holds {} nested containers; move or remove them first",
                    container_id, child_count
                )));
            }
            pack_list.containers.retain(|c| c.id != container_id);
            Ok(())
        })
        .await?;
        Ok(())
    }

    pub async fn add_prop_to_container(
        &self,
        pack_list_id: &str,
        container_id: &str,
        req: AddPropRequest,
    ) -> AppResult<PackingContainer> {
        let catalog = self.inventory.props_by_id().await?;
        let props = &catalog;
        let updated = self
            .mutate(pack_list_id, move |pack_list| {
                ensure_mutable(pack_list)?;
                let Some(container) = pack_list.container_mut(container_id) else {
                    return Err(container_not_found(container_id, pack_list_id));
                };
                let added = req.quantity.unwrap_or(1);
                match container.props.iter().position(|e| e.prop_id == req.prop_id) {
                    Some(index) => {
                        let new_quantity = container.props[index]
                            .quantity
                            .checked_add(added)
                            .ok_or_else(|| {
                                AppError::BadRequest(format!(
                                    "Quantity for prop {} exceeds the supported range",
                                    req.prop_id
                                ))
                            })?;
                        weight::check_capacity(container, props, &req.prop_id, new_quantity)?;
                        let entry = &mut container.props[index];
                        entry.quantity = new_quantity;
                        if req.notes.is_some() {
                            entry.notes = req.notes;
                        }
                    }
                    None => {
                        weight::check_capacity(container, props, &req.prop_id, added)?;
                        container.props.push(PackedProp {
                            prop_id: req.prop_id,
                            quantity: added,
                            notes: req.notes,
                        });
                    }
                }
                container.updated_at = Utc::now();
                if req.actor.is_some() {
                    container.updated_by = req.actor;
                }
                Ok(())
            })
            .await?;
        updated
            .container(container_id)
            .cloned()
            .ok_or_else(|| container_not_found(container_id, pack_list_id))
    }

    pub async fn update_prop_in_container(
        &self,
        pack_list_id: &str,
        container_id: &str,
        prop_id: &str,
        req: UpdatePropRequest,
    ) -> AppResult<PackingContainer> {
        let catalog = self.inventory.props_by_id().await?;
        let props = &catalog;
        let updated = self
            .mutate(pack_list_id, move |pack_list| {
                ensure_mutable(pack_list)?;
                let Some(container) = pack_list.container_mut(container_id) else {
                    return Err(container_not_found(container_id, pack_list_id));
                };
                let Some(index) = container.props.iter().position(|e| e.prop_id == prop_id)
                else {
                    return Err(AppError::NotFound(format!(
                        "Prop {} is not packed in container {}",
                        prop_id, container_id
                    )));
                };
                if let Some(quantity) = req.quantity {
                    weight::check_capacity(container, props, prop_id, quantity)?;
                    container.props[index].quantity = quantity;
                }
                if req.notes.is_some() {
                    container.props[index].notes = req.notes;
                }
                container.updated_at = Utc::now();
                if req.actor.is_some() {
                    container.updated_by = req.actor;
                }
                Ok(())
            })
            .await?;
        updated
            .container(container_id)
            .cloned()
            .ok_or_else(|| container_not_found(container_id, pack_list_id))
    }

    pub async fn remove_prop_from_container(
        &self,
        pack_list_id: &str,
        container_id: &str,
        prop_id: &str,
    ) -> AppResult<PackingContainer> {
        let updated = self
            .mutate(pack_list_id, move |pack_list| {
                ensure_mutable(pack_list)?;
                let Some(container) = pack_list.container_mut(container_id) else {
                    return Err(container_not_found(container_id, pack_list_id));
                };
                let before = container.props.len();
                container.props.retain(|e| e.prop_id != prop_id);
                if container.props.len() == before {
                    return Err(AppError::NotFound(format!(
                        "Prop {} is not packed in container {}",
                        prop_id, container_id
                    )));
                }
                container.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        updated
            .container(container_id)
            .cloned()
            .ok_or_else(|| container_not_found(container_id, pack_list_id))
    }

    pub async fn update_shipping(
        &self,
        id: &str,
        req: UpdateShippingRequest,
    ) -> AppResult<PackList> {
        self.mutate(id, move |pack_list| {
            ensure_mutable(pack_list)?;
            let state = pack_list
                .shipping
                .as_ref()
                .map(|s| s.state)
                .unwrap_or(ShipmentState::Pending);
            pack_list.shipping = Some(ShippingInfo {
                method: req.method,
                origin_address: req.origin_address,
                destination_address: req.destination_address,
                expected_delivery: req.expected_delivery,
                courier_name: req.courier_name,
                tracking_number: req.tracking_number,
                state,
            });
            if req.actor.is_some() {
                pack_list.updated_by = req.actor;
            }
            Ok(())
        })
        .await
    }

    pub async fn dispatch_shipment(
        &self,
        id: &str,
        req: TransitionRequest,
    ) -> AppResult<PackList> {
        self.transition_shipment(id, req.actor, |state, at| state.dispatch(at))
            .await
    }

    pub async fn ship_shipment(&self, id: &str, req: ShipRequest) -> AppResult<PackList> {
        self.mutate(id, move |pack_list| {
            let Some(shipping) = pack_list.shipping.as_mut() else {
                return Err(AppError::InvalidOperation(format!(
                    "Pack list {} has no shipping details configured",
                    pack_list.id
                )));
            };
            // Courier details usually land at the moment of handoff.
            if req.courier_name.is_some() {
                shipping.courier_name = req.courier_name;
            }
            if req.tracking_number.is_some() {
                shipping.tracking_number = req.tracking_number;
            }
            shipping.state = shipping.state.ship(Utc::now())?;
            if req.actor.is_some() {
                pack_list.updated_by = req.actor;
            }
            Ok(())
        })
        .await
    }

    pub async fn arrive_shipment(&self, id: &str, req: TransitionRequest) -> AppResult<PackList> {
        self.transition_shipment(id, req.actor, |state, at| state.arrive(at))
            .await
    }

    pub async fn report_shipment_lost(
        &self,
        id: &str,
        req: TransitionRequest,
    ) -> AppResult<PackList> {
        self.transition_shipment(id, req.actor, |state, at| state.mark_lost(at))
            .await
    }

    // Shipment transitions carry their own state checks, so they stay open
    // while content mutations are already frozen.
    async fn transition_shipment<F>(
        &self,
        id: &str,
        actor: Option<String>,
        apply: F,
    ) -> AppResult<PackList>
    where
        F: FnOnce(&ShipmentState, DateTime<Utc>) -> Result<ShipmentState, TransitionError>,
    {
        self.mutate(id, move |pack_list| {
            let Some(shipping) = pack_list.shipping.as_mut() else {
                return Err(AppError::InvalidOperation(format!(
                    "Pack list {} has no shipping details configured",
                    pack_list.id
                )));
            };
            shipping.state = apply(&shipping.state, Utc::now())?;
            if actor.is_some() {
                pack_list.updated_by = actor;
            }
            Ok(())
        })
        .await
    }

    /// Loads, applies the closure, bumps the version and writes back. The
    /// per-list lock serializes writers in this process; the version check in
    /// the UPDATE catches anything else touching the row.
    async fn mutate<F>(&self, id: &str, op: F) -> AppResult<PackList>
    where
        F: FnOnce(&mut PackList) -> AppResult<()>,
    {
        let lock = self.document_lock(id).await;
        let _guard = lock.lock().await;

        let mut pack_list = match self.load_document(id).await {
            Ok(pack_list) => pack_list,
            Err(err) => {
                self.discard_lock_if_unused(id, &lock).await;
                return Err(err);
            }
        };
        let expected_version = pack_list.version;
        op(&mut pack_list)?;
        pack_list.version = expected_version + 1;
        pack_list.updated_at = Utc::now();
        self.save_document(&pack_list, expected_version).await?;
        Ok(pack_list)
    }

    async fn document_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the registry entry for an id whose document turned out not to
    /// exist, so lookups of arbitrary ids cannot grow the registry without
    /// bound. Entries another writer still waits on are left alone.
    async fn discard_lock_if_unused(&self, id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.write_locks.lock().await;
        // Two strong references mean the map entry plus this caller; any
        // waiter would hold a third.
        if Arc::strong_count(lock) == 2 {
            locks.remove(id);
        }
    }

    fn parse_document(&self, document: &str, version: i64) -> AppResult<PackList> {
        let mut pack_list: PackList = serde_json::from_str(document)?;
        // The row's version column is authoritative.
        pack_list.version = version;
        Ok(pack_list)
    }

    async fn insert_document(&self, pack_list: &PackList) -> AppResult<()> {
        let document = serde_json::to_string(pack_list)?;
        match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO pack_lists (id, show_id, name, status, document, version, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(&pack_list.id)
                .bind(&pack_list.show_id)
                .bind(&pack_list.name)
                .bind(pack_list.status.as_str())
                .bind(&document)
                .bind(pack_list.version)
                .bind(pack_list.created_at)
                .bind(pack_list.updated_at)
                .execute(pool)
                .await?;
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query(
                    "INSERT INTO pack_lists (id, show_id, name, status, document, version, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .bind(&pack_list.id)
                .bind(&pack_list.show_id)
                .bind(&pack_list.name)
                .bind(pack_list.status.as_str())
                .bind(&document)
                .bind(pack_list.version)
                .bind(pack_list.created_at)
                .bind(pack_list.updated_at)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn load_document(&self, id: &str) -> AppResult<PackList> {
        let row: Option<(String, i64)> = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as("SELECT document, version FROM pack_lists WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as("SELECT document, version FROM pack_lists WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?
            }
        };
        match row {
            Some((document, version)) => self.parse_document(&document, version),
            None => Err(AppError::NotFound(format!("Pack list {} not found", id))),
        }
    }

    async fn save_document(&self, pack_list: &PackList, expected_version: i64) -> AppResult<()> {
        let document = serde_json::to_string(pack_list)?;
        let rows_affected = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query(
                    "UPDATE pack_lists SET show_id = $1, name = $2, status = $3, document = $4, version = $5, updated_at = $6 \
                     WHERE id = $7 AND version = $8",
                )
                .bind(&pack_list.show_id)
                .bind(&pack_list.name)
                .bind(pack_list.status.as_str())
                .bind(&document)
                .bind(pack_list.version)
                .bind(pack_list.updated_at)
                .bind(&pack_list.id)
                .bind(expected_version)
                .execute(pool)
                .await?
                .rows_affected()
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query(
                    "UPDATE pack_lists SET show_id = ?1, name = ?2, status = ?3, document = ?4, version = ?5, updated_at = ?6 \
                     WHERE id = ?7 AND version = ?8",
                )
                .bind(&pack_list.show_id)
                .bind(&pack_list.name)
                .bind(pack_list.status.as_str())
                .bind(&document)
                .bind(pack_list.version)
                .bind(pack_list.updated_at)
                .bind(&pack_list.id)
                .bind(expected_version)
                .execute(pool)
                .await?
                .rows_affected()
            }
        };
        if rows_affected == 0 {
            return self.cas_failure(&pack_list.id, expected_version).await;
        }
        Ok(())
    }

    async fn cas_failure(&self, id: &str, expected_version: i64) -> AppResult<()> {
        let stored_version: Option<i64> = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query_scalar("SELECT version FROM pack_lists WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_scalar("SELECT version FROM pack_lists WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?
            }
        };
        match stored_version {
            None => Err(AppError::NotFound(format!("Pack list {} not found", id))),
            Some(found) => Err(AppError::Conflict(format!(
                "Pack list {} was modified concurrently (expected version {}, found {})",
                id, expected_version, found
            ))),
        }
    }

    async fn next_reference_code(&self) -> AppResult<String> {
        match &self.db {
            DatabasePool::Postgres(pool) => {
                let mut tx = pool.begin().await?;

                let counter_row =
                    sqlx::query("SELECT current_value FROM container_code_counter WHERE id = 1")
                        .fetch_one(&mut *tx)
                        .await?;
                let current_value: i64 = counter_row.get("current_value");

                // Codes run 0001..ZZZZ in base-36.
                if current_value + 1 > 1679615 {
                    return Err(AppError::BadRequest(
                        "No container reference codes left".to_string(),
                    ));
                }
                let next = current_value + 1;
                let code = format!(
                    "{:0>4}",
                    radix_fmt::radix_36(next as u32).to_string().to_uppercase()
                );

                sqlx::query("UPDATE container_code_counter SET current_value = $1 WHERE id = 1")
                    .bind(next)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(code)
            }
            DatabasePool::Sqlite(pool) => {
                let mut tx = pool.begin().await?;

                let counter_row =
                    sqlx::query("SELECT current_value FROM container_code_counter WHERE id = 1")
                        .fetch_one(&mut *tx)
                        .await?;
                let current_value: i64 = counter_row.get("current_value");

                // Codes run 0001..ZZZZ in base-36.
                if current_value + 1 > 1679615 {
                    return Err(AppError::BadRequest(
                        "No container reference codes left".to_string(),
                    ));
                }
                let next = current_value + 1;
                let code = format!(
                    "{:0>4}",
                    radix_fmt::radix_36(next as u32).to_string().to_uppercase()
                );

                sqlx::query("UPDATE container_code_counter SET current_value = ? WHERE id = 1")
                    .bind(next)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(code)
            }
        }
    }
}
