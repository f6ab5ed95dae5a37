//! Label generation against a stubbed QR service, plus the public container
//! viewer lookup and the prop inventory, on in-memory SQLite.

use std::sync::Arc;

use async_trait::async_trait;
use stagepack_server::db::DatabasePool;
use stagepack_server::error::AppError;
use stagepack_server::models::{
    AddPropRequest, CreateContainerRequest, CreatePackListRequest, PackList,
    ReplaceContainersRequest,
};
use stagepack_server::services::{
    weight, InventoryService, LabelService, PackListService, QrCodeGenerator, QrCodeRequest,
    QrError,
};
use tokio_test::assert_ok;

/// Helper: spin up an in-memory database and run migrations.
async fn setup() -> DatabasePool {
    let db = DatabasePool::connect("sqlite://:memory:")
        .await
        .expect("in-memory sqlite should connect");
    assert_ok!(db.migrate().await);
    db
}

async fn seed_prop(
    db: &DatabasePool,
    id: &str,
    name: &str,
    show_id: &str,
    weight: Option<(f64, &str)>,
) {
    let DatabasePool::Sqlite(pool) = db else {
        panic!("tests run on sqlite");
    };
    let (weight_value, weight_unit) = match weight {
        Some((value, unit)) => (Some(value), Some(unit.to_string())),
        None => (None, None),
    };
    sqlx::query(
        "INSERT INTO props (id, name, show_id, weight_value, weight_unit) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(name)
    .bind(show_id)
    .bind(weight_value)
    .bind(weight_unit)
    .execute(pool)
    .await
    .expect("prop insert should succeed");
}

async fn create_list(service: &PackListService, name: &str) -> PackList {
    service
        .create_pack_list(CreatePackListRequest {
            name: name.to_string(),
            show_id: "show-1".to_string(),
            actor: None,
        })
        .await
        .expect("pack list create should succeed")
}

fn container_request(name: &str, parent_id: Option<&str>) -> CreateContainerRequest {
    CreateContainerRequest {
        name: Some(name.to_string()),
        parent_id: parent_id.map(str::to_string),
        container_type: None,
        description: None,
        location: None,
        dimensions: None,
        max_weight: None,
        labels: None,
        actor: None,
    }
}

fn add_prop(prop_id: &str, quantity: u32) -> AddPropRequest {
    AddPropRequest {
        prop_id: prop_id.to_string(),
        quantity: Some(quantity),
        notes: None,
        actor: None,
    }
}

struct StubQr;

#[async_trait]
impl QrCodeGenerator for StubQr {
    async fn generate(&self, request: &QrCodeRequest) -> Result<String, QrError> {
        Ok(format!("data:image/png;base64,{}", request.id))
    }
}

struct FailingQr {
    fail_for: String,
}

#[async_trait]
impl QrCodeGenerator for FailingQr {
    async fn generate(&self, request: &QrCodeRequest) -> Result<String, QrError> {
        if request.id == self.fail_for {
            Err(QrError::MalformedResponse)
        } else {
            Ok(format!("data:image/png;base64,{}", request.id))
        }
    }
}

// -----------------------------------------------------------------------
// Labels
// -----------------------------------------------------------------------

#[tokio::test]
async fn labels_cover_every_container() {
    let db = setup().await;
    let service = PackListService::new(db);
    let labels = LabelService::new(
        Arc::new(StubQr),
        "https://app.stagepack.example".to_string(),
    );

    let pack_list = create_list(&service, "Labels").await;
    let truck = service
        .add_container(&pack_list.id, container_request("Truck", None))
        .await
        .unwrap();
    let case = service
        .add_container(&pack_list.id, container_request("Case", Some(&truck.id)))
        .await
        .unwrap();
    service
        .add_prop_to_container(&pack_list.id, &case.id, add_prop("lamp", 2))
        .await
        .unwrap();
    service
        .add_prop_to_container(&pack_list.id, &case.id, add_prop("gel", 3))
        .await
        .unwrap();

    let fetched = service.get_pack_list(&pack_list.id).await.unwrap();
    let batch = labels.generate_labels(&fetched).await.unwrap();

    assert_eq!(batch.len(), 2);
    let case_label = batch
        .iter()
        .find(|l| l.container_id == case.id)
        .expect("nested container gets a label too");
    assert_eq!(case_label.container_name, "Case");
    assert_eq!(case_label.prop_count, 5);
    assert_eq!(case_label.pack_list_id, pack_list.id);
    // The app subdomain is stripped so scans open the public viewer.
    assert_eq!(
        case_label.url,
        format!("https://stagepack.example/c/{}", case.id)
    );
    assert!(case_label.qr_code.contains(&case.id));

    let truck_label = batch.iter().find(|l| l.container_id == truck.id).unwrap();
    assert_eq!(truck_label.prop_count, 0);
}

#[tokio::test]
async fn empty_pack_list_yields_no_labels() {
    let db = setup().await;
    let service = PackListService::new(db);
    let labels = LabelService::new(Arc::new(StubQr), "http://127.0.0.1:8080".to_string());

    let pack_list = create_list(&service, "Empty").await;
    let batch = labels.generate_labels(&pack_list).await.unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn one_failed_qr_fails_the_whole_batch() {
    let db = setup().await;
    let service = PackListService::new(db);

    let pack_list = create_list(&service, "Partial").await;
    let truck = service
        .add_container(&pack_list.id, container_request("Truck", None))
        .await
        .unwrap();
    let case = service
        .add_container(&pack_list.id, container_request("Case", None))
        .await
        .unwrap();

    let labels = LabelService::new(
        Arc::new(FailingQr {
            fail_for: case.id.clone(),
        }),
        "https://stagepack.example".to_string(),
    );

    let fetched = service.get_pack_list(&pack_list.id).await.unwrap();
    let err = labels.generate_labels(&fetched).await.unwrap_err();
    let AppError::UpstreamFailure(message) = err else {
        panic!("expected upstream failure, got {:?}", err);
    };
    assert!(message.contains(&case.id));
    assert!(!message.contains(&truck.id));
}

// -----------------------------------------------------------------------
// Public viewer
// -----------------------------------------------------------------------

#[tokio::test]
async fn viewer_resolves_container_across_pack_lists() {
    let db = setup().await;
    seed_prop(&db, "lamp", "Fresnel lamp", "show-1", Some((2.0, "kg"))).await;
    let service = PackListService::new(db.clone());
    let inventory = InventoryService::new(db);

    let first = create_list(&service, "First").await;
    service
        .add_container(&first.id, container_request("Decoy", None))
        .await
        .unwrap();

    let second = create_list(&service, "Second").await;
    let case = service
        .add_container(&second.id, container_request("Case", None))
        .await
        .unwrap();
    service
        .add_prop_to_container(&second.id, &case.id, add_prop("lamp", 2))
        .await
        .unwrap();

    let (owner, container) = service.find_container(&case.id).await.unwrap();
    assert_eq!(owner.id, second.id);
    assert_eq!(owner.name, "Second");
    assert_eq!(container.name, "Case");

    // The viewer resolves names and weights through the inventory catalog.
    let catalog = inventory.props_by_id().await.unwrap();
    let summary = weight::container_weight(&container, &catalog);
    assert!((summary.total_weight - 4.0).abs() < 1e-9);
    assert_eq!(
        catalog.get("lamp").map(|p| p.name.as_str()),
        Some("Fresnel lamp")
    );
}

#[tokio::test]
async fn viewer_unknown_container_is_not_found() {
    let db = setup().await;
    let service = PackListService::new(db);

    create_list(&service, "Only list").await;
    let err = service.find_container("no-such-container").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn viewer_resolves_ids_containing_like_wildcards() {
    let db = setup().await;
    let service = PackListService::new(db);

    let pack_list = create_list(&service, "Wildcards").await;
    service
        .add_container(&pack_list.id, container_request("Case", None))
        .await
        .unwrap();

    // Tree editors can save externally assigned ids through the bulk write.
    let fetched = service.get_pack_list(&pack_list.id).await.unwrap();
    let mut containers = fetched.containers.clone();
    containers[0].id = "crate_7%".to_string();
    service
        .replace_containers(
            &pack_list.id,
            ReplaceContainersRequest {
                containers,
                version: fetched.version,
                actor: None,
            },
        )
        .await
        .unwrap();

    let (owner, container) = service.find_container("crate_7%").await.unwrap();
    assert_eq!(owner.id, pack_list.id);
    assert_eq!(container.name, "Case");
}

// -----------------------------------------------------------------------
// Prop inventory
// -----------------------------------------------------------------------

#[tokio::test]
async fn inventory_parses_weights_and_filters_by_show() {
    let db = setup().await;
    seed_prop(&db, "lamp", "Fresnel lamp", "show-1", Some((2.0, "lb"))).await;
    seed_prop(&db, "odd", "Odd unit prop", "show-1", Some((3.0, "st"))).await;
    seed_prop(&db, "chair", "Bentwood chair", "show-2", Some((4.0, "kg"))).await;
    let inventory = InventoryService::new(db);

    let all = inventory.list_props(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let show_one = inventory.list_props(Some("show-1")).await.unwrap();
    assert_eq!(show_one.len(), 2);

    let lamp = inventory.get_prop("lamp").await.unwrap();
    let weight = lamp.weight.expect("lamp weight recorded");
    assert!((weight.to_kilograms() - 0.907184).abs() < 1e-9);

    // A unit the catalog does not know is treated as unrecorded.
    let odd = inventory.get_prop("odd").await.unwrap();
    assert!(odd.weight.is_none());

    let err = inventory.get_prop("ghost").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
