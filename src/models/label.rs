use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::container::ContainerStatus;

/// Printable label for one container. Labels are derived from the pack list
/// on demand and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PackingLabel {
    pub id: Uuid,
    pub container_id: String,
    pub pack_list_id: String,
    pub container_name: String,
    pub container_status: ContainerStatus,
    pub prop_count: u32,
    pub labels: Vec<String>,
    /// Public viewer URL, also encoded in the QR image.
    pub url: String,
    /// QR image as a data URI, as returned by the QR service.
    pub qr_code: String,
    pub generated_at: DateTime<Utc>,
}
