use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{PackList, PackingContainer, PackingLabel};
use crate::services::qr::{QrCodeGenerator, QrCodeRequest};

// Label URLs must open on phones without an account, so links point at the
// public site even when the server itself runs behind the app subdomain.
static APP_SUBDOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://)app\.").expect("app subdomain pattern is valid"));

pub fn public_origin(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    APP_SUBDOMAIN.replace(trimmed, "$1").into_owned()
}

pub struct LabelService {
    qr: Arc<dyn QrCodeGenerator>,
    public_base_url: String,
}

impl LabelService {
    pub fn new(qr: Arc<dyn QrCodeGenerator>, public_base_url: String) -> Self {
        LabelService {
            qr,
            public_base_url,
        }
    }

    pub fn viewer_url(&self, container_id: &str) -> String {
        format!("{}/c/{}", public_origin(&self.public_base_url), container_id)
    }

    /// Builds one label per container, fetching all QR codes concurrently.
    /// If any container fails the whole batch is rejected, so a print run
    /// never comes out with holes in it.
    pub async fn generate_labels(&self, pack_list: &PackList) -> AppResult<Vec<PackingLabel>> {
        let generated_at = Utc::now();

        let pending = pack_list.containers.iter().map(|container| {
            let request = QrCodeRequest::container(
                container.id.clone(),
                pack_list.id.clone(),
                self.viewer_url(&container.id),
                container.name.clone(),
            );
            async move {
                match self.qr.generate(&request).await {
                    Ok(qr_code) => Ok(self.label_for(pack_list, container, qr_code, generated_at)),
                    Err(err) => Err((container.id.clone(), err)),
                }
            }
        });

        let mut labels = Vec::with_capacity(pack_list.containers.len());
        let mut failed = Vec::new();
        for result in join_all(pending).await {
            match result {
                Ok(label) => labels.push(label),
                Err((container_id, err)) => {
                    tracing::warn!("QR generation failed for container {}: {}", container_id, err);
                    failed.push(container_id);
                }
            }
        }

        if !failed.is_empty() {
            return Err(AppError::UpstreamFailure(format!(
                "QR generation failed for containers: {}",
                failed.join(", ")
            )));
        }
        Ok(labels)
    }

    fn label_for(
        &self,
        pack_list: &PackList,
        container: &PackingContainer,
        qr_code: String,
        generated_at: DateTime<Utc>,
    ) -> PackingLabel {
        PackingLabel {
            id: Uuid::new_v4(),
            container_id: container.id.clone(),
            pack_list_id: pack_list.id.clone(),
            container_name: container.name.clone(),
            container_status: container.status,
            prop_count: container.prop_count(),
            labels: container.labels.clone(),
            url: self.viewer_url(&container.id),
            qr_code,
            generated_at,
        }
    }
}
