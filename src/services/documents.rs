// Patient documents and their copies in external cloud storage.
//
// The files themselves are handled by a serverless proxy; this side only
// forwards uploads and records where the proxy put them.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::PatientDocument;
use crate::store::{DocumentSyncUpdate, PracticeStore};

use super::{fetch_failed, write_failed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    NotSynced,
}

impl SyncStatus {
    pub fn of(doc: &PatientDocument) -> Self {
        if doc.is_synced && doc.external_file_id.as_deref().is_some_and(|id| !id.is_empty()) {
            SyncStatus::Synced
        } else {
            SyncStatus::NotSynced
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: PatientDocument,
    pub sync_status: SyncStatus,
}

impl From<PatientDocument> for DocumentView {
    fn from(document: PatientDocument) -> Self {
        let sync_status = SyncStatus::of(&document);
        Self { document, sync_status }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub document_id: Uuid,
    pub file_name: String,
    /// base64 of the file bytes
    pub file_data: String,
    pub mime_type: String,
    pub patient_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_id: String,
    pub web_view_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub document_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait CloudStorage: Send + Sync {
    async fn upload(&self, req: &UploadRequest) -> Result<StoredFile, DashboardError>;
    async fn sync_all(&self) -> Result<Vec<SyncResult>, DashboardError>;
}

/* -------------------------
   HTTP client for the proxy
--------------------------*/

pub struct CloudSyncClient {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CloudSyncClient {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            api_key,
            client,
        })
    }

    async fn call<B: Serialize + ?Sized>(&self, body: &B) -> Result<ProxyReply, DashboardError> {
        let mut req = self.client.post(&self.url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| {
            tracing::error!(error = %e, "document sync proxy unreachable");
            DashboardError::External("Cloud storage is unreachable".into())
        })?;

        let status = resp.status();
        let reply: ProxyReply = resp.json().await.map_err(|e| {
            tracing::error!(error = %e, %status, "document sync proxy sent an unreadable reply");
            DashboardError::External(format!("Cloud storage replied with {status}"))
        })?;
        if let Some(err) = reply.error.as_deref() {
            return Err(DashboardError::External(err.to_string()));
        }
        if !status.is_success() || reply.success != Some(true) {
            return Err(DashboardError::External(
                reply.message.unwrap_or_else(|| format!("Cloud storage replied with {status}")),
            ));
        }
        Ok(reply)
    }
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ProxyAction<'a> {
    Upload(&'a UploadRequest),
    SyncAll,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyReply {
    success: Option<bool>,
    drive_file: Option<RemoteFile>,
    #[serde(default)]
    results: Vec<SyncResult>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    id: String,
    web_view_link: Option<String>,
}

#[async_trait]
impl CloudStorage for CloudSyncClient {
    async fn upload(&self, req: &UploadRequest) -> Result<StoredFile, DashboardError> {
        let reply = self.call(&ProxyAction::Upload(req)).await?;
        let file = reply
            .drive_file
            .ok_or_else(|| DashboardError::External("Cloud storage did not return a file id".into()))?;
        Ok(StoredFile {
            file_id: file.id,
            web_view_link: file.web_view_link,
        })
    }

    async fn sync_all(&self) -> Result<Vec<SyncResult>, DashboardError> {
        Ok(self.call(&ProxyAction::SyncAll).await?.results)
    }
}

/* -------------------------
   Tracker operations
--------------------------*/

/// Newest first. `patient_id` narrows to one patient.
pub async fn list(
    store: &dyn PracticeStore,
    dentist_id: Uuid,
    patient_id: Option<Uuid>,
) -> Result<Vec<DocumentView>, DashboardError> {
    let docs = store
        .documents_for(dentist_id, patient_id)
        .await
        .map_err(|e| fetch_failed("documents", e))?;
    Ok(docs.into_iter().map(DocumentView::from).collect())
}

fn require_cloud(cloud: Option<&dyn CloudStorage>) -> Result<&dyn CloudStorage, DashboardError> {
    cloud.ok_or_else(|| DashboardError::Unavailable("Cloud storage is not configured".into()))
}

pub async fn upload(
    store: &dyn PracticeStore,
    cloud: Option<&dyn CloudStorage>,
    dentist_id: Uuid,
    document_id: Uuid,
    bytes: &[u8],
    mime_type: Option<&str>,
) -> Result<DocumentView, DashboardError> {
    let cloud = require_cloud(cloud)?;
    if bytes.is_empty() {
        return Err(DashboardError::Validation("File is empty".into()));
    }

    let doc = store
        .document(document_id)
        .await
        .map_err(|e| fetch_failed("document", e))?
        .ok_or_else(|| DashboardError::NotFound("Document not found".into()))?;
    if doc.dentist_id != dentist_id {
        return Err(DashboardError::Forbidden("Document belongs to another dentist".into()));
    }

    let patient_name = store
        .profile_by_id(doc.patient_id)
        .await
        .map_err(|e| fetch_failed("patient profile", e))?
        .map(|p| p.full_name())
        .unwrap_or_else(|| "Unknown patient".to_string());

    let req = UploadRequest {
        document_id,
        file_name: doc.document_name.clone(),
        file_data: STANDARD.encode(bytes),
        mime_type: mime_type
            .or(doc.mime_type.as_deref())
            .unwrap_or("application/octet-stream")
            .to_string(),
        patient_name,
    };
    let stored = cloud.upload(&req).await?;

    let update = DocumentSyncUpdate {
        external_file_id: stored.file_id,
        external_url: stored.web_view_link,
        synced_at: Utc::now(),
    };
    let doc = store
        .mark_document_synced(document_id, &update)
        .await
        .map_err(|e| write_failed("record document sync", e))?
        .ok_or_else(|| DashboardError::Transition("Document no longer exists".into()))?;
    tracing::info!(%document_id, "document uploaded to cloud storage");
    Ok(doc.into())
}

pub async fn sync_all(cloud: Option<&dyn CloudStorage>) -> Result<Vec<SyncResult>, DashboardError> {
    require_cloud(cloud)?.sync_all().await
}
