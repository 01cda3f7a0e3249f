// Passthrough to the hosted text-rewrite function used by the clinical forms.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub current_text: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResponse {
    pub rewritten_text: String,
}

#[async_trait]
pub trait TextRewriter: Send + Sync {
    async fn rewrite(&self, req: &RewriteRequest) -> Result<String, DashboardError>;
}

pub struct RewriteClient {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RewriteClient {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            api_key,
            client,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewriteReply {
    rewritten_text: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl TextRewriter for RewriteClient {
    async fn rewrite(&self, req: &RewriteRequest) -> Result<String, DashboardError> {
        let mut call = self.client.post(&self.url).json(req);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let resp = call.send().await.map_err(|e| {
            tracing::error!(error = %e, "text rewrite service unreachable");
            DashboardError::External("Text rewrite service is unreachable".into())
        })?;

        let status = resp.status();
        let reply: RewriteReply = resp.json().await.map_err(|e| {
            tracing::error!(error = %e, %status, "text rewrite reply unreadable");
            DashboardError::External(format!("Text rewrite service replied with {status}"))
        })?;
        match (reply.rewritten_text, reply.error) {
            (_, Some(err)) => Err(DashboardError::External(err)),
            (Some(text), None) if status.is_success() => Ok(text),
            _ => Err(DashboardError::External(format!(
                "Text rewrite service replied with {status}"
            ))),
        }
    }
}

/// Checks the request locally and forwards it. Blank text or prompt never
/// leaves the server.
pub async fn rewrite(
    rewriter: Option<&dyn TextRewriter>,
    req: RewriteRequest,
) -> Result<RewriteResponse, DashboardError> {
    if req.current_text.trim().is_empty() || req.prompt.trim().is_empty() {
        return Err(DashboardError::Validation(
            "Current text and prompt are required".into(),
        ));
    }
    let rewriter =
        rewriter.ok_or_else(|| DashboardError::Unavailable("Text rewriting is not configured".into()))?;
    let rewritten_text = rewriter.rewrite(&req).await?;
    Ok(RewriteResponse { rewritten_text })
}
