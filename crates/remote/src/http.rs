// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the remote document service.
//!
//! A small JSON REST mapping; everything above it talks to the
//! [`RemoteClient`] trait, so this module is replaceable wire plumbing.
//! Responses are classified into the [`RemoteError`] taxonomy here and
//! nowhere else.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::RemoteId;
use serde::Deserialize;
use tracing::trace;
use url::Url;

use crate::client::RemoteClient;
use crate::types::{ContentPatch, Created, NodeKind, RemoteDoc, RemoteError, RemoteNode};

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpRemote {
    http: reqwest::Client,
    base: Url,
}

impl HttpRemote {
    pub fn new(base_url: &str, token: &str) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url)
            .map_err(|e| RemoteError::Malformed(format!("invalid base url: {e}")))?;

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| RemoteError::Auth)?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path)
            .map_err(|e| RemoteError::Malformed(format!("invalid endpoint {path}: {e}")))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let response = classify_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

/// Map an HTTP response to the error taxonomy; pass successes through.
async fn classify_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(RemoteError::Throttled { retry_after });
    }
    if status.is_server_error() {
        return Err(RemoteError::Server { status: status.as_u16() });
    }
    match status.as_u16() {
        401 | 403 => Err(RemoteError::Auth),
        404 => {
            let id = response
                .url()
                .path()
                .trim_start_matches("/v1/nodes")
                .trim_end_matches("/content")
                .trim_end_matches("/descendants")
                .trim_matches('/')
                .to_string();
            Err(RemoteError::NotFound(RemoteId::new(id)))
        }
        code => {
            let message = response.text().await.unwrap_or_default();
            Err(RemoteError::Rejected { status: code, message })
        }
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout(ATTEMPT_TIMEOUT)
    } else {
        RemoteError::Transport(err.to_string())
    }
}

fn yaml_properties(
    json: BTreeMap<String, serde_json::Value>,
) -> Result<BTreeMap<String, serde_yaml::Value>, RemoteError> {
    json.into_iter()
        .map(|(k, v)| {
            let v = serde_yaml::to_value(v).map_err(|e| RemoteError::Malformed(e.to_string()))?;
            Ok((k, v))
        })
        .collect()
}

fn json_properties(
    yaml: &BTreeMap<String, serde_yaml::Value>,
) -> Result<BTreeMap<String, serde_json::Value>, RemoteError> {
    yaml.iter()
        .map(|(k, v)| {
            let v = serde_json::to_value(v).map_err(|e| RemoteError::Malformed(e.to_string()))?;
            Ok((k.clone(), v))
        })
        .collect()
}

// ── Wire shapes ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireNode {
    id: String,
    parent_id: Option<String>,
    kind: NodeKind,
    title: String,
    mtime: DateTime<Utc>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct TreePage {
    nodes: Vec<WireNode>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct WireContent {
    markdown: String,
    #[serde(default)]
    properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct WireCreated {
    id: String,
    #[serde(default)]
    url: Option<String>,
    mtime: DateTime<Utc>,
}

#[derive(Deserialize)]
struct WireUpdated {
    mtime: DateTime<Utc>,
}

#[async_trait]
impl RemoteClient for HttpRemote {
    async fn fetch_tree(&self, root: &RemoteId) -> Result<Vec<RemoteNode>, RemoteError> {
        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut url = self.endpoint(&format!("v1/nodes/{root}/descendants"))?;
            if let Some(c) = &cursor {
                url.query_pairs_mut().append_pair("cursor", c);
            }
            trace!(%url, "fetch_tree page");
            let response = self.http.get(url).send().await.map_err(transport_error)?;
            let page: TreePage = Self::read_json(response).await?;
            nodes.extend(page.nodes.into_iter().map(|n| RemoteNode {
                id: RemoteId::new(n.id),
                parent_id: n.parent_id.map(RemoteId::new),
                kind: n.kind,
                title: n.title,
                mtime: n.mtime,
                url: n.url,
            }));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(nodes),
            }
        }
    }

    async fn fetch_content(&self, id: &RemoteId) -> Result<RemoteDoc, RemoteError> {
        let url = self.endpoint(&format!("v1/nodes/{id}/content"))?;
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let content: WireContent = Self::read_json(response).await?;
        Ok(RemoteDoc {
            markdown: content.markdown,
            properties: yaml_properties(content.properties)?,
        })
    }

    async fn create(
        &self,
        parent: &RemoteId,
        kind: NodeKind,
        title: &str,
        content: &ContentPatch,
    ) -> Result<Created, RemoteError> {
        let url = self.endpoint("v1/nodes")?;
        let body = serde_json::json!({
            "parent_id": parent.as_str(),
            "kind": kind,
            "title": title,
            "markdown": content.markdown,
            "properties": json_properties(&content.properties)?,
        });
        let response =
            self.http.post(url).json(&body).send().await.map_err(transport_error)?;
        let created: WireCreated = Self::read_json(response).await?;
        Ok(Created {
            id: RemoteId::new(created.id),
            url: created.url,
            mtime: created.mtime,
        })
    }

    async fn update(
        &self,
        id: &RemoteId,
        patch: &ContentPatch,
    ) -> Result<DateTime<Utc>, RemoteError> {
        let url = self.endpoint(&format!("v1/nodes/{id}"))?;
        let body = serde_json::json!({
            "markdown": patch.markdown,
            "properties": json_properties(&patch.properties)?,
        });
        let response =
            self.http.patch(url).json(&body).send().await.map_err(transport_error)?;
        let updated: WireUpdated = Self::read_json(response).await?;
        Ok(updated.mtime)
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError> {
        let url = self.endpoint(&format!("v1/nodes/{id}"))?;
        let response = self.http.delete(url).send().await.map_err(transport_error)?;
        classify_status(response).await?;
        Ok(())
    }
}
