//! REST implementation of the remote collection.
//!
//! Collections live at `{api_url}/api/{resource}` and items at
//! `{api_url}/api/{resource}/{id}`. Requests carry the session's bearer token
//! when one is available.

use super::{Entity, RemoteCollection, RemoteError, RemoteResult};
use crate::session::Session;
use crate::types::ItemId;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, error};

/// Remote collection reached over HTTP.
pub struct HttpCollection<E: Entity> {
    client: Client,
    collection_url: String,
    token: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> HttpCollection<E> {
    /// Build a collection client for `E::RESOURCE` under `api_url`.
    pub fn new(api_url: &str, session: &Session, timeout: Option<Duration>) -> RemoteResult<Self> {
        let client = build_client(timeout)?;

        Ok(Self {
            client,
            collection_url: format!("{}/api/{}", api_url.trim_end_matches('/'), E::RESOURCE),
            token: session.token().map(str::to_string),
            _entity: PhantomData,
        })
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn item_url(&self, id: ItemId) -> String {
        format!("{}/{}", self.collection_url, id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

pub(crate) fn build_client(timeout: Option<Duration>) -> RemoteResult<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| RemoteError::transport(e.to_string()))
}

pub(crate) async fn send(builder: RequestBuilder) -> RemoteResult<Response> {
    let resp = builder
        .send()
        .await
        .map_err(|e| RemoteError::transport(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let detail = rejection_detail(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Server error".to_string());
    let err = RemoteError::rejected(status.as_u16(), detail);
    error!(status = status.as_u16(), "{}", err);
    Err(err)
}

/// Pull a human-readable reason out of an error body: the `message` field of
/// a JSON object, otherwise the raw text.
fn rejection_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
        if let Some(message) = map.get("message").and_then(|m| m.as_str()) {
            return Some(message.to_string());
        }
    }
    Some(trimmed.to_string())
}

pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> RemoteResult<T> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| RemoteError::transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::decode(e.to_string()))
}

#[async_trait]
impl<E: Entity> RemoteCollection<E> for HttpCollection<E> {
    async fn list(&self) -> RemoteResult<Vec<E>> {
        let resp = send(self.request(Method::GET, &self.collection_url)).await?;
        let rows: Vec<E> = decode(resp).await?;
        debug!(resource = E::RESOURCE, count = rows.len(), "Fetched rows");
        Ok(rows)
    }

    async fn create(&self, draft: &E::Draft) -> RemoteResult<E> {
        let resp = send(self.request(Method::POST, &self.collection_url).json(draft)).await?;
        let row: E = decode(resp).await?;
        debug!(resource = E::RESOURCE, id = row.id(), "Created row");
        Ok(row)
    }

    async fn update(&self, id: ItemId, item: &E) -> RemoteResult<E> {
        let resp = send(self.request(Method::PUT, &self.item_url(id)).json(item)).await?;
        let row: E = decode(resp).await?;
        debug!(resource = E::RESOURCE, id, "Updated row");
        Ok(row)
    }

    async fn delete(&self, id: ItemId) -> RemoteResult<()> {
        send(self.request(Method::DELETE, &self.item_url(id))).await?;
        debug!(resource = E::RESOURCE, id, "Deleted row");
        Ok(())
    }
}
