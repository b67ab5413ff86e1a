//! REST remote store speaking the PostgREST dialect used by the hosted
//! database (`/rest/v1/{table}`, `id=eq.{id}` filters).

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, Url};
use serde_json::Value;

use super::RemoteStore;
use crate::error::RemoteError;

/// Remote store backed by HTTP calls.
#[derive(Debug, Clone)]
pub struct RestRemoteStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestRemoteStore {
    /// Create a store for `base_url` (without the `/rest/v1` suffix).
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn table_url(&self, table: &str, id: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, table))
            .map_err(|e| RemoteError::Rejected(format!("invalid remote url: {e}")))?;
        if let Some(id) = id {
            url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn insert(&self, table: &str, payload: &Value) -> Result<Value, RemoteError> {
        let url = self.table_url(table, None)?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(payload)
            .send()
            .await?;
        let rows: Value = Self::check(response).await?.json().await?;

        // PostgREST answers with an array of inserted rows
        Ok(match rows {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            Value::Array(_) => Value::Null,
            row => row,
        })
    }

    async fn update(&self, table: &str, id: &str, payload: &Value) -> Result<(), RemoteError> {
        let url = self.table_url(table, Some(id))?;
        let response = self
            .request(Method::PATCH, url)
            .json(payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        let url = self.table_url(table, Some(id))?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Value>, RemoteError> {
        let mut url = self.table_url(table, None)?;
        url.query_pairs_mut().append_pair("select", "*");
        let response = self
            .request(Method::GET, url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        let url = self.table_url("", None)?;
        // Any HTTP answer, even an auth failure, means the network is up
        self.request(Method::HEAD, url).send().await?;
        Ok(())
    }
}
