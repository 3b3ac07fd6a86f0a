//! HTTP implementation of [`RecordStore`] against a PostgREST-style row API.
//!
//! Each table is exposed under `/rest/v1/{table}` with filter query
//! parameters (`user_id=eq.<uid>`, `id=eq.<row_id>`). Writes ask the server
//! to return the persisted representation so the caller can capture
//! store-assigned identifiers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{RecordStore, StoreError};
use crate::config::StoreSettings;

/// Remote row store client.
pub struct RestStore {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl RestStore {
    /// Build a client from configuration.
    pub fn new(settings: &StoreSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: parse_base_url(&settings.base_url)?,
            api_key: settings.api_key.clone(),
        })
    }

    /// Build a client against an explicit base URL. Test hook.
    #[doc(hidden)]
    pub fn new_with_base_url(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(base_url)?,
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!(
            "{}/rest/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            table
        );
        debug!(%url, %method, "store request");
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, StoreError> {
    Url::parse(raw).map_err(|e| StoreError::Malformed(format!("invalid store base url: {e}")))
}

/// Map a non-success response onto the store error taxonomy.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(message),
        StatusCode::NOT_FOUND => StoreError::NotFound,
        _ => StoreError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

/// The row API answers with a JSON array; a bare object is tolerated.
async fn read_rows(response: Response) -> Result<Vec<Value>, StoreError> {
    let body: Value = response
        .json()
        .await
        .map_err(|e| StoreError::Malformed(format!("unparseable store response: {e}")))?;
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Object(_) => Ok(vec![body]),
        other => Err(StoreError::Malformed(format!(
            "unexpected store response: {other}"
        ))),
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn find_one(&self, table: &str, user_id: &str) -> Result<Option<Value>, StoreError> {
        let response = self
            .request(Method::GET, table)
            .query(&[("user_id", format!("eq.{user_id}")), ("limit", "1".into())])
            .send()
            .await?;
        let rows = read_rows(check_status(response).await?).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_all(&self, table: &str, user_id: &str) -> Result<Vec<Value>, StoreError> {
        let response = self
            .request(Method::GET, table)
            .query(&[("user_id", format!("eq.{user_id}"))])
            .send()
            .await?;
        read_rows(check_status(response).await?).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows = read_rows(check_status(response).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no representation".into()))
    }

    async fn update(&self, table: &str, row_id: i64, fields: Value) -> Result<Value, StoreError> {
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", format!("eq.{row_id}"))])
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await?;
        let rows = read_rows(check_status(response).await?).await?;
        // An empty representation means no row matched the id filter.
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn delete(&self, table: &str, row_id: i64, user_id: &str) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, table)
            .query(&[
                ("id", format!("eq.{row_id}")),
                ("user_id", format!("eq.{user_id}")),
            ])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows = read_rows(check_status(response).await?).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
