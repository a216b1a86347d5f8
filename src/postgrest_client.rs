use crate::errors::StoreError;
use crate::models::Lead;
use crate::store::{Filter, TableStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Client for a single table exposed through a PostgREST endpoint (Supabase).
///
/// Rows are addressed with `column=eq.value` query filters and every write
/// asks for the affected rows back.
#[derive(Clone)]
pub struct PostgrestClient {
    client: Client,
    table_url: String,
    api_key: String,
}

impl PostgrestClient {
    /// Creates a new `PostgrestClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Project URL, e.g. `https://abc.supabase.co`.
    /// * `api_key` - Service or anon key, sent as both `apikey` and bearer token.
    /// * `table` - Table name under `/rest/v1/`.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: &str,
        api_key: String,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::Transport)?;

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key,
        })
    }

    /// Builds the table URL with `select=*`, filters and an optional limit.
    fn url(
        &self,
        filters: &[Filter],
        limit: Option<usize>,
        select: bool,
    ) -> Result<reqwest::Url, StoreError> {
        let mut url = reqwest::Url::parse(&self.table_url)
            .map_err(|e| StoreError::Decode(format!("Invalid table URL: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            if select {
                query.append_pair("select", "*");
            }
            for filter in filters {
                query.append_pair(&filter.column, &filter_expression(&filter.value));
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn rows(response: Response) -> Result<Vec<Lead>, StoreError> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Store returned error {}: {}", status, error_text);
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let body: Value = response.json().await?;
        match body {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(StoreError::Decode(format!(
                        "expected a row object, got {}",
                        other
                    ))),
                })
                .collect(),
            // A single-object representation still counts as one row
            Value::Object(row) => Ok(vec![row]),
            other => Err(StoreError::Decode(format!(
                "expected an array of rows, got {}",
                other
            ))),
        }
    }
}

/// Renders a filter value in PostgREST operator syntax.
fn filter_expression(value: &Value) -> String {
    match value {
        Value::Null => "is.null".to_string(),
        Value::String(s) => format!("eq.{}", s),
        other => format!("eq.{}", other),
    }
}

#[async_trait]
impl TableStore for PostgrestClient {
    async fn select(
        &self,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<Lead>, StoreError> {
        let url = self.url(filters, limit, true)?;
        tracing::debug!("Store select: {}", url);

        let response = self.authorized(self.client.get(url)).send().await?;
        Self::rows(response).await
    }

    async fn insert(&self, row: Lead) -> Result<Vec<Lead>, StoreError> {
        let url = self.url(&[], None, false)?;
        tracing::debug!("Store insert into {}", self.table_url);

        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn update(&self, filters: &[Filter], patch: Lead) -> Result<Vec<Lead>, StoreError> {
        let url = self.url(filters, None, false)?;
        tracing::debug!("Store update: {}", url);

        let response = self
            .authorized(self.client.patch(url))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn delete(&self, filters: &[Filter]) -> Result<Vec<Lead>, StoreError> {
        let url = self.url(filters, None, false)?;
        tracing::debug!("Store delete: {}", url);

        let response = self
            .authorized(self.client.delete(url))
            .header("Prefer", "return=representation")
            .send()
            .await?;
        Self::rows(response).await
    }
}
