//! PostgREST-backed record gateway

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

use backoffice::RecordGateway;
use backoffice::core::gateway::GatewayResult;
use backoffice_api::{Filter, GatewayError, Payload, Record, RecordId, Selection};

use crate::client::SupabaseClient;

/// One table exposed through `/rest/v1/<table>`
pub struct SupabaseTable<T> {
    client: Arc<SupabaseClient>,
    table: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SupabaseTable<T> {
    /// Table named after the record's collection
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self::named(client, T::COLLECTION)
    }

    pub fn named(client: Arc<SupabaseClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            _record: PhantomData,
        }
    }

    fn url(&self) -> reqwest::Url {
        self.client.url(["rest", "v1", self.table.as_str()])
    }

    fn not_found(&self, id: &RecordId) -> GatewayError {
        GatewayError::not_found(&self.table, id)
    }

    /// PostgREST answers 404 for the table itself when it is not exposed
    fn missing_table(&self) -> GatewayError {
        GatewayError::Rejected {
            status: 404,
            message: format!("Table {} does not exist", self.table),
        }
    }

    /// The single row PostgREST returns for `return=representation`, or
    /// NotFound when the id matched nothing
    fn single_row(&self, rows: Vec<T>, id: &RecordId) -> GatewayResult<T> {
        rows.into_iter()
            .next()
            .ok_or_else(|| self.not_found(id))
    }
}

/// PostgREST query parameters for a selection
pub fn select_query(selection: &Selection) -> Vec<(String, String)> {
    let mut query = vec![("select".to_string(), "*".to_string())];
    if let Some(filter) = &selection.filter {
        query.push(filter_param(filter));
    }
    if let Some(limit) = selection.limit {
        query.push(("limit".to_string(), limit.to_string()));
    }
    query
}

fn filter_param(filter: &Filter) -> (String, String) {
    (filter.field.clone(), format!("eq.{}", filter.value))
}

fn id_param(id: &RecordId) -> (String, String) {
    ("id".to_string(), format!("eq.{}", id))
}

/// Total row count from a `Content-Range` header such as `0-9/15` or `*/0`
pub fn parse_content_range(headers: &HeaderMap) -> GatewayResult<usize> {
    let value = headers
        .get(reqwest::header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::decode("Count response has no Content-Range header"))?;

    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.parse().ok())
        .ok_or_else(|| GatewayError::decode(format!("Unexpected Content-Range: {}", value)))
}

#[async_trait]
impl<T: Record> RecordGateway<T> for SupabaseTable<T> {
    fn collection(&self) -> &str {
        &self.table
    }

    #[tracing::instrument(name = "supabase.select", skip(self), fields(table = %self.table))]
    async fn select(&self, selection: &Selection) -> GatewayResult<Vec<T>> {
        let url = self.url();
        let request = self
            .client
            .request(Method::GET, url.clone())
            .query(&select_query(selection));

        let response = self
            .client
            .send(request, "select rows", || self.missing_table())
            .await?;
        let rows: Vec<T> = response.json(url.as_str())?;
        debug!("[SupabaseTable] Selected {} rows from {}", rows.len(), self.table);
        Ok(rows)
    }

    async fn get(&self, id: &RecordId) -> GatewayResult<Option<T>> {
        let url = self.url();
        let request = self
            .client
            .request(Method::GET, url.clone())
            .query(&[("select".to_string(), "*".to_string()), id_param(id)]);

        let response = self
            .client
            .send(request, "get row", || self.missing_table())
            .await?;
        let rows: Vec<T> = response.json(url.as_str())?;
        Ok(rows.into_iter().next())
    }

    #[tracing::instrument(name = "supabase.insert", skip_all, fields(table = %self.table))]
    async fn insert(&self, payload: Payload) -> GatewayResult<T> {
        let url = self.url();
        let request = self
            .client
            .request(Method::POST, url.clone())
            .header("Prefer", "return=representation")
            .json(&payload);

        let response = self
            .client
            .send(request, "insert row", || self.missing_table())
            .await?;
        let rows: Vec<T> = response.json(url.as_str())?;
        let record = rows.into_iter().next().ok_or_else(|| {
            GatewayError::decode(format!("Insert into {} returned no row", self.table))
        })?;
        info!("[SupabaseTable] Inserted into {}: {:?}", self.table, record.id());
        Ok(record)
    }

    #[tracing::instrument(name = "supabase.update", skip(self, payload), fields(table = %self.table))]
    async fn update(&self, id: &RecordId, payload: Payload) -> GatewayResult<T> {
        let url = self.url();
        let request = self
            .client
            .request(Method::PATCH, url.clone())
            .query(&[id_param(id)])
            .header("Prefer", "return=representation")
            .json(&payload);

        let response = self
            .client
            .send(request, "update row", || self.not_found(id))
            .await?;
        let rows: Vec<T> = response.json(url.as_str())?;
        self.single_row(rows, id)
    }

    #[tracing::instrument(name = "supabase.delete", skip(self), fields(table = %self.table))]
    async fn delete(&self, id: &RecordId) -> GatewayResult<()> {
        let url = self.url();
        let request = self
            .client
            .request(Method::DELETE, url.clone())
            .query(&[id_param(id)])
            .header("Prefer", "return=representation");

        let response = self
            .client
            .send(request, "delete row", || self.not_found(id))
            .await?;
        let rows: Vec<serde_json::Value> = response.json(url.as_str())?;
        if rows.is_empty() {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    async fn count(&self, filter: Option<&Filter>) -> GatewayResult<usize> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filter.map(filter_param));
        let request = self
            .client
            .request(Method::HEAD, self.url())
            .query(&query)
            .header("Prefer", "count=exact");

        let response = self
            .client
            .send(request, "count rows", || self.missing_table())
            .await?;
        parse_content_range(&response.headers)
    }
}
