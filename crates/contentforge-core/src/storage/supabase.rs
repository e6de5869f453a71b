//! Hosted generation store over the Supabase row REST API

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Generation, GenerationQuery, GenerationStore, NewGeneration};
use crate::config::SupabaseCredentials;
use crate::error::{Error, Result};

const TABLE: &str = "generations";

#[derive(Clone)]
pub struct SupabaseGenerationStore {
    http_client: HttpClient,
    table_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for SupabaseGenerationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseGenerationStore")
            .field("table_url", &self.table_url)
            .field("user_scoped", &self.access_token.is_some())
            .finish()
    }
}

impl SupabaseGenerationStore {
    pub fn new(credentials: &SupabaseCredentials) -> Result<Self> {
        let http_client = HttpClient::builder().build().map_err(Error::NetworkError)?;
        Ok(Self {
            http_client,
            table_url: format!(
                "{}/rest/v1/{}",
                credentials.url.trim_end_matches('/'),
                TABLE
            ),
            anon_key: credentials.anon_key.clone(),
            access_token: None,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    async fn rows(&self, response: Response) -> Result<Vec<Generation>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(row_api_error(status.as_u16(), &body));
        }
        response
            .json()
            .await
            .map_err(|e| Error::StorageError(format!("Failed to parse rows: {}", e)))
    }
}

/// Transport failure talking to the row API
fn transport_error(e: reqwest::Error) -> Error {
    warn!(error = %e, "Row API unreachable");
    Error::StorageError(format!("Row API unreachable: {}", e))
}

fn row_api_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    warn!(status = status, "Row API request failed");

    match status {
        401 | 403 => Error::Unauthorized(message),
        _ => Error::StorageError(format!("{} (HTTP {})", message, status)),
    }
}

#[async_trait]
impl GenerationStore for SupabaseGenerationStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn insert(&self, new: NewGeneration) -> Result<Generation> {
        new.validate()?;
        let generation = new.into_generation();

        let response = self
            .authorize(self.http_client.post(&self.table_url))
            .header("Prefer", "return=representation")
            .json(&generation)
            .send()
            .await
            .map_err(transport_error)?;

        let saved = self
            .rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::StorageError("Insert returned no row".to_string()))?;

        debug!(id = %saved.id, kind = %saved.kind, "Saved generation");
        Ok(saved)
    }

    async fn list(&self, query: &GenerationQuery) -> Result<Vec<Generation>> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", query.effective_limit().to_string()),
            ("offset", query.effective_offset().to_string()),
        ];
        if let Some(kind) = query.kind {
            params.push(("type", format!("eq.{}", kind)));
        }

        let response = self
            .authorize(self.http_client.get(&self.table_url))
            .query(&params)
            .send()
            .await
            .map_err(transport_error)?;

        self.rows(response).await
    }

    async fn get(&self, id: &str) -> Result<Option<Generation>> {
        let response = self
            .authorize(self.http_client.get(&self.table_url))
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        Ok(self.rows(response).await?.into_iter().next())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let response = self
            .authorize(self.http_client.delete(&self.table_url))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(transport_error)?;

        Ok(!self.rows(response).await?.is_empty())
    }

    fn with_access_token(self: Arc<Self>, access_token: &str) -> Arc<dyn GenerationStore> {
        Arc::new(Self {
            access_token: Some(access_token.to_string()),
            ..(*self).clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::GenerationKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> SupabaseGenerationStore {
        SupabaseGenerationStore::new(&SupabaseCredentials {
            url: server.uri(),
            anon_key: "anon".to_string(),
        })
        .unwrap()
    }

    fn row(id: &str, kind: &str) -> Value {
        json!({
            "id": id,
            "type": kind,
            "prompt": "p",
            "output": "o",
            "template": null,
            "style": null,
            "complexity": null,
            "created_at": "2025-03-01T12:00:00.123456+00:00"
        })
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/generations"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer anon"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([row("g1", "text")])))
            .mount(&server)
            .await;

        let saved = store(&server)
            .insert(NewGeneration::text("p", "o"))
            .await
            .unwrap();
        assert_eq!(saved.id, "g1");
        assert_eq!(saved.kind, GenerationKind::Text);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/generations"))
            .and(query_param("type", "eq.image"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("limit", "5"))
            .and(query_param("offset", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([row("a", "image"), row("b", "image")])),
            )
            .mount(&server)
            .await;

        let rows = store(&server)
            .list(&GenerationQuery::of_kind(GenerationKind::Image).with_limit(5))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, "b");
    }

    #[tokio::test]
    async fn test_get_and_delete_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("id", "eq.missing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(query_param("id", "eq.g1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("g1", "text")])))
            .mount(&server)
            .await;

        let store = store(&server);
        assert!(store.get("missing").await.unwrap().is_none());
        assert!(store.delete("g1").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_scoped_token_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "JWT expired"})),
            )
            .mount(&server)
            .await;

        let scoped = Arc::new(store(&server)).with_access_token("user-jwt");
        let err = scoped.list(&GenerationQuery::default()).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(ref m) if m == "JWT expired"));
    }

    #[tokio::test]
    async fn test_unreachable_row_api_is_storage_error() {
        let store = SupabaseGenerationStore::new(&SupabaseCredentials {
            url: "http://127.0.0.1:1".to_string(),
            anon_key: "anon".to_string(),
        })
        .unwrap();

        let err = store.list(&GenerationQuery::default()).await.unwrap_err();
        assert!(matches!(err, Error::StorageError(ref m) if m.starts_with("Row API unreachable")));
        assert_eq!(err.code(), "E401");
    }

    #[test]
    fn test_row_api_error_mapping() {
        let err = row_api_error(500, r#"{"message":"relation does not exist"}"#);
        assert_eq!(
            err.to_string(),
            "Storage error: relation does not exist (HTTP 500)"
        );
    }
}
