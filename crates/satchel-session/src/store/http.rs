//! Networked backend talking to a remote key-value service over HTTP.
//!
//! Protocol:
//! - `GET {url}/{key}` returns the raw value, `404` when absent.
//! - `PUT {url}/{key}` stores the request body.
//! - `DELETE {url}/{key}` removes the key; `404` counts as success.
//! - `GET {url}?prefix={prefix}` returns a JSON array of matching keys.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{KvBackend, StoreResult};
use crate::error::StoreError;

/// Remote key-value backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for the service at `url`.
    pub fn new(url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn status_error(status: StatusCode, key: &str) -> StoreError {
        StoreError::Status {
            status: status.as_u16(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl KvBackend for HttpBackend {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let response = self.client.get(self.item_url(key)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await?)),
            status => Err(Self::status_error(status, key)),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> StoreResult<()> {
        let response = self
            .client
            .put(self.item_url(key))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(value)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, key));
        }
        debug!(key = %key, "Stored item remotely");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        let response = self.client.delete(self.item_url(key)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(Self::status_error(status, key)),
        }
    }

    async fn get_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("prefix", prefix)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, prefix));
        }
        Ok(response.json::<Vec<String>>().await?)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::Router;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use tokio::sync::Mutex;

    type Kv = Arc<Mutex<HashMap<String, String>>>;

    async fn get_value(State(kv): State<Kv>, Path(key): Path<String>) -> Result<String, AxumStatus> {
        kv.lock().await.get(&key).cloned().ok_or(AxumStatus::NOT_FOUND)
    }

    async fn put_value(State(kv): State<Kv>, Path(key): Path<String>, body: String) -> AxumStatus {
        kv.lock().await.insert(key, body);
        AxumStatus::NO_CONTENT
    }

    async fn delete_value(State(kv): State<Kv>, Path(key): Path<String>) -> AxumStatus {
        match kv.lock().await.remove(&key) {
            Some(_) => AxumStatus::NO_CONTENT,
            None => AxumStatus::NOT_FOUND,
        }
    }

    async fn list_keys(
        State(kv): State<Kv>,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::Json<Vec<String>> {
        let prefix = params.get("prefix").cloned().unwrap_or_default();
        let mut keys: Vec<String> = kv
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        keys.sort();
        axum::Json(keys)
    }

    /// Spawn a throwaway KV service and return its base URL.
    async fn spawn_kv_service() -> String {
        let kv: Kv = Arc::new(Mutex::new(HashMap::new()));
        let app = Router::new()
            .route("/", get(list_keys))
            .route(
                "/{key}",
                get(get_value).put(put_value).delete(delete_value),
            )
            .route("/broken/{key}", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }))
            .with_state(kv);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_roundtrip_against_service() {
        let url = spawn_kv_service().await;
        let backend = HttpBackend::new(&url, Duration::from_secs(5)).unwrap();

        assert_eq!(backend.get_item("sessions:abc").await.unwrap(), None);

        backend
            .set_item("sessions:abc", "{\"a\":1}".to_string())
            .await
            .unwrap();
        assert_eq!(
            backend.get_item("sessions:abc").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        backend.remove_item("sessions:abc").await.unwrap();
        backend.remove_item("sessions:abc").await.unwrap();
        assert_eq!(backend.get_item("sessions:abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_keys_against_service() {
        let url = spawn_kv_service().await;
        let backend = HttpBackend::new(&format!("{url}/"), Duration::from_secs(5)).unwrap();

        backend.set_item("sessions:a", String::new()).await.unwrap();
        backend.set_item("sessions:b", String::new()).await.unwrap();
        backend.set_item("other:c", String::new()).await.unwrap();

        assert_eq!(
            backend.get_keys("sessions:").await.unwrap(),
            vec!["sessions:a".to_string(), "sessions:b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let url = spawn_kv_service().await;
        let backend = HttpBackend::new(&format!("{url}/broken"), Duration::from_secs(5)).unwrap();

        let err = backend.get_item("x").await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let backend = HttpBackend::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            backend.get_item("sessions:abc").await,
            Err(StoreError::Http(_))
        ));
    }
}
