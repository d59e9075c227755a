//! REST client for the collection cloud service: the record catalog, the
//! shared barcode dataset, and the binary object store.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use diecast_core::collection::CollectibleCar;
use diecast_core::errors::{Error as CoreError, Result as CoreResult};
use diecast_core::sync::{BarcodeAsset, ObjectPath, RemoteCatalogTrait, RemoteObjectStoreTrait};

use crate::error::{CloudSyncError, Result};
use crate::types::{
    ApiErrorResponse, ChangedRecordsResponse, RemoteCarRecord, UploadObjectResponse,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Percent-encode every segment of an object path, keeping the separators.
fn encode_object_path(path: &ObjectPath) -> String {
    path.to_path()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Client for the collection cloud API.
#[derive(Debug, Clone)]
pub struct CollectionApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl CollectionApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - base URL of the cloud API (e.g. "https://api.diecast.app")
    /// * `access_token` - bearer token for the signed-in account
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|_| CloudSyncError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    fn error_from_body(status: reqwest::StatusCode, body: &str) -> CloudSyncError {
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
            return CloudSyncError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            );
        }
        CloudSyncError::api(status.as_u16(), format!("Request failed: {body}"))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to deserialize response. Body: {}, Error: {}", body, e);
            CloudSyncError::api(status.as_u16(), format!("Failed to parse response: {e}"))
        })
    }

    /// Check a response where only the status matters. `missing_ok` treats
    /// 404 as success, for idempotent deletes.
    async fn check_status(response: reqwest::Response, missing_ok: bool) -> Result<()> {
        let status = response.status();
        if status.is_success() || (missing_ok && status == reqwest::StatusCode::NOT_FOUND) {
            return Ok(());
        }
        let body = response.text().await?;
        Self::log_response(status, &body);
        Err(Self::error_from_body(status, &body))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog (document API)
    // ─────────────────────────────────────────────────────────────────────

    /// GET /api/v1/catalog/{owner}/records?since={ms}
    async fn get_records_since(
        &self,
        owner_id: &str,
        since_ms: i64,
    ) -> Result<ChangedRecordsResponse> {
        let url = format!(
            "{}/api/v1/catalog/{}/records?since={}",
            self.base_url,
            urlencoding::encode(owner_id),
            since_ms
        );
        debug!("Fetching records changed since {since_ms}");

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// PUT /api/v1/catalog/{owner}/records/{id}
    async fn put_record(&self, record: &RemoteCarRecord) -> Result<()> {
        let url = format!(
            "{}/api/v1/catalog/{}/records/{}",
            self.base_url,
            urlencoding::encode(&record.owner_id),
            urlencoding::encode(&record.id)
        );
        debug!("Upserting record {}", record.id);

        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(record)
            .send()
            .await?;
        Self::check_status(response, false).await
    }

    /// DELETE /api/v1/catalog/{owner}/records/{id}
    async fn remove_record(&self, owner_id: &str, record_id: &str) -> Result<()> {
        let url = format!(
            "{}/api/v1/catalog/{}/records/{}",
            self.base_url,
            urlencoding::encode(owner_id),
            urlencoding::encode(record_id)
        );
        debug!("Deleting record {record_id}");

        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::check_status(response, true).await
    }

    /// GET /api/v1/barcodes/{barcode}; 404 means unknown barcode.
    async fn get_barcode_asset(&self, barcode: &str) -> Result<Option<BarcodeAsset>> {
        let url = format!(
            "{}/api/v1/barcodes/{}",
            self.base_url,
            urlencoding::encode(barcode)
        );

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::parse_response(response).await?))
    }

    /// PUT /api/v1/barcodes/{barcode}
    async fn put_barcode_asset(&self, asset: &BarcodeAsset) -> Result<()> {
        let url = format!(
            "{}/api/v1/barcodes/{}",
            self.base_url,
            urlencoding::encode(&asset.barcode)
        );
        debug!("Registering barcode {}", asset.barcode);

        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(asset)
            .send()
            .await?;
        Self::check_status(response, false).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Objects (binary API)
    // ─────────────────────────────────────────────────────────────────────

    /// PUT /api/v1/objects/{path}
    async fn put_object(
        &self,
        path: &ObjectPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadObjectResponse> {
        let url = format!(
            "{}/api/v1/objects/{}",
            self.base_url,
            encode_object_path(path)
        );
        debug!("Uploading {} bytes to {path}", bytes.len());

        let content_type_value = HeaderValue::from_str(content_type)
            .map_err(|_| CloudSyncError::invalid_request("Invalid content type"))?;
        let mut headers = self.headers()?;
        headers.insert(CONTENT_TYPE, content_type_value);

        let response = self
            .client
            .put(&url)
            .headers(headers)
            .body(bytes)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// DELETE /api/v1/objects/{path}
    async fn remove_object(&self, path: &ObjectPath) -> Result<()> {
        let url = format!(
            "{}/api/v1/objects/{}",
            self.base_url,
            encode_object_path(path)
        );
        debug!("Deleting object {path}");

        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::check_status(response, true).await
    }
}

#[async_trait]
impl RemoteCatalogTrait for CollectionApiClient {
    async fn records_changed_since(
        &self,
        owner_id: &str,
        since_ms: i64,
    ) -> CoreResult<Vec<CollectibleCar>> {
        let response = self
            .get_records_since(owner_id, since_ms)
            .await
            .map_err(CoreError::from)?;
        Ok(response
            .records
            .into_iter()
            .map(RemoteCarRecord::into_car)
            .collect())
    }

    async fn upsert_record(&self, car: &CollectibleCar) -> CoreResult<()> {
        self.put_record(&RemoteCarRecord::from_car(car))
            .await
            .map_err(CoreError::from)
    }

    async fn delete_record(&self, owner_id: &str, car_id: &str) -> CoreResult<()> {
        self.remove_record(owner_id, car_id)
            .await
            .map_err(CoreError::from)
    }

    async fn find_barcode_asset(&self, barcode: &str) -> CoreResult<Option<BarcodeAsset>> {
        self.get_barcode_asset(barcode).await.map_err(CoreError::from)
    }

    async fn register_barcode_asset(&self, asset: &BarcodeAsset) -> CoreResult<()> {
        self.put_barcode_asset(asset).await.map_err(CoreError::from)
    }
}

#[async_trait]
impl RemoteObjectStoreTrait for CollectionApiClient {
    async fn upload_object(
        &self,
        path: &ObjectPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> CoreResult<String> {
        let response = self
            .put_object(path, bytes, content_type)
            .await
            .map_err(CoreError::from)?;
        Ok(response.url)
    }

    async fn delete_object(&self, path: &ObjectPath) -> CoreResult<()> {
        self.remove_object(path).await.map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_paths_are_segment_encoded() {
        let path = ObjectPath::owned("owner 1", "car/1", "thumbnail.jpg");
        assert_eq!(
            encode_object_path(&path),
            "owners/owner%201/car%2F1/thumbnail.jpg"
        );

        let plain = ObjectPath::global("0657084", "barcode.jpg");
        assert_eq!(encode_object_path(&plain), "barcodes/0657084/barcode.jpg");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client =
            CollectionApiClient::new("https://api.diecast.app/", "token").expect("client");
        assert_eq!(client.base_url, "https://api.diecast.app");
    }

    #[test]
    fn structured_error_bodies_become_api_errors() {
        let err = CollectionApiClient::error_from_body(
            reqwest::StatusCode::CONFLICT,
            "{\"code\":\"version_conflict\",\"message\":\"stale write\"}",
        );
        match err {
            CloudSyncError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "version_conflict: stale write");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
