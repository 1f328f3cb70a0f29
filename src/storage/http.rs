use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{validate_key, ObjectStore, StorageError, StorageResult};

/// Object store backed by a remote HTTP object API. The server exposes
/// `GET/PUT/DELETE /objects/{key}`, `GET /objects?prefix=`, a server-side
/// `POST /objects/{key}/copy`, and `POST /objects/{key}/presign`.
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    api_token: String,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, api_token: &str) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StorageError::Backend(format!("http client setup failed: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_token)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{}", self.base_url, urlencoding::encode(key))
    }

    async fn check(
        response: reqwest::Response,
        key: &str,
    ) -> StorageResult<reqwest::Response> {
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "no error details".to_string());
            return Err(StorageError::Backend(format!(
                "server returned {status}: {detail}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn copy_object(&self, src_key: &str, dst_key: &str) -> StorageResult<()> {
        validate_key(src_key)?;
        validate_key(dst_key)?;
        debug!("copying object {} -> {}", src_key, dst_key);

        let response = self
            .client
            .post(format!("{}/copy", self.object_url(src_key)))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "destination": dst_key }))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("copy request failed: {e}")))?;
        Self::check(response, src_key).await?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        let response = self
            .client
            .get(self.object_url(key))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("get request failed: {e}")))?;
        let response = Self::check(response, key).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Backend(format!("failed to read body: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        validate_key(key)?;
        debug!("putting object {} ({} bytes)", key, data.len());

        let response = self
            .client
            .put(self.object_url(key))
            .header("Authorization", self.auth_header())
            .header("Content-Type", content_type.to_string())
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("put request failed: {e}")))?;
        Self::check(response, key).await?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let response = self
            .client
            .delete(self.object_url(key))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("delete request failed: {e}")))?;
        // Deleting a missing object is not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, key).await?;
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        #[derive(Deserialize)]
        struct Listing {
            keys: Vec<String>,
        }

        let response = self
            .client
            .get(format!("{}/objects", self.base_url))
            .query(&[("prefix", prefix)])
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("list request failed: {e}")))?;
        let response = Self::check(response, prefix).await?;
        let listing = response
            .json::<Listing>()
            .await
            .map_err(|e| StorageError::Backend(format!("failed to parse listing: {e}")))?;
        Ok(listing.keys)
    }

    async fn presigned_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        validate_key(key)?;

        #[derive(Deserialize)]
        struct Presigned {
            url: String,
        }

        let response = self
            .client
            .post(format!("{}/presign", self.object_url(key)))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "expires_in": ttl.as_secs() }))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("presign request failed: {e}")))?;
        let response = Self::check(response, key).await?;
        let presigned = response
            .json::<Presigned>()
            .await
            .map_err(|e| StorageError::Backend(format!("failed to parse presign: {e}")))?;
        Ok(presigned.url)
    }
}
