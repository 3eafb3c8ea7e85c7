use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use super::{Credential, SupabaseClient};
use crate::domain::repository::ObjectStore;
use crate::error::InventoryError;

/// Storage-API-backed [`ObjectStore`] for one public bucket.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[derive(Serialize)]
struct RemoveBody<'a> {
    prefixes: &'a [String],
}

impl ObjectStore for SupabaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), InventoryError> {
        let url = self
            .client
            .url(&format!("/storage/v1/object/{}/{path}", self.bucket), &[])?;
        let request = self
            .client
            .authorized(Method::POST, url, Credential::User)
            .await?
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes);
        self.client.send(request).await?;
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), InventoryError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self
            .client
            .url(&format!("/storage/v1/object/{}", self.bucket), &[])?;
        let request = self
            .client
            .authorized(Method::DELETE, url, Credential::User)
            .await?
            .json(&RemoveBody { prefixes: paths });
        self.client.send(request).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{path}",
            self.client.base_url(),
            self.bucket
        )
    }
}
