use super::{check_status, FirebaseAuth};
use crate::api::models::FileUpload;
use crate::api::{BlobStore, GatewayResult};
use crate::config::BackendConfig;
use futures_util::future::LocalBoxFuture;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::rc::Rc;

const STORAGE_BASE: &str = "https://firebasestorage.googleapis.com/v0";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    bucket: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Public download URL for an object, as the web SDK's `getDownloadURL`
/// builds it.
pub fn download_url(bucket: &str, object: &str, token: Option<&str>) -> String {
    let mut url = format!(
        "{STORAGE_BASE}/b/{bucket}/o/{}?alt=media",
        urlencoding::encode(object)
    );
    // Several tokens may be issued; any of them works.
    if let Some(token) = token.and_then(|tokens| tokens.split(',').next()) {
        url.push_str("&token=");
        url.push_str(&urlencoding::encode(token.trim()));
    }
    url
}

#[derive(Clone)]
pub struct CloudStorage {
    http: reqwest::Client,
    config: Rc<BackendConfig>,
    auth: FirebaseAuth,
}

impl CloudStorage {
    pub fn new(http: reqwest::Client, config: Rc<BackendConfig>, auth: FirebaseAuth) -> Self {
        Self { http, config, auth }
    }
}

impl BlobStore for CloudStorage {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        file: FileUpload,
    ) -> LocalBoxFuture<'a, GatewayResult<String>> {
        Box::pin(async move {
            let token = self.auth.require_token().await?;
            let size = file.bytes.len();
            let content_type = if file.content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                file.content_type
            };
            let response = self
                .http
                .post(format!("{STORAGE_BASE}/b/{}/o", self.config.storage_bucket))
                .query(&[("uploadType", "media"), ("name", path)])
                .header(AUTHORIZATION, format!("Firebase {token}"))
                .header(CONTENT_TYPE, content_type)
                .body(file.bytes)
                .send()
                .await?;
            let uploaded: UploadResponse = check_status(response).await?.json().await?;
            tracing::debug!(object = %uploaded.name, size, "upload finished");
            Ok(download_url(
                &uploaded.bucket,
                &uploaded.name,
                uploaded.download_tokens.as_deref(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_urls_escape_the_object_path() {
        assert_eq!(
            download_url("stage.appspot.com", "audio/17-Act 1.mp3", Some("t1,t2")),
            "https://firebasestorage.googleapis.com/v0/b/stage.appspot.com/o/audio%2F17-Act%201.mp3?alt=media&token=t1"
        );
        assert_eq!(
            download_url("b", "sheetmusic/1-x.pdf", None),
            "https://firebasestorage.googleapis.com/v0/b/b/o/sheetmusic%2F1-x.pdf?alt=media"
        );
    }
}
