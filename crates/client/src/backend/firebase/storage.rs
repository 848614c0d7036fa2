//! Storage REST client.
//!
//! Uploads stream the body in chunks so progress can be reported as bytes
//! leave the client. Requests are authorized with the signed-in user's ID
//! token.

use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tracing::instrument;
use url::Url;

use super::{IdentityToolkit, error_from_response};
use crate::backend::{BackendError, BlobStorage, BlobUpload, UploadProgress};
use crate::config::BackendConfig;

/// Bytes per streamed body chunk.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Storage client for one bucket.
#[derive(Clone)]
pub struct StorageClient {
    inner: Arc<StorageClientInner>,
}

struct StorageClientInner {
    client: reqwest::Client,
    base_url: Url,
    bucket: String,
    identity: IdentityToolkit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl StorageClient {
    /// Create a client for the configured bucket.
    #[must_use]
    pub fn new(config: &BackendConfig, identity: IdentityToolkit) -> Self {
        Self {
            inner: Arc::new(StorageClientInner {
                client: reqwest::Client::new(),
                base_url: config.storage_url.clone(),
                bucket: config.storage_bucket.clone(),
                identity,
            }),
        }
    }

    fn objects_url(&self) -> String {
        format!(
            "{}/v0/b/{}/o",
            self.inner.base_url.as_str().trim_end_matches('/'),
            self.inner.bucket
        )
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.objects_url(), urlencoding::encode(path))
    }

    fn bearer(&self) -> Result<String, BackendError> {
        self.inner
            .identity
            .id_token()
            .map(|t| t.expose_secret().to_owned())
            .ok_or(BackendError::NoSession)
    }
}

#[async_trait]
impl BlobStorage for StorageClient {
    #[instrument(skip(self, upload, progress), fields(path = %upload.path, bytes = upload.bytes.len()))]
    async fn upload(
        &self,
        upload: BlobUpload,
        progress: &watch::Sender<UploadProgress>,
    ) -> Result<String, BackendError> {
        let token = self.bearer()?;
        let total = upload.bytes.len() as u64;
        progress.send_replace(UploadProgress {
            transferred: 0,
            total,
        });

        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();
        let bytes = upload.bytes;
        let body = stream! {
            let mut sent = 0_u64;
            for chunk in bytes.chunks(UPLOAD_CHUNK) {
                sent += chunk.len() as u64;
                let _ = sent_tx.send(sent);
                yield Ok::<_, std::io::Error>(chunk.to_vec());
            }
        };

        let mut url = Url::parse(&self.objects_url())
            .map_err(|e| BackendError::Parse(format!("storage URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &upload.path);

        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, upload.content_type.as_str())
            .body(reqwest::Body::wrap_stream(body))
            .send();
        tokio::pin!(request);

        let result = loop {
            tokio::select! {
                result = &mut request => break result,
                Some(sent) = sent_rx.recv() => {
                    progress.send_replace(UploadProgress { transferred: sent, total });
                }
            }
        };
        while let Ok(sent) = sent_rx.try_recv() {
            progress.send_replace(UploadProgress {
                transferred: sent,
                total,
            });
        }

        let response = result.map_err(|e| BackendError::UploadInterrupted(e.to_string()))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let metadata: ObjectMetadata = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(metadata.name)
    }

    #[instrument(skip(self))]
    async fn download_url(&self, path: &str) -> Result<String, BackendError> {
        let response = self
            .inner
            .client
            .get(self.object_url(path))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let metadata: ObjectMetadata = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BackendError::NotFound(format!("no download token for {path}")))?;

        Ok(format!(
            "{}?alt=media&token={}",
            self.object_url(&metadata.name),
            urlencoding::encode(token)
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> StorageClient {
        let host = Url::parse("http://127.0.0.1:9199/").unwrap();
        let config = BackendConfig::emulator("demo", &host);
        StorageClient::new(&config, IdentityToolkit::new(&config))
    }

    #[test]
    fn test_object_url_encodes_path_separators() {
        assert_eq!(
            client().object_url("orders/s1_u1/1700000000000_design.png"),
            "http://127.0.0.1:9199/v0/b/demo.appspot.com/o/orders%2Fs1_u1%2F1700000000000_design.png"
        );
    }

    #[tokio::test]
    async fn test_upload_requires_session() {
        let (tx, _rx) = watch::channel(UploadProgress::default());
        let err = client()
            .upload(
                BlobUpload {
                    path: "orders/a".to_owned(),
                    content_type: "image/png".to_owned(),
                    bytes: vec![1, 2, 3],
                },
                &tx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NoSession));
    }

    #[test]
    fn test_metadata_parses_download_tokens() {
        let meta: ObjectMetadata = serde_json::from_str(
            r#"{"name":"orders/a.png","bucket":"demo.appspot.com","downloadTokens":"abc,def"}"#,
        )
        .unwrap();
        assert_eq!(meta.download_tokens.as_deref(), Some("abc,def"));
    }
}
