//! Media uploads to the storage bucket, sent as multipart form data.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use lokitos_types::ValidatedMedia;

use crate::BackendError;
use crate::client::{Attempts, BackendClient, decode};

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

impl BackendClient {
    /// Upload an image or video and return its public URL.
    ///
    /// Takes [`ValidatedMedia`] so size and type limits are already enforced;
    /// see [`lokitos_types::validate_media`].
    pub async fn upload(&self, media: ValidatedMedia) -> Result<String, BackendError> {
        self.require_viewer()?;
        let url = self.endpoint("/storage/v1/upload")?;

        let mut part_headers = HeaderMap::new();
        let content_type = HeaderValue::from_str(media.mime_type()).map_err(|_| {
            BackendError::Validation(lokitos_types::DraftError::Media(
                lokitos_types::MediaValidationError::UnsupportedType {
                    mime: media.mime_type().to_string(),
                },
            ))
        })?;
        part_headers.insert(CONTENT_TYPE, content_type);

        let kind = media.kind();
        let size = media.bytes().len();
        let file_name = media.file_name().to_string();
        let bytes = media.into_bytes();

        let response = self
            .send(
                |http| {
                    let part = Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .headers(part_headers.clone());
                    http.post(url.clone()).multipart(Form::new().part("file", part))
                },
                Attempts::Once,
            )
            .await?;
        let uploaded: UploadResponse = decode(response).await?;

        tracing::info!(%kind, size, url = %uploaded.url, "Uploaded media");
        Ok(uploaded.url)
    }
}
