use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::error::UploadError;

const CATBOX_API: &str = "https://catbox.moe/user/api.php";

/// A file host that turns bytes into a public URL.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, content: Vec<u8>, file_name: &str) -> Result<String, UploadError>;
}

pub struct Catbox {
    client: reqwest::Client,
    user_hash: Option<String>,
}

impl Catbox {
    /// Uploads are anonymous when no user hash is given.
    pub fn new(user_hash: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_hash,
        }
    }
}

#[async_trait]
impl FileUploader for Catbox {
    async fn upload(&self, content: Vec<u8>, file_name: &str) -> Result<String, UploadError> {
        let mut form = Form::new().text("reqtype", "fileupload");
        if let Some(hash) = &self.user_hash {
            form = form.text("userhash", hash.clone());
        }
        form = form.part(
            "fileToUpload",
            Part::bytes(content).file_name(file_name.to_string()),
        );

        let response = self
            .client
            .post(CATBOX_API)
            .multipart(form)
            .send()
            .await
            .map_err(|source| UploadError::Request {
                file_name: file_name.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| UploadError::Request {
            file_name: file_name.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(UploadError::Status {
                file_name: file_name.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let url = body.trim();
        if !url.starts_with("http") {
            return Err(UploadError::InvalidResponse {
                file_name: file_name.to_string(),
                body,
            });
        }

        Ok(url.to_string())
    }
}
