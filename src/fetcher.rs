use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SadPandaCredentials;
use crate::error::FetchError;
use crate::gallery::{SAD_PANDA_BASE, SAD_PANDA_COOKIE_DOMAIN};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(40);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// The network side of the scraper: plain GETs returning text or bytes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// A cookie jar holding the three session cookies, scoped to the sad panda
/// domain and the root path.
pub fn session_jar(credentials: &SadPandaCredentials) -> Jar {
    let jar = Jar::default();
    let origin = SAD_PANDA_BASE
        .parse::<reqwest::Url>()
        .expect("valid sad panda base url");
    for (name, value) in credentials.cookies() {
        let cookie = format!(
            "{}={}; Domain={}; Path=/",
            name, value, SAD_PANDA_COOKIE_DOMAIN
        );
        jar.add_cookie_str(&cookie, &origin);
    }
    jar
}

/// Without valid cookies the site answers with an empty body.
pub fn non_empty_document(url: &str, body: String) -> Result<String, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::EmptyDocument {
            url: url.to_string(),
        });
    }
    Ok(body)
}

/// An HTTP client carrying the sad panda session cookies.
pub struct SessionClient {
    client: reqwest::Client,
}

impl SessionClient {
    pub fn new(credentials: &SadPandaCredentials) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::new(session_jar(credentials)))
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "*/*")
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for SessionClient {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let html = self
            .send(url)
            .await?
            .text()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        non_empty_document(url, html)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .send(url)
            .await?
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}
