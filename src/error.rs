use thiserror::Error;

use crate::gallery::GalleryId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned an empty document (sad panda), check the cookies")]
    EmptyDocument { url: String },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload of '{file_name}' failed: {source}")]
    Request {
        file_name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload of '{file_name}' was rejected with HTTP {status}: {body}")]
    Status {
        file_name: String,
        status: u16,
        body: String,
    },

    #[error("file host returned an unusable response for '{file_name}': {body}")]
    InvalidResponse { file_name: String, body: String },
}

#[derive(Debug, Error)]
pub enum SadPandaError {
    #[error("sad panda functionality is turned off, no cookies were provided")]
    Disabled,

    #[error("sad panda controller has been closed")]
    Closed,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not scrape '{id}': {message}")]
    Scrape {
        id: GalleryId,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Failure while mining a parsed document; carries no gallery id yet.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing required element '{field}'")]
    Missing { field: &'static str },

    #[error("{message}")]
    Malformed {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
}

impl ExtractError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ExtractError::Malformed {
            message: message.into(),
            cause: None,
        }
    }

    pub fn malformed_by(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        ExtractError::Malformed {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn into_scrape(self, id: &GalleryId) -> SadPandaError {
        let message = self.to_string();
        let cause = match self {
            ExtractError::Missing { .. } => None,
            ExtractError::Malformed { cause, .. } => cause,
        };
        SadPandaError::Scrape {
            id: id.clone(),
            message,
            cause,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
