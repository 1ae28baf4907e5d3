use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Address of a locally running library gateway.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";

#[derive(Debug, Error)]
pub enum PhotoLibraryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("base url cannot carry path segments: {0}")]
    BaseUrl(Url),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

#[derive(Clone)]
pub struct PhotoLibraryClient {
    http: Client,
    base_url: Url,
    session_token: String,
}

impl PhotoLibraryClient {
    pub fn with_base_url(
        base_url: &str,
        session_token: impl Into<String>,
    ) -> Result<Self, PhotoLibraryError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            session_token: session_token.into(),
        })
    }

    pub async fn list_photos(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<PhotoPage, PhotoLibraryError> {
        let mut url = self.endpoint("/v1/photos")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = offset {
                query.append_pair("offset", &offset.to_string());
            }
        }
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Walks every page of the library in server order.
    pub async fn list_all_photos(&self, page_size: u32) -> Result<Vec<Photo>, PhotoLibraryError> {
        let page_size = page_size.max(1);
        let mut offset = 0u32;
        let mut items = Vec::new();
        loop {
            let page = self.list_photos(Some(page_size), Some(offset)).await?;
            let received = page.items.len() as u32;
            offset = offset.saturating_add(received);
            let total = page.total;
            items.extend(page.items);
            if offset >= total || received == 0 {
                break;
            }
        }
        Ok(items)
    }

    pub async fn get_photo(&self, id: &str) -> Result<Photo, PhotoLibraryError> {
        let url = self.photo_endpoint(id, None)?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Starts the download of the original file. The body is left unread so
    /// callers can stream it.
    pub async fn open_original(&self, id: &str) -> Result<reqwest::Response, PhotoLibraryError> {
        let url = self.photo_endpoint(id, Some("original"))?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(PhotoLibraryError::Api { status, body })
        }
    }

    fn auth_header_value(&self) -> String {
        format!("Session {}", self.session_token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, PhotoLibraryError> {
        Ok(self.base_url.join(path)?)
    }

    fn photo_endpoint(&self, id: &str, suffix: Option<&str>) -> Result<Url, PhotoLibraryError> {
        let mut url = self.endpoint("/v1/photos")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PhotoLibraryError::BaseUrl(self.base_url.clone()))?;
            segments.push(id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PhotoLibraryError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(PhotoLibraryError::Api { status, body })
        }
    }
}

impl PhotoLibraryError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            PhotoLibraryError::Api { status, .. } => Some(classify_api_status(*status)),
            PhotoLibraryError::Request(err) => match err.status() {
                Some(status) => Some(classify_api_status(status)),
                None if err.is_connect() || err.is_timeout() || err.is_body() => {
                    Some(ApiErrorClass::Transient)
                }
                None => None,
            },
            _ => None,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        self.classification() == Some(ApiErrorClass::Auth)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.classification(),
            Some(ApiErrorClass::RateLimit | ApiErrorClass::Transient)
        )
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Photo {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PhotoPage {
    pub items: Vec<Photo>,
    pub limit: u32,
    pub offset: u32,
    pub total: u32,
}
