use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;


#[derive(Debug, Error)]
pub enum SessionError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct SessionClient {
    http: Client,
    base_url: Url,
}

impl SessionClient {
    pub fn with_base_url(base_url: &str) -> Result<Self, SessionError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Session, SessionError> {
        let url = self.base_url.join("/v1/session")?;
        let body = SignInRequest { username, password };
        let response = self.http.post(url).json(&body).send().await?;
        Self::handle_response(response).await
    }

    pub async fn trusted_devices(
        &self,
        session: &Session,
    ) -> Result<Vec<TrustedDevice>, SessionError> {
        let url = self.base_url.join("/v1/session/devices")?;
        let response = self
            .http
            .get(url)
            .header("Authorization", session.auth_header_value())
            .send()
            .await?;
        let payload: DeviceList = Self::handle_response(response).await?;
        Ok(payload.devices)
    }

    /// Asks the service to deliver a verification code to `device`. Returns
    /// whether the service reports the code as sent.
    pub async fn send_verification_code(
        &self,
        session: &Session,
        device: &TrustedDevice,
    ) -> Result<bool, SessionError> {
        let url = self.base_url.join("/v1/session/verification")?;
        let response = self
            .http
            .post(url)
            .header("Authorization", session.auth_header_value())
            .json(&VerificationRequest {
                device_id: &device.id,
                code: None,
            })
            .send()
            .await?;
        let payload: CodeSent = Self::handle_response(response).await?;
        Ok(payload.sent)
    }

    /// Exchanges a verification code for an upgraded session. A rejected code
    /// yields `Ok(None)`.
    pub async fn validate_verification_code(
        &self,
        session: &Session,
        device: &TrustedDevice,
        code: &str,
    ) -> Result<Option<Session>, SessionError> {
        let url = self.base_url.join("/v1/session/verification/validate")?;
        let response = self
            .http
            .post(url)
            .header("Authorization", session.auth_header_value())
            .json(&VerificationRequest {
                device_id: &device.id,
                code: Some(code),
            })
            .send()
            .await?;
        let payload: Validation = Self::handle_response(response).await?;
        if !payload.verified {
            return Ok(None);
        }
        Ok(Some(Session {
            session_token: payload
                .session_token
                .unwrap_or_else(|| session.session_token.clone()),
            requires_2sa: false,
        }))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SessionError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SessionError::Api { status, body })
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Session {
    pub session_token: String,
    #[serde(default)]
    pub requires_2sa: bool,
}

impl Session {
    fn auth_header_value(&self) -> String {
        format!("Session {}", self.session_token)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrustedDevice {
    pub id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl TrustedDevice {
    pub fn label(&self) -> String {
        match (&self.device_name, &self.phone_number) {
            (Some(name), _) => name.clone(),
            (None, Some(phone)) => format!("SMS to {phone}"),
            (None, None) => format!("device {}", self.id),
        }
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct VerificationRequest<'a> {
    device_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

#[derive(Deserialize)]
struct DeviceList {
    devices: Vec<TrustedDevice>,
}

#[derive(Deserialize)]
struct CodeSent {
    sent: bool,
}

#[derive(Deserialize)]
struct Validation {
    verified: bool,
    #[serde(default)]
    session_token: Option<String>,
}
