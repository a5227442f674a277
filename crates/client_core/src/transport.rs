use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, COOKIE},
    Client,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ReservationType, Step},
    protocol::{PasswordResetResponse, StepResponse},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::{config::ClientSettings, error::TransportError};

pub const PASSWORD_RESET_PATH: &str = "/customer/recovery/password_reset/";

pub fn validate_path(reservation_type: ReservationType, step: Step) -> String {
    format!("/api/validate/{}/{}/", reservation_type.slug(), step.as_str())
}

#[async_trait]
pub trait StepTransport: Send + Sync {
    async fn validate_step(
        &self,
        reservation_type: ReservationType,
        step: Step,
        params: &[(String, String)],
    ) -> Result<StepResponse, TransportError>;

    async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<PasswordResetResponse, TransportError>;
}

/// Form-encoded POSTs against the site's validation API.
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    csrf_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
            csrf_token: None,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: settings.base_url()?,
            csrf_token: settings.csrf_token.clone(),
        })
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        if let Some(token) = &self.csrf_token {
            match (
                HeaderValue::from_str(token),
                HeaderValue::from_str(&format!("csrftoken={token}")),
            ) {
                (Ok(header), Ok(cookie)) => {
                    headers.insert("X-CSRFToken", header);
                    headers.insert(COOKIE, cookie);
                }
                _ => warn!("transport: csrf token is not a valid header value, sending without it"),
            }
        }
        headers
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, TransportError> {
        let endpoint = self.base_url.join(path)?;
        debug!(endpoint = %endpoint, fields = params.len(), "transport: posting form");
        let response = self
            .http
            .post(endpoint.clone())
            .headers(self.headers())
            .form(params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| TransportError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl StepTransport for HttpTransport {
    async fn validate_step(
        &self,
        reservation_type: ReservationType,
        step: Step,
        params: &[(String, String)],
    ) -> Result<StepResponse, TransportError> {
        self.post_form(&validate_path(reservation_type, step), params)
            .await
    }

    async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<PasswordResetResponse, TransportError> {
        let params = [("email".to_string(), email.to_string())];
        self.post_form(PASSWORD_RESET_PATH, &params).await
    }
}

/// Stand-in used when no server is configured.
pub struct MissingTransport;

#[async_trait]
impl StepTransport for MissingTransport {
    async fn validate_step(
        &self,
        _reservation_type: ReservationType,
        _step: Step,
        _params: &[(String, String)],
    ) -> Result<StepResponse, TransportError> {
        Err(TransportError::Unavailable("no validation server configured".into()))
    }

    async fn request_password_reset(
        &self,
        _email: &str,
    ) -> Result<PasswordResetResponse, TransportError> {
        Err(TransportError::Unavailable("no validation server configured".into()))
    }
}

/// A submitted validation request, as seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub reservation_type: ReservationType,
    pub step: Step,
    pub params: Vec<(String, String)>,
}

/// Replays queued responses in order; an empty queue behaves like a dropped
/// connection.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<serde_json::Value, String>>>,
    reset_responses: Mutex<VecDeque<Result<serde_json::Value, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_response(&self, body: serde_json::Value) {
        self.responses.lock().await.push_back(Ok(body));
    }

    pub async fn push_failure(&self, reason: impl Into<String>) {
        self.responses.lock().await.push_back(Err(reason.into()));
    }

    pub async fn push_reset_response(&self, body: serde_json::Value) {
        self.reset_responses.lock().await.push_back(Ok(body));
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    fn decode<T: DeserializeOwned>(
        next: Option<Result<serde_json::Value, String>>,
        endpoint: String,
    ) -> Result<T, TransportError> {
        match next {
            Some(Ok(body)) => serde_json::from_value(body)
                .map_err(|source| TransportError::Decode { endpoint, source }),
            Some(Err(reason)) => Err(TransportError::Unavailable(reason)),
            None => Err(TransportError::Unavailable(format!(
                "no scripted response for {endpoint}"
            ))),
        }
    }
}

#[async_trait]
impl StepTransport for ScriptedTransport {
    async fn validate_step(
        &self,
        reservation_type: ReservationType,
        step: Step,
        params: &[(String, String)],
    ) -> Result<StepResponse, TransportError> {
        self.requests.lock().await.push(RecordedRequest {
            reservation_type,
            step,
            params: params.to_vec(),
        });
        let next = self.responses.lock().await.pop_front();
        Self::decode(next, validate_path(reservation_type, step))
    }

    async fn request_password_reset(
        &self,
        _email: &str,
    ) -> Result<PasswordResetResponse, TransportError> {
        let next = self.reset_responses.lock().await.pop_front();
        Self::decode(next, PASSWORD_RESET_PATH.to_string())
    }
}
