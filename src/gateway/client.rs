// HTTP implementation of the gateway traits on top of reqwest.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{paths, AuthApi};
use crate::config::ApiConfig;
use crate::error::{GatewayError, SetupError};
use crate::types::{
    ApiAck, AuthResponse, EmailRequest, LoginRequest, ResetPasswordRequest, SignupRequest, User,
    VerifyEmailAck, VerifyEmailRequest,
};

/// Error body shape; the backend puts the code and text at the top level,
/// older deployments nest them under `data`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Box<ErrorBody>>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.code())
            .or_else(|| self.code.clone())
    }

    fn message(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.message())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
    }
}

/// Stateless client for the backend API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuthGateway {
    http: reqwest::Client,
    base_url: Url,
    log_requests: bool,
}

impl AuthGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, SetupError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| SetupError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            log_requests: config.enable_request_logging,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Network(format!("invalid endpoint {path}: {e}")))
    }

    pub(crate) fn request(&self, method: Method, path: &str, token: Option<&str>) -> Result<RequestBuilder, GatewayError> {
        let url = self.endpoint(path)?;
        let mut builder = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Send a request and decode the success payload.
    pub(crate) async fn call<T: DeserializeOwned>(&self, path: &str, builder: RequestBuilder) -> Result<T, GatewayError> {
        let value = self.call_raw(path, builder).await?;
        decode_payload(value)
    }

    pub(crate) async fn call_raw(&self, path: &str, builder: RequestBuilder) -> Result<Value, GatewayError> {
        let started = Instant::now();
        let result = match builder.send().await {
            Ok(response) => read_response(response).await,
            Err(e) => Err(GatewayError::from(e)),
        };

        if self.log_requests {
            match &result {
                Ok(_) => tracing::debug!(path, elapsed_ms = started.elapsed().as_millis() as u64, "request ok"),
                Err(e) => tracing::debug!(path, elapsed_ms = started.elapsed().as_millis() as u64, error = %e, "request failed"),
            }
        }
        result
    }
}

async fn read_response(response: Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(GatewayError::from)?;

    if status.is_success() {
        if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Default::default()));
        }
        return serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()));
    }

    let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
    Err(GatewayError::server(status.as_u16(), body.code(), body.message()))
}

/// Accept either a bare payload or one wrapped as `{ "success": true, "data": ... }`.
pub(crate) fn decode_payload<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Ok(decoded),
        Err(direct) => match value {
            Value::Object(mut map) if map.contains_key("data") => {
                let data = map.remove("data").unwrap_or(Value::Null);
                serde_json::from_value(data).map_err(|e| GatewayError::Decode(e.to_string()))
            }
            _ => Err(GatewayError::Decode(direct.to_string())),
        },
    }
}

#[async_trait]
impl AuthApi for AuthGateway {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, GatewayError> {
        let builder = self.request(Method::POST, paths::LOGIN, None)?.json(request);
        self.call(paths::LOGIN, builder).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<ApiAck, GatewayError> {
        let builder = self.request(Method::POST, paths::SIGNUP, None)?.json(request);
        self.call(paths::SIGNUP, builder).await
    }

    async fn verify_email(&self, request: &VerifyEmailRequest) -> Result<VerifyEmailAck, GatewayError> {
        let builder = self.request(Method::POST, paths::VERIFY_EMAIL, None)?.json(request);
        self.call(paths::VERIFY_EMAIL, builder).await
    }

    async fn resend_verification(&self, request: &EmailRequest) -> Result<ApiAck, GatewayError> {
        let builder = self
            .request(Method::POST, paths::RESEND_VERIFICATION, None)?
            .json(request);
        self.call(paths::RESEND_VERIFICATION, builder).await
    }

    async fn refresh_token(&self, token: &str) -> Result<AuthResponse, GatewayError> {
        let builder = self.request(Method::POST, paths::REFRESH, Some(token))?;
        self.call(paths::REFRESH, builder).await
    }

    async fn get_current_user(&self, token: &str) -> Result<User, GatewayError> {
        let builder = self.request(Method::GET, paths::ME, Some(token))?;
        self.call(paths::ME, builder).await
    }

    async fn logout(&self, token: &str) -> Result<(), GatewayError> {
        let builder = self.request(Method::POST, paths::LOGOUT, Some(token))?;
        self.call_raw(paths::LOGOUT, builder).await.map(|_| ())
    }

    async fn forgot_password(&self, request: &EmailRequest) -> Result<ApiAck, GatewayError> {
        let builder = self
            .request(Method::POST, paths::FORGOT_PASSWORD, None)?
            .json(request);
        self.call(paths::FORGOT_PASSWORD, builder).await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<ApiAck, GatewayError> {
        let builder = self
            .request(Method::POST, paths::RESET_PASSWORD, None)?
            .json(request);
        self.call(paths::RESET_PASSWORD, builder).await
    }
}
