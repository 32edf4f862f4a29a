// Client error types: gateway failures and the user-facing taxonomy built on them
use std::collections::HashMap;
use thiserror::Error;

pub const GENERIC_FALLBACK: &str = "Something went wrong. Please try again";
pub const NETWORK_FALLBACK: &str = "Unable to connect. Please check your internet connection";
pub const TIMEOUT_FALLBACK: &str = "Request timed out. Please try again";

/// Translate a backend error code into the message shown to the user.
pub fn message_for_code(code: &str) -> Option<&'static str> {
    let message = match code {
        "UserNotFoundException" => "No account found with this email",
        "NotAuthorizedException" => "Incorrect email or password",
        "UserNotConfirmedException" => "Please verify your email first",
        "UsernameExistsException" => "An account with this email already exists",
        "InvalidPasswordException" => {
            "Password must be at least 8 characters with a number and uppercase letter"
        }
        "CodeMismatchException" => "Invalid verification code",
        "ExpiredCodeException" => "Code has expired. Please request a new one",
        "LimitExceededException" => "Too many attempts. Please try again in a few minutes",
        "InvalidInvitationCode" => "Invalid or expired invitation code",
        "InvitationAlreadyUsed" => "This invitation code has already been used",
        "AccessRequestPending" => "You already have a pending access request",
        "ProfileIncomplete" => "Please complete your profile to continue",
        "NetworkError" => NETWORK_FALLBACK,
        "TimeoutError" => TIMEOUT_FALLBACK,
        _ => return None,
    };
    Some(message)
}

/// Failure of a single request against the backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// No response within the request budget.
    #[error("request timed out")]
    Timeout,

    /// The request never produced a response (DNS, refused connection, TLS...).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {}", .code.as_deref().unwrap_or("no error code"))]
    Server {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    /// A success status with a body that did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn server(status: u16, code: Option<String>, message: Option<String>) -> Self {
        GatewayError::Server { status, code, message }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Server { code, .. } => code.as_deref(),
            GatewayError::Timeout => Some("TimeoutError"),
            GatewayError::Network(_) => Some("NetworkError"),
            GatewayError::Decode(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// No response came back at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::Network(_))
    }

    /// The server refused the presented token.
    pub fn is_session_rejection(&self) -> bool {
        match self {
            GatewayError::Server { status, code, .. } => {
                matches!(status, 401 | 403 | 410)
                    || code.as_deref() == Some("NotAuthorizedException")
            }
            _ => false,
        }
    }

    /// Message fit for display: mapped code, then the backend text, then a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Timeout => TIMEOUT_FALLBACK.to_string(),
            GatewayError::Network(_) => NETWORK_FALLBACK.to_string(),
            GatewayError::Decode(_) => GENERIC_FALLBACK.to_string(),
            GatewayError::Server { code, message, .. } => code
                .as_deref()
                .and_then(message_for_code)
                .map(str::to_string)
                .or_else(|| message.clone().filter(|m| !m.trim().is_empty()))
                .unwrap_or_else(|| GENERIC_FALLBACK.to_string()),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::server(status.as_u16(), None, None)
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Failure to build a gateway from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The four ways a user-facing operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Form input rejected locally; shown next to the offending field.
    Validation,
    /// Server refused the request (bad credentials, used invitation...); shown as a banner.
    Authentication,
    /// Stored or refreshed token no longer accepted; the session is cleared silently.
    SessionInvalidated,
    /// No response or timeout; shown as a banner, retried only by the user.
    Transport,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
    pub field_errors: HashMap<String, String>,
}

impl ClientError {
    pub fn validation(field_errors: HashMap<String, String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: "Please correct the highlighted fields".to_string(),
            field_errors,
        }
    }

    pub fn session_invalidated() -> Self {
        Self {
            kind: ErrorKind::SessionInvalidated,
            message: "Session expired".to_string(),
            field_errors: HashMap::new(),
        }
    }

    /// Classify a gateway failure from a user-initiated request.
    pub fn from_gateway(err: &GatewayError) -> Self {
        let kind = if err.is_transport() {
            ErrorKind::Transport
        } else {
            ErrorKind::Authentication
        };
        Self {
            kind,
            message: err.user_message(),
            field_errors: HashMap::new(),
        }
    }

    /// Text for the dismissible banner, if this error gets one.
    pub fn banner(&self) -> Option<&str> {
        match self.kind {
            ErrorKind::Authentication | ErrorKind::Transport => Some(&self.message),
            ErrorKind::Validation | ErrorKind::SessionInvalidated => None,
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        ClientError::from_gateway(&err)
    }
}
