// Remote gateway: stateless request/response calls against the backend.
//
// The traits are the seam the session controller and bootstrapper depend on;
// `AuthGateway` is the HTTP implementation.

pub mod client;
pub mod onboarding;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{
    AccessRequestStatus, AccessRequestSubmit, ApiAck, AuthResponse, CompleteProfileRequest,
    EmailRequest, InvitationActivateRequest, InvitationActivateResponse, InvitationStatus,
    LoginRequest, ResetPasswordRequest, SignupRequest, User, VerifyEmailAck, VerifyEmailRequest,
};

pub use client::AuthGateway;
pub use onboarding::OnboardingStep;

/// Endpoint paths under the base API URL.
pub mod paths {
    pub const SIGNUP: &str = "/api/auth/signup";
    pub const VERIFY_EMAIL: &str = "/api/auth/verify-email";
    pub const RESEND_VERIFICATION: &str = "/api/auth/resend-verification";
    pub const LOGIN: &str = "/api/auth/login";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const REFRESH: &str = "/api/auth/refresh";
    pub const FORGOT_PASSWORD: &str = "/api/auth/forgot-password";
    pub const RESET_PASSWORD: &str = "/api/auth/reset-password";
    pub const ME: &str = "/api/auth/me";
    pub const ACCESS_REQUESTS: &str = "/api/access-requests";
    pub const MY_ACCESS_REQUEST: &str = "/api/access-requests/mine";
    pub const VALIDATE_INVITATION: &str = "/api/invitations/validate";
    pub const ACTIVATE_INVITATION: &str = "/api/invitations/activate";
    pub const COMPLETE_PROFILE: &str = "/api/profile/complete";
}

/// Authentication endpoints. Calls that act on an existing session take the
/// bearer token explicitly; the gateway itself holds no session state.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, GatewayError>;

    async fn signup(&self, request: &SignupRequest) -> Result<ApiAck, GatewayError>;

    async fn verify_email(&self, request: &VerifyEmailRequest) -> Result<VerifyEmailAck, GatewayError>;

    async fn resend_verification(&self, request: &EmailRequest) -> Result<ApiAck, GatewayError>;

    async fn refresh_token(&self, token: &str) -> Result<AuthResponse, GatewayError>;

    async fn get_current_user(&self, token: &str) -> Result<User, GatewayError>;

    async fn logout(&self, token: &str) -> Result<(), GatewayError>;

    async fn forgot_password(&self, request: &EmailRequest) -> Result<ApiAck, GatewayError>;

    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<ApiAck, GatewayError>;
}

/// Access-request, invitation and profile endpoints used during onboarding.
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    async fn submit_access_request(
        &self,
        token: &str,
        request: &AccessRequestSubmit,
    ) -> Result<ApiAck, GatewayError>;

    /// The caller's own access request, if one was ever submitted.
    async fn my_access_request(&self, token: &str) -> Result<Option<AccessRequestStatus>, GatewayError>;

    async fn validate_invitation(&self, token: Option<&str>, code: &str) -> Result<InvitationStatus, GatewayError>;

    async fn activate_invitation(
        &self,
        token: &str,
        request: &InvitationActivateRequest,
    ) -> Result<InvitationActivateResponse, GatewayError>;

    async fn complete_profile(&self, token: &str, request: &CompleteProfileRequest) -> Result<ApiAck, GatewayError>;
}
