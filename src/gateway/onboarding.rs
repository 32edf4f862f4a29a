// Onboarding endpoints: access requests, invitations and profile completion.

use async_trait::async_trait;
use reqwest::Method;

use super::{paths, AuthGateway, OnboardingApi};
use crate::error::GatewayError;
use crate::guard::Route;
use crate::types::{
    AccessRequestState, AccessRequestStatus, AccessRequestSubmit, ActivationState, ApiAck,
    CompleteProfileRequest, InvitationActivateRequest, InvitationActivateResponse, InvitationStatus,
};

/// Screen a user is sent to after an onboarding action settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    CompleteProfile,
    PendingVerification,
    PendingApproval,
    /// Request was turned down; the user can only go back to login.
    Rejected,
    /// Nothing left to do; the regular landing screen applies.
    Done,
}

impl OnboardingStep {
    pub fn after_activation(response: &InvitationActivateResponse) -> Self {
        match response.status {
            ActivationState::Activated => OnboardingStep::CompleteProfile,
            ActivationState::PendingVerification => OnboardingStep::PendingVerification,
        }
    }

    /// A freshly submitted access request always waits on an administrator.
    pub fn after_access_request() -> Self {
        OnboardingStep::PendingApproval
    }

    pub fn for_request_status(status: &AccessRequestStatus) -> Self {
        match status.status {
            AccessRequestState::Pending => OnboardingStep::PendingApproval,
            AccessRequestState::Approved => OnboardingStep::Done,
            AccessRequestState::Rejected => OnboardingStep::Rejected,
        }
    }

    pub fn route(&self) -> Route {
        match self {
            OnboardingStep::CompleteProfile => Route::CompleteProfile,
            OnboardingStep::PendingVerification => Route::PendingVerification,
            OnboardingStep::PendingApproval => Route::PendingApproval,
            OnboardingStep::Rejected => Route::Login,
            OnboardingStep::Done => Route::Home,
        }
    }
}

#[async_trait]
impl OnboardingApi for AuthGateway {
    async fn submit_access_request(
        &self,
        token: &str,
        request: &AccessRequestSubmit,
    ) -> Result<ApiAck, GatewayError> {
        let builder = self
            .request(Method::POST, paths::ACCESS_REQUESTS, Some(token))?
            .json(request);
        self.call(paths::ACCESS_REQUESTS, builder).await
    }

    async fn my_access_request(&self, token: &str) -> Result<Option<AccessRequestStatus>, GatewayError> {
        let builder = self.request(Method::GET, paths::MY_ACCESS_REQUEST, Some(token))?;
        match self.call(paths::MY_ACCESS_REQUEST, builder).await {
            Err(GatewayError::Server { status: 404, .. }) => Ok(None),
            other => other,
        }
    }

    async fn validate_invitation(&self, token: Option<&str>, code: &str) -> Result<InvitationStatus, GatewayError> {
        let builder = self
            .request(Method::GET, paths::VALIDATE_INVITATION, token)?
            .query(&[("code", code)]);
        self.call(paths::VALIDATE_INVITATION, builder).await
    }

    async fn activate_invitation(
        &self,
        token: &str,
        request: &InvitationActivateRequest,
    ) -> Result<InvitationActivateResponse, GatewayError> {
        let builder = self
            .request(Method::POST, paths::ACTIVATE_INVITATION, Some(token))?
            .json(request);
        self.call(paths::ACTIVATE_INVITATION, builder).await
    }

    async fn complete_profile(&self, token: &str, request: &CompleteProfileRequest) -> Result<ApiAck, GatewayError> {
        let builder = self
            .request(Method::PUT, paths::COMPLETE_PROFILE, Some(token))?
            .json(request);
        self.call(paths::COMPLETE_PROFILE, builder).await
    }
}
