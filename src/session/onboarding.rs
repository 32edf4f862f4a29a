// Onboarding operations for a signed-in user. Each successful call also says
// which screen comes next.

use std::sync::Arc;

use crate::config::ValidationRules;
use crate::error::{ClientError, GatewayError};
use crate::gateway::{OnboardingApi, OnboardingStep};
use crate::session::store::{Action, SessionStore};
use crate::types::{
    AccessRequestStatus, Address, ApiAck, InvitationActivateRequest, InvitationActivateResponse,
    InvitationStatus,
};
use crate::validation;

pub struct OnboardingController {
    api: Arc<dyn OnboardingApi>,
    store: Arc<SessionStore>,
    rules: ValidationRules,
}

impl OnboardingController {
    pub fn new(api: Arc<dyn OnboardingApi>, store: Arc<SessionStore>, rules: ValidationRules) -> Self {
        Self { api, store, rules }
    }

    pub async fn request_access(&self, access_type: &str, reason: &str) -> Result<(ApiAck, OnboardingStep), ClientError> {
        let request = validation::validate_access_request(access_type, reason, &self.rules)?;
        let token = self.token().await?;
        match self.api.submit_access_request(&token, &request).await {
            Ok(ack) => Ok((ack, OnboardingStep::after_access_request())),
            Err(e) => Err(self.classify(e).await),
        }
    }

    /// Latest access request, if the user ever submitted one.
    pub async fn request_status(&self) -> Result<Option<(AccessRequestStatus, OnboardingStep)>, ClientError> {
        let token = self.token().await?;
        match self.api.my_access_request(&token).await {
            Ok(status) => Ok(status.map(|s| {
                let step = OnboardingStep::for_request_status(&s);
                (s, step)
            })),
            Err(e) => Err(self.classify(e).await),
        }
    }

    /// Invitation lookup works with or without a session.
    pub async fn validate_invitation(&self, code: &str) -> Result<InvitationStatus, ClientError> {
        let code = required_code(code)?;
        let token = self.store.access_token();
        match self.api.validate_invitation(token.as_deref(), code).await {
            Ok(status) => Ok(status),
            Err(e) => Err(self.classify(e).await),
        }
    }

    pub async fn activate_invitation(
        &self,
        code: &str,
    ) -> Result<(InvitationActivateResponse, OnboardingStep), ClientError> {
        let code = required_code(code)?;
        let token = self.token().await?;
        let request = InvitationActivateRequest { code: code.to_string() };
        match self.api.activate_invitation(&token, &request).await {
            Ok(response) => {
                let step = OnboardingStep::after_activation(&response);
                Ok((response, step))
            }
            Err(e) => Err(self.classify(e).await),
        }
    }

    pub async fn complete_profile(
        &self,
        gst_number: &str,
        business_name: &str,
        address: &Address,
    ) -> Result<ApiAck, ClientError> {
        let request = validation::validate_complete_profile(gst_number, business_name, address, &self.rules)?;
        let token = self.token().await?;
        match self.api.complete_profile(&token, &request).await {
            Ok(ack) => Ok(ack),
            Err(e) => Err(self.classify(e).await),
        }
    }

    async fn token(&self) -> Result<String, ClientError> {
        match self.store.access_token() {
            Some(token) => Ok(token),
            None => {
                self.store.dispatch(Action::Logout).await;
                Err(ClientError::session_invalidated())
            }
        }
    }

    async fn classify(&self, err: GatewayError) -> ClientError {
        // 403 here means the invitation or request was refused, not that the session died.
        let expired = matches!(err.status(), Some(401) | Some(410));
        if expired {
            tracing::info!(status = ?err.status(), "session token rejected during onboarding");
            self.store.dispatch(Action::Logout).await;
            return ClientError::session_invalidated();
        }
        ClientError::from_gateway(&err)
    }
}

fn required_code(code: &str) -> Result<&str, ClientError> {
    let code = code.trim();
    if code.is_empty() {
        let mut fields = std::collections::HashMap::new();
        fields.insert("code".to_string(), "Invitation code is required".to_string());
        return Err(ClientError::validation(fields));
    }
    Ok(code)
}
