// User-initiated auth operations: validate, call the gateway, then drive the
// session store with the outcome.

use std::sync::Arc;

use crate::config::ValidationRules;
use crate::error::{ClientError, GatewayError};
use crate::gateway::AuthApi;
use crate::session::store::{Action, Session, SessionStore};
use crate::types::{ApiAck, User, VerifyEmailAck};
use crate::validation::{self, SignupForm};

pub struct AuthController {
    api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    rules: ValidationRules,
}

impl AuthController {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<SessionStore>, rules: ValidationRules) -> Self {
        Self { api, store, rules }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Exchange credentials for a session. On failure the session is untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = validation::validate_login(email, password, &self.rules)?;

        match self.api.login(&request).await {
            Ok(response) => {
                tracing::info!(role = response.user.role.as_str(), "login succeeded");
                Ok(self.store.dispatch(Action::LoginSucceeded(response)).await)
            }
            Err(e) => {
                tracing::debug!(error = %e, "login rejected");
                Err(ClientError::from_gateway(&e))
            }
        }
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<ApiAck, ClientError> {
        let request = validation::validate_signup(form, &self.rules)?;
        Ok(self.api.signup(&request).await?)
    }

    pub async fn verify_email(
        &self,
        email: Option<&str>,
        link_token: Option<&str>,
        code: Option<&str>,
    ) -> Result<VerifyEmailAck, ClientError> {
        let request = validation::validate_verify_email(email, link_token, code, &self.rules)?;
        Ok(self.api.verify_email(&request).await?)
    }

    pub async fn resend_verification(&self, email: &str) -> Result<ApiAck, ClientError> {
        let request = validation::validate_email_request(email)?;
        Ok(self.api.resend_verification(&request).await?)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ApiAck, ClientError> {
        let request = validation::validate_email_request(email)?;
        Ok(self.api.forgot_password(&request).await?)
    }

    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<ApiAck, ClientError> {
        let request = validation::validate_reset_password(email, code, new_password, &self.rules)?;
        Ok(self.api.reset_password(&request).await?)
    }

    /// Renew the held token. A rejected token ends the session without a banner.
    pub async fn refresh(&self) -> Result<Session, ClientError> {
        let Some(token) = self.store.access_token() else {
            self.store.dispatch(Action::Logout).await;
            return Err(ClientError::session_invalidated());
        };

        match self.api.refresh_token(&token).await {
            Ok(response) => Ok(self.store.dispatch(Action::RefreshSucceeded(response)).await),
            Err(e) => Err(self.handle_session_failure(e).await),
        }
    }

    /// Fetch the current user with the held token and mark the session authenticated.
    pub async fn reload_user(&self) -> Result<User, ClientError> {
        let Some(token) = self.store.access_token() else {
            return Err(ClientError::session_invalidated());
        };

        match self.api.get_current_user(&token).await {
            Ok(user) => {
                self.store.dispatch(Action::CurrentUserFetched(user.clone())).await;
                Ok(user)
            }
            Err(e) => Err(self.handle_session_failure(e).await),
        }
    }

    /// Sign out. The local session always ends, even if the server call fails.
    pub async fn logout(&self) -> Session {
        let Some(token) = self.store.access_token() else {
            return self.store.dispatch(Action::Logout).await;
        };

        match self.api.logout(&token).await {
            Ok(()) => self.store.dispatch(Action::LogoutSucceeded).await,
            Err(e) => {
                tracing::warn!(error = %e, "remote logout failed, clearing local session");
                self.store.dispatch(Action::Logout).await
            }
        }
    }

    async fn handle_session_failure(&self, err: GatewayError) -> ClientError {
        if err.is_session_rejection() {
            tracing::info!(status = ?err.status(), "session token rejected, signing out");
            self.store.dispatch(Action::Logout).await;
            return ClientError::session_invalidated();
        }
        ClientError::from_gateway(&err)
    }
}
