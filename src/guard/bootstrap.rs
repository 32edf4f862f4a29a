// Cold-start restore: read the persisted token once and settle the session.

use std::sync::Arc;

use tokio::sync::watch;

use crate::gateway::AuthApi;
use crate::session::{Action, Session, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    Uninitialized,
    Initializing,
    Ready,
}

pub struct Bootstrapper {
    api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    phase: watch::Sender<BootPhase>,
}

impl Bootstrapper {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<SessionStore>) -> Self {
        let (phase, _) = watch::channel(BootPhase::Uninitialized);
        Self { api, store, phase }
    }

    pub fn phase(&self) -> BootPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<BootPhase> {
        self.phase.subscribe()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Restore the session from storage. Only one call does the work; others
    /// wait for it to finish and return the settled session. A run dropped
    /// before it settles hands the phase back, and the next caller starts over.
    pub async fn run(&self) -> Session {
        let mut phase = self.phase.subscribe();
        loop {
            if let Some(claim) = self.claim() {
                let session = self.restore().await;
                claim.settle();
                tracing::info!(authenticated = session.is_authenticated, "bootstrap complete");
                return session;
            }

            let settled = phase
                .wait_for(|p| *p != BootPhase::Initializing)
                .await
                .map(|p| *p == BootPhase::Ready);
            match settled {
                Ok(false) => continue,
                Ok(true) | Err(_) => return self.store.snapshot(),
            }
        }
    }

    fn claim(&self) -> Option<Claim<'_>> {
        let claimed = self.phase.send_if_modified(|phase| {
            if *phase == BootPhase::Uninitialized {
                *phase = BootPhase::Initializing;
                true
            } else {
                false
            }
        });
        claimed.then(|| Claim {
            phase: &self.phase,
            settled: false,
        })
    }

    async fn restore(&self) -> Session {
        let Some(token) = self.store.token_store().get_token().await else {
            return self.store.dispatch(Action::InitializeFromStorage(None)).await;
        };

        self.store.dispatch(Action::TokenRestored(token.clone())).await;
        match self.api.get_current_user(&token).await {
            Ok(user) => self.store.dispatch(Action::CurrentUserFetched(user)).await,
            Err(e) => {
                // Any failure here, transport included, counts as a dead token.
                tracing::info!(error = %e, "stored token rejected");
                self.store.dispatch(Action::CurrentUserRejected).await
            }
        }
    }
}

/// Exclusive right to run the restore. Dropped unsettled, it resets the phase.
struct Claim<'a> {
    phase: &'a watch::Sender<BootPhase>,
    settled: bool,
}

impl Claim<'_> {
    fn settle(mut self) {
        self.settled = true;
        self.phase.send_replace(BootPhase::Ready);
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("bootstrap dropped before settling");
            self.phase.send_replace(BootPhase::Uninitialized);
        }
    }
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::session::{MemoryTokenStore, TokenStore};
    use crate::types::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeApi {
        me: Result<User, GatewayError>,
        calls: AtomicUsize,
        /// Leading `me` calls that hang instead of answering.
        stalled_calls: usize,
    }

    impl FakeApi {
        fn new(me: Result<User, GatewayError>) -> Arc<Self> {
            Self::stalling(me, 0)
        }

        fn stalling(me: Result<User, GatewayError>, stalled_calls: usize) -> Arc<Self> {
            Arc::new(Self {
                me,
                calls: AtomicUsize::new(0),
                stalled_calls,
            })
        }
    }

    #[async_trait]
    impl AuthApi for FakeApi {
        async fn login(&self, _: &LoginRequest) -> Result<AuthResponse, GatewayError> {
            unimplemented!()
        }
        async fn signup(&self, _: &SignupRequest) -> Result<ApiAck, GatewayError> {
            unimplemented!()
        }
        async fn verify_email(&self, _: &VerifyEmailRequest) -> Result<VerifyEmailAck, GatewayError> {
            unimplemented!()
        }
        async fn resend_verification(&self, _: &EmailRequest) -> Result<ApiAck, GatewayError> {
            unimplemented!()
        }
        async fn refresh_token(&self, _: &str) -> Result<AuthResponse, GatewayError> {
            unimplemented!()
        }
        async fn get_current_user(&self, _: &str) -> Result<User, GatewayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.stalled_calls {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.me.clone()
        }
        async fn logout(&self, _: &str) -> Result<(), GatewayError> {
            unimplemented!()
        }
        async fn forgot_password(&self, _: &EmailRequest) -> Result<ApiAck, GatewayError> {
            unimplemented!()
        }
        async fn reset_password(&self, _: &ResetPasswordRequest) -> Result<ApiAck, GatewayError> {
            unimplemented!()
        }
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            email: "a@b.com".into(),
            name: "Asha".into(),
            phone: None,
            role: UserRole::CaOwner,
            staff_type: None,
            permissions: None,
            tenant_id: None,
            client_id: None,
            department: None,
            assigned_client_ids: None,
            status: UserStatus::Active,
            created_at: None,
        }
    }

    fn setup(token: Option<&str>, me: Result<User, GatewayError>) -> (Arc<FakeApi>, Arc<MemoryTokenStore>, Bootstrapper) {
        let tokens = Arc::new(match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::default(),
        });
        let store = Arc::new(SessionStore::new(tokens.clone()));
        let api = FakeApi::new(me);
        let boot = Bootstrapper::new(api.clone(), store);
        (api, tokens, boot)
    }

    #[tokio::test]
    async fn test_no_token_settles_signed_out() {
        let (api, _, boot) = setup(None, Ok(user()));
        assert_eq!(boot.phase(), BootPhase::Uninitialized);

        let session = boot.run().await;
        assert!(!session.is_authenticated);
        assert!(!session.is_loading);
        assert_eq!(boot.phase(), BootPhase::Ready);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_token_restores_session() {
        let (_, tokens, boot) = setup(Some("t1"), Ok(user()));
        let session = boot.run().await;
        assert!(session.is_authenticated);
        assert_eq!(session.access_token.as_deref(), Some("t1"));
        assert_eq!(session.user.map(|u| u.id), Some("u1".to_string()));
        assert_eq!(tokens.get_token().await.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_rejected_token_is_removed() {
        let (_, tokens, boot) = setup(Some("stale"), Err(GatewayError::server(401, None, None)));
        let session = boot.run().await;
        assert!(!session.is_authenticated);
        assert!(!session.is_loading);
        assert!(session.access_token.is_none());
        assert_eq!(tokens.get_token().await, None);
    }

    #[tokio::test]
    async fn test_transport_failure_also_signs_out() {
        let (_, tokens, boot) = setup(Some("t1"), Err(GatewayError::Timeout));
        let session = boot.run().await;
        assert!(!session.is_authenticated);
        assert_eq!(tokens.get_token().await, None);
    }

    #[tokio::test]
    async fn test_runs_only_once() {
        let (api, _, boot) = setup(Some("t1"), Ok(user()));
        let (first, second) = tokio::join!(boot.run(), boot.run());
        assert_eq!(first, second);
        boot.run().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_run_resets_phase_and_retries() {
        let tokens = Arc::new(MemoryTokenStore::with_token("t1"));
        let store = Arc::new(SessionStore::new(tokens.clone()));
        let api = FakeApi::stalling(Ok(user()), 1);
        let boot = Bootstrapper::new(api.clone(), store);

        let first = tokio::time::timeout(Duration::from_millis(20), boot.run()).await;
        assert!(first.is_err());
        assert_eq!(boot.phase(), BootPhase::Uninitialized);
        assert!(boot.store().snapshot().is_loading);

        let session = tokio::time::timeout(Duration::from_secs(1), boot.run())
            .await
            .expect("second run settles");
        assert!(session.is_authenticated);
        assert_eq!(boot.phase(), BootPhase::Ready);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_waiter_takes_over_when_runner_is_dropped() {
        let (api, _, boot) = setup(Some("t1"), Ok(user()));
        let boot = Arc::new(boot);

        // Hold the claim by hand, then drop it while another caller waits.
        let claim = boot.claim().expect("first claim");
        let waiter = {
            let boot = boot.clone();
            tokio::spawn(async move { boot.run().await })
        };
        tokio::task::yield_now().await;
        drop(claim);

        let session = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter settles")
            .expect("task joins");
        assert!(session.is_authenticated);
        assert_eq!(boot.phase(), BootPhase::Ready);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
