// Session store: pure reducer + injectable state container.
//
// Views never touch Session directly. Every change goes through `reduce`,
// which also says what must happen to the persisted token.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::session::token_store::TokenStore;
use crate::types::{AuthResponse, User};

/// Client-held record of the current authentication state.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl Default for Session {
    /// Process-start state: nothing known yet, bootstrap pending.
    fn default() -> Self {
        Self {
            user: None,
            access_token: None,
            is_authenticated: false,
            is_loading: true,
        }
    }
}

impl Session {
    fn signed_out() -> Self {
        Self {
            user: None,
            access_token: None,
            is_authenticated: false,
            is_loading: false,
        }
    }

    fn signed_in(user: User, token: String) -> Self {
        Self {
            user: Some(user),
            access_token: Some(token),
            is_authenticated: true,
            is_loading: false,
        }
    }

    /// Authenticated exactly when both a user and a token are held,
    /// and never authenticated without a user.
    pub fn is_consistent(&self) -> bool {
        let both = self.user.is_some() && self.access_token.is_some();
        self.is_authenticated == both && (self.is_authenticated || self.user.is_none())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Result of the startup token read. Always ends loading.
    InitializeFromStorage(Option<String>),
    /// A persisted token is being validated; loading continues.
    TokenRestored(String),
    SetCredentials { user: User, token: String },
    /// Profile refresh. Only applies to an authenticated session.
    SetUser(User),
    SetLoading(bool),
    Logout,
    LoginSucceeded(AuthResponse),
    RefreshSucceeded(AuthResponse),
    CurrentUserFetched(User),
    CurrentUserRejected,
    LogoutSucceeded,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::InitializeFromStorage(_) => "initialize_from_storage",
            Action::TokenRestored(_) => "token_restored",
            Action::SetCredentials { .. } => "set_credentials",
            Action::SetUser(_) => "set_user",
            Action::SetLoading(_) => "set_loading",
            Action::Logout => "logout",
            Action::LoginSucceeded(_) => "login_succeeded",
            Action::RefreshSucceeded(_) => "refresh_succeeded",
            Action::CurrentUserFetched(_) => "current_user_fetched",
            Action::CurrentUserRejected => "current_user_rejected",
            Action::LogoutSucceeded => "logout_succeeded",
        }
    }
}

/// What a transition requires of the token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEffect {
    None,
    Persist(String),
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session: Session,
    pub token_effect: TokenEffect,
}

impl Transition {
    fn keep(session: Session) -> Self {
        Self {
            session,
            token_effect: TokenEffect::None,
        }
    }

    fn credentials(user: User, token: String) -> Self {
        Self {
            session: Session::signed_in(user, token.clone()),
            token_effect: TokenEffect::Persist(token),
        }
    }

    fn cleared() -> Self {
        Self {
            session: Session::signed_out(),
            token_effect: TokenEffect::Remove,
        }
    }
}

pub fn reduce(state: &Session, action: Action) -> Transition {
    match action {
        Action::InitializeFromStorage(token) => {
            let mut next = state.clone();
            if let Some(token) = token {
                next.access_token = Some(token);
            }
            next.is_loading = false;
            Transition::keep(next)
        }
        Action::TokenRestored(token) => {
            let mut next = state.clone();
            next.access_token = Some(token);
            next.is_loading = true;
            Transition::keep(next)
        }
        Action::SetCredentials { user, token } => Transition::credentials(user, token),
        Action::LoginSucceeded(response) | Action::RefreshSucceeded(response) => {
            Transition::credentials(response.user, response.access_token)
        }
        Action::SetUser(user) => {
            let mut next = state.clone();
            if next.is_authenticated {
                next.user = Some(user);
            }
            Transition::keep(next)
        }
        Action::SetLoading(loading) => {
            let mut next = state.clone();
            next.is_loading = loading;
            Transition::keep(next)
        }
        Action::CurrentUserFetched(user) => match &state.access_token {
            Some(token) => Transition::keep(Session::signed_in(user, token.clone())),
            // nothing to authenticate with
            None => Transition::keep(Session::signed_out()),
        },
        Action::Logout | Action::LogoutSucceeded | Action::CurrentUserRejected => Transition::cleared(),
    }
}

pub mod selectors {
    use super::Session;
    use crate::types::User;

    pub fn current_user(session: &Session) -> Option<&User> {
        session.user.as_ref()
    }

    pub fn is_authenticated(session: &Session) -> bool {
        session.is_authenticated
    }

    pub fn is_loading(session: &Session) -> bool {
        session.is_loading
    }

    pub fn access_token(session: &Session) -> Option<&str> {
        session.access_token.as_deref()
    }
}

/// Shared session container handed explicitly to whatever needs it.
///
/// Transitions are serialized. A transition's token effect lands before the
/// new state is published, so subscribers only ever see settled states.
pub struct SessionStore {
    state: watch::Sender<Session>,
    tokens: Arc<dyn TokenStore>,
    gate: Mutex<()>,
}

impl SessionStore {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            state,
            tokens,
            gate: Mutex::new(()),
        }
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Apply a selector to the current state.
    pub fn select<T>(&self, selector: impl FnOnce(&Session) -> T) -> T {
        selector(&self.state.borrow())
    }

    pub fn access_token(&self) -> Option<String> {
        self.select(|s| selectors::access_token(s).map(str::to_string))
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub async fn dispatch(&self, action: Action) -> Session {
        let _serial = self.gate.lock().await;
        let name = action.name();
        let transition = reduce(&self.state.borrow(), action);
        let Transition { session, token_effect } = transition;

        match token_effect {
            TokenEffect::None => {}
            TokenEffect::Persist(token) => self.tokens.set_token(&token).await,
            TokenEffect::Remove => self.tokens.remove_token().await,
        }

        self.state.send_if_modified(|current| {
            if *current == session {
                false
            } else {
                *current = session.clone();
                true
            }
        });
        tracing::debug!(
            action = name,
            authenticated = session.is_authenticated,
            loading = session.is_loading,
            "session transition"
        );

        session
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.state.borrow();
        f.debug_struct("SessionStore")
            .field("authenticated", &session.is_authenticated)
            .field("loading", &session.is_loading)
            .field("persists", &self.tokens.persists())
            .finish()
    }
}
