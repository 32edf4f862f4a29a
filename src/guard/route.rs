// Pure redirect decision: (boot phase, session) -> where the user belongs.

use crate::guard::bootstrap::BootPhase;
use crate::session::Session;
use crate::types::{UserRole, UserStatus};

/// Top-level navigation groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    /// Login, signup, verification, password recovery.
    Auth,
    /// Access request and invitation activation.
    Onboarding,
    /// Tabbed dashboards behind authentication.
    Main,
}

impl Area {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Area::Auth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Signup,
    VerifyEmail,
    PendingApproval,
    ForgotPassword,
    ResetPassword,
    RequestAccess,
    PendingVerification,
    CompleteProfile,
    Home,
    AdminOverview,
}

impl Route {
    pub fn area(&self) -> Area {
        match self {
            Route::Login
            | Route::Signup
            | Route::VerifyEmail
            | Route::PendingApproval
            | Route::ForgotPassword
            | Route::ResetPassword => Area::Auth,
            Route::RequestAccess | Route::PendingVerification | Route::CompleteProfile => Area::Onboarding,
            Route::Home | Route::AdminOverview => Area::Main,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::VerifyEmail => "/verify-email",
            Route::PendingApproval => "/pending-approval",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetPassword => "/reset-password",
            Route::RequestAccess => "/request-access",
            Route::PendingVerification => "/pending-verification",
            Route::CompleteProfile => "/complete-profile",
            Route::Home => "/",
            Route::AdminOverview => "/admin-dashboard",
        }
    }
}

/// Landing screen inside the authenticated area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landing {
    Home,
    AdminOverview,
}

impl Landing {
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::SystemAdmin => Landing::AdminOverview,
            _ => Landing::Home,
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Landing::Home => Route::Home,
            Landing::AdminOverview => Route::AdminOverview,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArea {
    Unauthenticated,
    Authenticated(Landing),
}

impl TargetArea {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, TargetArea::Unauthenticated)
    }

    pub fn route(&self) -> Route {
        match self {
            TargetArea::Unauthenticated => Route::Login,
            TargetArea::Authenticated(landing) => landing.route(),
        }
    }
}

/// Everything the guard decides on.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardState {
    pub phase: BootPhase,
    pub session: Session,
}

impl GuardState {
    pub fn new(phase: BootPhase, session: Session) -> Self {
        Self { phase, session }
    }
}

/// Where the session belongs, or `None` while bootstrap has not settled.
pub fn target_area(state: &GuardState) -> Option<TargetArea> {
    let session = &state.session;
    if state.phase != BootPhase::Ready || session.is_loading {
        return None;
    }
    if !session.is_authenticated {
        return Some(TargetArea::Unauthenticated);
    }

    let Some(user) = session.user.as_ref() else {
        return Some(TargetArea::Unauthenticated);
    };
    // Invited users finish signup through their invitation before they count as signed in.
    match user.status {
        UserStatus::Invited | UserStatus::Disabled => Some(TargetArea::Unauthenticated),
        UserStatus::Active | UserStatus::Unknown => Some(TargetArea::Authenticated(Landing::for_role(user.role))),
    }
}

/// Route to replace the current location with, if the current area is wrong.
///
/// Only the authenticated/unauthenticated split is compared, so a user already
/// on an acceptable screen of the right side is never bounced again.
pub fn redirect(current: Area, state: &GuardState) -> Option<Route> {
    let target = target_area(state)?;
    (current.is_unauthenticated() != target.is_unauthenticated()).then(|| target.route())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    fn session_for(status: UserStatus, role: UserRole) -> Session {
        Session {
            user: Some(User {
                id: "u1".into(),
                email: "a@b.com".into(),
                name: "Asha".into(),
                phone: None,
                role,
                staff_type: None,
                permissions: None,
                tenant_id: None,
                client_id: None,
                department: None,
                assigned_client_ids: None,
                status,
                created_at: None,
            }),
            access_token: Some("t1".into()),
            is_authenticated: true,
            is_loading: false,
        }
    }

    fn signed_out() -> Session {
        Session {
            is_loading: false,
            ..Session::default()
        }
    }

    fn ready(session: &Session) -> GuardState {
        GuardState::new(BootPhase::Ready, session.clone())
    }

    #[test]
    fn test_no_decision_before_ready() {
        let session = session_for(UserStatus::Active, UserRole::ClientUser);
        for phase in [BootPhase::Uninitialized, BootPhase::Initializing] {
            let state = GuardState::new(phase, session.clone());
            assert_eq!(target_area(&state), None);
            assert_eq!(redirect(Area::Auth, &state), None);
        }
    }

    #[test]
    fn test_no_decision_while_loading() {
        assert_eq!(target_area(&ready(&Session::default())), None);
    }

    #[test]
    fn test_signed_out_goes_to_login() {
        let state = ready(&signed_out());
        assert_eq!(target_area(&state), Some(TargetArea::Unauthenticated));
        assert_eq!(redirect(Area::Main, &state), Some(Route::Login));
        assert_eq!(redirect(Area::Onboarding, &state), Some(Route::Login));
        assert_eq!(redirect(Area::Auth, &state), None);
    }

    #[test]
    fn test_invited_user_is_never_treated_as_signed_in() {
        for role in [UserRole::SystemAdmin, UserRole::CaOwner, UserRole::ClientUser] {
            let state = ready(&session_for(UserStatus::Invited, role));
            assert_eq!(target_area(&state), Some(TargetArea::Unauthenticated));
            assert_eq!(redirect(Area::Main, &state), Some(Route::Login));
            assert_eq!(redirect(Area::Auth, &state), None);
        }
    }

    #[test]
    fn test_disabled_user_goes_to_login() {
        let state = ready(&session_for(UserStatus::Disabled, UserRole::CaStaff));
        assert_eq!(redirect(Area::Main, &state), Some(Route::Login));
    }

    #[test]
    fn test_active_landing_by_role() {
        let admin = ready(&session_for(UserStatus::Active, UserRole::SystemAdmin));
        assert_eq!(redirect(Area::Auth, &admin), Some(Route::AdminOverview));

        for role in [
            UserRole::CaOwner,
            UserRole::CaManager,
            UserRole::CaStaff,
            UserRole::ClientAdmin,
            UserRole::ClientManager,
            UserRole::ClientUser,
        ] {
            let state = ready(&session_for(UserStatus::Active, role));
            assert_eq!(redirect(Area::Auth, &state), Some(Route::Home));
        }
    }

    #[test]
    fn test_unknown_status_treated_as_active() {
        let state = ready(&session_for(UserStatus::Unknown, UserRole::ClientAdmin));
        assert_eq!(target_area(&state), Some(TargetArea::Authenticated(Landing::Home)));
    }

    #[test]
    fn test_redirect_target_never_redirects_again() {
        let sessions = [
            signed_out(),
            session_for(UserStatus::Active, UserRole::SystemAdmin),
            session_for(UserStatus::Active, UserRole::ClientUser),
            session_for(UserStatus::Invited, UserRole::ClientUser),
            session_for(UserStatus::Disabled, UserRole::ClientUser),
        ];
        for session in &sessions {
            let state = ready(session);
            for area in [Area::Auth, Area::Onboarding, Area::Main] {
                if let Some(route) = redirect(area, &state) {
                    assert_eq!(redirect(route.area(), &state), None);
                }
            }
        }
    }

    #[test]
    fn test_authenticated_user_may_stay_in_onboarding() {
        let state = ready(&session_for(UserStatus::Active, UserRole::ClientUser));
        assert_eq!(redirect(Area::Onboarding, &state), None);
    }

    #[test]
    fn test_route_areas() {
        assert_eq!(Route::ResetPassword.area(), Area::Auth);
        assert_eq!(Route::PendingApproval.area(), Area::Auth);
        assert_eq!(Route::CompleteProfile.area(), Area::Onboarding);
        assert_eq!(Route::AdminOverview.area(), Area::Main);
        assert_eq!(Route::Home.path(), "/");
    }
}
