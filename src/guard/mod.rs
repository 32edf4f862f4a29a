// Navigation guard: keeps the visible area in line with the session.
//
// The decision itself lives in `route` and is pure; `RouteGuard` only wires it
// to the store and bootstrap phase and hands redirects to a `Navigator`.

pub mod bootstrap;
pub mod route;

use tokio::sync::watch;

use crate::session::{Session, SessionStore};

pub use bootstrap::{BootPhase, Bootstrapper};
pub use route::{redirect, target_area, Area, GuardState, Landing, Route, TargetArea};

/// Whatever owns the visible screen stack.
pub trait Navigator: Send {
    fn current_area(&self) -> Area;

    /// Replace the current location; no back-navigation to the old one.
    fn replace(&mut self, route: Route);
}

pub struct RouteGuard {
    session: watch::Receiver<Session>,
    phase: watch::Receiver<BootPhase>,
}

impl RouteGuard {
    pub fn new(store: &SessionStore, bootstrapper: &Bootstrapper) -> Self {
        Self {
            session: store.subscribe(),
            phase: bootstrapper.subscribe_phase(),
        }
    }

    pub fn state(&self) -> GuardState {
        GuardState::new(*self.phase.borrow(), self.session.borrow().clone())
    }

    /// Check the navigator's area once and redirect if it is on the wrong side.
    pub fn evaluate<N: Navigator + ?Sized>(&self, navigator: &mut N) -> Option<Route> {
        let route = redirect(navigator.current_area(), &self.state())?;
        tracing::debug!(to = route.path(), "redirecting");
        navigator.replace(route);
        Some(route)
    }

    /// Re-evaluate on every session or phase change until either source is dropped.
    pub async fn run<N: Navigator + ?Sized>(mut self, navigator: &mut N) {
        self.mark_seen();
        self.evaluate(navigator);

        loop {
            let changed = tokio::select! {
                r = self.session.changed() => r,
                r = self.phase.changed() => r,
            };
            if changed.is_err() {
                break;
            }
            self.mark_seen();
            self.evaluate(navigator);
        }
    }

    fn mark_seen(&mut self) {
        self.session.borrow_and_update();
        self.phase.borrow_and_update();
    }
}
