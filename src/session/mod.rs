pub mod controller;
pub mod onboarding;
pub mod store;
pub mod token_store;

pub use controller::AuthController;
pub use onboarding::OnboardingController;
pub use store::{reduce, selectors, Action, Session, SessionStore, TokenEffect, Transition};
pub use token_store::{
    token_store_for, EphemeralTokenStore, MemoryTokenStore, SecureFileTokenStore, TokenStore, TOKEN_KEY,
};
