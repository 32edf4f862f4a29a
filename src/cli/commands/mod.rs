pub mod auth;
pub mod onboarding;
