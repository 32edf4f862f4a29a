use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::cli::config::Client;
use crate::cli::utils::{fail, output_success, value_or_prompt};
use crate::cli::OutputFormat;
use crate::error::ClientError;
use crate::guard::{target_area, BootPhase, GuardState, Route};
use crate::session::{Action, Session};
use crate::validation::SignupForm;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in with email and password")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Sign out and forget the stored token")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh authentication token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Create an account from an invitation")]
    Signup {
        #[arg(long, help = "Invitation token")]
        invite: String,
        #[arg(long, help = "Full name")]
        name: String,
        #[arg(long, help = "Email")]
        email: String,
        #[arg(long, help = "Phone number")]
        phone: Option<String>,
        #[arg(long, help = "Firm name (CA owners)")]
        firm_name: Option<String>,
        #[arg(long, help = "Firm GSTIN (CA owners)")]
        firm_gstin: Option<String>,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Verify an email address with a code or link token")]
    Verify {
        #[arg(long, help = "Email the code was sent to")]
        email: Option<String>,
        #[arg(long, help = "Token from the verification link")]
        token: Option<String>,
        #[arg(long, help = "6-digit verification code")]
        code: Option<String>,
    },

    #[command(about = "Send the verification code again")]
    Resend {
        #[arg(help = "Email")]
        email: String,
    },

    #[command(about = "Request a password reset code")]
    ForgotPassword {
        #[arg(help = "Email")]
        email: String,
    },

    #[command(about = "Set a new password with a reset code")]
    ResetPassword {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Reset code from the email")]
        code: String,
        #[arg(long, help = "New password (will prompt if not provided)")]
        password: Option<String>,
    },
}

pub async fn handle(cmd: AuthCommands, client: &Client, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let password = value_or_prompt(password, "Password")?;
            let session = client
                .auth
                .login(&email, &password)
                .await
                .map_err(|e| fail(&output_format, e))?;

            let mut state = client.load_state()?;
            state.last_email = Some(email.trim().to_string());
            state.last_login_at = Some(Utc::now());
            client.save_state(&state)?;

            let name = session.user.as_ref().map(|u| u.name.as_str()).unwrap_or_default();
            output_success(
                &output_format,
                &format!("Signed in as {}", name),
                Some(json!({
                    "user": session.user,
                    "landing": landing_path(&session),
                })),
            )
        }
        AuthCommands::Logout => {
            // Load the stored token without a round trip; logout needs nothing else.
            let token = client.store.token_store().get_token().await;
            client.store.dispatch(Action::InitializeFromStorage(token)).await;
            client.auth.logout().await;
            output_success(&output_format, "Signed out", None)
        }
        AuthCommands::Status => {
            let session = client.bootstrapper.run().await;
            let state = client.load_state()?;
            let landing = landing_path(&session);

            let message = match &session.user {
                Some(user) if session.is_authenticated => format!("Signed in as {} ({})", user.email, user.role.as_str()),
                _ => "Not signed in".to_string(),
            };
            output_success(
                &output_format,
                &message,
                Some(json!({
                    "authenticated": session.is_authenticated,
                    "landing": landing,
                    "last_email": state.last_email,
                    "last_login_at": state.last_login_at,
                    "token_persisted": client.store.token_store().persists(),
                })),
            )
        }
        AuthCommands::Refresh => {
            client.bootstrapper.run().await;
            let session = client.auth.refresh().await.map_err(|e| fail(&output_format, e))?;
            output_success(
                &output_format,
                "Token refreshed",
                Some(json!({ "authenticated": session.is_authenticated })),
            )
        }
        AuthCommands::Whoami => {
            let session = client.bootstrapper.run().await;
            let user = match session.user {
                Some(user) if session.is_authenticated => user,
                _ => return Err(fail(&output_format, ClientError::session_invalidated())),
            };
            let message = format!("{} <{}> {}", user.name, user.email, user.role.as_str());
            output_success(&output_format, &message, Some(json!({ "user": user })))
        }
        AuthCommands::Signup {
            invite,
            name,
            email,
            phone,
            firm_name,
            firm_gstin,
            password,
        } => {
            let password = value_or_prompt(password, "Password")?;
            let confirm_password = value_or_prompt(None, "Confirm password")?;
            let form = SignupForm {
                invite_token: invite,
                name,
                email,
                phone,
                password,
                confirm_password,
                firm_name,
                firm_gstin,
            };
            let ack = client.auth.signup(&form).await.map_err(|e| fail(&output_format, e))?;
            let message = ack
                .message
                .unwrap_or_else(|| "Account created. Check your email for a verification code".to_string());
            output_success(&output_format, &message, Some(json!({ "next": Route::VerifyEmail.path() })))
        }
        AuthCommands::Verify { email, token, code } => {
            let ack = client
                .auth
                .verify_email(email.as_deref(), token.as_deref(), code.as_deref())
                .await
                .map_err(|e| fail(&output_format, e))?;
            let next = if ack.pending_approval {
                Route::PendingApproval
            } else {
                Route::Login
            };
            let message = ack.ack.message.unwrap_or_else(|| "Email verified".to_string());
            output_success(
                &output_format,
                &message,
                Some(json!({ "pending_approval": ack.pending_approval, "next": next.path() })),
            )
        }
        AuthCommands::Resend { email } => {
            let ack = client
                .auth
                .resend_verification(&email)
                .await
                .map_err(|e| fail(&output_format, e))?;
            let message = ack.message.unwrap_or_else(|| "Verification code sent".to_string());
            output_success(&output_format, &message, None)
        }
        AuthCommands::ForgotPassword { email } => {
            let ack = client
                .auth
                .forgot_password(&email)
                .await
                .map_err(|e| fail(&output_format, e))?;
            let message = ack.message.unwrap_or_else(|| "Reset code sent".to_string());
            output_success(&output_format, &message, Some(json!({ "next": Route::ResetPassword.path() })))
        }
        AuthCommands::ResetPassword { email, code, password } => {
            let password = value_or_prompt(password, "New password")?;
            let ack = client
                .auth
                .reset_password(&email, &code, &password)
                .await
                .map_err(|e| fail(&output_format, e))?;
            let message = ack.message.unwrap_or_else(|| "Password updated".to_string());
            output_success(&output_format, &message, Some(json!({ "next": Route::Login.path() })))
        }
    }
}

/// Screen a settled session belongs on.
fn landing_path(session: &Session) -> Option<&'static str> {
    target_area(&GuardState::new(BootPhase::Ready, session.clone())).map(|target| target.route().path())
}
