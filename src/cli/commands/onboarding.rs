use clap::Subcommand;
use serde_json::json;

use crate::cli::config::Client;
use crate::cli::utils::{fail, output_success};
use crate::cli::OutputFormat;
use crate::types::Address;

#[derive(Subcommand)]
pub enum OnboardingCommands {
    #[command(about = "Ask an administrator for access")]
    RequestAccess {
        #[arg(long, help = "individual, business or ca_firm")]
        access_type: String,
        #[arg(long, help = "What you want to use Chanakya for")]
        reason: String,
    },

    #[command(about = "Show the status of your access request")]
    RequestStatus,

    #[command(about = "Check an invitation code")]
    ValidateInvite {
        #[arg(help = "Invitation code")]
        code: String,
    },

    #[command(about = "Accept an invitation")]
    Activate {
        #[arg(help = "Invitation code")]
        code: String,
    },

    #[command(about = "Complete the business profile")]
    CompleteProfile {
        #[arg(long, help = "GSTIN")]
        gst_number: String,
        #[arg(long, help = "Registered business name")]
        business_name: String,
        #[arg(long)]
        line1: String,
        #[arg(long)]
        line2: Option<String>,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long, help = "6-digit PIN code")]
        pin_code: String,
    },
}

pub async fn handle(cmd: OnboardingCommands, client: &Client, output_format: OutputFormat) -> anyhow::Result<()> {
    // Restore the stored token; invitation lookups also work signed out.
    client.bootstrapper.run().await;
    let flow = &client.onboarding;

    match cmd {
        OnboardingCommands::RequestAccess { access_type, reason } => {
            let (ack, step) = flow
                .request_access(&access_type, &reason)
                .await
                .map_err(|e| fail(&output_format, e))?;
            let message = ack.message.unwrap_or_else(|| "Access request submitted".to_string());
            output_success(&output_format, &message, Some(json!({ "next": step.route().path() })))
        }
        OnboardingCommands::RequestStatus => {
            match flow.request_status().await.map_err(|e| fail(&output_format, e))? {
                Some((status, step)) => {
                    let mut message = format!("Access request {}: {:?}", status.id, status.status);
                    if let Some(reason) = &status.rejection_reason {
                        message.push_str(&format!(" ({})", reason));
                    }
                    output_success(
                        &output_format,
                        &message,
                        Some(json!({ "request": status, "next": step.route().path() })),
                    )
                }
                None => output_success(&output_format, "No access request on file", Some(json!({ "request": null }))),
            }
        }
        OnboardingCommands::ValidateInvite { code } => {
            let status = flow
                .validate_invitation(&code)
                .await
                .map_err(|e| fail(&output_format, e))?;
            let message = match (status.valid, status.organization_name.as_deref()) {
                (true, Some(org)) => format!("Invitation from {} is valid", org),
                (true, None) => "Invitation is valid".to_string(),
                (false, _) => "Invitation is not valid".to_string(),
            };
            output_success(&output_format, &message, Some(json!({ "invitation": status })))
        }
        OnboardingCommands::Activate { code } => {
            let (response, step) = flow
                .activate_invitation(&code)
                .await
                .map_err(|e| fail(&output_format, e))?;
            output_success(
                &output_format,
                &response.message,
                Some(json!({ "activation": response, "next": step.route().path() })),
            )
        }
        OnboardingCommands::CompleteProfile {
            gst_number,
            business_name,
            line1,
            line2,
            city,
            state,
            pin_code,
        } => {
            let address = Address {
                line1,
                line2,
                city,
                state,
                pin_code,
            };
            let ack = flow
                .complete_profile(&gst_number, &business_name, &address)
                .await
                .map_err(|e| fail(&output_format, e))?;
            let message = ack.message.unwrap_or_else(|| "Profile completed".to_string());
            output_success(&output_format, &message, None)
        }
    }
}
