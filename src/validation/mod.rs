// Form validation run before any request reaches the gateway.
// Errors are keyed by the wire field name so callers can render them inline.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ValidationRules;
use crate::error::ClientError;
use crate::types::{
    AccessRequestSubmit, AccessType, Address, CompleteProfileRequest, EmailRequest, LoginRequest,
    ResetPasswordRequest, SignupRequest, VerifyEmailRequest,
};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9]\d{9,14}$").expect("phone pattern compiles"));

static GSTIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}[A-Z]{5}\d{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").expect("gstin pattern compiles")
});

/// Accumulates the first error reported for each field.
#[derive(Debug, Default)]
struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn finish<T>(self, value: T) -> Result<T, ClientError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ClientError::validation(self.0))
        }
    }
}

/// Raw signup form as typed by the user, including the confirmation field.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub invite_token: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub confirm_password: String,
    pub firm_name: Option<String>,
    pub firm_gstin: Option<String>,
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        errors.add("email", "Please enter a valid email address");
    }
}

fn check_new_password(errors: &mut FieldErrors, field: &str, password: &str, rules: &ValidationRules) {
    if password.is_empty() {
        errors.add(field, "Password is required");
        return;
    }
    if password.chars().count() < rules.password_min_length {
        errors.add(
            field,
            format!("Password must be at least {} characters", rules.password_min_length),
        );
        return;
    }
    let missing_upper = rules.password_require_uppercase && !password.chars().any(|c| c.is_uppercase());
    let missing_lower = rules.password_require_lowercase && !password.chars().any(|c| c.is_lowercase());
    let missing_digit = rules.password_require_number && !password.chars().any(|c| c.is_ascii_digit());
    if missing_upper || missing_lower || missing_digit {
        errors.add(field, "Password must include uppercase, lowercase, and number");
    }
}

fn check_code(errors: &mut FieldErrors, code: &str, rules: &ValidationRules) {
    if code.is_empty() {
        errors.add("code", "Verification code is required");
    } else if code.chars().count() != rules.verification_code_length {
        errors.add(
            "code",
            format!("Code must be {} digits", rules.verification_code_length),
        );
    } else if !code.chars().all(|c| c.is_ascii_digit()) {
        errors.add("code", "Code must contain only numbers");
    }
}

pub fn validate_login(email: &str, password: &str, rules: &ValidationRules) -> Result<LoginRequest, ClientError> {
    let email = email.trim();
    let mut errors = FieldErrors::default();

    check_email(&mut errors, email);
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < rules.password_min_length {
        errors.add(
            "password",
            format!("Password must be at least {} characters", rules.password_min_length),
        );
    }

    errors.finish(LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_signup(form: &SignupForm, rules: &ValidationRules) -> Result<SignupRequest, ClientError> {
    let mut errors = FieldErrors::default();
    let invite_token = form.invite_token.trim();
    let name = form.name.trim();
    let email = form.email.trim();
    let phone = form
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    if invite_token.is_empty() {
        errors.add("inviteToken", "Invite token is required");
    }
    if name.is_empty() {
        errors.add("name", "Name is required");
    } else if name.chars().count() < rules.name_min_length {
        errors.add(
            "name",
            format!("Name must be at least {} characters", rules.name_min_length),
        );
    }
    check_email(&mut errors, email);
    if let Some(phone) = phone {
        if !PHONE_RE.is_match(phone) {
            errors.add("phone", "Please enter a valid phone number");
        }
    }
    check_new_password(&mut errors, "password", &form.password, rules);
    if form.confirm_password.is_empty() {
        errors.add("confirmPassword", "Please confirm your password");
    } else if !errors.has("password") && form.password != form.confirm_password {
        errors.add("confirmPassword", "Passwords do not match");
    }

    errors.finish(SignupRequest {
        invite_token: invite_token.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password: form.password.clone(),
        phone: phone.map(str::to_string),
        firm_name: form.firm_name.clone().filter(|v| !v.trim().is_empty()),
        firm_gstin: form.firm_gstin.clone().filter(|v| !v.trim().is_empty()),
    })
}

/// Verification by email + code. A link token skips local checks on the code.
pub fn validate_verify_email(
    email: Option<&str>,
    token: Option<&str>,
    code: Option<&str>,
    rules: &ValidationRules,
) -> Result<VerifyEmailRequest, ClientError> {
    let mut errors = FieldErrors::default();
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    let token = token.map(str::trim).filter(|t| !t.is_empty());
    let code = code.map(str::trim);

    if token.is_none() {
        match email {
            Some(email) => check_email(&mut errors, email),
            None => errors.add("email", "Email is required"),
        }
        check_code(&mut errors, code.unwrap_or_default(), rules);
    } else if let Some(code) = code.filter(|c| !c.is_empty()) {
        check_code(&mut errors, code, rules);
    }

    errors.finish(VerifyEmailRequest {
        email: email.map(str::to_string),
        token: token.map(str::to_string),
        code: code.filter(|c| !c.is_empty()).map(str::to_string),
    })
}

pub fn validate_email_request(email: &str) -> Result<EmailRequest, ClientError> {
    let email = email.trim();
    let mut errors = FieldErrors::default();
    check_email(&mut errors, email);
    errors.finish(EmailRequest { email: email.to_string() })
}

pub fn validate_reset_password(
    email: &str,
    code: &str,
    new_password: &str,
    rules: &ValidationRules,
) -> Result<ResetPasswordRequest, ClientError> {
    let email = email.trim();
    let code = code.trim();
    let mut errors = FieldErrors::default();

    check_email(&mut errors, email);
    check_code(&mut errors, code, rules);
    check_new_password(&mut errors, "newPassword", new_password, rules);

    errors.finish(ResetPasswordRequest {
        email: email.to_string(),
        code: code.to_string(),
        new_password: new_password.to_string(),
    })
}

pub fn validate_access_request(
    access_type: &str,
    reason: &str,
    rules: &ValidationRules,
) -> Result<AccessRequestSubmit, ClientError> {
    let reason = reason.trim();
    let mut errors = FieldErrors::default();

    let access_type = AccessType::parse(access_type.trim());
    if access_type.is_none() {
        errors.add("accessType", "Please select how you will use Chanakya");
    }
    if reason.is_empty() {
        errors.add("reason", "Please tell us what you are looking for");
    } else if reason.chars().count() < rules.access_reason_min_length {
        errors.add(
            "reason",
            format!(
                "Please provide more detail (at least {} characters)",
                rules.access_reason_min_length
            ),
        );
    }

    match access_type {
        Some(access_type) => errors.finish(AccessRequestSubmit {
            access_type,
            reason: reason.to_string(),
        }),
        None => Err(ClientError::validation(errors.0)),
    }
}

/// Business details for a client activated through an invitation.
/// GSTIN is upper-cased before checking; PIN codes are six digits.
pub fn validate_complete_profile(
    gst_number: &str,
    business_name: &str,
    address: &Address,
    rules: &ValidationRules,
) -> Result<CompleteProfileRequest, ClientError> {
    let gst_number = gst_number.trim().to_uppercase();
    let business_name = business_name.trim();
    let mut errors = FieldErrors::default();

    if gst_number.is_empty() {
        errors.add("gstNumber", "GST number is required");
    } else if !GSTIN_RE.is_match(&gst_number) {
        errors.add("gstNumber", "Please enter a valid 15-character GSTIN");
    }
    if business_name.chars().count() < rules.name_min_length {
        errors.add("businessName", "Business name is required");
    }

    let address = Address {
        line1: address.line1.trim().to_string(),
        line2: address
            .line2
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
        city: address.city.trim().to_string(),
        state: address.state.trim().to_string(),
        pin_code: address.pin_code.trim().to_string(),
    };
    if address.line1.is_empty() {
        errors.add("address.line1", "Address is required");
    }
    if address.city.is_empty() {
        errors.add("address.city", "City is required");
    }
    if address.state.is_empty() {
        errors.add("address.state", "State is required");
    }
    if address.pin_code.len() != 6 || !address.pin_code.chars().all(|c| c.is_ascii_digit()) {
        errors.add("address.pinCode", "PIN code must be 6 digits");
    }

    errors.finish(CompleteProfileRequest {
        gst_number,
        business_name: business_name.to_string(),
        address,
    })
}
