//! Lead payload validation.
//!
//! Every write path runs [`LeadValidator::validate`], which collects all
//! problems it can find instead of stopping at the first one.

use crate::models::{fields, is_blank, Lead};
use crate::repository::{LeadRepository, UniqueField};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use validator::ValidateEmail;

pub const INVALID_PHONE_MESSAGE: &str =
    "Invalid phone number format. Use +91 XXXXXXXXXX or 0XXXXXXXXXX";
pub const INVALID_EMAIL_MESSAGE: &str = "Invalid email format";

static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();

fn phone_regex() -> &'static Regex {
    // `\d` is Unicode-aware, so Devanagari and other decimal digits count.
    // A single trailing newline is tolerated, nothing else after the digits.
    PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^(\+91[\s-]?|0)?[6-9]\d{9}\n?$").expect("phone pattern compiles")
    })
}

/// Validate an Indian mobile number.
///
/// Accepts an optional `+91` (optionally followed by a space or hyphen) or a
/// leading `0`, then ten digits starting with 6, 7, 8 or 9. The input is not
/// normalized; `"+91 9876543210"` and `"9876543210"` are different values.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(phone)
}

/// Validate email syntax. No DNS lookup.
///
/// Length limits, domain labels and IDN domains are left to `validator`.
/// On top of that the domain needs a dot and a non-numeric top-level label,
/// and the local part is a dot-atom (no leading, trailing or doubled dots).
pub fn is_valid_email(email: &str) -> bool {
    if !email.validate_email() {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    // Address literals like `user@[10.0.0.1]` are not accepted
    if domain.starts_with('[') {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((_, tld)) => !tld.is_empty() && !tld.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Runs required-field, format and uniqueness checks over lead payloads.
#[derive(Clone)]
pub struct LeadValidator {
    repository: LeadRepository,
}

impl LeadValidator {
    pub fn new(repository: LeadRepository) -> Self {
        Self { repository }
    }

    /// Returns every problem found in `data`, in a stable order; empty means valid.
    ///
    /// With `check_existing`, well-formed phone and email values are looked up
    /// in the store. A failed lookup is reported as a validation error rather
    /// than surfacing as a server error, so the write is rejected either way.
    pub async fn validate(&self, data: &Lead, check_existing: bool) -> Vec<String> {
        let mut errors = Vec::new();

        for field in fields::REQUIRED {
            if is_blank(data.get(field)) {
                errors.push(format!("{} is required", field));
            }
        }

        if let Some(phone) = data.get(fields::PHONE).filter(|v| !is_blank(Some(*v))) {
            if !phone.as_str().map(is_valid_phone).unwrap_or(false) {
                errors.push(INVALID_PHONE_MESSAGE.to_string());
            } else if check_existing {
                if let Some(error) = self.check_unique(UniqueField::Phone, phone).await {
                    errors.push(error);
                }
            }
        }

        if let Some(email) = data.get(fields::EMAIL).filter(|v| !is_blank(Some(*v))) {
            if !email.as_str().map(is_valid_email).unwrap_or(false) {
                errors.push(INVALID_EMAIL_MESSAGE.to_string());
            } else if check_existing {
                if let Some(error) = self.check_unique(UniqueField::Email, email).await {
                    errors.push(error);
                }
            }
        }

        errors
    }

    async fn check_unique(&self, field: UniqueField, value: &Value) -> Option<String> {
        match self.repository.exists_by_field(field, value).await {
            Ok(false) => None,
            Ok(true) => Some(match field {
                UniqueField::Phone => "Phone number already exists".to_string(),
                UniqueField::Email => "Email already exists".to_string(),
            }),
            Err(e) => {
                tracing::error!("{} validation error: {}", field.column(), e);
                Some(match field {
                    UniqueField::Phone => "Error validating phone number".to_string(),
                    UniqueField::Email => "Error validating email".to_string(),
                })
            }
        }
    }
}
