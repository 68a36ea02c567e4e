//! User account records.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{VellumError, VellumResult};
use crate::types::{Entity, EntityKind};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

/// Trim and lower-case an email, rejecting anything that is not shaped like one.
pub fn normalize_email(email: &str) -> VellumResult<String> {
    let normalized = email.trim().to_lowercase();
    if EMAIL_PATTERN.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(VellumError::validation_with_suggestion(
            format!("'{}' is not a valid email address", email.trim()),
            "Use an address of the form name@example.com",
        ))
    }
}

/// An account holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Normalized (lower-case) email; unique across users.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Password hash produced by the auth layer. Never a plain password.
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Entity for UserProfile {
    const KIND: EntityKind = EntityKind::User;
}
