//! User accounts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{normalize_email, UserProfile};
use crate::error::{VellumError, VellumResult};
use crate::store::VersionedStore;
use crate::types::{to_field_map, EntityKind, FieldMap, Stored};

/// Input for [`UserService::register`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password_hash: String,
}

/// Profile fields a user may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

pub struct UserService {
    store: Arc<VersionedStore>,
}

impl UserService {
    pub fn new(store: Arc<VersionedStore>) -> Self {
        Self { store }
    }

    /// Create an account. Emails are unique, checked by a full scan first.
    pub async fn register(&self, user: NewUser) -> VellumResult<Stored<UserProfile>> {
        let email = normalize_email(&user.email)?;
        if user.password_hash.is_empty() {
            return Err(VellumError::validation("A password hash is required"));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(VellumError::conflict(format!(
                "An account already exists for {}",
                email
            )));
        }

        let profile = UserProfile {
            email,
            first_name: user.first_name.trim().to_string(),
            last_name: user.last_name.trim().to_string(),
            phone: user.phone,
            password_hash: user.password_hash,
            last_login_at: None,
        };
        let stored = self.store.create_typed(&profile).await?;
        tracing::info!(user_id = %stored.id, "registered user");
        Ok(stored)
    }

    pub async fn get(&self, id: &str) -> VellumResult<Option<Stored<UserProfile>>> {
        self.store.get_typed(id).await
    }

    /// Look up a user by email. Scans every user record.
    pub async fn find_by_email(&self, email: &str) -> VellumResult<Option<Stored<UserProfile>>> {
        let email = normalize_email(email)?;
        let mut matches = self
            .store
            .find_where(EntityKind::User, |record| record.get_str("email") == Some(email.as_str()))
            .await?;

        if matches.len() > 1 {
            tracing::warn!("{} user records share the email {}", matches.len(), email);
        }
        match matches.pop() {
            Some(record) => record.into_stored().map(Some),
            None => Ok(None),
        }
    }

    /// Change profile fields, archiving the previous profile.
    pub async fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> VellumResult<Stored<UserProfile>> {
        let fields = to_field_map(&patch)?;
        if fields.is_empty() {
            return Err(VellumError::validation("Profile update has no fields"));
        }
        self.store
            .update(EntityKind::User, id, fields, true)
            .await?
            .into_stored()
    }

    /// Record a login. Metadata only, so no archive is kept.
    pub async fn touch_login(&self, id: &str) -> VellumResult<Stored<UserProfile>> {
        let mut fields = FieldMap::new();
        fields.insert("lastLoginAt".to_string(), serde_json::to_value(Utc::now())?);
        self.store
            .update(EntityKind::User, id, fields, false)
            .await?
            .into_stored()
    }

    pub async fn delete(&self, id: &str) -> VellumResult<usize> {
        self.store.delete(EntityKind::User, id).await
    }
}
