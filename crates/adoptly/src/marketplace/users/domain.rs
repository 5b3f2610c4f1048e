use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for marketplace accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Adopter,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Adopter => "adopter",
            Role::Admin => "admin",
        }
    }
}

/// Stored account document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub banned: bool,
    pub ban_reason: Option<String>,
    pub suspended_until: Option<DateTime<Utc>>,
    pub reset_digest: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether an account may currently sign in and act.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStanding {
    Active,
    Banned { reason: Option<String> },
    Suspended { until: DateTime<Utc> },
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn standing(&self, now: DateTime<Utc>) -> AccountStanding {
        if self.banned {
            return AccountStanding::Banned {
                reason: self.ban_reason.clone(),
            };
        }
        match self.suspended_until {
            Some(until) if until > now => AccountStanding::Suspended { until },
            _ => AccountStanding::Active,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            banned: self.banned,
            suspended_until: self.suspended_until,
            created_at: self.created_at,
        }
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            created_at: self.created_at,
        }
    }
}

/// A write that touches only the fields it names, applied to the stored account under the
/// store's lock so concurrent changes to other fields survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChange {
    Profile {
        full_name: Option<String>,
        email: Option<String>,
    },
    Password {
        hash: String,
    },
    ResetIssued {
        digest: String,
        expires_at: DateTime<Utc>,
    },
    /// Only lands while `digest` is still the account's outstanding reset token.
    ResetRedeemed {
        digest: String,
        hash: String,
    },
    Role(Role),
    Ban {
        reason: Option<String>,
    },
    Unban,
    Suspend {
        until: DateTime<Utc>,
    },
}

impl AccountChange {
    /// The e-mail this change would give the account, for uniqueness checks.
    pub fn new_email(&self) -> Option<&str> {
        match self {
            AccountChange::Profile {
                email: Some(email), ..
            } => Some(email),
            _ => None,
        }
    }

    /// Returns `false`, leaving `user` untouched, when the change no longer applies.
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) -> bool {
        match self {
            AccountChange::Profile { full_name, email } => {
                if let Some(full_name) = full_name {
                    user.full_name = full_name;
                }
                if let Some(email) = email {
                    user.email = email;
                }
            }
            AccountChange::Password { hash } => user.password_hash = hash,
            AccountChange::ResetIssued { digest, expires_at } => {
                user.reset_digest = Some(digest);
                user.reset_expires_at = Some(expires_at);
            }
            AccountChange::ResetRedeemed { digest, hash } => {
                if user.reset_digest.as_deref() != Some(digest.as_str()) {
                    return false;
                }
                user.password_hash = hash;
                user.reset_digest = None;
                user.reset_expires_at = None;
            }
            AccountChange::Role(role) => user.role = role,
            AccountChange::Ban { reason } => {
                user.banned = true;
                user.ban_reason = reason;
            }
            AccountChange::Unban => {
                user.banned = false;
                user.ban_reason = None;
            }
            AccountChange::Suspend { until } => user.suspended_until = Some(until),
        }
        user.updated_at = now;
        true
    }
}

/// Account view returned to the account holder and admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub banned: bool,
    pub suspended_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Account view visible to other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Login payload; `identifier` accepts either the e-mail or the username.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(alias = "email", alias = "username")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub q: Option<String>,
    pub role: Option<Role>,
    pub banned: Option<bool>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(banned) = self.banned {
            if user.banned != banned {
                return false;
            }
        }
        match &self.q {
            Some(q) => {
                let needle = q.to_lowercase();
                user.username.to_lowercase().contains(&needle)
                    || user.email.contains(&needle)
                    || user.full_name.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}
