use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::{AdminBootstrap, SecurityConfig};
use crate::security::{
    digest_reset_token, generate_reset_token, hash_password, verify_password, PasswordError,
};
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{
    AccountChange, AccountStanding, Credentials, PasswordChange, PasswordReset, ProfileUpdate,
    Registration, ResetRequest, Role, User, UserFilter, UserId,
};
use super::repository::UserRepository;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;
const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=30;
const MAX_FULL_NAME_LENGTH: usize = 80;

/// Account registration, authentication, and self-service profile management.
pub struct UserService<R> {
    repository: Arc<R>,
    reset_ttl: Duration,
    expose_reset_tokens: bool,
}

impl<R> UserService<R>
where
    R: UserRepository + 'static,
{
    pub fn new(repository: Arc<R>, security: &SecurityConfig) -> Self {
        Self {
            repository,
            reset_ttl: Duration::minutes(security.reset_ttl_minutes),
            expose_reset_tokens: security.expose_reset_tokens,
        }
    }

    pub fn register(
        &self,
        registration: Registration,
        now: DateTime<Utc>,
    ) -> Result<User, UserServiceError> {
        self.create_account(registration, Role::Adopter, now)
    }

    fn create_account(
        &self,
        registration: Registration,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<User, UserServiceError> {
        let username = validate_username(&registration.username)?;
        let email = normalize_email(&registration.email)?;
        validate_password(&registration.password)?;
        let full_name = validate_full_name(registration.full_name.as_deref().unwrap_or(""))?;

        if self.repository.find_user_by_login(&username)?.is_some() {
            return Err(UserServiceError::UsernameTaken);
        }
        if self.repository.find_user_by_login(&email)?.is_some() {
            return Err(UserServiceError::EmailTaken);
        }

        let user = User {
            id: UserId::generate(),
            username: username.clone(),
            email,
            full_name,
            password_hash: hash_password(&registration.password)?,
            role,
            banned: false,
            ban_reason: None,
            suspended_until: None,
            reset_digest: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        };

        let stored = match self.repository.insert_user(user) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(self.registration_conflict(&username)?),
            Err(other) => return Err(other.into()),
        };
        info!(user_id = %stored.id, role = stored.role.label(), "account registered");
        Ok(stored)
    }

    /// Another registration won the store's uniqueness check; report the field it took.
    fn registration_conflict(&self, username: &str) -> Result<UserServiceError, UserServiceError> {
        Ok(match self.repository.find_user_by_login(username)? {
            Some(_) => UserServiceError::UsernameTaken,
            None => UserServiceError::EmailTaken,
        })
    }

    /// Verify credentials and account standing.
    pub fn authenticate(
        &self,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> Result<User, UserServiceError> {
        let identifier = credentials.identifier.trim();
        let Some(user) = self.repository.find_user_by_login(identifier)? else {
            warn!("login refused: unknown account");
            return Err(UserServiceError::InvalidCredentials);
        };

        match verify_password(&credentials.password, &user.password_hash) {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => {
                warn!(user_id = %user.id, "login refused: wrong password");
                return Err(UserServiceError::InvalidCredentials);
            }
            Err(other) => return Err(other.into()),
        }

        ensure_active(&user, now)?;
        info!(user_id = %user.id, "login succeeded");
        Ok(user)
    }

    /// Load the account behind an access token, refusing banned or suspended users.
    pub fn active_user(&self, id: &UserId, now: DateTime<Utc>) -> Result<User, UserServiceError> {
        let user = self.get(id)?;
        ensure_active(&user, now)?;
        Ok(user)
    }

    pub fn get(&self, id: &UserId) -> Result<User, UserServiceError> {
        self.repository
            .fetch_user(id)?
            .ok_or(UserServiceError::NotFound)
    }

    pub fn list(&self, filter: &UserFilter, page: Page) -> Result<Paged<User>, UserServiceError> {
        Ok(self.repository.query_users(filter, page)?)
    }

    pub fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<User, UserServiceError> {
        let full_name = update
            .full_name
            .map(|full_name| validate_full_name(&full_name))
            .transpose()?;
        let email = update
            .email
            .map(|email| normalize_email(&email))
            .transpose()?;
        if let Some(email) = &email {
            if let Some(existing) = self.repository.find_user_by_login(email)? {
                if &existing.id != id {
                    return Err(UserServiceError::EmailTaken);
                }
            }
        }

        let change = AccountChange::Profile { full_name, email };
        self.repository
            .apply_user_change(id, change, now)
            .map_err(|err| match err {
                RepositoryError::Conflict => UserServiceError::EmailTaken,
                RepositoryError::NotFound => UserServiceError::NotFound,
                other => UserServiceError::Repository(other),
            })
    }

    pub fn change_password(
        &self,
        id: &UserId,
        change: PasswordChange,
        now: DateTime<Utc>,
    ) -> Result<(), UserServiceError> {
        let user = self.get(id)?;
        match verify_password(&change.current_password, &user.password_hash) {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => return Err(UserServiceError::InvalidCredentials),
            Err(other) => return Err(other.into()),
        }
        validate_password(&change.new_password)?;

        let hash = hash_password(&change.new_password)?;
        self.repository
            .apply_user_change(id, AccountChange::Password { hash }, now)
            .map_err(|err| match err {
                RepositoryError::NotFound => UserServiceError::NotFound,
                other => UserServiceError::Repository(other),
            })?;
        info!(user_id = %id, "password changed");
        Ok(())
    }

    /// Issue a reset token when the e-mail is known. The outcome is the same either way so
    /// callers cannot tell which e-mails have accounts. The token is only returned when
    /// exposure is enabled.
    pub fn request_password_reset(
        &self,
        request: ResetRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, UserServiceError> {
        let email = request.email.trim().to_lowercase();
        let Some(user) = self.repository.find_user_by_login(&email)? else {
            debug!("password reset requested for unknown e-mail");
            return Ok(None);
        };

        let reset = generate_reset_token();
        let change = AccountChange::ResetIssued {
            digest: reset.digest,
            expires_at: now + self.reset_ttl,
        };
        self.repository.apply_user_change(&user.id, change, now)?;

        debug!(user_id = %user.id, token = %reset.token, "password reset token issued");
        Ok(self.expose_reset_tokens.then_some(reset.token))
    }

    pub fn reset_password(
        &self,
        reset: PasswordReset,
        now: DateTime<Utc>,
    ) -> Result<(), UserServiceError> {
        let digest = digest_reset_token(&reset.token);
        let user = self
            .repository
            .find_user_by_reset_digest(&digest)?
            .ok_or(UserServiceError::InvalidResetToken)?;

        match user.reset_expires_at {
            Some(expires_at) if expires_at > now => {}
            _ => return Err(UserServiceError::InvalidResetToken),
        }
        validate_password(&reset.new_password)?;

        let change = AccountChange::ResetRedeemed {
            digest,
            hash: hash_password(&reset.new_password)?,
        };
        self.repository
            .apply_user_change(&user.id, change, now)
            .map_err(|err| match err {
                // Redeemed or replaced while the new password was being hashed.
                RepositoryError::Stale | RepositoryError::NotFound => {
                    UserServiceError::InvalidResetToken
                }
                other => UserServiceError::Repository(other),
            })?;
        info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    /// Create the configured admin, or promote the matching account if it already exists.
    pub fn bootstrap_admin(
        &self,
        admin: &AdminBootstrap,
        now: DateTime<Utc>,
    ) -> Result<User, UserServiceError> {
        let email = normalize_email(&admin.email)?;
        if let Some(existing) = self.repository.find_user_by_login(&email)? {
            if existing.is_admin() {
                return Ok(existing);
            }
            let promoted = self.repository.apply_user_change(
                &existing.id,
                AccountChange::Role(Role::Admin),
                now,
            )?;
            info!(user_id = %promoted.id, "existing account promoted to admin");
            return Ok(promoted);
        }

        self.create_account(
            Registration {
                username: admin.username.clone(),
                email,
                password: admin.password.clone(),
                full_name: Some("Administrator".to_string()),
            },
            Role::Admin,
            now,
        )
    }
}

fn ensure_active(user: &User, now: DateTime<Utc>) -> Result<(), UserServiceError> {
    match user.standing(now) {
        AccountStanding::Active => Ok(()),
        AccountStanding::Banned { reason } => {
            warn!(user_id = %user.id, "banned account refused");
            Err(UserServiceError::Banned { reason })
        }
        AccountStanding::Suspended { until } => {
            warn!(user_id = %user.id, %until, "suspended account refused");
            Err(UserServiceError::Suspended { until })
        }
    }
}

pub(crate) fn validate_username(raw: &str) -> Result<String, UserServiceError> {
    let username = raw.trim();
    if !USERNAME_LENGTH.contains(&username.chars().count()) {
        return Err(UserServiceError::Invalid(
            "username must be between 3 and 30 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(UserServiceError::Invalid(
            "username may only contain letters, digits, and underscores".to_string(),
        ));
    }
    Ok(username.to_string())
}

pub(crate) fn normalize_email(raw: &str) -> Result<String, UserServiceError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(UserServiceError::Invalid(
            "email address is invalid".to_string(),
        ))
    }
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(UserServiceError::Invalid(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_full_name(raw: &str) -> Result<String, UserServiceError> {
    let name = raw.trim();
    if name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(UserServiceError::Invalid(format!(
            "full name must be at most {MAX_FULL_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

/// Error raised by the user service.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("username already exists")]
    UsernameTaken,
    #[error("email already exists")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is banned")]
    Banned { reason: Option<String> },
    #[error("account is suspended until {until}")]
    Suspended { until: DateTime<Utc> },
    #[error("user not found")]
    NotFound,
    #[error("password reset token is invalid or expired")]
    InvalidResetToken,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
