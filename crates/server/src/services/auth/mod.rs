//! Authentication service.
//!
//! Provides password accounts, bearer tokens, password reset and profile
//! management.

mod error;
pub mod reset;
pub mod token;

pub use error::AuthError;
pub use reset::{LogDelivery, MemoryOutbox, ResetDelivery};
pub use token::{Claims, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use tracing::instrument;

use brana_core::api::UpdateProfileRequest;
use brana_core::{Email, Role, UserId, Username};

use crate::db::{RepositoryError, Store, USERNAME_TAKEN, UserStore};
use crate::models::{CurrentUser, NewUser, ProfileChanges, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum length of a free-text profile field.
const MAX_PROFILE_FIELD_LENGTH: usize = 2000;

/// Identity carried by a verified bearer token.
///
/// Not yet checked against the store; see [`AuthService::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Option<UserId>,
    pub email: Option<Email>,
}

/// Authentication service.
///
/// Handles registration, login, token verification, password reset and
/// profile updates.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenSigner,
    delivery: &'a dyn ResetDelivery,
    public_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        tokens: &'a TokenSigner,
        delivery: &'a dyn ResetDelivery,
        public_url: &'a str,
    ) -> Self {
        Self {
            store,
            tokens,
            delivery,
            public_url,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new account with the `user` role.
    ///
    /// A blank `username` or `display_name` is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::InvalidUsername` for
    /// malformed input, `AuthError::WeakPassword` if the password is too short,
    /// and `AuthError::UserAlreadyExists` / `AuthError::UsernameTaken` on
    /// duplicates.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        self.create_account(email, password, username, display_name, Role::User)
            .await
    }

    /// Create an account with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
        display_name: Option<&str>,
        role: Role,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let username = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(Username::parse)
            .transpose()?;
        let display_name = optional_text("display name", display_name)?;

        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(&NewUser {
                email,
                username,
                display_name,
                password_hash,
                role,
            })
            .await
            .map_err(account_conflict)?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Login with email and password, returning a fresh bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(user.id, &user.email, Utc::now())?;
        Ok((token, user))
    }

    // =========================================================================
    // Bearer Tokens
    // =========================================================================

    /// Verify a bearer token. Pure: does not touch the store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for expired tokens and
    /// `AuthError::InvalidToken` for anything else that fails verification.
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.tokens.verify(token, Utc::now())?;
        let email = claims
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| AuthError::InvalidToken(token::TokenError::Malformed(e.to_string())))?;

        Ok(AuthUser {
            id: claims.sub,
            email,
        })
    }

    /// Look up the account a verified token refers to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn resolve(&self, auth: &AuthUser) -> Result<CurrentUser, AuthError> {
        let user = match (auth.id, &auth.email) {
            (Some(id), _) => self.store.get_user(id).await?,
            (None, Some(email)) => self.store.get_user_by_email(email).await?,
            (None, None) => None,
        };

        user.as_ref()
            .map(CurrentUser::from)
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a single-use reset token and deliver a reset link.
    ///
    /// Succeeds without doing anything if no account has this email, so the
    /// response does not reveal which emails are registered.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed email.
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        let Some(user) = self.store.get_user_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let (token, digest) = reset::generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(reset::RESET_TOKEN_TTL_MINUTES);
        self.store
            .create_reset_token(user.id, &digest, expires_at)
            .await?;

        let link = format!(
            "{}/reset-password?token={token}",
            self.public_url.trim_end_matches('/')
        );
        if let Err(e) = self.delivery.deliver(&user.email, &link).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to deliver reset link");
        }

        Ok(())
    }

    /// Set a new password using a reset token. The token is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password is too short and
    /// `AuthError::InvalidResetToken` if the token is unknown, used or expired.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        let user_id = self
            .store
            .reset_password(&reset::hash_reset_token(token.trim()), &password_hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        tracing::info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// The caller's full profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn profile(&self, actor: &CurrentUser) -> Result<User, AuthError> {
        self.store
            .get_user(actor.id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Anyone's public profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if there is no such user.
    pub async fn public_profile(&self, id: UserId) -> Result<User, AuthError> {
        self.store.get_user(id).await?.ok_or(AuthError::UserNotFound)
    }

    /// Update the caller's profile. Absent fields are left alone; an empty
    /// string clears a field.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` / `AuthError::InvalidProfile` for
    /// bad values and `AuthError::UsernameTaken` if the username is in use.
    #[instrument(skip(self, request), fields(user_id = %actor.id))]
    pub async fn update_profile(
        &self,
        actor: &CurrentUser,
        request: &UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let changes = profile_changes(request)?;
        if changes.is_empty() {
            return self.profile(actor).await;
        }

        self.store
            .update_profile(actor.id, &changes)
            .await
            .map_err(account_conflict)?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Map store conflicts on account creation/update to auth errors.
fn account_conflict(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(message) if message == USERNAME_TAKEN => AuthError::UsernameTaken,
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        other => AuthError::Repository(other),
    }
}

fn profile_changes(request: &UpdateProfileRequest) -> Result<ProfileChanges, AuthError> {
    let username = match request.username.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(username) => Some(Some(Username::parse(username)?)),
    };

    Ok(ProfileChanges {
        username,
        display_name: clearable_text("display name", request.display_name.as_deref())?,
        bio: clearable_text("bio", request.bio.as_deref())?,
        profile_picture: clearable_text("profile picture", request.profile_picture.as_deref())?,
        phone: clearable_text("phone", request.phone.as_deref())?,
        studio_address: clearable_text("studio address", request.studio_address.as_deref())?,
    })
}

/// `None` leaves the field alone, `""` clears it, anything else sets it.
fn clearable_text(field: &str, value: Option<&str>) -> Result<Option<Option<String>>, AuthError> {
    value.map(|v| optional_text(field, Some(v))).transpose()
}

fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, AuthError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > MAX_PROFILE_FIELD_LENGTH {
        return Err(AuthError::InvalidProfile(format!(
            "{field} must be at most {MAX_PROFILE_FIELD_LENGTH} characters"
        )));
    }
    Ok(Some(value.to_owned()))
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        tokens: TokenSigner,
        outbox: MemoryOutbox,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                tokens: TokenSigner::new(
                    SecretString::from("k3J9#pQ2$vX8!mN4@rT6&wY1*zB5^cD7".to_owned()),
                    Duration::hours(1),
                ),
                outbox: MemoryOutbox::new(),
            }
        }

        fn auth(&self) -> AuthService<'_> {
            AuthService::new(
                &self.store,
                &self.tokens,
                &self.outbox,
                "http://localhost:3000/",
            )
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let fx = Fixture::new();
        let auth = fx.auth();

        let user = auth
            .register("Alice@Example.com", "password123", Some("alice"), None)
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "alice@example.com");
        assert_eq!(user.role, Role::User);

        let (token, logged_in) = auth
            .login("alice@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let identity = auth.authenticate(&token).unwrap();
        assert_eq!(identity.id, Some(user.id));
        let current = auth.resolve(&identity).await.unwrap();
        assert_eq!(current.email, user.email);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let fx = Fixture::new();
        let auth = fx.auth();

        assert!(matches!(
            auth.register("not-an-email", "password123", None, None).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("a@example.com", "12345", None, None).await,
            Err(AuthError::WeakPassword(_))
        ));

        auth.register("a@example.com", "password123", Some("alice"), None)
            .await
            .unwrap();
        assert!(matches!(
            auth.register("A@example.com", "password123", None, None).await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.register("b@example.com", "password123", Some("alice"), None)
                .await,
            Err(AuthError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.register("a@example.com", "password123", None, None)
            .await
            .unwrap();

        assert!(matches!(
            auth.login("a@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_does_not_resolve() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let user = auth
            .register("a@example.com", "password123", None, None)
            .await
            .unwrap();
        let (token, _) = auth.login("a@example.com", "password123").await.unwrap();

        fx.store.delete_user(user.id).await.unwrap();

        let identity = auth.authenticate(&token).unwrap();
        assert!(matches!(
            auth.resolve(&identity).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let user = auth
            .register("a@example.com", "password123", None, None)
            .await
            .unwrap();

        auth.request_reset("a@example.com").await.unwrap();
        let link = fx.outbox.last_link_for(&user.email).unwrap();
        assert!(link.starts_with("http://localhost:3000/reset-password?token="));
        let token = reset::token_from_link(&link).unwrap();

        assert!(matches!(
            auth.reset_password(&token, "short").await,
            Err(AuthError::WeakPassword(_))
        ));
        auth.reset_password(&token, "new-password").await.unwrap();

        assert!(auth.login("a@example.com", "password123").await.is_err());
        auth.login("a@example.com", "new-password").await.unwrap();

        // Single use.
        assert!(matches!(
            auth.reset_password(&token, "another-password").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_is_silent() {
        let fx = Fixture::new();
        fx.auth().request_reset("ghost@example.com").await.unwrap();
        assert!(fx.outbox.is_empty());
    }

    #[tokio::test]
    async fn test_update_profile_sets_and_clears() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let user = auth
            .register("a@example.com", "password123", None, Some("Abebe"))
            .await
            .unwrap();
        let actor = CurrentUser::from(&user);

        let updated = auth
            .update_profile(
                &actor,
                &UpdateProfileRequest {
                    username: Some("abebe".to_owned()),
                    bio: Some("  Painter from Gondar ".to_owned()),
                    display_name: Some(String::new()),
                    ..UpdateProfileRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username.as_ref().map(Username::as_str), Some("abebe"));
        assert_eq!(updated.bio.as_deref(), Some("Painter from Gondar"));
        assert_eq!(updated.display_name, None);

        assert!(matches!(
            auth.update_profile(
                &actor,
                &UpdateProfileRequest {
                    username: Some("no spaces".to_owned()),
                    ..UpdateProfileRequest::default()
                },
            )
            .await,
            Err(AuthError::InvalidUsername(_))
        ));
    }
}
