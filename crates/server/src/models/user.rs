//! User domain types.

use chrono::{DateTime, Utc};

use brana_core::api::{PublicProfile, UserProfile, UserSummary};
use brana_core::{Email, Role, UserId, Username};

/// A marketplace account (artist and/or buyer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub username: Option<Username>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub phone: Option<String>,
    pub studio_address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this account may use the admin surface.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Public identity shown on artworks and comments.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.as_ref().map(ToString::to_string),
            display_name: self.display_name.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }

    /// Full profile, for the account owner and admins.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            username: self.username.as_ref().map(ToString::to_string),
            display_name: self.display_name.clone(),
            bio: self.bio.clone(),
            profile_picture: self.profile_picture.clone(),
            phone: self.phone.clone(),
            studio_address: self.studio_address.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }

    /// Profile visible to anyone.
    #[must_use]
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            username: self.username.as_ref().map(ToString::to_string),
            display_name: self.display_name.clone(),
            bio: self.bio.clone(),
            profile_picture: self.profile_picture.clone(),
            created_at: self.created_at,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub role: Role,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Data for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: Option<Username>,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Partial profile update.
///
/// The outer `Option` is "change this field"; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub username: Option<Option<Username>>,
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub profile_picture: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub studio_address: Option<Option<String>>,
}

impl ProfileChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.display_name.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
            && self.phone.is_none()
            && self.studio_address.is_none()
    }

    /// Apply these changes to an in-memory user.
    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username.clone_from(username);
        }
        if let Some(display_name) = &self.display_name {
            user.display_name.clone_from(display_name);
        }
        if let Some(bio) = &self.bio {
            user.bio.clone_from(bio);
        }
        if let Some(profile_picture) = &self.profile_picture {
            user.profile_picture.clone_from(profile_picture);
        }
        if let Some(phone) = &self.phone {
            user.phone.clone_from(phone);
        }
        if let Some(studio_address) = &self.studio_address {
            user.studio_address.clone_from(studio_address);
        }
    }
}
