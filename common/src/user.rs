//! Users, roles and the user directory collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChatId, DirectoryError, DirectoryResult, UserId};

/// Role granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular user.
    User,
    /// Administrator, may tune the global fee.
    Admin,
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// Registered, verification code not yet confirmed.
    Unverified,
    /// Verified and allowed to use the bot.
    Active,
    /// Blocked by an administrator.
    Banned,
    /// Soft-deleted.
    Deleted,
}

impl UserStatus {
    /// Check if the account may act at all.
    pub fn is_usable(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

/// Action a user may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Run currency conversions and read own history.
    Convert,
    /// Change the global conversion fee.
    ManageFee,
}

impl Role {
    /// Capabilities granted by this role to an active account.
    pub fn capabilities(&self) -> &[Capability] {
        match self {
            Role::User => &[Capability::Convert],
            Role::Admin => &[Capability::Convert, Capability::ManageFee],
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    /// Pending verification code, cleared once verified.
    pub verification_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create an unverified user awaiting its verification code.
    pub fn unverified(
        chat_id: ChatId,
        username: Option<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        verification_code: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(),
            chat_id,
            username,
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            status: UserStatus::Unverified,
            verification_code: Some(verification_code.into()),
            created_at: Utc::now(),
        }
    }

    /// Check whether this user may perform the given action.
    pub fn can(&self, capability: Capability) -> bool {
        self.status.is_usable() && self.role.capabilities().contains(&capability)
    }

    /// Check if the account is verified and not blocked.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Mark the account as verified.
    pub fn verify(&mut self) {
        self.status = UserStatus::Active;
        self.verification_code = None;
    }
}

/// Directory of registered users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> DirectoryResult<Option<User>>;

    async fn find_by_chat_id(&self, chat_id: ChatId) -> DirectoryResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>>;

    async fn exists_by_chat_id(&self, chat_id: ChatId) -> DirectoryResult<bool>;

    /// Insert a new user.
    ///
    /// Fails with the matching duplicate error when the email, username or
    /// chat id already belongs to another user.
    async fn create(&self, user: User) -> DirectoryResult<User>;

    /// Overwrite an existing user by id.
    async fn save(&self, user: User) -> DirectoryResult<User>;

    /// Activate the account and drop its pending verification code.
    async fn mark_verified(&self, id: UserId) -> DirectoryResult<User> {
        let mut user = self
            .find_by_id(id)
            .await?
            .ok_or(DirectoryError::NotFound(id))?;
        user.verify();
        self.save(user).await
    }

    /// Hash a plain-text password for storage.
    fn hash_password(&self, plain: &str) -> DirectoryResult<String>;

    /// Check a plain-text password against a stored hash.
    fn verify_password(&self, plain: &str, hash: &str) -> bool;
}
