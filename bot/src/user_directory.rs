//! In-memory user directory.

use async_trait::async_trait;
use dashmap::DashMap;
use kursbot_common::{ChatId, DirectoryError, DirectoryResult, User, UserDirectory, UserId};
use parking_lot::Mutex;
use tracing::{debug, info};

/// User directory indexed by id, chat id and email.
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
    by_chat: DashMap<ChatId, UserId>,
    by_email: DashMap<String, UserId>,
    /// Serializes writes so uniqueness checks and index updates are atomic.
    write_lock: Mutex<()>,
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_chat: DashMap::new(),
            by_email: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn check_unique(&self, user: &User) -> DirectoryResult<()> {
        if let Some(owner) = self.by_email.get(&email_key(&user.email)) {
            if *owner != user.id {
                return Err(DirectoryError::DuplicateEmail(user.email.clone()));
            }
        }

        if let Some(owner) = self.by_chat.get(&user.chat_id) {
            if *owner != user.id {
                return Err(DirectoryError::DuplicateChatId(user.chat_id));
            }
        }

        if let Some(username) = &user.username {
            let taken = self
                .users
                .iter()
                .any(|other| other.id != user.id && other.username.as_deref() == Some(username));
            if taken {
                return Err(DirectoryError::DuplicateUsername(username.clone()));
            }
        }

        Ok(())
    }

    fn index(&self, user: &User) {
        self.by_email.insert(email_key(&user.email), user.id);
        self.by_chat.insert(user.chat_id, user.id);
        self.users.insert(user.id, user.clone());
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: UserId) -> DirectoryResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_chat_id(&self, chat_id: ChatId) -> DirectoryResult<Option<User>> {
        let id = self.by_chat.get(&chat_id).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let id = self.by_email.get(&email_key(email)).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn exists_by_chat_id(&self, chat_id: ChatId) -> DirectoryResult<bool> {
        Ok(self.by_chat.contains_key(&chat_id))
    }

    async fn create(&self, user: User) -> DirectoryResult<User> {
        let _guard = self.write_lock.lock();
        self.check_unique(&user)?;
        self.index(&user);

        info!(user_id = %user.id, chat_id = %user.chat_id, role = ?user.role, "User created");
        Ok(user)
    }

    async fn save(&self, user: User) -> DirectoryResult<User> {
        let _guard = self.write_lock.lock();
        let previous = self
            .users
            .get(&user.id)
            .map(|u| u.clone())
            .ok_or(DirectoryError::NotFound(user.id))?;
        self.check_unique(&user)?;

        if email_key(&previous.email) != email_key(&user.email) {
            self.by_email.remove(&email_key(&previous.email));
        }
        if previous.chat_id != user.chat_id {
            self.by_chat.remove(&previous.chat_id);
        }
        self.index(&user);

        debug!(user_id = %user.id, status = ?user.status, "User saved");
        Ok(user)
    }

    fn hash_password(&self, plain: &str) -> DirectoryResult<String> {
        kursbot_crypto::hash_password(plain).map_err(|e| DirectoryError::Hashing(e.to_string()))
    }

    fn verify_password(&self, plain: &str, hash: &str) -> bool {
        kursbot_crypto::verify_password(plain, hash).unwrap_or(false)
    }
}
