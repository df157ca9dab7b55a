//! Registration dialog: email, password, verification code.

use std::sync::{Arc, OnceLock};

use kursbot_common::{ChatId, DirectoryError, Role, User, UserDirectory, UserStatus};
use regex::Regex;
use tracing::info;

use crate::error::{FlowError, FlowResult};
use crate::notifier::Notifier;
use crate::reply::{Message, Reply};
use crate::state::{RegistrationPayload, RegistrationStep};
use crate::state_store::RegistrationStates;

use super::settle;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

fn email_pattern() -> Result<&'static Regex, &'static regex::Error> {
    static EMAIL: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN)).as_ref()
}

/// Check an address against the accepted email shape.
pub fn is_valid_email(email: &str) -> Result<bool, regex::Error> {
    email_pattern()
        .map(|pattern| pattern.is_match(email))
        .map_err(Clone::clone)
}

/// Drives `NONE → WAITING_EMAIL → WAITING_PASSWORD → WAITING_VERIFICATION_CODE → NONE`.
pub struct RegistrationFlow {
    states: Arc<RegistrationStates>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    admin_chats: Vec<ChatId>,
    min_password_len: usize,
}

impl RegistrationFlow {
    pub fn new(
        states: Arc<RegistrationStates>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        admin_chats: Vec<ChatId>,
        min_password_len: usize,
    ) -> Self {
        Self {
            states,
            users,
            notifier,
            admin_chats,
            min_password_len,
        }
    }

    /// `/register`: ask for the email.
    pub fn start(&self, chat_id: ChatId) -> Reply {
        self.states.transition(
            chat_id,
            RegistrationStep::WaitingEmail,
            RegistrationPayload::default(),
        );
        Message::AskEmail.into()
    }

    /// Plain text while a registration is pending.
    pub async fn handle_text(
        &self,
        chat_id: ChatId,
        username: Option<String>,
        text: &str,
    ) -> Reply {
        let state = self.states.get(chat_id);
        let outcome = match state.step {
            RegistrationStep::None => Err(FlowError::Invalid(Message::UnknownCommand)),
            RegistrationStep::WaitingEmail => self.accept_email(chat_id, text),
            RegistrationStep::WaitingPassword => {
                self.accept_password(chat_id, username, state.payload, text).await
            }
            RegistrationStep::WaitingVerificationCode => {
                self.accept_code(chat_id, state.payload, text).await
            }
        };
        settle(&self.states, chat_id, outcome)
    }

    fn accept_email(&self, chat_id: ChatId, text: &str) -> FlowResult {
        let email = text.trim();
        let valid = is_valid_email(email).map_err(|e| {
            FlowError::aborted(Message::RegistrationFailed, "EMAIL_PATTERN", e)
        })?;
        if !valid {
            return Err(Message::InvalidEmail.into());
        }

        self.states.transition(
            chat_id,
            RegistrationStep::WaitingPassword,
            RegistrationPayload {
                email: Some(email.to_string()),
            },
        );
        Ok(Message::AskPassword.into())
    }

    async fn accept_password(
        &self,
        chat_id: ChatId,
        username: Option<String>,
        payload: RegistrationPayload,
        text: &str,
    ) -> FlowResult {
        if text.chars().count() < self.min_password_len {
            return Err(Message::PasswordTooShort {
                min: self.min_password_len,
            }
            .into());
        }

        let email = payload.email.clone().ok_or_else(|| {
            FlowError::aborted(Message::RegistrationFailed, "MISSING_EMAIL", "no email in payload")
        })?;

        let existing = self
            .users
            .find_by_chat_id(chat_id)
            .await
            .map_err(|e| FlowError::aborted(Message::RegistrationFailed, e.error_code(), e))?;

        let role = if self.admin_chats.contains(&chat_id) {
            Role::Admin
        } else {
            Role::User
        };
        let code = kursbot_crypto::verification_code();
        let fail = |e: DirectoryError| {
            FlowError::aborted(Message::RegistrationFailed, e.error_code(), e)
        };
        let hash = self.users.hash_password(text).map_err(fail)?;

        let user = match existing {
            Some(user) if user.is_active() => {
                return Err(FlowError::aborted(
                    Message::AlreadyRegistered,
                    "ALREADY_REGISTERED",
                    "chat has an active account",
                ));
            }
            // An abandoned registration is reissued in place.
            Some(mut pending) if pending.status == UserStatus::Unverified => {
                pending.email = email.clone();
                pending.password_hash = hash;
                pending.role = role;
                pending.verification_code = Some(code.clone());
                if username.is_some() {
                    pending.username = username;
                }
                self.users.save(pending).await.map_err(fail)?
            }
            _ => {
                let user =
                    User::unverified(chat_id, username, email.clone(), hash, role, code.clone());
                self.users.create(user).await.map_err(fail)?
            }
        };

        self.notifier
            .send_verification_code(&email, &code)
            .await
            .map_err(|e| FlowError::aborted(Message::RegistrationFailed, "NOTIFY_FAILED", e))?;

        info!(chat_id = %chat_id, user_id = %user.id, role = ?role, "Verification code sent");
        self.states
            .transition(chat_id, RegistrationStep::WaitingVerificationCode, payload);
        Ok(Message::VerificationCodeSent { email }.into())
    }

    async fn accept_code(
        &self,
        chat_id: ChatId,
        payload: RegistrationPayload,
        text: &str,
    ) -> FlowResult {
        let lookup_failed = |code: &'static str, cause: String| {
            FlowError::aborted(Message::RegistrationFailed, code, cause)
        };

        let email = payload
            .email
            .ok_or_else(|| lookup_failed("MISSING_EMAIL", "no email in payload".to_string()))?;
        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| lookup_failed(e.error_code(), e.to_string()))?
            .ok_or_else(|| {
                lookup_failed("USER_NOT_FOUND", format!("no pending user for {email}"))
            })?;

        if user.verification_code.as_deref() != Some(text.trim()) {
            return Err(Message::InvalidVerificationCode.into());
        }

        let user = self
            .users
            .mark_verified(user.id)
            .await
            .map_err(|e| lookup_failed(e.error_code(), e.to_string()))?;

        self.states.clear(chat_id);
        info!(chat_id = %chat_id, user_id = %user.id, "Registration complete");
        Ok(Message::Registered.into())
    }
}
