//! Routes chat updates to commands and flows.

use std::sync::Arc;

use kursbot_common::{ChatId, UserDirectory};
use kursbot_fx::{ConversionEngine, FeeSettings};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::callback::Callback;
use crate::config::BotConfig;
use crate::flows::{ConversionFlow, FeeFlow, RegistrationFlow};
use crate::notifier::Notifier;
use crate::reply::{Message, Reply};
use crate::state::FlowKind;
use crate::state_store::ConversationStates;

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Input {
    /// Typed text, including `/commands`.
    Text(String),
    /// Inline button callback data.
    Callback(String),
}

/// One incoming chat update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Update {
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub input: Input,
}

impl Update {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            username: None,
            input: Input::Text(text.into()),
        }
    }

    pub fn callback(chat_id: ChatId, data: impl Into<String>) -> Self {
        Self {
            chat_id,
            username: None,
            input: Input::Callback(data.into()),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Entry point for every chat update.
pub struct Dispatcher {
    states: Arc<ConversationStates>,
    users: Arc<dyn UserDirectory>,
    engine: Arc<ConversionEngine>,
    registration: RegistrationFlow,
    fee: FeeFlow,
    conversion: ConversionFlow,
}

/// Collaborators the dispatcher is wired from.
pub struct DispatcherParts {
    pub users: Arc<dyn UserDirectory>,
    pub notifier: Arc<dyn Notifier>,
    pub fees: Arc<dyn FeeSettings>,
    pub engine: Arc<ConversionEngine>,
}

impl Dispatcher {
    /// Wire the flows over fresh conversation state.
    pub fn new(config: &BotConfig, parts: DispatcherParts) -> Self {
        Self::with_states(config, parts, Arc::new(ConversationStates::new()))
    }

    /// Wire the flows over existing conversation state.
    pub fn with_states(
        config: &BotConfig,
        parts: DispatcherParts,
        states: Arc<ConversationStates>,
    ) -> Self {
        let DispatcherParts {
            users,
            notifier,
            fees,
            engine,
        } = parts;

        let registration = RegistrationFlow::new(
            states.registration.clone(),
            users.clone(),
            notifier,
            config.admin_chat_ids.clone(),
            config.min_password_len,
        );
        let fee = FeeFlow::new(
            states.fee.clone(),
            users.clone(),
            fees,
            config.fee_quick_picks.clone(),
        );
        let conversion =
            ConversionFlow::new(states.conversion.clone(), users.clone(), engine.clone());

        Self {
            states,
            users,
            engine,
            registration,
            fee,
            conversion,
        }
    }

    /// Shared conversation state.
    pub fn states(&self) -> &Arc<ConversationStates> {
        &self.states
    }

    /// Handle one update and produce the reply.
    #[instrument(skip(self, update), fields(chat_id = %update.chat_id))]
    pub async fn dispatch(&self, update: Update) -> Reply {
        let Update {
            chat_id,
            username,
            input,
        } = update;

        match input {
            Input::Text(text) => {
                let text = text.trim();
                if text.starts_with('/') {
                    self.command(chat_id, text).await
                } else {
                    self.plain_text(chat_id, username, text).await
                }
            }
            Input::Callback(data) => self.callback(chat_id, &data).await,
        }
    }

    async fn command(&self, chat_id: ChatId, text: &str) -> Reply {
        let mut words = text.split_whitespace();
        let command = words
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let args: Vec<&str> = words.collect();
        debug!(chat_id = %chat_id, command = %command, args = args.len(), "Command");

        match command.as_str() {
            "/start" => Message::Welcome.into(),
            "/help" => Message::Help.into(),
            "/register" => self.registration.start(chat_id),
            "/fee" => self.fee.start(chat_id).await,
            "/convert" => self.conversion.command(chat_id, &args).await,
            "/rates" => self.rates().await,
            "/history" => self.history(chat_id).await,
            "/cancel" => {
                self.states.clear_all(chat_id);
                Message::Cancelled.into()
            }
            _ => Message::UnknownCommand.into(),
        }
    }

    async fn plain_text(&self, chat_id: ChatId, username: Option<String>, text: &str) -> Reply {
        match self.states.pending(chat_id) {
            Some(FlowKind::Registration) => {
                self.registration.handle_text(chat_id, username, text).await
            }
            Some(FlowKind::FeeEntry) => self.fee.handle_text(chat_id, text).await,
            Some(FlowKind::Conversion) => self.conversion.handle_text(chat_id, text).await,
            None => Message::UnknownCommand.into(),
        }
    }

    async fn callback(&self, chat_id: ChatId, data: &str) -> Reply {
        let Some(callback) = Callback::parse(data) else {
            warn!(chat_id = %chat_id, data = %data, "Unrecognized callback");
            return Message::UnknownCommand.into();
        };

        match callback {
            Callback::FeePick(percent) => self.fee.pick(chat_id, percent).await,
            Callback::FeeManual => self.fee.manual(chat_id).await,
            Callback::FeeConfirm => self.fee.confirm(chat_id).await,
            Callback::ConvertFrom(from) => self.conversion.select_source(chat_id, &from).await,
            Callback::ConvertTo(from, to) => {
                self.conversion.select_target(chat_id, &from, &to).await
            }
        }
    }

    async fn rates(&self) -> Reply {
        match self.engine.rates().await {
            Ok(rates) => Message::Rates { rates }.into(),
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Rates unavailable");
                Message::RatesUnavailable.into()
            }
        }
    }

    async fn history(&self, chat_id: ChatId) -> Reply {
        let user = match self.users.find_by_chat_id(chat_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Message::NotRegistered.into(),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "User lookup failed");
                return Message::GenericError.into();
            }
        };

        match self.engine.history(user.id).await {
            Ok(records) if records.is_empty() => Message::EmptyHistory.into(),
            Ok(records) => Message::History { records }.into(),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "History unavailable");
                Message::GenericError.into()
            }
        }
    }
}
