//! Per-chat conversation state storage.

use std::sync::Arc;

use dashmap::DashMap;
use kursbot_common::ChatId;
use tracing::debug;

use crate::state::{
    ConversationState, ConversionPayload, ConversionStep, FeePayload, FeeStep, FlowKind,
    FlowStep, RegistrationPayload, RegistrationStep,
};

/// Concurrent state store for one flow, keyed by chat.
///
/// Each chat id maps to its own shard entry, so unrelated chats never
/// contend on a shared lock.
pub struct ConversationStateStore<S, P> {
    states: DashMap<ChatId, ConversationState<S, P>>,
}

impl<S, P> ConversationStateStore<S, P>
where
    S: FlowStep,
    P: Clone + Default + Send + Sync + 'static,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Current state for a chat, idle if none is stored. Never inserts.
    pub fn get(&self, chat_id: ChatId) -> ConversationState<S, P> {
        self.states
            .get(&chat_id)
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Current step without creating an entry.
    pub fn step(&self, chat_id: ChatId) -> S {
        self.states
            .get(&chat_id)
            .map(|state| state.step)
            .unwrap_or_default()
    }

    /// Replace the state for a chat.
    pub fn set(&self, chat_id: ChatId, state: ConversationState<S, P>) {
        debug!(chat_id = %chat_id, flow = ?S::KIND, step = ?state.step, "State transition");
        self.states.insert(chat_id, state);
    }

    /// Move to `step` with a fresh payload.
    pub fn transition(&self, chat_id: ChatId, step: S, payload: P) {
        self.set(chat_id, ConversationState::new(step, payload));
    }

    /// Reset a chat to the idle step and drop its payload.
    pub fn clear(&self, chat_id: ChatId) {
        if self.states.remove(&chat_id).is_some() {
            debug!(chat_id = %chat_id, flow = ?S::KIND, "State cleared");
        }
    }

    /// Check if a chat is mid-dialog in this flow.
    pub fn is_pending(&self, chat_id: ChatId) -> bool {
        !self.step(chat_id).is_idle()
    }

    /// Number of chats with a stored state.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl<S, P> Default for ConversationStateStore<S, P>
where
    S: FlowStep,
    P: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

pub type RegistrationStates = ConversationStateStore<RegistrationStep, RegistrationPayload>;
pub type FeeStates = ConversationStateStore<FeeStep, FeePayload>;
pub type ConversionStates = ConversationStateStore<ConversionStep, ConversionPayload>;

/// The three flow namespaces. They never share state for a chat.
#[derive(Default)]
pub struct ConversationStates {
    pub registration: Arc<RegistrationStates>,
    pub fee: Arc<FeeStates>,
    pub conversion: Arc<ConversionStates>,
}

impl ConversationStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// First flow with a pending step, in routing priority order.
    pub fn pending(&self, chat_id: ChatId) -> Option<FlowKind> {
        if self.registration.is_pending(chat_id) {
            Some(FlowKind::Registration)
        } else if self.fee.is_pending(chat_id) {
            Some(FlowKind::FeeEntry)
        } else if self.conversion.is_pending(chat_id) {
            Some(FlowKind::Conversion)
        } else {
            None
        }
    }

    /// Reset every flow for a chat.
    pub fn clear_all(&self, chat_id: ChatId) {
        self.registration.clear(chat_id);
        self.fee.clear(chat_id);
        self.conversion.clear(chat_id);
    }
}
