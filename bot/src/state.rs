//! Conversation state definitions.

use kursbot_common::CurrencyCode;
use rust_decimal::Decimal;
use serde::Serialize;

/// The independent dialogs a chat can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowKind {
    Registration,
    FeeEntry,
    Conversion,
}

/// A step enum of one flow. The default value is the idle `NONE` step.
pub trait FlowStep: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Flow this step belongs to.
    const KIND: FlowKind;

    /// Check if the flow is idle.
    fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Registration flow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStep {
    #[default]
    None,
    WaitingEmail,
    WaitingPassword,
    WaitingVerificationCode,
}

impl FlowStep for RegistrationStep {
    const KIND: FlowKind = FlowKind::Registration;
}

/// Data collected while registering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationPayload {
    /// Email accepted in the email step; the verification code is looked up by it.
    pub email: Option<String>,
}

/// Fee entry flow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeStep {
    #[default]
    None,
    WaitingManualFee,
}

impl FlowStep for FeeStep {
    const KIND: FlowKind = FlowKind::FeeEntry;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeePayload {
    /// Quick-pick value awaiting confirmation.
    pub suggested: Option<Decimal>,
}

/// Conversion flow step. Picker steps carry their data in callbacks and
/// are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionStep {
    #[default]
    None,
    WaitingAmount,
}

impl FlowStep for ConversionStep {
    const KIND: FlowKind = FlowKind::Conversion;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionPayload {
    pub from: Option<CurrencyCode>,
    pub to: Option<CurrencyCode>,
}

/// Current step of one flow for one chat, with its ephemeral payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState<S, P> {
    pub step: S,
    pub payload: P,
}

impl<S: FlowStep, P: Default> ConversationState<S, P> {
    pub fn new(step: S, payload: P) -> Self {
        Self { step, payload }
    }

    /// Flow this state belongs to.
    pub fn kind(&self) -> FlowKind {
        S::KIND
    }

    pub fn is_idle(&self) -> bool {
        self.step.is_idle()
    }
}

pub type RegistrationState = ConversationState<RegistrationStep, RegistrationPayload>;
pub type FeeState = ConversationState<FeeStep, FeePayload>;
pub type ConversionState = ConversationState<ConversionStep, ConversionPayload>;
