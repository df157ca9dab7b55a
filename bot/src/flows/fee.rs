//! Admin fee entry dialog.

use std::sync::Arc;

use kursbot_common::{parse_decimal, Capability, ChatId, User, UserDirectory};
use kursbot_fx::{FeeError, FeeSettings};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::callback::Callback;
use crate::error::{FlowError, FlowResult};
use crate::reply::{Button, Keyboard, Message, Reply};
use crate::state::{FeePayload, FeeStep};
use crate::state_store::FeeStates;

use super::settle;

/// Drives `NONE ⇄ WAITING_MANUAL_FEE` for administrators.
pub struct FeeFlow {
    states: Arc<FeeStates>,
    users: Arc<dyn UserDirectory>,
    fees: Arc<dyn FeeSettings>,
    quick_picks: Vec<Decimal>,
}

impl FeeFlow {
    pub fn new(
        states: Arc<FeeStates>,
        users: Arc<dyn UserDirectory>,
        fees: Arc<dyn FeeSettings>,
        quick_picks: Vec<Decimal>,
    ) -> Self {
        Self {
            states,
            users,
            fees,
            quick_picks,
        }
    }

    /// `/fee`: show the current fee with quick picks. Stores nothing.
    pub async fn start(&self, chat_id: ChatId) -> Reply {
        if let Err(denied) = self.authorize(chat_id).await {
            return denied;
        }

        match self.fees.current().await {
            Ok(percent) => Reply::new(Message::CurrentFee { percent }).with_keyboard(self.picker()),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Failed to read fee");
                Message::GenericError.into()
            }
        }
    }

    /// `fee:pick:<v>`: remember the value and wait for confirmation or a typed value.
    pub async fn pick(&self, chat_id: ChatId, percent: Decimal) -> Reply {
        if let Err(denied) = self.authorize(chat_id).await {
            return denied;
        }
        if kursbot_fx::fee::validate_percent(percent).is_err() {
            return Message::InvalidFeeValue.into();
        }

        self.states.transition(
            chat_id,
            FeeStep::WaitingManualFee,
            FeePayload {
                suggested: Some(percent),
            },
        );
        let confirm = Keyboard::default().with_row(vec![Button::new(
            format!("Confirm {}%", percent.normalize()),
            Callback::FeeConfirm.to_string(),
        )]);
        Reply::new(Message::AskFee {
            suggested: Some(percent),
        })
        .with_keyboard(confirm)
    }

    /// `fee:manual`: wait for a typed value.
    pub async fn manual(&self, chat_id: ChatId) -> Reply {
        if let Err(denied) = self.authorize(chat_id).await {
            return denied;
        }

        self.states
            .transition(chat_id, FeeStep::WaitingManualFee, FeePayload::default());
        Message::AskFee { suggested: None }.into()
    }

    /// `fee:confirm`: apply the picked value.
    pub async fn confirm(&self, chat_id: ChatId) -> Reply {
        if let Err(denied) = self.authorize(chat_id).await {
            return denied;
        }

        let state = self.states.get(chat_id);
        let outcome = match (state.step, state.payload.suggested) {
            (FeeStep::WaitingManualFee, Some(percent)) => self.apply(chat_id, percent).await,
            _ => Err(FlowError::Invalid(Message::NothingToConfirm)),
        };
        settle(&self.states, chat_id, outcome)
    }

    /// Plain text while waiting for a manual value.
    pub async fn handle_text(&self, chat_id: ChatId, text: &str) -> Reply {
        if let Err(denied) = self.authorize(chat_id).await {
            return denied;
        }

        let outcome = match self.states.step(chat_id) {
            FeeStep::None => Err(FlowError::Invalid(Message::UnknownCommand)),
            FeeStep::WaitingManualFee => match parse_decimal(text) {
                Ok(percent) => self.apply(chat_id, percent).await,
                Err(_) => Err(Message::InvalidFeeValue.into()),
            },
        };
        settle(&self.states, chat_id, outcome)
    }

    async fn apply(&self, chat_id: ChatId, percent: Decimal) -> FlowResult {
        match self.fees.set(percent).await {
            Ok(setting) => {
                self.states.clear(chat_id);
                info!(chat_id = %chat_id, percent = %setting.percent, "Fee changed by admin");
                Ok(Message::FeeUpdated {
                    percent: setting.percent,
                }
                .into())
            }
            Err(FeeError::OutOfRange(_)) => Err(Message::InvalidFeeValue.into()),
            Err(e @ FeeError::Storage(_)) => {
                Err(FlowError::aborted(Message::GenericError, "FEE_STORAGE", e))
            }
        }
    }

    /// Resolve the caller and require the fee capability. Never touches state.
    async fn authorize(&self, chat_id: ChatId) -> Result<User, Reply> {
        match self.users.find_by_chat_id(chat_id).await {
            Ok(Some(user)) if user.can(Capability::ManageFee) => Ok(user),
            Ok(_) => {
                warn!(chat_id = %chat_id, "Fee access denied");
                Err(Message::AccessDenied.into())
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "User lookup failed");
                Err(Message::GenericError.into())
            }
        }
    }

    fn picker(&self) -> Keyboard {
        let picks = self
            .quick_picks
            .iter()
            .map(|p| Button::new(format!("{}%", p.normalize()), Callback::FeePick(*p).to_string()))
            .collect();
        Keyboard::grid(picks, 3).with_row(vec![Button::new(
            "Enter manually",
            Callback::FeeManual.to_string(),
        )])
    }
}
