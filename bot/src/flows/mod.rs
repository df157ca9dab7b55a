//! Multi-step dialog controllers.

pub mod conversion;
pub mod fee;
pub mod registration;

pub use conversion::ConversionFlow;
pub use fee::FeeFlow;
pub use registration::RegistrationFlow;

use kursbot_common::ChatId;
use tracing::warn;

use crate::error::FlowResult;
use crate::reply::Reply;
use crate::state::FlowStep;
use crate::state_store::ConversationStateStore;

/// Turn a step outcome into a reply, resetting the flow on unrecoverable errors.
pub(crate) fn settle<S, P>(
    store: &ConversationStateStore<S, P>,
    chat_id: ChatId,
    outcome: FlowResult,
) -> Reply
where
    S: FlowStep,
    P: Clone + Default + Send + Sync + 'static,
{
    match outcome {
        Ok(reply) => reply,
        Err(err) => {
            if !err.is_recoverable() {
                store.clear(chat_id);
                warn!(
                    chat_id = %chat_id,
                    flow = ?S::KIND,
                    error = %err,
                    code = err.error_code(),
                    "Flow aborted"
                );
            }
            err.into_reply()
        }
    }
}
