//! Kursbot Chat Layer
//!
//! Turns chat updates into replies. Each chat walks through three
//! independent dialogs (registration, admin fee entry, conversion) whose
//! progress is kept per chat in [`ConversationStates`].
//!
//! ```ignore
//! let dispatcher = Dispatcher::new(&config, parts);
//! let reply = dispatcher.dispatch(Update::text(chat_id, "/convert USD EUR 100")).await;
//! ```

pub mod callback;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flows;
pub mod notifier;
pub mod reply;
pub mod state;
pub mod state_store;
pub mod user_directory;

pub use callback::Callback;
pub use config::BotConfig;
pub use dispatcher::{Dispatcher, DispatcherParts, Input, Update};
pub use error::{FlowError, FlowResult, NotifyError};
pub use notifier::{LogNotifier, Notifier};
pub use reply::{Button, Keyboard, Message, Reply};
pub use state::{ConversationState, FlowKind, FlowStep};
pub use state_store::{ConversationStateStore, ConversationStates};
pub use user_directory::InMemoryUserDirectory;
