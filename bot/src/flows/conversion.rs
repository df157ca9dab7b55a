//! Currency picker and conversion dialog.

use std::sync::Arc;

use kursbot_common::{Capability, ChatId, CurrencyCode, CurrencyRate, UserDirectory};
use kursbot_fx::{ConversionEngine, ConversionError, ConversionResult};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::callback::Callback;
use crate::error::{FlowError, FlowResult};
use crate::reply::{Button, Keyboard, Message, Reply};
use crate::state::{ConversionPayload, ConversionStep};
use crate::state_store::ConversionStates;

use super::settle;

const BUTTONS_PER_ROW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Target,
}

impl Side {
    fn unknown(self, code: &str) -> Message {
        let code = CurrencyCode::new(code).to_string();
        match self {
            Side::Source => Message::UnknownSourceCurrency { code },
            Side::Target => Message::UnknownTargetCurrency { code },
        }
    }
}

fn runtime(e: ConversionError) -> FlowError {
    FlowError::aborted(Message::ConversionFailed, e.error_code(), e)
}

/// Drives `NONE → pick from → pick to → WAITING_AMOUNT → NONE`.
///
/// Only `WAITING_AMOUNT` is stored; picker steps carry their data in callbacks.
pub struct ConversionFlow {
    states: Arc<ConversionStates>,
    users: Arc<dyn UserDirectory>,
    engine: Arc<ConversionEngine>,
}

impl ConversionFlow {
    pub fn new(
        states: Arc<ConversionStates>,
        users: Arc<dyn UserDirectory>,
        engine: Arc<ConversionEngine>,
    ) -> Self {
        Self {
            states,
            users,
            engine,
        }
    }

    /// `/convert [from [to [amount]]]`.
    pub async fn command(&self, chat_id: ChatId, args: &[&str]) -> Reply {
        // A new command replaces any pending amount prompt.
        self.states.clear(chat_id);

        let outcome = match args {
            [] => self.pick_source().await,
            [from] => self.pick_target(from).await,
            [from, to] => self.ask_amount(chat_id, from, to).await,
            [from, to, amount, ..] => self.convert_now(chat_id, from, to, amount).await,
        };
        settle(&self.states, chat_id, outcome)
    }

    /// `conv:from:<CODE>` button.
    pub async fn select_source(&self, chat_id: ChatId, from: &CurrencyCode) -> Reply {
        let outcome = self.pick_target(from.code()).await;
        settle(&self.states, chat_id, outcome)
    }

    /// `conv:to:<FROM>:<TO>` button.
    pub async fn select_target(
        &self,
        chat_id: ChatId,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Reply {
        let outcome = self.ask_amount(chat_id, from.code(), to.code()).await;
        settle(&self.states, chat_id, outcome)
    }

    /// Plain text while waiting for an amount.
    pub async fn handle_text(&self, chat_id: ChatId, text: &str) -> Reply {
        let state = self.states.get(chat_id);
        let outcome = match (state.step, state.payload.from, state.payload.to) {
            (ConversionStep::WaitingAmount, Some(from), Some(to)) => {
                match ConversionEngine::parse_amount(text) {
                    Ok(amount) => self.delegate(chat_id, &from, &to, amount).await,
                    Err(_) => Err(Message::InvalidAmount.into()),
                }
            }
            (ConversionStep::WaitingAmount, _, _) => Err(FlowError::aborted(
                Message::ConversionFailed,
                "MISSING_CURRENCY",
                "amount prompt without currencies",
            )),
            (ConversionStep::None, _, _) => Err(FlowError::Invalid(Message::UnknownCommand)),
        };
        settle(&self.states, chat_id, outcome)
    }

    async fn pick_source(&self) -> FlowResult {
        let currencies = self.listing().await.map_err(runtime)?;
        if currencies.is_empty() {
            return Err(FlowError::Invalid(Message::RatesUnavailable));
        }

        let buttons = currencies
            .iter()
            .map(|rate| {
                Button::new(
                    rate.code.to_string(),
                    Callback::ConvertFrom(rate.code.clone()).to_string(),
                )
            })
            .collect();
        Ok(Reply::new(Message::PickSourceCurrency)
            .with_keyboard(Keyboard::grid(buttons, BUTTONS_PER_ROW)))
    }

    async fn pick_target(&self, from: &str) -> FlowResult {
        let source = self.resolve(from, Side::Source).await?;
        let currencies = self.listing().await.map_err(runtime)?;

        let buttons = currencies
            .iter()
            .filter(|rate| rate.code != source.code)
            .map(|rate| {
                Button::new(
                    rate.code.to_string(),
                    Callback::ConvertTo(source.code.clone(), rate.code.clone()).to_string(),
                )
            })
            .collect();
        Ok(Reply::new(Message::PickTargetCurrency { from: source.code })
            .with_keyboard(Keyboard::grid(buttons, BUTTONS_PER_ROW)))
    }

    async fn ask_amount(&self, chat_id: ChatId, from: &str, to: &str) -> FlowResult {
        let source = self.resolve(from, Side::Source).await?;
        let target = self.resolve(to, Side::Target).await?;

        self.states.transition(
            chat_id,
            ConversionStep::WaitingAmount,
            ConversionPayload {
                from: Some(source.code.clone()),
                to: Some(target.code.clone()),
            },
        );
        Ok(Message::AskAmount {
            from: source.code,
            to: target.code,
        }
        .into())
    }

    async fn convert_now(&self, chat_id: ChatId, from: &str, to: &str, amount: &str) -> FlowResult {
        let source = self.resolve(from, Side::Source).await?;
        let target = self.resolve(to, Side::Target).await?;
        let amount = ConversionEngine::parse_amount(amount).map_err(|_| Message::InvalidAmount)?;

        self.delegate(chat_id, &source.code, &target.code, amount).await
    }

    /// Resolve the caller and hand the validated request to the engine.
    async fn delegate(
        &self,
        chat_id: ChatId,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> FlowResult {
        let user = self
            .users
            .find_by_chat_id(chat_id)
            .await
            .map_err(|e| FlowError::aborted(Message::ConversionFailed, e.error_code(), e))?
            .ok_or_else(|| {
                FlowError::aborted(Message::NotRegistered, "NOT_REGISTERED", "no user for chat")
            })?;
        if !user.can(Capability::Convert) {
            return Err(FlowError::aborted(
                Message::AccessDenied,
                "ACCESS_DENIED",
                format!("user {} may not convert", user.id),
            ));
        }

        match self.engine.convert(user.id, from.code(), to.code(), amount).await {
            Ok(record) => {
                self.states.clear(chat_id);
                info!(chat_id = %chat_id, record_id = %record.id, "Conversion replied");
                Ok(Message::Converted { record }.into())
            }
            Err(ConversionError::CurrencyNotFound(code)) => {
                let side = if &code == from { Side::Source } else { Side::Target };
                Err(FlowError::aborted(side.unknown(code.code()), "CURRENCY_NOT_FOUND", code))
            }
            Err(e) => Err(runtime(e)),
        }
    }

    async fn resolve(&self, code: &str, side: Side) -> Result<CurrencyRate, FlowError> {
        match self.lookup(code).await {
            Ok(Some(rate)) => Ok(rate),
            Ok(None) => {
                debug!(code = %code, side = ?side, "Unknown currency");
                Err(FlowError::Invalid(side.unknown(code)))
            }
            Err(e) => Err(runtime(e)),
        }
    }

    /// Pure lookup, except that an empty store is filled from the feed first.
    async fn lookup(&self, code: &str) -> ConversionResult<Option<CurrencyRate>> {
        if let Some(rate) = self.engine.find_currency(code).await? {
            return Ok(Some(rate));
        }
        if self.engine.currencies().await?.is_empty() {
            self.engine.rates().await?;
            return self.engine.find_currency(code).await;
        }
        Ok(None)
    }

    async fn listing(&self) -> ConversionResult<Vec<CurrencyRate>> {
        let currencies = self.engine.currencies().await?;
        if currencies.is_empty() {
            return self.engine.rates().await;
        }
        Ok(currencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_directory::InMemoryUserDirectory;
    use kursbot_common::{Role, User};
    use kursbot_fx::{
        FeeSettings, FetchError, InMemoryFeeSettings, InMemoryRateStore, IngestionConfig,
        MockFeedFetcher, RateIngestionEngine,
    };
    use kursbot_ledger::InMemoryLedger;
    use rust_decimal_macros::dec;

    const CHAT: ChatId = ChatId::new(10);

    struct Fixture {
        flow: ConversionFlow,
        states: Arc<ConversionStates>,
        fetcher: Arc<MockFeedFetcher>,
        ledger: Arc<InMemoryLedger>,
        users: Arc<InMemoryUserDirectory>,
    }

    async fn fixture() -> Fixture {
        let fetcher = Arc::new(MockFeedFetcher::with_rates(&[
            ("USD", "Доллар США", 1, "90,5"),
            ("EUR", "Евро", 1, "98,25"),
        ]));
        let rates = Arc::new(InMemoryRateStore::new());
        let ingestion = Arc::new(RateIngestionEngine::new(
            fetcher.clone(),
            rates.clone(),
            IngestionConfig::default(),
        ));
        let users = Arc::new(InMemoryUserDirectory::new());
        let mut user = User::unverified(CHAT, None, "u@example.com", "h", Role::User, "1");
        user.verify();
        users.create(user).await.unwrap();
        let ledger = Arc::new(InMemoryLedger::new());
        let fees = Arc::new(InMemoryFeeSettings::new());
        fees.set(dec!(10)).await.unwrap();

        let engine = Arc::new(ConversionEngine::new(
            ingestion,
            rates,
            users.clone(),
            ledger.clone(),
            fees,
        ));
        let states = Arc::new(ConversionStates::new());
        let flow = ConversionFlow::new(states.clone(), users.clone(), engine);

        Fixture {
            flow,
            states,
            fetcher,
            ledger,
            users,
        }
    }

    #[tokio::test]
    async fn test_one_shot_conversion() {
        let f = fixture().await;

        let reply = f.flow.command(CHAT, &["usd", "rub", "100"]).await;

        match reply.message {
            Message::Converted { record } => {
                assert_eq!(record.rate, dec!(90.5));
                assert_eq!(record.result_amount, dec!(8145));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(f.states.get(CHAT).is_idle());
        assert_eq!(f.ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_picker_walkthrough() {
        let f = fixture().await;

        let reply = f.flow.command(CHAT, &[]).await;
        assert_eq!(reply.message, Message::PickSourceCurrency);
        let data: Vec<String> = reply.keyboard.unwrap().buttons().map(|b| b.data.clone()).collect();
        assert_eq!(data, vec!["conv:from:EUR", "conv:from:RUB", "conv:from:USD"]);
        assert!(f.states.is_empty());

        let reply = f.flow.select_source(CHAT, &CurrencyCode::usd()).await;
        assert_eq!(
            reply.message,
            Message::PickTargetCurrency {
                from: CurrencyCode::usd()
            }
        );
        let data: Vec<String> = reply.keyboard.unwrap().buttons().map(|b| b.data.clone()).collect();
        assert_eq!(data, vec!["conv:to:USD:EUR", "conv:to:USD:RUB"]);
        assert!(f.states.is_empty());

        let reply = f
            .flow
            .select_target(CHAT, &CurrencyCode::usd(), &CurrencyCode::eur())
            .await;
        assert_eq!(
            reply.message,
            Message::AskAmount {
                from: CurrencyCode::usd(),
                to: CurrencyCode::eur()
            }
        );
        assert_eq!(f.states.step(CHAT), ConversionStep::WaitingAmount);

        let reply = f.flow.handle_text(CHAT, "ten").await;
        assert_eq!(reply.message, Message::InvalidAmount);
        assert_eq!(f.states.step(CHAT), ConversionStep::WaitingAmount);

        let reply = f.flow.handle_text(CHAT, "100,5").await;
        assert!(matches!(reply.message, Message::Converted { .. }));
        assert!(f.states.get(CHAT).is_idle());
    }

    #[tokio::test]
    async fn test_unknown_currency_names_side() {
        let f = fixture().await;

        let reply = f.flow.command(CHAT, &["xxx"]).await;
        assert_eq!(
            reply.message,
            Message::UnknownSourceCurrency { code: "XXX".into() }
        );

        let reply = f.flow.command(CHAT, &["USD", "zzz", "5"]).await;
        assert_eq!(
            reply.message,
            Message::UnknownTargetCurrency { code: "ZZZ".into() }
        );
        assert!(f.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_currency_checked_before_amount() {
        let f = fixture().await;

        let reply = f.flow.command(CHAT, &["QQQ", "RUB", "abc"]).await;

        assert_eq!(reply.message, Message::UnknownSourceCurrency { code: "QQQ".into() });
    }

    #[tokio::test]
    async fn test_bad_one_shot_amount() {
        let f = fixture().await;

        let reply = f.flow.command(CHAT, &["USD", "RUB", "-3"]).await;

        assert_eq!(reply.message, Message::InvalidAmount);
        assert!(f.states.get(CHAT).is_idle());
    }

    #[tokio::test]
    async fn test_refresh_failure_resets_flow() {
        let f = fixture().await;
        f.flow.command(CHAT, &["USD", "RUB"]).await;
        assert_eq!(f.states.step(CHAT), ConversionStep::WaitingAmount);

        f.fetcher.set_error(FetchError::Status(503));
        let reply = f.flow.handle_text(CHAT, "10").await;

        assert_eq!(reply.message, Message::ConversionFailed);
        assert!(f.states.get(CHAT).is_idle());
        assert!(f.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_chat() {
        let f = fixture().await;
        let stranger = ChatId::new(77);

        let reply = f.flow.command(stranger, &["USD", "RUB", "1"]).await;

        assert_eq!(reply.message, Message::NotRegistered);
        assert!(f.ledger.is_empty());
        assert_eq!(f.users.len(), 1);
    }

    #[tokio::test]
    async fn test_new_command_replaces_pending_prompt() {
        let f = fixture().await;
        f.flow.command(CHAT, &["USD", "RUB"]).await;

        f.flow.command(CHAT, &["EUR"]).await;

        assert!(f.states.get(CHAT).is_idle());
    }
}
