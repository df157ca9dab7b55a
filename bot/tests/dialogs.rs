//! Full dialogs driven through the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use kursbot_bot::{
    BotConfig, Dispatcher, DispatcherParts, FlowKind, InMemoryUserDirectory, Message, Notifier,
    NotifyError, Update,
};
use kursbot_common::{ChatId, CurrencyCode, UserDirectory};
use kursbot_fx::{
    ConversionEngine, FeeSettings, InMemoryFeeSettings, InMemoryRateStore, IngestionConfig,
    MockFeedFetcher, RateIngestionEngine,
};
use kursbot_ledger::InMemoryLedger;
use parking_lot::Mutex;
use rust_decimal_macros::dec;

const ADMIN: ChatId = ChatId::new(100);
const ALICE: ChatId = ChatId::new(200);

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn last_code(&self, destination: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(to, _)| to == destination)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_code(
        &self,
        destination: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        self.sent.lock().push((destination.to_string(), code.to_string()));
        Ok(())
    }
}

struct Harness {
    dispatcher: Dispatcher,
    notifier: Arc<RecordingNotifier>,
    users: Arc<InMemoryUserDirectory>,
    fees: Arc<InMemoryFeeSettings>,
    ledger: Arc<InMemoryLedger>,
}

impl Harness {
    fn new() -> Self {
        let fetcher = Arc::new(MockFeedFetcher::with_rates(&[
            ("USD", "Доллар США", 1, "90,5000"),
            ("EUR", "Евро", 1, "98,2500"),
            ("JPY", "Японских иен", 100, "61,2345"),
        ]));
        let rates = Arc::new(InMemoryRateStore::new());
        let ingestion = Arc::new(RateIngestionEngine::new(
            fetcher,
            rates.clone(),
            IngestionConfig::default(),
        ));
        let users = Arc::new(InMemoryUserDirectory::new());
        let fees = Arc::new(InMemoryFeeSettings::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = Arc::new(ConversionEngine::new(
            ingestion,
            rates,
            users.clone(),
            ledger.clone(),
            fees.clone(),
        ));
        let notifier = Arc::new(RecordingNotifier::default());

        let config = BotConfig {
            admin_chat_ids: vec![ADMIN],
            ..BotConfig::default()
        };
        let dispatcher = Dispatcher::new(
            &config,
            DispatcherParts {
                users: users.clone(),
                notifier: notifier.clone(),
                fees: fees.clone(),
                engine,
            },
        );

        Self {
            dispatcher,
            notifier,
            users,
            fees,
            ledger,
        }
    }

    async fn text(&self, chat: ChatId, text: &str) -> Message {
        self.text_as(chat, &format!("user{chat}"), text).await
    }

    async fn text_as(&self, chat: ChatId, username: &str, text: &str) -> Message {
        self.dispatcher
            .dispatch(Update::text(chat, text).with_username(username))
            .await
            .message
    }

    async fn press(&self, chat: ChatId, data: &str) -> Message {
        self.dispatcher.dispatch(Update::callback(chat, data)).await.message
    }

    async fn register(&self, chat: ChatId, email: &str) {
        assert_eq!(self.text(chat, "/register").await, Message::AskEmail);
        assert_eq!(self.text(chat, email).await, Message::AskPassword);
        assert_eq!(
            self.text(chat, "hunter22").await,
            Message::VerificationCodeSent {
                email: email.to_string()
            }
        );
        let code = self.notifier.last_code(email).unwrap();
        assert_eq!(self.text(chat, &code).await, Message::Registered);
    }
}

#[tokio::test]
async fn test_register_set_fee_and_convert() {
    let h = Harness::new();
    h.register(ADMIN, "admin@example.com").await;
    h.register(ALICE, "alice@example.com").await;

    assert_eq!(h.text(ADMIN, "/fee").await, Message::CurrentFee { percent: dec!(0) });
    assert_eq!(
        h.press(ADMIN, "fee:pick:10").await,
        Message::AskFee {
            suggested: Some(dec!(10))
        }
    );
    assert_eq!(h.press(ADMIN, "fee:confirm").await, Message::FeeUpdated { percent: dec!(10) });
    assert_eq!(h.fees.current().await.unwrap(), dec!(10));

    assert_eq!(h.text(ALICE, "/fee").await, Message::AccessDenied);

    assert_eq!(h.text(ALICE, "/convert").await, Message::PickSourceCurrency);
    assert_eq!(
        h.press(ALICE, "conv:from:USD").await,
        Message::PickTargetCurrency {
            from: CurrencyCode::usd()
        }
    );
    assert_eq!(
        h.press(ALICE, "conv:to:USD:RUB").await,
        Message::AskAmount {
            from: CurrencyCode::usd(),
            to: CurrencyCode::rub()
        }
    );
    assert_eq!(h.dispatcher.states().pending(ALICE), Some(FlowKind::Conversion));

    match h.text(ALICE, "100").await {
        Message::Converted { record } => {
            assert_eq!(record.rate, dec!(90.5));
            assert_eq!(record.result_amount, dec!(8145));
        }
        other => panic!("unexpected reply: {other:?}"),
    }
    assert_eq!(h.dispatcher.states().pending(ALICE), None);

    match h.text(ALICE, "/history").await {
        Message::History { records } => assert_eq!(records.len(), 1),
        other => panic!("unexpected reply: {other:?}"),
    }
    assert_eq!(h.text(ADMIN, "/history").await, Message::EmptyHistory);
    assert_eq!(h.ledger.len(), 1);
}

#[tokio::test]
async fn test_admin_chat_gets_admin_role() {
    let h = Harness::new();
    h.register(ADMIN, "admin@example.com").await;
    h.register(ALICE, "alice@example.com").await;

    let admin = h.users.find_by_chat_id(ADMIN).await.unwrap().unwrap();
    let alice = h.users.find_by_chat_id(ALICE).await.unwrap().unwrap();
    assert_eq!(admin.role, kursbot_common::Role::Admin);
    assert_eq!(alice.role, kursbot_common::Role::User);
    assert!(alice.is_active());
}

#[tokio::test]
async fn test_cancel_clears_every_flow() {
    let h = Harness::new();
    h.register(ALICE, "alice@example.com").await;

    h.text(ALICE, "/convert USD EUR").await;
    h.text(ALICE, "/register").await;
    assert_eq!(h.dispatcher.states().pending(ALICE), Some(FlowKind::Registration));

    assert_eq!(h.text(ALICE, "/cancel").await, Message::Cancelled);
    assert_eq!(h.dispatcher.states().pending(ALICE), None);
    assert_eq!(h.text(ALICE, "150").await, Message::UnknownCommand);
}

#[tokio::test]
async fn test_unregistered_chat() {
    let h = Harness::new();

    assert_eq!(h.text(ALICE, "/history").await, Message::NotRegistered);
    assert_eq!(h.text(ALICE, "/convert USD RUB 10").await, Message::NotRegistered);
    assert_eq!(h.text(ALICE, "/fee").await, Message::AccessDenied);
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn test_commands_and_callbacks_routing() {
    let h = Harness::new();

    assert_eq!(h.text(ALICE, "/start").await, Message::Welcome);
    assert_eq!(h.text(ALICE, "/help@kursbot").await, Message::Help);
    assert_eq!(h.text(ALICE, "/nope").await, Message::UnknownCommand);
    assert_eq!(h.text(ALICE, "hello").await, Message::UnknownCommand);
    assert_eq!(h.press(ALICE, "garbage").await, Message::UnknownCommand);

    match h.text(ALICE, "/rates").await {
        Message::Rates { rates } => {
            let codes: Vec<String> = rates.iter().map(|r| r.code.to_string()).collect();
            assert_eq!(codes, vec!["EUR", "JPY", "RUB", "USD"]);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_code_keeps_registration_open() {
    let h = Harness::new();
    h.text(ALICE, "/register").await;
    assert_eq!(h.text(ALICE, "not-an-email").await, Message::InvalidEmail);
    h.text(ALICE, "alice@example.com").await;
    h.text(ALICE, "hunter22").await;

    let code = h.notifier.last_code("alice@example.com").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };
    assert_eq!(h.text(ALICE, wrong).await, Message::InvalidVerificationCode);
    assert_eq!(h.dispatcher.states().pending(ALICE), Some(FlowKind::Registration));

    assert_eq!(h.text(ALICE, &code).await, Message::Registered);
    assert_eq!(h.dispatcher.states().pending(ALICE), None);
}

#[tokio::test]
async fn test_taken_username_fails_registration_and_resets() {
    let h = Harness::new();
    h.text_as(ADMIN, "tester", "/register").await;
    h.text_as(ADMIN, "tester", "admin@example.com").await;
    h.text_as(ADMIN, "tester", "hunter22").await;

    h.text_as(ALICE, "tester", "/register").await;
    h.text_as(ALICE, "tester", "alice@example.com").await;
    let reply = h.text_as(ALICE, "tester", "hunter22").await;

    assert_eq!(reply, Message::RegistrationFailed);
    assert_eq!(h.dispatcher.states().pending(ALICE), None);
    assert!(h.notifier.last_code("alice@example.com").is_none());
    assert!(h.users.find_by_chat_id(ALICE).await.unwrap().is_none());
}
