//! Reply payloads handed to the chat transport.

use std::fmt;

use kursbot_common::{CurrencyCode, CurrencyRate};
use kursbot_ledger::ConversionRecord;
use rust_decimal::Decimal;
use serde::Serialize;

/// A message the bot sends back, identified by an i18n key.
///
/// `Display` renders the default English text; transports with their own
/// translations look the message up by [`Message::key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum Message {
    Welcome,
    Help,
    UnknownCommand,
    Cancelled,
    NotRegistered,
    AccessDenied,
    GenericError,

    AskEmail,
    InvalidEmail,
    AskPassword,
    PasswordTooShort { min: usize },
    AlreadyRegistered,
    RegistrationFailed,
    VerificationCodeSent { email: String },
    InvalidVerificationCode,
    Registered,

    CurrentFee { percent: Decimal },
    AskFee { suggested: Option<Decimal> },
    InvalidFeeValue,
    NothingToConfirm,
    FeeUpdated { percent: Decimal },

    PickSourceCurrency,
    PickTargetCurrency { from: CurrencyCode },
    AskAmount { from: CurrencyCode, to: CurrencyCode },
    UnknownSourceCurrency { code: String },
    UnknownTargetCurrency { code: String },
    InvalidAmount,
    Converted { record: ConversionRecord },
    ConversionFailed,

    Rates { rates: Vec<CurrencyRate> },
    RatesUnavailable,
    History { records: Vec<ConversionRecord> },
    EmptyHistory,
}

impl Message {
    /// Stable i18n key.
    pub fn key(&self) -> &'static str {
        match self {
            Message::Welcome => "welcome",
            Message::Help => "help",
            Message::UnknownCommand => "unknown_command",
            Message::Cancelled => "cancelled",
            Message::NotRegistered => "not_registered",
            Message::AccessDenied => "access_denied",
            Message::GenericError => "generic_error",
            Message::AskEmail => "ask_email",
            Message::InvalidEmail => "invalid_email",
            Message::AskPassword => "ask_password",
            Message::PasswordTooShort { .. } => "password_too_short",
            Message::AlreadyRegistered => "already_registered",
            Message::RegistrationFailed => "registration_failed",
            Message::VerificationCodeSent { .. } => "verification_code_sent",
            Message::InvalidVerificationCode => "invalid_verification_code",
            Message::Registered => "registered",
            Message::CurrentFee { .. } => "current_fee",
            Message::AskFee { .. } => "ask_fee",
            Message::InvalidFeeValue => "invalid_fee_value",
            Message::NothingToConfirm => "nothing_to_confirm",
            Message::FeeUpdated { .. } => "fee_updated",
            Message::PickSourceCurrency => "pick_source_currency",
            Message::PickTargetCurrency { .. } => "pick_target_currency",
            Message::AskAmount { .. } => "ask_amount",
            Message::UnknownSourceCurrency { .. } => "unknown_source_currency",
            Message::UnknownTargetCurrency { .. } => "unknown_target_currency",
            Message::InvalidAmount => "invalid_amount",
            Message::Converted { .. } => "converted",
            Message::ConversionFailed => "conversion_failed",
            Message::Rates { .. } => "rates",
            Message::RatesUnavailable => "rates_unavailable",
            Message::History { .. } => "history",
            Message::EmptyHistory => "empty_history",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Welcome => write!(
                f,
                "Welcome! I convert currencies at central bank rates. Send /help for commands."
            ),
            Message::Help => write!(
                f,
                "/register - create an account\n\
                 /convert [from [to [amount]]] - convert currencies\n\
                 /rates - current rates\n\
                 /history - your conversions\n\
                 /fee - set the conversion fee (admins)\n\
                 /cancel - abort the current dialog"
            ),
            Message::UnknownCommand => write!(f, "Unknown command. Send /help for the list."),
            Message::Cancelled => write!(f, "Cancelled."),
            Message::NotRegistered => write!(f, "You are not registered yet. Send /register."),
            Message::AccessDenied => write!(f, "You are not allowed to do that."),
            Message::GenericError => write!(f, "Something went wrong. Please try again later."),
            Message::AskEmail => write!(f, "Enter your email:"),
            Message::InvalidEmail => {
                write!(f, "That does not look like an email address. Try again:")
            }
            Message::AskPassword => write!(f, "Enter a password:"),
            Message::PasswordTooShort { min } => {
                write!(f, "Password must be at least {min} characters. Try again:")
            }
            Message::AlreadyRegistered => write!(f, "This chat already has an account."),
            Message::RegistrationFailed => write!(f, "Registration is not possible right now."),
            Message::VerificationCodeSent { email } => {
                write!(f, "A verification code was sent to {email}. Enter it:")
            }
            Message::InvalidVerificationCode => write!(f, "Wrong code. Try again:"),
            Message::Registered => write!(f, "Registration complete."),
            Message::CurrentFee { percent } => {
                write!(
                    f,
                    "Current fee: {}%. Pick a new value or enter one manually.",
                    percent.normalize()
                )
            }
            Message::AskFee { suggested: Some(percent) } => write!(
                f,
                "Confirm {}% or enter another value:",
                percent.normalize()
            ),
            Message::AskFee { suggested: None } => write!(f, "Enter the fee in percent (0-100):"),
            Message::InvalidFeeValue => {
                write!(f, "The fee must be a number from 0 to 100. Try again:")
            }
            Message::NothingToConfirm => write!(f, "There is no fee value to confirm."),
            Message::FeeUpdated { percent } => write!(f, "Fee set to {}%.", percent.normalize()),
            Message::PickSourceCurrency => write!(f, "Convert from:"),
            Message::PickTargetCurrency { from } => write!(f, "Convert {from} to:"),
            Message::AskAmount { from, to } => write!(f, "How much {from} to convert to {to}?"),
            Message::UnknownSourceCurrency { code } => write!(f, "Unknown source currency: {code}"),
            Message::UnknownTargetCurrency { code } => write!(f, "Unknown target currency: {code}"),
            Message::InvalidAmount => write!(f, "The amount must be a positive number. Try again:"),
            Message::Converted { record } => write!(
                f,
                "{} {} = {} {} (rate {})",
                record.amount.normalize(),
                record.source,
                record.result_amount.normalize(),
                record.target,
                record.rate.normalize()
            ),
            Message::ConversionFailed => write!(f, "Conversion failed. Please try again later."),
            Message::Rates { rates } => {
                for (i, rate) in rates.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{} {}: {}", rate.code, rate.name, rate.rate.normalize())?;
                }
                Ok(())
            }
            Message::RatesUnavailable => write!(f, "Rates are unavailable right now."),
            Message::History { records } => {
                for (i, record) in records.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "{} {} {} -> {} {}",
                        record.created_at.format("%Y-%m-%d %H:%M"),
                        record.amount.normalize(),
                        record.source,
                        record.result_amount.normalize(),
                        record.target
                    )?;
                }
                Ok(())
            }
            Message::EmptyHistory => write!(f, "You have no conversions yet."),
        }
    }
}

/// An inline button carrying callback data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Rows of inline buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Lay buttons out left to right, `per_row` per row.
    pub fn grid(buttons: Vec<Button>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows = Vec::new();
        let mut row = Vec::with_capacity(per_row);
        for button in buttons {
            row.push(button);
            if row.len() == per_row {
                rows.push(std::mem::replace(&mut row, Vec::with_capacity(per_row)));
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
        Self { rows }
    }

    /// Append a full-width row.
    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// A message plus an optional keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub message: Message,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

impl From<Message> for Reply {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}
