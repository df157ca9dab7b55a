//! Verification code delivery.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::NotifyError;

/// Delivers verification codes to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_code(
        &self,
        destination: &str,
        code: &str,
    ) -> Result<(), NotifyError>;
}

/// Notifier that only records the delivery in the log.
///
/// The code itself never reaches the log unless built with
/// [`LogNotifier::revealing`], which writes it at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier {
    reveal_codes: bool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Development notifier that also logs the code.
    pub fn revealing() -> Self {
        Self { reveal_codes: true }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_code(
        &self,
        destination: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        info!(destination = %destination, "Verification code issued");
        if self.reveal_codes {
            debug!(destination = %destination, code = %code, "Verification code");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;
    use std::sync::Arc;
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    async fn logged(notifier: LogNotifier, level: Level) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(level)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        notifier
            .send_verification_code("ann@example.com", "482913")
            .await
            .unwrap();
        captured.text()
    }

    #[tokio::test]
    async fn test_code_stays_out_of_the_log() {
        let output = logged(LogNotifier::new(), Level::TRACE).await;

        assert!(output.contains("ann@example.com"));
        assert!(!output.contains("482913"));
    }

    #[tokio::test]
    async fn test_revealing_logs_code_at_debug_only() {
        let info = logged(LogNotifier::revealing(), Level::INFO).await;
        assert!(!info.contains("482913"));

        let debug = logged(LogNotifier::revealing(), Level::DEBUG).await;
        assert!(debug.contains("482913"));
    }
}
