use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use reqwest::Client;
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    config::constants,
    decision::{Attendance, Clock},
    error::Result,
    fetch::{Fetcher, check_attendance},
};

/// Where periodic alerts go.
pub enum AlertSink {
    Log,
    /// Discord-style webhook taking `{"content": "..."}`.
    Webhook { client: Client, url: String },
}

impl AlertSink {
    pub fn new(webhook: Option<String>) -> reqwest::Result<Self> {
        let Some(url) = webhook else {
            return Ok(Self::Log);
        };
        let client = Client::builder()
            .connect_timeout(constants::CONNECT_TIMEOUT)
            .timeout(constants::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::Webhook { client, url })
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        match self {
            Self::Log => tracing::warn!(target: "bot", "\x1b[1;33m{text}\x1b[0m"),
            Self::Webhook { client, url } => {
                client
                    .post(url)
                    .json(&json!({ "content": text }))
                    .send()
                    .await?
                    .error_for_status()?;
                tracing::info!(target: "bot", "alert delivered");
            }
        }
        Ok(())
    }
}

/// Only an absence is worth interrupting someone for.
pub fn alert_text(attendance: &Attendance) -> Option<String> {
    (!attendance.present).then(|| {
        let today = crate::decision::date_key(attendance.date);
        format!("⏰ 오늘({today}) 출석이 아직 안 되어 있어요!")
    })
}

pub fn error_text(e: &crate::Error) -> String {
    format!("🚨 오류: {e}")
}

/// Timer and command surface sharing one fetcher; checks never overlap.
pub struct Notifier<C> {
    fetcher: Mutex<Fetcher<C>>,
    sink: AlertSink,
}

impl<C: Clock> Notifier<C> {
    pub fn new(fetcher: Fetcher<C>, sink: AlertSink) -> Self {
        Self {
            fetcher: Mutex::new(fetcher),
            sink,
        }
    }

    async fn check(&self) -> Result<Attendance> {
        let mut fetcher = self.fetcher.lock().await;
        check_attendance(&mut fetcher).await
    }

    /// The "check now" command: a human-readable answer either way.
    pub async fn check_now(&self) -> core::result::Result<String, String> {
        match self.check().await {
            Ok(attendance) => {
                tracing::info!(target: "bot", "check: present = {}", attendance.present);
                Ok(attendance.message())
            }
            Err(e) => {
                tracing::error!(target: "bot", "\x1b[31mcheck failed\x1b[0m: {e}");
                Err(error_text(&e))
            }
        }
    }

    /// One timer tick. Failures are reported and swallowed so the loop
    /// keeps going.
    pub async fn on_tick(&self) {
        let text = match self.check().await {
            Ok(attendance) => {
                tracing::info!(target: "bot", "tick: {}", attendance.message());
                alert_text(&attendance)
            }
            Err(e) => {
                tracing::error!(target: "bot", "\x1b[31mtick failed\x1b[0m: {e}");
                Some(error_text(&e))
            }
        };
        if let Some(text) = text {
            if let Err(e) = self.sink.send(&text).await {
                tracing::error!(target: "bot", "alert not delivered: {e}");
            }
        }
    }
}

pub fn router<C>(notifier: Arc<Notifier<C>>) -> Router
where
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/check", get(check_handler::<C>))
        .with_state(notifier)
}

async fn check_handler<C>(State(notifier): State<Arc<Notifier<C>>>) -> (StatusCode, String)
where
    C: Clock + Send + Sync + 'static,
{
    match notifier.check_now().await {
        Ok(text) => (StatusCode::OK, text),
        Err(text) => (StatusCode::BAD_GATEWAY, text),
    }
}
