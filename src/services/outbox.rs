use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::db::models::Notification;
use crate::db::queries;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const MAX_ATTEMPTS: i32 = 5;
const BATCH_SIZE: i64 = 10;
const POLL_INTERVAL_SECS: u64 = 5;
const BASE_RETRY_SECS: i64 = 30;

/// Delivery channel for notifications. Failures are reported to the
/// dispatcher for retry but never reach the business operation that
/// enqueued the notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Posts notifications to a webhook endpoint with an HMAC-signed body.
pub struct WebhookSink {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
}

impl WebhookSink {
    pub fn new(endpoint: String, secret: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint,
            secret,
        }
    }

    fn signature_for(&self, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&json!({
            "id": notification.id,
            "recipient": notification.recipient,
            "recipient_type": notification.recipient_type,
            "event_type": notification.event_type,
            "subject": notification.subject,
            "body": notification.body,
            "metadata": notification.metadata,
        }))?;
        let signature = self.signature_for(&body);

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("X-Notify-Signature", signature)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("notification sink returned {}", response.status());
        }

        Ok(())
    }
}

/// Exponential backoff for redelivery: 30s, 60s, 120s, ...
pub fn retry_delay(attempts: i32) -> ChronoDuration {
    let exponent = attempts.clamp(0, 10) as u32;
    ChronoDuration::seconds(BASE_RETRY_SECS << exponent)
}

#[derive(Clone)]
pub struct OutboxService {
    pool: PgPool,
}

impl OutboxService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_notification(&self, id: Uuid) -> Result<Notification, AppError> {
        queries::get_notification(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }

    /// Resending creates a brand-new pending row linked to the original via
    /// `metadata.resend_of`; the original is never mutated.
    pub async fn resend(&self, id: Uuid) -> Result<Notification, AppError> {
        let original = self.get_notification(id).await?;

        let mut metadata = original.metadata.clone();
        if let Some(map) = metadata.as_object_mut() {
            map.insert("resend_of".to_string(), json!(original.id));
        } else {
            metadata = json!({ "resend_of": original.id });
        }

        let resend = Notification::new(
            original.recipient.clone(),
            original.recipient_type,
            &original.event_type,
            original.subject.clone(),
            original.body.clone(),
            metadata,
        );
        let saved = queries::enqueue_notification(&self.pool, &resend).await?;

        info!("Queued resend {} of notification {}", saved.id, id);

        Ok(saved)
    }
}

/// Runs the background dispatcher loop. Pulls due rows from the outbox and
/// pushes them through the sink without blocking the HTTP server. Uses
/// `FOR UPDATE SKIP LOCKED` so multiple workers cooperate safely.
pub async fn run_dispatcher(pool: PgPool, sink: Arc<dyn NotificationSink>) {
    info!("Notification outbox dispatcher started");

    loop {
        if let Err(e) = dispatch_batch(&pool, sink.as_ref()).await {
            error!("Dispatcher batch error: {}", e);
        }

        sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
    }
}

pub async fn dispatch_batch(pool: &PgPool, sink: &dyn NotificationSink) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    let due = queries::due_notifications(&mut tx, Utc::now(), BATCH_SIZE).await?;
    if due.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    debug!("Dispatching {} notification(s)", due.len());

    let mut sent = 0usize;
    for notification in &due {
        match sink.send(notification).await {
            Ok(()) => {
                queries::mark_notification_sent(&mut tx, notification.id).await?;
                sent += 1;
            }
            Err(e) => {
                let attempts = notification.attempts + 1;
                if attempts >= MAX_ATTEMPTS {
                    error!(
                        "Notification {} failed permanently after {} attempts: {}",
                        notification.id, attempts, e
                    );
                    queries::mark_notification_failed(&mut tx, notification.id).await?;
                } else {
                    debug!(
                        "Notification {} attempt {} failed, retrying: {}",
                        notification.id, attempts, e
                    );
                    let next = Utc::now() + retry_delay(attempts);
                    queries::mark_notification_retry(&mut tx, notification.id, next).await?;
                }
            }
        }
    }

    tx.commit().await?;
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_per_attempt() {
        assert_eq!(retry_delay(0), ChronoDuration::seconds(30));
        assert_eq!(retry_delay(1), ChronoDuration::seconds(60));
        assert_eq!(retry_delay(2), ChronoDuration::seconds(120));
        assert_eq!(retry_delay(3), ChronoDuration::seconds(240));
    }

    #[test]
    fn retry_delay_is_capped() {
        // Attempts beyond the clamp all map to the same ceiling.
        assert_eq!(retry_delay(10), retry_delay(11));
        assert_eq!(retry_delay(10), retry_delay(100));
    }

    #[test]
    fn webhook_sink_signature_is_stable_hex() {
        let sink = WebhookSink::new("http://localhost/hook".to_string(), "secret".to_string());
        let sig = sink.signature_for(b"{\"ok\":true}");

        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig, sink.signature_for(b"{\"ok\":true}"));
        assert_ne!(sig, sink.signature_for(b"{\"ok\":false}"));
    }
}
