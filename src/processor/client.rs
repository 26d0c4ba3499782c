use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Processor rejected the request ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid response from processor: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// Remote order created at the processor; the front-end completes the charge
/// against it. Amount is in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRefund {
    pub id: String,
    pub amount: i64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    description: Option<String>,
}

/// HTTP client for the external payment processor. Key-pair authenticated;
/// the key id is public and is handed to the front-end to complete charges.
#[derive(Clone)]
pub struct ProcessorClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl ProcessorClient {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(60), Duration::from_secs(120));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        ProcessorClient {
            client,
            base_url,
            key_id,
            key_secret,
            circuit_breaker,
        }
    }

    /// Public key id, returned to the front-end alongside the remote order.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Creates a remote payment order for `amount_minor` minor currency units.
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: Value,
    ) -> Result<RemoteOrder, ProcessorError> {
        let url = format!("{}/orders", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "amount": amount_minor,
            "currency": currency,
            "receipt": receipt,
            "notes": notes,
        });

        self.post(&url, body).await
    }

    /// Refunds a captured payment, fully when `amount_minor` is None.
    pub async fn refund(
        &self,
        payment_id: &str,
        amount_minor: Option<i64>,
        notes: Value,
    ) -> Result<RemoteRefund, ProcessorError> {
        let url = format!(
            "{}/payments/{}/refund",
            self.base_url.trim_end_matches('/'),
            payment_id
        );
        let mut body = serde_json::json!({ "notes": notes });
        if let Some(amount) = amount_minor {
            body["amount"] = serde_json::json!(amount);
        }

        self.post(&url, body).await
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: Value,
    ) -> Result<T, ProcessorError> {
        let client = self.client.clone();
        let key_id = self.key_id.clone();
        let key_secret = self.key_secret.clone();
        let url = url.to_string();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .basic_auth(&key_id, Some(&key_secret))
                    .json(&body)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let message = response
                        .json::<ApiErrorBody>()
                        .await
                        .ok()
                        .and_then(|b| b.error)
                        .and_then(|e| e.description)
                        .unwrap_or_else(|| "no error detail".to_string());
                    return Err(ProcessorError::ApiError {
                        status: status.as_u16(),
                        message,
                    });
                }

                response
                    .json::<T>()
                    .await
                    .map_err(|e| ProcessorError::InvalidResponse(e.to_string()))
            })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(ProcessorError::CircuitBreakerOpen(
                "payment processor circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ProcessorClient::new(
            "https://api.processor.test/v1".to_string(),
            "key_test_123".to_string(),
            "secret".to_string(),
        );
        assert_eq!(client.base_url, "https://api.processor.test/v1");
        assert_eq!(client.key_id(), "key_test_123");
    }

    #[tokio::test]
    async fn test_create_order() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "order_N9876",
                    "amount": 450000,
                    "currency": "INR",
                    "receipt": "rcpt-1",
                    "status": "created"
                }"#,
            )
            .create_async()
            .await;

        let client = ProcessorClient::new(
            server.url(),
            "key_test_123".to_string(),
            "secret".to_string(),
        );
        let order = client
            .create_order(450000, "INR", "rcpt-1", serde_json::json!({}))
            .await
            .expect("create order");

        assert_eq!(order.id, "order_N9876");
        assert_eq!(order.amount, 450000);
        assert_eq!(order.currency, "INR");
    }

    #[tokio::test]
    async fn test_create_order_api_error() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/orders")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"description": "amount too small"}}"#)
            .create_async()
            .await;

        let client = ProcessorClient::new(
            server.url(),
            "key_test_123".to_string(),
            "secret".to_string(),
        );
        let result = client
            .create_order(1, "INR", "rcpt-2", serde_json::json!({}))
            .await;

        match result {
            Err(ProcessorError::ApiError { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "amount too small");
            }
            other => panic!("expected ApiError, got {:?}", other.map(|o| o.id)),
        }
    }

    #[tokio::test]
    async fn test_refund() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/payments/pay_123/refund")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "rfnd_42", "amount": 450000, "status": "processed"}"#)
            .create_async()
            .await;

        let client = ProcessorClient::new(
            server.url(),
            "key_test_123".to_string(),
            "secret".to_string(),
        );
        let refund = client
            .refund("pay_123", Some(450000), serde_json::json!({"reason": "customer request"}))
            .await
            .expect("refund");

        assert_eq!(refund.id, "rfnd_42");
        assert_eq!(refund.status, "processed");
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/orders")
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let client = ProcessorClient::new(
            server.url(),
            "key_test_123".to_string(),
            "secret".to_string(),
        );

        for _ in 0..3 {
            let _ = client
                .create_order(1000, "INR", "rcpt", serde_json::json!({}))
                .await;
        }

        let result = client
            .create_order(1000, "INR", "rcpt", serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(ProcessorError::CircuitBreakerOpen(_))));
    }
}
