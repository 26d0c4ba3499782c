use mockito::{Matcher, Server};
use serde_json::json;

use movebid_core::db::models::{Notification, RecipientType};
use movebid_core::services::{NotificationSink, WebhookSink};

fn sample_notification() -> Notification {
    Notification::new(
        "customer@example.com".to_string(),
        RecipientType::Customer,
        "payment_confirmed",
        "Payment received".to_string(),
        "Your payment was received.".to_string(),
        json!({ "order_id": "11111111-2222-3333-4444-555555555555" }),
    )
}

#[tokio::test]
async fn test_webhook_sink_delivers_signed_payload() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("content-type", "application/json")
        .match_header(
            "x-notify-signature",
            Matcher::Regex("^[0-9a-f]{64}$".to_string()),
        )
        .match_body(Matcher::PartialJson(json!({
            "recipient": "customer@example.com",
            "event_type": "payment_confirmed",
        })))
        .with_status(200)
        .create_async()
        .await;

    let sink = WebhookSink::new(format!("{}/hook", server.url()), "secret".to_string());
    let result = sink.send(&sample_notification()).await;

    assert!(result.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_sink_reports_server_errors() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("POST", "/hook")
        .with_status(503)
        .create_async()
        .await;

    let sink = WebhookSink::new(format!("{}/hook", server.url()), "secret".to_string());
    let result = sink.send(&sample_notification()).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("503"));
}

#[tokio::test]
async fn test_webhook_sink_reports_connection_errors() {
    // Nothing listens on this port.
    let sink = WebhookSink::new(
        "http://127.0.0.1:1/hook".to_string(),
        "secret".to_string(),
    );
    let result = sink.send(&sample_notification()).await;

    assert!(result.is_err());
}
