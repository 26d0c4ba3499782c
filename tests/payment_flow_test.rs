use mockito::{Matcher, Server};
use serde_json::json;

use movebid_core::processor::{payment_signature, verify_payment_signature, ProcessorClient};

#[tokio::test]
async fn test_create_order_and_verify_signature() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("POST", "/orders")
        .match_body(Matcher::PartialJson(json!({
            "amount": 450000,
            "currency": "INR",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "order_remote_123",
                "amount": 450000,
                "currency": "INR",
                "receipt": "mb_order_1",
                "status": "created",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = ProcessorClient::new(server.url(), "key_id".to_string(), "key_secret".to_string());
    let remote = client
        .create_order(450000, "INR", "mb_order_1", json!({}))
        .await
        .expect("create order");

    assert_eq!(remote.id, "order_remote_123");
    assert_eq!(remote.amount, 450000);

    // The processor later confirms a payment against this order. The webhook
    // signature covers both ids joined with a pipe.
    let signature = payment_signature(&remote.id, "pay_remote_456", "webhook_secret");
    assert!(verify_payment_signature(
        &remote.id,
        "pay_remote_456",
        &signature,
        "webhook_secret",
    ));
    assert!(!verify_payment_signature(
        &remote.id,
        "pay_remote_456",
        &signature,
        "wrong_secret",
    ));
    assert!(!verify_payment_signature(
        "order_remote_999",
        "pay_remote_456",
        &signature,
        "webhook_secret",
    ));
}

#[tokio::test]
async fn test_create_order_surfaces_processor_rejection() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("POST", "/orders")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": { "code": "BAD_REQUEST_ERROR", "description": "amount too small" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = ProcessorClient::new(server.url(), "key_id".to_string(), "key_secret".to_string());
    let err = client
        .create_order(0, "INR", "mb_order_2", json!({}))
        .await
        .expect_err("should fail");

    let message = err.to_string();
    assert!(message.contains("400"));
    assert!(message.contains("amount too small"));
}

#[tokio::test]
async fn test_partial_refund_sends_amount() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("POST", "/payments/pay_remote_456/refund")
        .match_body(Matcher::PartialJson(json!({ "amount": 100000 })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "rfnd_789",
                "amount": 100000,
                "status": "processed",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = ProcessorClient::new(server.url(), "key_id".to_string(), "key_secret".to_string());
    let refund = client
        .refund("pay_remote_456", Some(100000), json!({ "reason": "damaged item" }))
        .await
        .expect("refund");

    assert_eq!(refund.id, "rfnd_789");
    assert_eq!(refund.status, "processed");
}
