use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Result, Transaction as SqlxTransaction};
use uuid::Uuid;

use crate::db::models::{
    CommissionRecord, CrossLeadStatus, Delivery, DeliveryEvent, DeliveryStatus, Notification,
    NotificationStatus, Order, OrderStatus, Payment, Pincode, Quote, Rider, RiderStatus, Vendor,
};

// --- Order Queries ---

pub async fn insert_order<'e>(executor: impl PgExecutor<'e>, order: &Order) -> Result<Order> {
    sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            id, user_email, order_type, pickup_pincode, destination_pincode, status,
            selected_vendor_id, is_cross_lead, referring_vendor_id, cross_lead_status,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(&order.user_email)
    .bind(order.order_type)
    .bind(&order.pickup_pincode)
    .bind(&order.destination_pincode)
    .bind(order.status)
    .bind(order.selected_vendor_id)
    .bind(order.is_cross_lead)
    .bind(order.referring_vendor_id)
    .bind(order.cross_lead_status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .fetch_one(executor)
    .await
}

pub async fn get_order<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locked read used inside the payment settlement transaction so two
/// concurrent verifications of the same order serialize on the row.
pub async fn get_order_for_update(
    tx: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn list_orders_for_user(
    pool: &PgPool,
    user_email: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_email = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_email)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Orders a vendor participates in: quoted on, selected for, or referred.
pub async fn list_orders_for_vendor(pool: &PgPool, vendor_id: Uuid) -> Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT DISTINCT o.* FROM orders o
        LEFT JOIN quotes q ON q.order_id = o.id
        WHERE q.vendor_id = $1
           OR o.selected_vendor_id = $1
           OR o.referring_vendor_id = $1
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(vendor_id)
    .fetch_all(pool)
    .await
}

pub async fn update_order_status<'e>(
    executor: impl PgExecutor<'e>,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<u64> {
    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(order_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

pub async fn set_selected_vendor<'e>(
    executor: impl PgExecutor<'e>,
    order_id: Uuid,
    vendor_id: Uuid,
    status: OrderStatus,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE orders SET selected_vendor_id = $1, status = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(vendor_id)
    .bind(status)
    .bind(order_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_cross_lead_status(
    tx: &mut SqlxTransaction<'_, Postgres>,
    order_id: Uuid,
    status: CrossLeadStatus,
) -> Result<()> {
    sqlx::query("UPDATE orders SET cross_lead_status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(order_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

// --- Quote Queries ---

/// A vendor re-submitting a bid replaces their earlier amount; there is at
/// most one selectable quote per (order, vendor).
pub async fn upsert_quote(pool: &PgPool, quote: &Quote) -> Result<Quote> {
    sqlx::query_as::<_, Quote>(
        r#"
        INSERT INTO quotes (id, order_id, vendor_id, amount, submitted_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (order_id, vendor_id)
        DO UPDATE SET amount = EXCLUDED.amount, submitted_at = EXCLUDED.submitted_at
        RETURNING *
        "#,
    )
    .bind(quote.id)
    .bind(quote.order_id)
    .bind(quote.vendor_id)
    .bind(&quote.amount)
    .bind(quote.submitted_at)
    .fetch_one(pool)
    .await
}

pub async fn get_quote<'e>(
    executor: impl PgExecutor<'e>,
    order_id: Uuid,
    vendor_id: Uuid,
) -> Result<Option<Quote>> {
    sqlx::query_as::<_, Quote>("SELECT * FROM quotes WHERE order_id = $1 AND vendor_id = $2")
        .bind(order_id)
        .bind(vendor_id)
        .fetch_optional(executor)
        .await
}

pub async fn list_quotes<'e>(executor: impl PgExecutor<'e>, order_id: Uuid) -> Result<Vec<Quote>> {
    sqlx::query_as::<_, Quote>(
        "SELECT * FROM quotes WHERE order_id = $1 ORDER BY submitted_at ASC",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await
}

// --- Vendor Queries ---

pub async fn insert_vendor(pool: &PgPool, vendor: &Vendor) -> Result<Vendor> {
    sqlx::query_as::<_, Vendor>(
        r#"
        INSERT INTO vendors (
            id, name, email, service_areas, referral_code,
            commission_rate, discounted_commissions_used, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(vendor.id)
    .bind(&vendor.name)
    .bind(&vendor.email)
    .bind(&vendor.service_areas)
    .bind(&vendor.referral_code)
    .bind(vendor.commission_rate)
    .bind(vendor.discounted_commissions_used)
    .bind(vendor.created_at)
    .fetch_one(pool)
    .await
}

pub async fn get_vendor<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Vendor>> {
    sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Vendors whose service area covers a pincode; these are the vendors
/// invited to bid on an order picked up there.
pub async fn list_vendors_serving<'e>(
    executor: impl PgExecutor<'e>,
    pincode: &str,
) -> Result<Vec<Vendor>> {
    sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE $1 = ANY(service_areas)")
        .bind(pincode)
        .fetch_all(executor)
        .await
}

pub async fn count_cross_leads_referred<'e>(
    executor: impl PgExecutor<'e>,
    vendor_id: Uuid,
) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE is_cross_lead AND referring_vendor_id = $1",
    )
    .bind(vendor_id)
    .fetch_one(executor)
    .await
}

pub async fn consume_discount_credit(
    tx: &mut SqlxTransaction<'_, Postgres>,
    vendor_id: Uuid,
) -> Result<()> {
    sqlx::query(
        "UPDATE vendors SET discounted_commissions_used = discounted_commissions_used + 1 WHERE id = $1",
    )
    .bind(vendor_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// --- Payment Queries ---

pub async fn insert_payment(
    tx: &mut SqlxTransaction<'_, Postgres>,
    payment: &Payment,
) -> Result<Payment> {
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (
            id, order_id, processor_order_id, processor_payment_id, signature,
            amount, currency, paid_at, applied_commission_discount, commission_rate
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(payment.id)
    .bind(payment.order_id)
    .bind(&payment.processor_order_id)
    .bind(&payment.processor_payment_id)
    .bind(&payment.signature)
    .bind(&payment.amount)
    .bind(&payment.currency)
    .bind(payment.paid_at)
    .bind(payment.applied_commission_discount)
    .bind(payment.commission_rate)
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_payment_for_order<'e>(
    executor: impl PgExecutor<'e>,
    order_id: Uuid,
) -> Result<Option<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(executor)
        .await
}

pub async fn apply_refund(
    tx: &mut SqlxTransaction<'_, Postgres>,
    payment_id: Uuid,
    refund_id: &str,
    refund_amount: &BigDecimal,
    refund_status: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE payments
        SET refund_id = $1, refund_amount = $2, refund_status = $3, refunded_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(refund_id)
    .bind(refund_amount)
    .bind(refund_status)
    .bind(payment_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// --- Commission Queries ---

pub async fn insert_commission_record(
    tx: &mut SqlxTransaction<'_, Postgres>,
    record: &CommissionRecord,
) -> Result<CommissionRecord> {
    sqlx::query_as::<_, CommissionRecord>(
        r#"
        INSERT INTO commission_records (
            id, referring_vendor_id, order_id, selected_vendor_id,
            amount, rate, commission_amount, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(record.id)
    .bind(record.referring_vendor_id)
    .bind(record.order_id)
    .bind(record.selected_vendor_id)
    .bind(&record.amount)
    .bind(record.rate)
    .bind(&record.commission_amount)
    .bind(record.created_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn list_commission_records(pool: &PgPool, vendor_id: Uuid) -> Result<Vec<CommissionRecord>> {
    sqlx::query_as::<_, CommissionRecord>(
        "SELECT * FROM commission_records WHERE referring_vendor_id = $1 ORDER BY created_at DESC",
    )
    .bind(vendor_id)
    .fetch_all(pool)
    .await
}

// --- Rider / Delivery Queries ---

pub async fn insert_rider(pool: &PgPool, rider: &Rider) -> Result<Rider> {
    sqlx::query_as::<_, Rider>(
        r#"
        INSERT INTO riders (
            id, name, status, current_lat, current_lng,
            completed_deliveries, location_updated_at, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(rider.id)
    .bind(&rider.name)
    .bind(rider.status)
    .bind(rider.current_lat)
    .bind(rider.current_lng)
    .bind(rider.completed_deliveries)
    .bind(rider.location_updated_at)
    .bind(rider.created_at)
    .fetch_one(pool)
    .await
}

pub async fn get_rider<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Rider>> {
    sqlx::query_as::<_, Rider>("SELECT * FROM riders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Available riders, row-locked so concurrent assignments cannot grab the
/// same rider. SKIP LOCKED lets a parallel assignment take the next one.
pub async fn list_available_riders_for_update(
    tx: &mut SqlxTransaction<'_, Postgres>,
) -> Result<Vec<Rider>> {
    sqlx::query_as::<_, Rider>(
        "SELECT * FROM riders WHERE status = 'available' FOR UPDATE SKIP LOCKED",
    )
    .fetch_all(&mut **tx)
    .await
}

pub async fn set_rider_status<'e>(
    executor: impl PgExecutor<'e>,
    rider_id: Uuid,
    status: RiderStatus,
) -> Result<()> {
    sqlx::query("UPDATE riders SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(rider_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn update_rider_location(
    pool: &PgPool,
    rider_id: Uuid,
    lat: f64,
    lng: f64,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE riders SET current_lat = $1, current_lng = $2, location_updated_at = NOW() WHERE id = $3",
    )
    .bind(lat)
    .bind(lng)
    .bind(rider_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn increment_completed_deliveries(
    tx: &mut SqlxTransaction<'_, Postgres>,
    rider_id: Uuid,
) -> Result<()> {
    sqlx::query("UPDATE riders SET completed_deliveries = completed_deliveries + 1 WHERE id = $1")
        .bind(rider_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

pub async fn insert_delivery(
    tx: &mut SqlxTransaction<'_, Postgres>,
    delivery: &Delivery,
) -> Result<Delivery> {
    sqlx::query_as::<_, Delivery>(
        r#"
        INSERT INTO deliveries (
            id, order_id, rider_id, status, pickup_lat, pickup_lng, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(delivery.id)
    .bind(delivery.order_id)
    .bind(delivery.rider_id)
    .bind(delivery.status)
    .bind(delivery.pickup_lat)
    .bind(delivery.pickup_lng)
    .bind(delivery.created_at)
    .bind(delivery.updated_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_delivery<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Delivery>> {
    sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_delivery_for_update(
    tx: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Delivery>> {
    sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn get_delivery_for_order<'e>(
    executor: impl PgExecutor<'e>,
    order_id: Uuid,
) -> Result<Option<Delivery>> {
    sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(executor)
        .await
}

pub async fn set_delivery_status(
    tx: &mut SqlxTransaction<'_, Postgres>,
    delivery_id: Uuid,
    status: DeliveryStatus,
) -> Result<()> {
    sqlx::query("UPDATE deliveries SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(delivery_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

pub async fn insert_delivery_event(
    tx: &mut SqlxTransaction<'_, Postgres>,
    event: &DeliveryEvent,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO delivery_events (id, delivery_id, from_status, to_status, note, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(event.id)
    .bind(event.delivery_id)
    .bind(event.from_status)
    .bind(event.to_status)
    .bind(&event.note)
    .bind(event.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn list_delivery_events(pool: &PgPool, delivery_id: Uuid) -> Result<Vec<DeliveryEvent>> {
    sqlx::query_as::<_, DeliveryEvent>(
        "SELECT * FROM delivery_events WHERE delivery_id = $1 ORDER BY created_at ASC",
    )
    .bind(delivery_id)
    .fetch_all(pool)
    .await
}

pub async fn get_pincode<'e>(
    executor: impl PgExecutor<'e>,
    pincode: &str,
) -> Result<Option<Pincode>> {
    sqlx::query_as::<_, Pincode>("SELECT * FROM pincodes WHERE pincode = $1")
        .bind(pincode)
        .fetch_optional(executor)
        .await
}

// --- Notification Outbox Queries ---

pub async fn enqueue_notification<'e>(
    executor: impl PgExecutor<'e>,
    notification: &Notification,
) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (
            id, recipient, recipient_type, event_type, subject, body,
            status, attempts, next_attempt_at, sent_at, metadata, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(notification.id)
    .bind(&notification.recipient)
    .bind(notification.recipient_type)
    .bind(&notification.event_type)
    .bind(&notification.subject)
    .bind(&notification.body)
    .bind(notification.status)
    .bind(notification.attempts)
    .bind(notification.next_attempt_at)
    .bind(notification.sent_at)
    .bind(&notification.metadata)
    .bind(notification.created_at)
    .fetch_one(executor)
    .await
}

pub async fn get_notification(pool: &PgPool, id: Uuid) -> Result<Option<Notification>> {
    sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Pending notifications due for delivery. SKIP LOCKED ensures parallel
/// dispatcher workers never double-send a row.
pub async fn due_notifications(
    tx: &mut SqlxTransaction<'_, Postgres>,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Notification>> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE status = 'pending' AND next_attempt_at <= $1
        ORDER BY next_attempt_at ASC
        LIMIT $2
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await
}

pub async fn mark_notification_sent(
    tx: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<()> {
    sqlx::query(
        "UPDATE notifications SET status = $1, sent_at = NOW(), attempts = attempts + 1 WHERE id = $2",
    )
    .bind(NotificationStatus::Sent)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn mark_notification_retry(
    tx: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    next_attempt_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE notifications SET attempts = attempts + 1, next_attempt_at = $1 WHERE id = $2",
    )
    .bind(next_attempt_at)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn mark_notification_failed(
    tx: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<()> {
    sqlx::query("UPDATE notifications SET status = $1, attempts = attempts + 1 WHERE id = $2")
        .bind(NotificationStatus::Failed)
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}
