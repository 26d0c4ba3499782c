use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Move,
    Parcel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Initiated,
    QuoteSelected,
    Paid,
    Delivered,
    FailedDelivery,
    Refunded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cross_lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CrossLeadStatus {
    Open,
    Converted,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rider_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    Available,
    Busy,
    Offline,
    Suspended,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Accepted,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    FailedDelivery,
    ReattemptDelivery,
    Returned,
}

impl DeliveryStatus {
    /// Legal successors for each delivery state. Transitions are driven by
    /// explicit rider/operator action; anything not listed here is rejected.
    pub fn successors(self) -> &'static [DeliveryStatus] {
        use DeliveryStatus::*;
        match self {
            Accepted => &[PickedUp],
            PickedUp => &[InTransit],
            InTransit => &[OutForDelivery],
            OutForDelivery => &[Delivered, FailedDelivery],
            FailedDelivery => &[ReattemptDelivery, Returned],
            ReattemptDelivery => &[OutForDelivery],
            Delivered | Returned => &[],
        }
    }

    pub fn can_transition_to(self, target: DeliveryStatus) -> bool {
        self.successors().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        use DeliveryStatus::*;
        match self {
            Accepted => "accepted",
            PickedUp => "picked_up",
            InTransit => "in_transit",
            OutForDelivery => "out_for_delivery",
            Delivered => "delivered",
            FailedDelivery => "failed_delivery",
            ReattemptDelivery => "reattempt_delivery",
            Returned => "returned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recipient_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Customer,
    Vendor,
    Rider,
    Admin,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_email: String,
    pub order_type: OrderType,
    pub pickup_pincode: String,
    pub destination_pincode: String,
    pub status: OrderStatus,
    pub selected_vendor_id: Option<Uuid>,
    pub is_cross_lead: bool,
    pub referring_vendor_id: Option<Uuid>,
    pub cross_lead_status: Option<CrossLeadStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        user_email: String,
        order_type: OrderType,
        pickup_pincode: String,
        destination_pincode: String,
        referring_vendor_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let is_cross_lead = referring_vendor_id.is_some();
        Self {
            id: Uuid::new_v4(),
            user_email,
            order_type,
            pickup_pincode,
            destination_pincode,
            status: OrderStatus::Initiated,
            selected_vendor_id: None,
            is_cross_lead,
            referring_vendor_id,
            cross_lead_status: is_cross_lead.then_some(CrossLeadStatus::Open),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub amount: BigDecimal,
    pub submitted_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(order_id: Uuid, vendor_id: Uuid, amount: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            vendor_id,
            amount,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub service_areas: Vec<String>,
    pub referral_code: String,
    pub commission_rate: i32,
    pub discounted_commissions_used: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub processor_order_id: String,
    pub processor_payment_id: String,
    pub signature: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
    pub applied_commission_discount: bool,
    pub commission_rate: i32,
    pub refund_id: Option<String>,
    pub refund_amount: Option<BigDecimal>,
    pub refund_status: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: Uuid,
        processor_order_id: String,
        processor_payment_id: String,
        signature: String,
        amount: BigDecimal,
        currency: String,
        applied_commission_discount: bool,
        commission_rate: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            processor_order_id,
            processor_payment_id,
            signature,
            amount,
            currency,
            paid_at: Utc::now(),
            applied_commission_discount,
            commission_rate,
            refund_id: None,
            refund_amount: None,
            refund_status: None,
            refunded_at: None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub id: Uuid,
    pub referring_vendor_id: Uuid,
    pub order_id: Uuid,
    pub selected_vendor_id: Uuid,
    pub amount: BigDecimal,
    pub rate: i32,
    pub commission_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub status: RiderStatus,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub completed_deliveries: i32,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub rider_id: Uuid,
    pub status: DeliveryStatus,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(order_id: Uuid, rider_id: Uuid, pickup_lat: f64, pickup_lng: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            rider_id,
            status: DeliveryStatus::Accepted,
            pickup_lat,
            pickup_lng,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub from_status: Option<DeliveryStatus>,
    pub to_status: DeliveryStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient: String,
    pub recipient_type: RecipientType,
    pub event_type: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient: String,
        recipient_type: RecipientType,
        event_type: &str,
        subject: String,
        body: String,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recipient,
            recipient_type,
            event_type: event_type.to_string(),
            subject,
            body,
            status: NotificationStatus::Pending,
            attempts: 0,
            next_attempt_at: now,
            sent_at: None,
            metadata,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Pincode {
    pub pincode: String,
    pub city: String,
    pub lat: f64,
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_starts_initiated() {
        let order = Order::new(
            "jane@example.com".to_string(),
            OrderType::Parcel,
            "560001".to_string(),
            "560038".to_string(),
            None,
        );

        assert_eq!(order.status, OrderStatus::Initiated);
        assert!(!order.is_cross_lead);
        assert!(order.cross_lead_status.is_none());
        assert!(order.selected_vendor_id.is_none());
    }

    #[test]
    fn referred_order_is_cross_lead() {
        let referrer = Uuid::new_v4();
        let order = Order::new(
            "jane@example.com".to_string(),
            OrderType::Move,
            "560001".to_string(),
            "110001".to_string(),
            Some(referrer),
        );

        assert!(order.is_cross_lead);
        assert_eq!(order.referring_vendor_id, Some(referrer));
        assert_eq!(order.cross_lead_status, Some(CrossLeadStatus::Open));
    }

    #[test]
    fn delivery_happy_path_is_legal() {
        use DeliveryStatus::*;
        assert!(Accepted.can_transition_to(PickedUp));
        assert!(PickedUp.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(OutForDelivery.can_transition_to(FailedDelivery));
    }

    #[test]
    fn delivery_skipping_states_is_illegal() {
        use DeliveryStatus::*;
        assert!(!Accepted.can_transition_to(InTransit));
        assert!(!Accepted.can_transition_to(Delivered));
        assert!(!PickedUp.can_transition_to(Delivered));
        assert!(!InTransit.can_transition_to(Delivered));
    }

    #[test]
    fn failed_delivery_can_reattempt_or_return() {
        use DeliveryStatus::*;
        assert!(FailedDelivery.can_transition_to(ReattemptDelivery));
        assert!(FailedDelivery.can_transition_to(Returned));
        assert!(ReattemptDelivery.can_transition_to(OutForDelivery));
        assert!(!FailedDelivery.can_transition_to(Delivered));
    }

    #[test]
    fn terminal_states_have_no_successors() {
        use DeliveryStatus::*;
        assert!(Delivered.is_terminal());
        assert!(Returned.is_terminal());
        assert!(!FailedDelivery.is_terminal());
        for target in [
            Accepted,
            PickedUp,
            InTransit,
            OutForDelivery,
            Delivered,
            FailedDelivery,
            ReattemptDelivery,
            Returned,
        ] {
            assert!(!Delivered.can_transition_to(target));
            assert!(!Returned.can_transition_to(target));
        }
    }

    #[test]
    fn new_notification_is_pending_and_due() {
        let n = Notification::new(
            "jane@example.com".to_string(),
            RecipientType::Customer,
            "payment_confirmed",
            "Payment received".to_string(),
            "Your payment was received".to_string(),
            serde_json::json!({}),
        );

        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.attempts, 0);
        assert!(n.next_attempt_at <= Utc::now());
        assert!(n.sent_at.is_none());
    }
}
