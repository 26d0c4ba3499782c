pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod processor;
pub mod services;
pub mod validation;

use axum::{
    Router,
    routing::{get, post},
};

use crate::services::{
    CommissionRates, CommissionService, DeliveryService, OutboxService, PaymentService,
    QuoteService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub rates: CommissionRates,
    pub quotes: QuoteService,
    pub payments: PaymentService,
    pub commission: CommissionService,
    pub delivery: DeliveryService,
    pub outbox: OutboxService,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/orders", post(handlers::orders::create_order).get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/:id/quotes",
            post(handlers::quotes::submit_quote).get(handlers::quotes::list_quotes),
        )
        .route(
            "/orders/:id/quotes/:vendor_id/select",
            post(handlers::quotes::select_quote),
        )
        .route(
            "/orders/:id/payments",
            post(handlers::payments::create_payment_order),
        )
        .route(
            "/orders/:id/payments/verify",
            post(handlers::payments::verify_payment),
        )
        .route("/orders/:id/refunds", post(handlers::payments::process_refund))
        .route(
            "/orders/:id/delivery",
            post(handlers::deliveries::assign_rider),
        )
        .route(
            "/orders/:id/distance-category",
            get(handlers::deliveries::order_distance_category),
        )
        .route(
            "/deliveries/:id",
            get(handlers::deliveries::get_delivery),
        )
        .route(
            "/deliveries/:id/status",
            post(handlers::deliveries::update_delivery_status),
        )
        .route("/riders", post(handlers::deliveries::register_rider))
        .route(
            "/riders/:id/status",
            post(handlers::deliveries::set_rider_status),
        )
        .route(
            "/riders/:id/location",
            post(handlers::deliveries::update_rider_location),
        )
        .route("/vendors", post(handlers::vendors::register_vendor))
        .route("/vendors/:id", get(handlers::vendors::get_vendor))
        .route(
            "/vendors/:id/commission-discount",
            get(handlers::vendors::get_commission_discount),
        )
        .route(
            "/vendors/:id/commissions",
            get(handlers::vendors::list_commission_history),
        )
        .route(
            "/notifications/:id",
            get(handlers::notifications::get_notification),
        )
        .route(
            "/notifications/:id/resend",
            post(handlers::notifications::resend_notification),
        )
        .with_state(state)
}
