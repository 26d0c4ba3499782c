use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{
    CrossLeadStatus, Notification, Order, OrderStatus, Payment, RecipientType,
};
use crate::db::queries;
use crate::error::AppError;
use crate::processor::{self, ProcessorClient};
use crate::services::commission::{self, CommissionRates};
use crate::validation;

/// Converts a currency amount to minor units (amount * 100), rounding half
/// up. The rounding policy must match the processor's exactly or settlement
/// reconciliation drifts by one unit.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, AppError> {
    let half = BigDecimal::from(1) / BigDecimal::from(2);
    let scaled = amount * BigDecimal::from(100) + half;

    scaled.with_scale(0).to_i64().ok_or_else(|| {
        AppError::Validation("amount out of range for minor-unit conversion".to_string())
    })
}

/// What the front-end needs to complete the charge against the processor.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOrder {
    pub processor_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub remote_order_id: String,
    pub remote_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResult {
    pub refund_id: String,
    pub refund_amount: BigDecimal,
    pub refund_status: String,
    pub order_status: OrderStatus,
}

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    processor: ProcessorClient,
    rates: CommissionRates,
    currency: String,
    webhook_secret: String,
}

impl PaymentService {
    pub fn new(
        pool: PgPool,
        processor: ProcessorClient,
        rates: CommissionRates,
        currency: String,
        webhook_secret: String,
    ) -> Self {
        Self {
            pool,
            processor,
            rates,
            currency,
            webhook_secret,
        }
    }

    /// Creates a remote order at the processor for the selected vendor's
    /// quote. Never called twice for a paid order; that is a conflict.
    pub async fn create_payment_order(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
        user_email: &str,
    ) -> Result<PaymentOrder, AppError> {
        let order = queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        if order.user_email != user_email {
            return Err(AppError::Authorization(format!(
                "Order {} does not belong to this user",
                order_id
            )));
        }
        if order.status == OrderStatus::Paid {
            return Err(AppError::Conflict(format!(
                "Order {} is already paid",
                order_id
            )));
        }

        let quote = queries::get_quote(&self.pool, order_id, vendor_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Vendor {} has no quote on order {}",
                    vendor_id, order_id
                ))
            })?;
        validation::validate_positive_amount(&quote.amount)?;

        let amount_minor = to_minor_units(&quote.amount)?;
        let remote = self
            .processor
            .create_order(
                amount_minor,
                &self.currency,
                &order_id.to_string(),
                json!({ "order_id": order_id, "vendor_id": vendor_id }),
            )
            .await
            .map_err(|e| AppError::PaymentGateway(e.to_string()))?;

        tracing::info!(
            "Created processor order {} for order {} ({} minor units)",
            remote.id,
            order_id,
            remote.amount
        );

        Ok(PaymentOrder {
            processor_order_id: remote.id,
            amount: remote.amount,
            currency: remote.currency,
            key_id: self.processor.key_id().to_string(),
        })
    }

    /// Verifies the processor's signed confirmation and, when it checks out,
    /// commits the paid state.
    pub async fn verify_payment(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> Result<Order, AppError> {
        if !processor::verify_payment_signature(
            &confirmation.remote_order_id,
            &confirmation.remote_payment_id,
            &confirmation.signature,
            &self.webhook_secret,
        ) {
            return Err(AppError::Signature(format!(
                "payment signature does not match for order {}",
                order_id
            )));
        }

        self.process_payment(order_id, vendor_id, confirmation).await
    }

    /// Commits the paid state in a single database transaction: order status,
    /// payment record, discount credit consumption, cross-lead commission and
    /// the notification fan-out all land together or not at all.
    pub async fn process_payment(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = queries::get_order_for_update(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
        if order.status == OrderStatus::Paid {
            return Err(AppError::Conflict(format!(
                "Order {} is already paid",
                order_id
            )));
        }

        let vendor = queries::get_vendor(&mut *tx, vendor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vendor {} not found", vendor_id)))?;
        let quote = queries::get_quote(&mut *tx, order_id, vendor_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Vendor {} has no quote on order {}",
                    vendor_id, order_id
                ))
            })?;

        let discount = commission::discount_in_tx(&mut tx, vendor_id, self.rates).await?;
        if discount.has_discount {
            queries::consume_discount_credit(&mut tx, vendor_id).await?;
        }

        let payment = Payment::new(
            order_id,
            confirmation.remote_order_id,
            confirmation.remote_payment_id,
            confirmation.signature,
            quote.amount.clone(),
            self.currency.clone(),
            discount.has_discount,
            discount.rate,
        );
        queries::insert_payment(&mut tx, &payment).await?;
        queries::set_selected_vendor(&mut *tx, order_id, vendor_id, OrderStatus::Paid).await?;

        // Notify the winner, then every other vendor serving the pickup area,
        // tagged with whether and what they quoted.
        let quotes = queries::list_quotes(&mut *tx, order_id).await?;
        let winner_note = Notification::new(
            vendor.email.clone(),
            RecipientType::Vendor,
            "quote_won",
            format!("You won order {}", order_id),
            format!(
                "Your quote of {} was selected and paid for order {}",
                quote.amount, order_id
            ),
            json!({ "order_id": order_id, "amount": quote.amount.to_string() }),
        );
        queries::enqueue_notification(&mut *tx, &winner_note).await?;

        // Losers are every vendor serving the pickup area plus anyone who
        // quoted from outside it; a bidding vendor must hear the outcome.
        let mut invited = queries::list_vendors_serving(&mut *tx, &order.pickup_pincode).await?;
        for quoted in &quotes {
            if invited.iter().all(|v| v.id != quoted.vendor_id) {
                if let Some(vendor) = queries::get_vendor(&mut *tx, quoted.vendor_id).await? {
                    invited.push(vendor);
                }
            }
        }
        for other in invited.iter().filter(|v| v.id != vendor_id) {
            let their_quote = quotes.iter().find(|q| q.vendor_id == other.id);
            let note = Notification::new(
                other.email.clone(),
                RecipientType::Vendor,
                "order_closed",
                format!("Order {} has been awarded", order_id),
                match their_quote {
                    Some(q) => format!(
                        "Order {} was awarded to another vendor; your quote was {}",
                        order_id, q.amount
                    ),
                    None => format!(
                        "Order {} was awarded to another vendor; you did not quote",
                        order_id
                    ),
                },
                json!({
                    "order_id": order_id,
                    "quoted": their_quote.is_some(),
                    "quote_amount": their_quote.map(|q| q.amount.to_string()),
                }),
            );
            queries::enqueue_notification(&mut *tx, &note).await?;
        }

        let customer_note = Notification::new(
            order.user_email.clone(),
            RecipientType::Customer,
            "payment_confirmed",
            format!("Payment received for order {}", order_id),
            format!("We received your payment of {}", quote.amount),
            json!({ "order_id": order_id, "amount": quote.amount.to_string() }),
        );
        queries::enqueue_notification(&mut *tx, &customer_note).await?;

        if order.is_cross_lead {
            if let Some(referring_vendor_id) = order.referring_vendor_id {
                let recorded = commission::process_cross_lead_commission(
                    &mut tx,
                    referring_vendor_id,
                    vendor_id,
                    &quote.amount,
                    discount.rate,
                    order_id,
                )
                .await?;
                queries::set_cross_lead_status(&mut tx, order_id, CrossLeadStatus::Converted)
                    .await?;
                if recorded {
                    tracing::info!(
                        "Recorded cross-lead commission for vendor {} on order {}",
                        referring_vendor_id,
                        order_id
                    );
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Order {} marked paid (vendor {}, rate {}%, discount applied: {})",
            order_id,
            vendor_id,
            discount.rate,
            discount.has_discount
        );

        let updated = queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(updated)
    }

    /// Refunds a payment through the processor. A full refund flips the order
    /// to refunded; partial refunds leave the order status untouched.
    pub async fn process_refund(
        &self,
        order_id: Uuid,
        processor_payment_id: &str,
        amount: Option<BigDecimal>,
        reason: &str,
    ) -> Result<RefundResult, AppError> {
        queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
        let payment = queries::get_payment_for_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} has no payment", order_id)))?;

        if payment.processor_payment_id != processor_payment_id {
            return Err(AppError::Validation(format!(
                "payment id does not match the recorded payment for order {}",
                order_id
            )));
        }

        let refund_amount = amount.unwrap_or_else(|| payment.amount.clone());
        validation::validate_positive_amount(&refund_amount)?;
        if refund_amount > payment.amount {
            return Err(AppError::Validation(
                "refund amount exceeds the original paid amount".to_string(),
            ));
        }
        if payment.refund_id.is_some() {
            return Err(AppError::Conflict(format!(
                "Payment for order {} is already refunded",
                order_id
            )));
        }

        let remote = self
            .processor
            .refund(
                processor_payment_id,
                Some(to_minor_units(&refund_amount)?),
                json!({ "order_id": order_id, "reason": reason }),
            )
            .await
            .map_err(|e| AppError::PaymentGateway(e.to_string()))?;

        let full_refund = refund_amount == payment.amount;

        let mut tx = self.pool.begin().await?;
        queries::apply_refund(&mut tx, payment.id, &remote.id, &refund_amount, &remote.status)
            .await?;
        let order_status = if full_refund {
            queries::update_order_status(&mut *tx, order_id, OrderStatus::Refunded).await?;
            OrderStatus::Refunded
        } else {
            OrderStatus::Paid
        };

        let order = queries::get_order(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
        let note = Notification::new(
            order.user_email.clone(),
            RecipientType::Customer,
            "refund_processed",
            format!("Refund issued for order {}", order_id),
            format!("A refund of {} has been issued ({})", refund_amount, reason),
            json!({
                "order_id": order_id,
                "refund_id": remote.id,
                "amount": refund_amount.to_string(),
            }),
        );
        queries::enqueue_notification(&mut *tx, &note).await?;
        tx.commit().await?;

        tracing::info!(
            "Refunded {} for order {} (full: {})",
            refund_amount,
            order_id,
            full_refund
        );

        Ok(RefundResult {
            refund_id: remote.id,
            refund_amount,
            refund_status: remote.status,
            order_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn whole_amounts_convert_exactly() {
        assert_eq!(to_minor_units(&dec("4500")).unwrap(), 450000);
        assert_eq!(to_minor_units(&dec("5000")).unwrap(), 500000);
        assert_eq!(to_minor_units(&dec("1")).unwrap(), 100);
    }

    #[test]
    fn fractional_amounts_round_half_up() {
        assert_eq!(to_minor_units(&dec("4500.50")).unwrap(), 450050);
        assert_eq!(to_minor_units(&dec("4500.004")).unwrap(), 450000);
        assert_eq!(to_minor_units(&dec("4500.005")).unwrap(), 450001);
        assert_eq!(to_minor_units(&dec("4500.006")).unwrap(), 450001);
        assert_eq!(to_minor_units(&dec("0.01")).unwrap(), 1);
        assert_eq!(to_minor_units(&dec("0.005")).unwrap(), 1);
    }

    #[test]
    fn sub_minor_dust_truncates_below_half() {
        assert_eq!(to_minor_units(&dec("0.004")).unwrap(), 0);
        assert_eq!(to_minor_units(&dec("0.0049")).unwrap(), 0);
    }
}
