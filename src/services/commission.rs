use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

use crate::db::models::CommissionRecord;
use crate::db::queries;
use crate::error::AppError;

/// Two-tier commission schedule. The shape is intentionally fixed: one
/// standard rate and one discounted rate earned through referred cross-leads.
#[derive(Debug, Clone, Copy)]
pub struct CommissionRates {
    pub standard: i32,
    pub discounted: i32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommissionDiscount {
    pub has_discount: bool,
    pub rate: i32,
}

pub fn commission_amount(amount: &BigDecimal, rate: i32) -> BigDecimal {
    amount * BigDecimal::from(rate) / BigDecimal::from(100)
}

#[derive(Clone)]
pub struct CommissionService {
    pool: PgPool,
    rates: CommissionRates,
}

impl CommissionService {
    pub fn new(pool: PgPool, rates: CommissionRates) -> Self {
        Self { pool, rates }
    }

    /// A vendor earns one discounted commission per cross-lead they referred.
    /// Credits are the referred count minus the discounts already consumed.
    pub async fn check_vendor_commission_discount(
        &self,
        vendor_id: Uuid,
    ) -> Result<CommissionDiscount, AppError> {
        let vendor = queries::get_vendor(&self.pool, vendor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vendor {} not found", vendor_id)))?;
        let referred = queries::count_cross_leads_referred(&self.pool, vendor_id).await?;

        Ok(discount_from_counts(
            referred,
            vendor.discounted_commissions_used,
            self.rates,
        ))
    }

    pub async fn list_commission_history(
        &self,
        vendor_id: Uuid,
    ) -> Result<Vec<CommissionRecord>, AppError> {
        queries::list_commission_records(&self.pool, vendor_id)
            .await
            .map_err(AppError::from)
    }
}

pub(crate) fn discount_from_counts(
    referred: i64,
    discounts_used: i32,
    rates: CommissionRates,
) -> CommissionDiscount {
    let has_discount = referred - i64::from(discounts_used) > 0;
    CommissionDiscount {
        has_discount,
        rate: if has_discount {
            rates.discounted
        } else {
            rates.standard
        },
    }
}

/// Transaction-scoped discount check, used by the payment settlement saga so
/// the read and the credit consumption commit together.
pub(crate) async fn discount_in_tx(
    tx: &mut SqlxTransaction<'_, Postgres>,
    vendor_id: Uuid,
    rates: CommissionRates,
) -> Result<CommissionDiscount, AppError> {
    let vendor = queries::get_vendor(&mut **tx, vendor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vendor {} not found", vendor_id)))?;
    let referred = queries::count_cross_leads_referred(&mut **tx, vendor_id).await?;

    Ok(discount_from_counts(
        referred,
        vendor.discounted_commissions_used,
        rates,
    ))
}

/// Records a cross-lead referral commission for the referring vendor.
/// Self-referrals never earn commission; returns whether a record was
/// appended.
pub(crate) async fn process_cross_lead_commission(
    tx: &mut SqlxTransaction<'_, Postgres>,
    referring_vendor_id: Uuid,
    selected_vendor_id: Uuid,
    amount: &BigDecimal,
    rate: i32,
    order_id: Uuid,
) -> Result<bool, AppError> {
    if referring_vendor_id == selected_vendor_id {
        tracing::info!(
            "Skipping self-referral commission for vendor {} on order {}",
            referring_vendor_id,
            order_id
        );
        return Ok(false);
    }

    let record = CommissionRecord {
        id: Uuid::new_v4(),
        referring_vendor_id,
        order_id,
        selected_vendor_id,
        amount: amount.clone(),
        rate,
        commission_amount: commission_amount(amount, rate),
        created_at: Utc::now(),
    };
    queries::insert_commission_record(tx, &record).await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const RATES: CommissionRates = CommissionRates {
        standard: 20,
        discounted: 5,
    };

    #[test]
    fn discount_iff_unused_credits_remain() {
        // has_discount == (referred - used) > 0, exhaustively around the edge
        for referred in 0..4i64 {
            for used in 0..4i32 {
                let discount = discount_from_counts(referred, used, RATES);
                assert_eq!(discount.has_discount, referred - i64::from(used) > 0);
            }
        }
    }

    #[test]
    fn discounted_rate_applies_only_with_credit() {
        assert_eq!(discount_from_counts(2, 1, RATES).rate, 5);
        assert_eq!(discount_from_counts(1, 1, RATES).rate, 20);
        assert_eq!(discount_from_counts(0, 0, RATES).rate, 20);
    }

    #[test]
    fn commission_amount_is_percentage_of_amount() {
        let amount = BigDecimal::from(10000);
        assert_eq!(commission_amount(&amount, 20), BigDecimal::from(2000));
        assert_eq!(commission_amount(&amount, 5), BigDecimal::from(500));
    }

    #[test]
    fn commission_amount_keeps_decimal_precision() {
        let amount = BigDecimal::from_str("4500.50").unwrap();
        let expected = BigDecimal::from_str("900.10").unwrap();
        assert_eq!(commission_amount(&amount, 20), expected);
    }
}
