use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Order, OrderStatus, Quote};
use crate::db::queries;
use crate::error::AppError;
use crate::validation;

/// Vendor bidding against customer orders. Selection records the winner but
/// never marks the order paid; that commit belongs to payment settlement.
#[derive(Clone)]
pub struct QuoteService {
    pool: PgPool,
}

impl QuoteService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn submit_quote(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Quote, AppError> {
        validation::validate_positive_amount(&amount)?;

        let order = queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
        if order.status == OrderStatus::Paid {
            return Err(AppError::Conflict(format!(
                "Order {} is already paid; quoting is closed",
                order_id
            )));
        }

        queries::get_vendor(&self.pool, vendor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vendor {} not found", vendor_id)))?;

        let quote = Quote::new(order_id, vendor_id, amount);
        let saved = queries::upsert_quote(&self.pool, &quote).await?;

        tracing::info!(
            "Vendor {} quoted {} on order {}",
            vendor_id,
            saved.amount,
            order_id
        );

        Ok(saved)
    }

    pub async fn select_quote(&self, order_id: Uuid, vendor_id: Uuid) -> Result<Order, AppError> {
        let order = queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
        if order.status == OrderStatus::Paid {
            return Err(AppError::Conflict(format!(
                "Order {} is already paid",
                order_id
            )));
        }

        queries::get_quote(&self.pool, order_id, vendor_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Vendor {} has no quote on order {}",
                    vendor_id, order_id
                ))
            })?;

        queries::set_selected_vendor(&self.pool, order_id, vendor_id, OrderStatus::QuoteSelected)
            .await?;

        let updated = queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(updated)
    }

    pub async fn list_quotes(&self, order_id: Uuid) -> Result<Vec<Quote>, AppError> {
        queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        queries::list_quotes(&self.pool, order_id)
            .await
            .map_err(AppError::from)
    }
}
