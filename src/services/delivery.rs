use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{
    Delivery, DeliveryEvent, DeliveryStatus, Notification, OrderStatus, OrderType, RecipientType,
    Rider, RiderStatus,
};
use crate::db::queries;
use crate::error::AppError;
use crate::validation;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Display-only classification of a delivery's geographic span. Not priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceCategory {
    Intracity,
    NearbyCity,
    Intercity,
    LongDistance,
}

pub fn categorize_distance(km: f64) -> DistanceCategory {
    if km <= 25.0 {
        DistanceCategory::Intracity
    } else if km <= 100.0 {
        DistanceCategory::NearbyCity
    } else if km <= 500.0 {
        DistanceCategory::Intercity
    } else {
        DistanceCategory::LongDistance
    }
}

#[derive(Clone)]
pub struct DeliveryService {
    pool: PgPool,
}

impl DeliveryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Binds the nearest available rider to a parcel order. The pickup
    /// location comes from explicit coordinates or the pickup pincode.
    pub async fn assign_rider(
        &self,
        order_id: Uuid,
        pickup: Option<(f64, f64)>,
    ) -> Result<Delivery, AppError> {
        let order = queries::get_order(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        if order.order_type != OrderType::Parcel {
            return Err(AppError::Validation(format!(
                "Order {} is not a parcel order",
                order_id
            )));
        }
        if queries::get_delivery_for_order(&self.pool, order_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Order {} already has a rider assigned",
                order_id
            )));
        }

        let (pickup_lat, pickup_lng) = match pickup {
            Some((lat, lng)) => {
                validation::validate_latitude(lat)?;
                validation::validate_longitude(lng)?;
                (lat, lng)
            }
            None => {
                let pin = queries::get_pincode(&self.pool, &order.pickup_pincode)
                    .await?
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "pickup location cannot be resolved from pincode {}",
                            order.pickup_pincode
                        ))
                    })?;
                (pin.lat, pin.lng)
            }
        };

        let mut tx = self.pool.begin().await?;

        let riders = queries::list_available_riders_for_update(&mut tx).await?;
        let rider = nearest_rider(&riders, pickup_lat, pickup_lng).ok_or_else(|| {
            AppError::NotFound("no available rider for this pickup".to_string())
        })?;

        queries::set_rider_status(&mut *tx, rider.id, RiderStatus::Busy).await?;
        let delivery = Delivery::new(order_id, rider.id, pickup_lat, pickup_lng);
        let saved = queries::insert_delivery(&mut tx, &delivery).await?;
        queries::insert_delivery_event(
            &mut tx,
            &DeliveryEvent {
                id: Uuid::new_v4(),
                delivery_id: saved.id,
                from_status: None,
                to_status: DeliveryStatus::Accepted,
                note: None,
                created_at: Utc::now(),
            },
        )
        .await?;

        let note = Notification::new(
            order.user_email.clone(),
            RecipientType::Customer,
            "rider_assigned",
            format!("A rider was assigned to order {}", order_id),
            format!("{} is picking up your parcel", rider.name),
            json!({ "order_id": order_id, "rider_id": rider.id }),
        );
        queries::enqueue_notification(&mut *tx, &note).await?;

        tx.commit().await?;

        tracing::info!("Assigned rider {} to order {}", rider.id, order_id);

        Ok(saved)
    }

    /// Advances the delivery state machine. Only the legal successor states
    /// of the current status are accepted.
    pub async fn update_delivery_status(
        &self,
        delivery_id: Uuid,
        target: DeliveryStatus,
        note: Option<String>,
    ) -> Result<Delivery, AppError> {
        if let Some(note) = &note {
            validation::validate_max_len("note", note, validation::NOTE_MAX_LEN)?;
        }

        let mut tx = self.pool.begin().await?;

        let delivery = queries::get_delivery_for_update(&mut tx, delivery_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Delivery {} not found", delivery_id)))?;

        if !delivery.status.can_transition_to(target) {
            return Err(AppError::InvalidTransition {
                from: delivery.status.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }

        queries::set_delivery_status(&mut tx, delivery_id, target).await?;
        queries::insert_delivery_event(
            &mut tx,
            &DeliveryEvent {
                id: Uuid::new_v4(),
                delivery_id,
                from_status: Some(delivery.status),
                to_status: target,
                note: note.clone(),
                created_at: Utc::now(),
            },
        )
        .await?;

        match target {
            DeliveryStatus::Delivered => {
                queries::update_order_status(&mut *tx, delivery.order_id, OrderStatus::Delivered)
                    .await?;
                queries::set_rider_status(&mut *tx, delivery.rider_id, RiderStatus::Available)
                    .await?;
                queries::increment_completed_deliveries(&mut tx, delivery.rider_id).await?;
            }
            DeliveryStatus::FailedDelivery => {
                queries::update_order_status(
                    &mut *tx,
                    delivery.order_id,
                    OrderStatus::FailedDelivery,
                )
                .await?;
            }
            DeliveryStatus::Returned => {
                queries::set_rider_status(&mut *tx, delivery.rider_id, RiderStatus::Available)
                    .await?;
            }
            _ => {}
        }

        let order = queries::get_order(&mut *tx, delivery.order_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Order {} not found", delivery.order_id))
            })?;
        let notification = Notification::new(
            order.user_email.clone(),
            RecipientType::Customer,
            "delivery_status_changed",
            format!("Delivery update for order {}", delivery.order_id),
            match &note {
                Some(n) => format!("Your delivery is now {} ({})", target.as_str(), n),
                None => format!("Your delivery is now {}", target.as_str()),
            },
            json!({
                "order_id": delivery.order_id,
                "from": delivery.status.as_str(),
                "to": target.as_str(),
            }),
        );
        queries::enqueue_notification(&mut *tx, &notification).await?;

        tx.commit().await?;

        tracing::info!(
            "Delivery {} moved {} -> {}",
            delivery_id,
            delivery.status.as_str(),
            target.as_str()
        );

        queries::get_delivery(&self.pool, delivery_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Delivery {} not found", delivery_id)))
    }

    /// Best-effort, at-least-once location ping from the rider's device.
    pub async fn update_rider_location(
        &self,
        rider_id: Uuid,
        lat: f64,
        lng: f64,
    ) -> Result<(), AppError> {
        validation::validate_latitude(lat)?;
        validation::validate_longitude(lng)?;

        let updated = queries::update_rider_location(&self.pool, rider_id, lat, lng).await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("Rider {} not found", rider_id)));
        }

        Ok(())
    }

    /// Classifies the order's span from its pincode centroids, for display.
    pub async fn distance_category(
        &self,
        pickup_pincode: &str,
        destination_pincode: &str,
    ) -> Result<Option<DistanceCategory>, AppError> {
        let pickup = queries::get_pincode(&self.pool, pickup_pincode).await?;
        let destination = queries::get_pincode(&self.pool, destination_pincode).await?;

        Ok(match (pickup, destination) {
            (Some(a), Some(b)) => {
                let km = haversine_km(a.lat, a.lng, b.lat, b.lng);
                Some(categorize_distance(km))
            }
            _ => None,
        })
    }
}

fn nearest_rider(riders: &[Rider], lat: f64, lng: f64) -> Option<&Rider> {
    riders.iter().min_by(|a, b| {
        let da = rider_distance(a, lat, lng);
        let db = rider_distance(b, lat, lng);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    })
}

// Riders without a known location sort last.
fn rider_distance(rider: &Rider, lat: f64, lng: f64) -> f64 {
    match (rider.current_lat, rider.current_lng) {
        (Some(rlat), Some(rlng)) => haversine_km(rlat, rlng, lat, lng),
        _ => f64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rider_at(lat: f64, lng: f64) -> Rider {
        Rider {
            id: Uuid::new_v4(),
            name: "test rider".to_string(),
            status: RiderStatus::Available,
            current_lat: Some(lat),
            current_lng: Some(lng),
            completed_deliveries: 0,
            location_updated_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_km(12.97, 77.59, 12.97, 77.59) < 1e-9);
    }

    #[test]
    fn haversine_known_distance() {
        // Bangalore to Chennai is roughly 290 km
        let km = haversine_km(12.9716, 77.5946, 13.0827, 80.2707);
        assert!((km - 290.0).abs() < 15.0, "got {}", km);
    }

    #[test]
    fn categorizes_distance_bands() {
        assert_eq!(categorize_distance(5.0), DistanceCategory::Intracity);
        assert_eq!(categorize_distance(25.0), DistanceCategory::Intracity);
        assert_eq!(categorize_distance(60.0), DistanceCategory::NearbyCity);
        assert_eq!(categorize_distance(300.0), DistanceCategory::Intercity);
        assert_eq!(categorize_distance(800.0), DistanceCategory::LongDistance);
    }

    #[test]
    fn picks_nearest_rider() {
        let near = rider_at(12.98, 77.60);
        let far = rider_at(13.50, 78.20);
        let riders = vec![far.clone(), near.clone()];

        let picked = nearest_rider(&riders, 12.97, 77.59).expect("a rider");
        assert_eq!(picked.id, near.id);
    }

    #[test]
    fn riders_without_location_sort_last() {
        let mut unknown = rider_at(0.0, 0.0);
        unknown.current_lat = None;
        unknown.current_lng = None;
        let located = rider_at(13.50, 78.20);
        let riders = vec![unknown.clone(), located.clone()];

        let picked = nearest_rider(&riders, 12.97, 77.59).expect("a rider");
        assert_eq!(picked.id, located.id);
    }

    #[test]
    fn no_riders_means_none() {
        assert!(nearest_rider(&[], 12.97, 77.59).is_none());
    }
}
