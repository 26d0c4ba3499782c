use movebid_core::db::models::DeliveryStatus;
use movebid_core::services::delivery::{categorize_distance, haversine_km, DistanceCategory};

#[test]
fn test_happy_path_reaches_delivered() {
    let path = [
        DeliveryStatus::Accepted,
        DeliveryStatus::PickedUp,
        DeliveryStatus::InTransit,
        DeliveryStatus::OutForDelivery,
        DeliveryStatus::Delivered,
    ];

    for pair in path.windows(2) {
        assert!(
            pair[0].can_transition_to(pair[1]),
            "{:?} -> {:?} should be allowed",
            pair[0],
            pair[1]
        );
    }
    assert!(DeliveryStatus::Delivered.is_terminal());
}

#[test]
fn test_failed_delivery_can_be_reattempted_or_returned() {
    assert!(DeliveryStatus::OutForDelivery.can_transition_to(DeliveryStatus::FailedDelivery));
    assert!(DeliveryStatus::FailedDelivery.can_transition_to(DeliveryStatus::ReattemptDelivery));
    assert!(DeliveryStatus::FailedDelivery.can_transition_to(DeliveryStatus::Returned));
    assert!(DeliveryStatus::ReattemptDelivery.can_transition_to(DeliveryStatus::OutForDelivery));
    assert!(DeliveryStatus::Returned.is_terminal());
}

#[test]
fn test_no_shortcuts_or_backward_moves() {
    assert!(!DeliveryStatus::Accepted.can_transition_to(DeliveryStatus::Delivered));
    assert!(!DeliveryStatus::InTransit.can_transition_to(DeliveryStatus::PickedUp));
    assert!(!DeliveryStatus::Delivered.can_transition_to(DeliveryStatus::Accepted));
    assert!(!DeliveryStatus::Returned.can_transition_to(DeliveryStatus::ReattemptDelivery));
}

#[test]
fn test_distance_categories_by_known_city_pairs() {
    // Within Mumbai: Bandra to Colaba is well under 25 km.
    let intracity = haversine_km(19.0596, 72.8295, 18.9067, 72.8147);
    assert_eq!(categorize_distance(intracity), DistanceCategory::Intracity);

    // Mumbai to Pune is roughly 120 km.
    let intercity = haversine_km(19.0760, 72.8777, 18.5204, 73.8567);
    assert_eq!(categorize_distance(intercity), DistanceCategory::Intercity);

    // Mumbai to Delhi is far beyond 500 km.
    let long = haversine_km(19.0760, 72.8777, 28.6139, 77.2090);
    assert_eq!(categorize_distance(long), DistanceCategory::LongDistance);
}
