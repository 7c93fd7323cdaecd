//! Fixtures shared by the service unit tests.

use chrono::{TimeZone, Utc};

use moowwee_core::{
    GeoPoint, MaterialRequest, Money, NewJob, PackingMaterial, PropertyType, RateConfiguration,
    ServicePackage, Stop, StopRole,
};
use moowwee_db::Database;

/// In-memory database with $125/h, $2/mile and a $3 small-box catalog entry.
pub async fn seeded_db() -> Database {
    let db = Database::in_memory().await.unwrap();

    db.rates()
        .save(&RateConfiguration {
            hourly_rate: Money::from_dollars(125),
            floor_fee: Money::zero(),
            per_mile_fee: Money::from_dollars(2),
            piano_fee: Money::zero(),
            gun_safe_fee: Money::zero(),
            packing_materials: Vec::new(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    db.rates()
        .upsert_material(&PackingMaterial {
            id: 0,
            name: "small_boxes".to_string(),
            display_name: "Small Boxes".to_string(),
            price: Money::from_dollars(3),
            description: None,
            is_active: true,
            is_full_service: false,
            sort_order: 1,
        })
        .await
        .unwrap();

    db
}

/// Three stops across Manhattan, crew of 3, ten small boxes.
pub fn new_job() -> NewJob {
    NewJob {
        property_type: PropertyType::Residential,
        square_feet: Some(900),
        floor_count: None,
        additional_objects: Default::default(),
        package: ServicePackage::Standard,
        crew_size: 3,
        departure_time: Utc.with_ymd_and_hms(2026, 11, 2, 9, 0, 0).unwrap(),
        estimated_duration_minutes: None,
        stops: vec![
            Stop {
                sequence: 0,
                role: StopRole::Loading,
                location: GeoPoint::new(40.7128, -74.0060),
                address: "1 Centre St, New York".to_string(),
                category: None,
            },
            Stop {
                sequence: 1,
                role: StopRole::Intermediate,
                location: GeoPoint::new(40.7527, -73.9772),
                address: "89 E 42nd St, New York".to_string(),
                category: None,
            },
            Stop {
                sequence: 2,
                role: StopRole::Unloading,
                location: GeoPoint::new(40.7589, -73.9851),
                address: "1560 Broadway, New York".to_string(),
                category: None,
            },
        ],
        materials: vec![MaterialRequest {
            // First catalog row in a fresh database
            packing_material_id: Some(1),
            name: "small_boxes".to_string(),
            quantity: 10,
            unit_price: Money::zero(),
        }],
    }
}
