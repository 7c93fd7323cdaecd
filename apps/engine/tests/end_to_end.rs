//! Full request lifecycle: create, quote, operate, settle, tip.
//!
//! Both routing providers answer with server errors, so pricing runs on the
//! haversine estimate. The payment processor is a scripted fake.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use tokio::sync::Mutex;

use moowwee_core::{
    Actor, GeoPoint, JobStatus, MaterialRequest, Money, NewJob, PackingMaterial, PaymentStatus,
    Percentage, PriceLineKind, PropertyType, RateConfiguration, ServicePackage, Stop, StopRole,
    TipInput, TipsPaymentStatus,
};
use moowwee_db::Database;
use moowwee_engine::payment::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, PaymentResult, SessionStatus,
};
use moowwee_engine::{Engine, EngineError, ErrorCode};
use moowwee_routing::{RouteResolver, RoutingConfig};

/// Hands out sequential sessions and reports each as paid.
#[derive(Default)]
struct FakeProcessor {
    sessions: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl CheckoutGateway for FakeProcessor {
    async fn create_session(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let mut sessions = self.sessions.lock().await;
        sessions.push(request.clone());
        let id = format!("cs_test_{}", sessions.len());
        Ok(CheckoutSession {
            redirect_url: format!("https://checkout.example/{}", id),
            session_id: id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> PaymentResult<SessionStatus> {
        let sessions = self.sessions.lock().await;
        let index: usize = session_id
            .trim_start_matches("cs_test_")
            .parse()
            .unwrap_or(0);
        let request = index
            .checked_sub(1)
            .and_then(|i| sessions.get(i))
            .cloned()
            .unwrap_or_else(|| panic!("unknown session {}", session_id));

        Ok(SessionStatus {
            session_id: session_id.to_string(),
            payment_status: "paid".to_string(),
            amount: request.amount,
            currency: request.currency,
            reference: Some(request.reference),
        })
    }
}

async fn seeded_db() -> Database {
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

fn manhattan_move(small_boxes_id: i64) -> NewJob {
    let stop = |sequence, role, lat, lng, address: &str| Stop {
        sequence,
        role,
        location: GeoPoint::new(lat, lng),
        address: address.to_string(),
        category: None,
    };

    NewJob {
        property_type: PropertyType::Residential,
        square_feet: Some(1_100),
        floor_count: None,
        additional_objects: Default::default(),
        package: ServicePackage::Standard,
        crew_size: 3,
        departure_time: Utc.with_ymd_and_hms(2026, 11, 2, 9, 0, 0).unwrap(),
        estimated_duration_minutes: None,
        stops: vec![
            stop(0, StopRole::Loading, 40.7128, -74.0060, "1 Centre St, New York"),
            stop(1, StopRole::Intermediate, 40.7527, -73.9772, "89 E 42nd St, New York"),
            stop(2, StopRole::Unloading, 40.7589, -73.9851, "1560 Broadway, New York"),
        ],
        materials: vec![MaterialRequest {
            packing_material_id: Some(small_boxes_id),
            name: "small_boxes".to_string(),
            quantity: 10,
            unit_price: Money::zero(),
        }],
    }
}

async fn engine_with_failing_providers(server: &MockServer) -> (Engine, Arc<FakeProcessor>) {
    let routing = RoutingConfig {
        api_key: Some("test-key".to_string()),
        routes_api_url: server.url("/directions/v2:computeRoutes"),
        directions_api_url: server.url("/maps/api/directions/json"),
        tier_timeout_ms: 2_000,
        ..Default::default()
    };
    let resolver = RouteResolver::from_config(&routing).unwrap();
    let processor = Arc::new(FakeProcessor::default());

    let engine = Engine::assemble(
        seeded_db().await,
        Arc::new(resolver),
        processor.clone(),
        "usd",
    );
    (engine, processor)
}

#[tokio::test]
async fn test_moving_request_end_to_end() {
    let server = MockServer::start_async().await;
    let outage = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(503).body("upstream unavailable");
        })
        .await;

    let (engine, processor) = engine_with_failing_providers(&server).await;
    let customer = Actor::new("customer-42");
    let small_boxes = engine
        .db
        .rates()
        .load()
        .await
        .unwrap()
        .material_by_name("small_boxes")
        .map(|m| m.id)
        .unwrap();

    // Create and quote
    let job = engine
        .requests
        .create_job(&customer, manhattan_move(small_boxes))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.payment_status, PaymentStatus::Unpaid);

    let quote = engine.requests.quote(&job.id).await.unwrap();
    assert!(outage.hits_async().await >= 2);
    assert_eq!(quote.route_source, "haversine");
    assert_eq!(quote.route.distance_meters, 6015);
    assert_eq!(quote.breakdown.line(PriceLineKind::Labor), Money::from_cents(84_375));
    assert_eq!(quote.breakdown.line(PriceLineKind::Transport), Money::from_cents(748));
    assert_eq!(quote.breakdown.line(PriceLineKind::Materials), Money::from_dollars(30));
    assert_eq!(quote.breakdown.total, Money::from_cents(88_123));

    // Operate
    for status in [
        JobStatus::Confirmed,
        JobStatus::Active,
        JobStatus::Break,
        JobStatus::Active,
        JobStatus::Completed,
    ] {
        let moved = engine.requests.transition(&job.id, status).await.unwrap();
        assert_eq!(moved.status, status);
    }

    // The itinerary is frozen now
    let err = engine
        .requests
        .update_job(&customer, &job.id, Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StateConflict);

    // Settle the price
    let session = engine
        .settlement
        .start_payment(&customer, &job.id)
        .await
        .unwrap();
    assert_eq!(processor.sessions.lock().await[0].amount, Money::from_cents(88_123));
    let paid = engine
        .settlement
        .confirm_payment(&job.id, &session.session_id)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    // Tip the crew
    let preview = engine
        .requests
        .calculate_tips(&job.id, TipInput::Percentage(Percentage::from_whole(15)))
        .await
        .unwrap();
    let tipped = engine
        .requests
        .save_tips(&customer, &job.id, TipInput::Percentage(Percentage::from_whole(15)))
        .await
        .unwrap();

    let final_job = engine.requests.get_job(&job.id).await.unwrap();
    let tips = final_job.tips.clone().unwrap();
    assert_eq!(Some(&tips), tipped.tips.as_ref());
    assert_eq!(tips, preview);
    assert_eq!(tips.tips_amount, Money::from_cents(13_218));
    assert_eq!(
        tips.shares.iter().map(|s| s.amount.cents()).collect::<Vec<_>>(),
        vec![4_406, 4_406, 4_406]
    );
    assert_eq!(tips.shares_total(), tips.tips_amount);

    assert_eq!(final_job.status, JobStatus::Completed);
    assert!(final_job.completed_at.is_some());
    assert_eq!(final_job.payment_status, PaymentStatus::Paid);
    assert_eq!(final_job.tips_payment_status, TipsPaymentStatus::Pending);
    assert_eq!(final_job.price, Some(Money::from_cents(88_123)));
}

#[tokio::test]
async fn test_cancelled_job_is_terminal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.any_request();
            then.status(500);
        })
        .await;

    let (engine, _) = engine_with_failing_providers(&server).await;
    let customer = Actor::new("customer-42");
    let job = engine
        .requests
        .create_job(&customer, manhattan_move(1))
        .await
        .unwrap();

    engine
        .requests
        .transition(&job.id, JobStatus::Cancelled)
        .await
        .unwrap();

    for next in JobStatus::ALL {
        let err = engine.requests.transition(&job.id, next).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(_)));
        assert_eq!(err.code(), ErrorCode::IllegalTransition);
    }

    let err = engine
        .settlement
        .start_payment(&customer, &job.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StateConflict);
}
