//! Integration tests for booking admission and cancellation over HTTP.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use shared::{BookingStatus, StatusPolicy};
use uuid::Uuid;

use common::{booking_id, TestApp};

#[tokio::test]
async fn test_create_booking_returns_created_booking() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let response = app.book(user, app.seed.washer_id, "10:00", "11:00").await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    let booking = &response.body["booking"];
    assert_eq!(booking["status"], "active");
    assert_eq!(booking["user_id"], user.to_string());
    assert_eq!(booking["machine_id"], app.seed.washer_id.to_string());
    assert_eq!(app.machine_status(app.seed.washer_id).await, "booked");
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/bookings",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "machine_id": app.seed.washer_id,
                "start_time": "2024-05-01T10:00:00Z",
                "end_time": "2024-05-01T11:00:00Z",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Missing required fields.");
    assert_eq!(response.body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/bookings",
            Some(json!({
                "user_id": "not-a-uuid",
                "laundromat_id": app.seed.laundromat_id,
                "machine_id": app.seed.washer_id,
                "start_time": "yesterday",
                "end_time": "2024-05-01T11:00:00Z",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_empty_or_inverted_window_is_rejected() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let empty = app.book(user, app.seed.washer_id, "10:00", "10:00").await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["error"], "Start time must be before end time.");

    let inverted = app.book(user, app.seed.washer_id, "11:00", "10:00").await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.machine_status(app.seed.washer_id).await, "available");
}

#[tokio::test]
async fn test_unknown_machine_is_not_found() {
    let app = TestApp::new().await;

    let response = app.book(Uuid::new_v4(), Uuid::new_v4(), "10:00", "11:00").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Machine not found.");
}

#[tokio::test]
async fn test_machine_from_other_laundromat_is_rejected() {
    let app = TestApp::new().await;
    let remote = app
        .request("GET", &format!("/laundromats/{}", app.seed.other_laundromat_id), None)
        .await;
    let remote_washer: Uuid = remote.body["machines"][0]["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("remote washer id");

    let response = app.book(Uuid::new_v4(), remote_washer, "10:00", "11:00").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identical_window_conflicts() {
    let app = TestApp::new().await;

    let first = app.book(Uuid::new_v4(), app.seed.washer_id, "10:00", "11:00").await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.book(Uuid::new_v4(), app.seed.washer_id, "10:00", "11:00").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_touching_window_is_admitted() {
    let app = TestApp::new().await;

    let first = app.book(Uuid::new_v4(), app.seed.washer_id, "10:00", "11:00").await;
    assert_eq!(first.status, StatusCode::CREATED);

    let after = app.book(Uuid::new_v4(), app.seed.washer_id, "11:00", "12:00").await;
    assert_eq!(after.status, StatusCode::CREATED, "{:?}", after.body);

    let before = app.book(Uuid::new_v4(), app.seed.washer_id, "09:00", "10:00").await;
    assert_eq!(before.status, StatusCode::CREATED, "{:?}", before.body);
}

#[tokio::test]
async fn test_other_machine_is_unaffected_by_overlap() {
    let app = TestApp::new().await;

    let first = app.book(Uuid::new_v4(), app.seed.washer_id, "10:00", "11:00").await;
    let other = app.book(Uuid::new_v4(), app.seed.second_washer_id, "10:00", "11:00").await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(other.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_out_of_order_machine_is_not_available() {
    let app = TestApp::new().await;

    let response = app.book(Uuid::new_v4(), app.seed.broken_dryer_id, "10:00", "11:00").await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "Machine is not available.");
}

#[tokio::test]
async fn test_strict_policy_refuses_booked_machine() {
    let app = TestApp::with_policy(StatusPolicy::Strict).await;

    let first = app.book(Uuid::new_v4(), app.seed.washer_id, "10:00", "11:00").await;
    assert_eq!(first.status, StatusCode::CREATED);

    let later = app.book(Uuid::new_v4(), app.seed.washer_id, "14:00", "15:00").await;
    assert_eq!(later.status, StatusCode::CONFLICT);
    assert_eq!(later.body["error"], "Machine is not available.");
}

#[tokio::test]
async fn test_booking_scenario_with_cancellation() {
    let app = TestApp::new().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
    let washer = app.seed.washer_id;

    let first = app.book(u1, washer, "10:00", "11:00").await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(app.machine_status(washer).await, "booked");

    let overlap = app.book(u2, washer, "10:30", "11:30").await;
    assert_eq!(overlap.status, StatusCode::CONFLICT);

    let cancelled = app.cancel(&booking_id(&first), u1).await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["success"], true);
    assert_eq!(app.machine_status(washer).await, "available");

    let retry = app.book(u2, washer, "10:30", "11:30").await;
    assert_eq!(retry.status, StatusCode::CREATED, "{:?}", retry.body);
}

#[tokio::test]
async fn test_cancel_then_rebook_identical_window() {
    let app = TestApp::with_policy(StatusPolicy::Strict).await;
    let user = Uuid::new_v4();

    let first = app.book(user, app.seed.dryer_id, "18:00", "19:00").await;
    let cancelled = app.cancel(&booking_id(&first), user).await;
    assert_eq!(cancelled.status, StatusCode::OK);

    let again = app.book(user, app.seed.dryer_id, "18:00", "19:00").await;
    assert_eq!(again.status, StatusCode::CREATED, "{:?}", again.body);
}

#[tokio::test]
async fn test_cancel_by_non_owner_is_forbidden() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();

    let created = app.book(owner, app.seed.washer_id, "10:00", "11:00").await;
    let id = booking_id(&created);

    let response = app.cancel(&id, Uuid::new_v4()).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["code"], "FORBIDDEN");

    let booking = app
        .manager
        .booking(id.parse().unwrap())
        .await
        .expect("booking still exists");
    assert_eq!(booking.status, BookingStatus::Active);
    assert_eq!(app.machine_status(app.seed.washer_id).await, "booked");
}

#[tokio::test]
async fn test_get_booking_reflects_cancellation() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let created = app.book(owner, app.seed.washer_id, "10:00", "11:00").await;
    let id = booking_id(&created);

    let fetched = app.request("GET", &format!("/bookings/{id}"), None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["booking"]["status"], "active");
    assert_eq!(fetched.body["booking"]["start_time"], created.body["booking"]["start_time"]);

    app.cancel(&id, owner).await;
    let fetched = app.request("GET", &format!("/bookings/{id}"), None).await;
    assert_eq!(fetched.body["booking"]["status"], "cancelled");

    let unknown = app
        .request("GET", &format!("/bookings/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["error"], "Booking not found.");
}

#[tokio::test]
async fn test_cancel_twice_conflicts() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let created = app.book(owner, app.seed.washer_id, "10:00", "11:00").await;
    let id = booking_id(&created);

    assert_eq!(app.cancel(&id, owner).await.status, StatusCode::OK);

    let again = app.cancel(&id, owner).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "Booking is not active.");
}

#[tokio::test]
async fn test_cancel_unknown_booking_is_not_found() {
    let app = TestApp::new().await;

    let response = app.cancel(&Uuid::new_v4().to_string(), Uuid::new_v4()).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_requires_user_id() {
    let app = TestApp::new().await;
    let created = app.book(Uuid::new_v4(), app.seed.washer_id, "10:00", "11:00").await;

    let response = app
        .request(
            "POST",
            &format!("/bookings/{}/cancel", booking_id(&created)),
            Some(json!({})),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Missing user_id.");
}

#[tokio::test]
async fn test_cancel_with_malformed_booking_id_is_bad_request() {
    let app = TestApp::new().await;

    let response = app.cancel("not-a-uuid", Uuid::new_v4()).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancelling_one_of_two_bookings_keeps_machine_booked() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let morning = app.book(user, app.seed.washer_id, "08:00", "09:00").await;
    let evening = app.book(user, app.seed.washer_id, "20:00", "21:00").await;
    assert_eq!(evening.status, StatusCode::CREATED);

    app.cancel(&booking_id(&morning), user).await;
    assert_eq!(app.machine_status(app.seed.washer_id).await, "booked");

    app.cancel(&booking_id(&evening), user).await;
    assert_eq!(app.machine_status(app.seed.washer_id).await, "available");
}

#[tokio::test]
async fn test_list_user_bookings_sorted_and_filtered() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let late = app.book(user, app.seed.washer_id, "15:00", "16:00").await;
    app.book(user, app.seed.dryer_id, "09:00", "10:00").await;
    app.book(Uuid::new_v4(), app.seed.second_washer_id, "12:00", "13:00").await;
    app.cancel(&booking_id(&late), user).await;

    let all = app.request("GET", &format!("/users/{user}/bookings"), None).await;
    assert_eq!(all.status, StatusCode::OK);
    let bookings = all.body["bookings"].as_array().expect("bookings array");
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0]["machine"]["label"], "Dryer 1");
    assert_eq!(bookings[0]["machine"]["type"], "dryer");
    assert_eq!(bookings[0]["laundromat"]["name"], "Suds City");
    assert_eq!(bookings[1]["machine"]["label"], "Washer 1");

    let active = app
        .request("GET", &format!("/users/{user}/bookings?status=active"), None)
        .await;
    let active = active.body["bookings"].as_array().expect("bookings array");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["status"], "active");

    let bad = app
        .request("GET", &format!("/users/{user}/bookings?status=pending"), None)
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}
