//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use booking_service::handlers::BookingManager;
use booking_service::memory::MemoryStore;
use booking_service::store::{BookingStore, Fixtures};
use shared::{Laundromat, Machine, MachineKind, MachineStatus, StatusPolicy};

/// Ids of the seeded catalogue.
pub struct Seed {
    pub laundromat_id: Uuid,
    pub other_laundromat_id: Uuid,
    pub washer_id: Uuid,
    pub second_washer_id: Uuid,
    pub dryer_id: Uuid,
    pub broken_dryer_id: Uuid,
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub manager: Arc<BookingManager>,
    pub seed: Seed,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

fn laundromat(id: Uuid, name: &str, borough: &str, latitude: f64, longitude: f64) -> Laundromat {
    let now = Utc::now();
    Laundromat {
        id,
        name: name.to_string(),
        borough: borough.to_string(),
        address: format!("{name} address"),
        latitude,
        longitude,
        created_at: now,
        updated_at: now,
    }
}

fn machine(laundromat_id: Uuid, label: &str, kind: MachineKind, status: MachineStatus) -> Machine {
    Machine {
        id: Uuid::new_v4(),
        laundromat_id,
        label: label.to_string(),
        kind,
        status,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_policy(StatusPolicy::Derived).await
    }

    pub async fn with_policy(policy: StatusPolicy) -> Self {
        let laundromat_id = Uuid::new_v4();
        let other_laundromat_id = Uuid::new_v4();

        let washer = machine(laundromat_id, "Washer 1", MachineKind::Washer, MachineStatus::Available);
        let second_washer =
            machine(laundromat_id, "Washer 2", MachineKind::Washer, MachineStatus::Available);
        let dryer = machine(laundromat_id, "Dryer 1", MachineKind::Dryer, MachineStatus::Available);
        let broken_dryer =
            machine(laundromat_id, "Dryer 2", MachineKind::Dryer, MachineStatus::OutOfOrder);
        let remote_washer = machine(
            other_laundromat_id,
            "Washer A",
            MachineKind::Washer,
            MachineStatus::Available,
        );

        let seed = Seed {
            laundromat_id,
            other_laundromat_id,
            washer_id: washer.id,
            second_washer_id: second_washer.id,
            dryer_id: dryer.id,
            broken_dryer_id: broken_dryer.id,
        };

        let fixtures = Fixtures {
            laundromats: vec![
                // Lower Manhattan
                laundromat(laundromat_id, "Suds City", "Manhattan", 40.7128, -74.0060),
                // Astoria
                laundromat(other_laundromat_id, "Astoria Wash", "Queens", 40.7644, -73.9235),
            ],
            machines: vec![washer, second_washer, dryer, broken_dryer, remote_washer],
        };

        let store = Arc::new(MemoryStore::new());
        store
            .load_fixtures(fixtures)
            .await
            .expect("Failed to load fixtures");

        let manager = Arc::new(BookingManager::new(store.clone(), policy));
        let router = booking_service::api::create_router(booking_service::api::AppState {
            manager: manager.clone(),
        });

        Self {
            router,
            store,
            manager,
            seed,
        }
    }

    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// `POST /bookings` for a window on 2024-05-01, times given as `HH:MM`.
    pub async fn book(&self, user_id: Uuid, machine_id: Uuid, start: &str, end: &str) -> TestResponse {
        self.request(
            "POST",
            "/bookings",
            Some(serde_json::json!({
                "user_id": user_id,
                "laundromat_id": self.seed.laundromat_id,
                "machine_id": machine_id,
                "start_time": format!("2024-05-01T{start}:00Z"),
                "end_time": format!("2024-05-01T{end}:00Z"),
            })),
        )
        .await
    }

    pub async fn cancel(&self, booking_id: &str, user_id: Uuid) -> TestResponse {
        self.request(
            "POST",
            &format!("/bookings/{booking_id}/cancel"),
            Some(serde_json::json!({ "user_id": user_id })),
        )
        .await
    }

    pub async fn machine_status(&self, machine_id: Uuid) -> String {
        let response = self
            .request("GET", &format!("/laundromats/{}", self.seed.laundromat_id), None)
            .await;
        response.body["machines"]
            .as_array()
            .expect("machines array")
            .iter()
            .find(|m| m["id"] == machine_id.to_string())
            .and_then(|m| m["status"].as_str())
            .expect("machine in listing")
            .to_string()
    }
}

pub fn booking_id(response: &TestResponse) -> String {
    response.body["booking"]["id"]
        .as_str()
        .expect("booking id in response")
        .to_string()
}
