use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::*;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::handlers::{BookingManager, LaundromatDetails};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BookingManager>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: Option<Uuid>,
    pub laundromat_id: Option<Uuid>,
    pub machine_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SetMachineStatusRequest {
    pub status: MaintenanceStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LaundromatsQuery {
    pub borough: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub laundromat_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub struct ApiError(pub BookingError);

impl CreateBookingRequest {
    /// Field validation; runs before the store is touched.
    pub fn into_new_booking(self) -> BookingResult<NewBooking> {
        let (Some(user_id), Some(laundromat_id), Some(machine_id), Some(start), Some(end)) = (
            self.user_id,
            self.laundromat_id,
            self.machine_id,
            self.start_time,
            self.end_time,
        ) else {
            return Err(BookingError::Validation("Missing required fields.".to_string()));
        };

        Ok(NewBooking {
            user_id,
            machine_id,
            laundromat_id,
            window: TimeWindow::new(start, end)?,
        })
    }
}

impl BookingsQuery {
    fn status(&self) -> BookingResult<Option<BookingStatus>> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(|e: ParseEnumError| BookingError::Validation(e.to_string())))
            .transpose()
    }
}

impl From<LaundromatsQuery> for LaundromatFilter {
    fn from(query: LaundromatsQuery) -> Self {
        Self {
            borough: query.borough.filter(|b| !b.trim().is_empty()),
            name: query.name.filter(|n| !n.trim().is_empty()),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BookingError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(BookingError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(BookingError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Authorization(_) => StatusCode::FORBIDDEN,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Store(_) => {
                tracing::error!("Store failure: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/:booking_id", get(get_booking))
        .route("/bookings/:booking_id/cancel", post(cancel_booking))
        .route("/users/:user_id/bookings", get(list_user_bookings))
        .route("/laundromats", get(list_laundromats))
        .route("/laundromats/nearest", get(nearest_laundromats))
        .route("/laundromats/:laundromat_id", get(get_laundromat))
        .route("/machines/availability", get(machine_availability))
        .route("/machines/:machine_id/status", put(set_machine_status))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(request) = payload?;
    let new_booking = request.into_new_booking()?;

    let booking = state.manager.create_booking(new_booking).await?;
    Ok((StatusCode::CREATED, Json(json!({ "booking": booking }))))
}

pub async fn get_booking(
    State(state): State<AppState>,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Path(booking_id) = booking_id?;

    let booking = state.manager.booking(booking_id).await?;
    Ok(Json(json!({ "booking": booking })))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    booking_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CancelBookingRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Path(booking_id) = booking_id?;
    let Json(request) = payload?;
    let user_id = request
        .user_id
        .ok_or_else(|| BookingError::Validation("Missing user_id.".to_string()))?;

    state.manager.cancel_booking(booking_id, user_id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_user_bookings(
    State(state): State<AppState>,
    user_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<BookingsQuery>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Path(user_id) = user_id?;
    let Query(query) = query?;

    let bookings = state.manager.bookings_for_user(user_id, query.status()?).await?;
    Ok(Json(json!({ "bookings": bookings })))
}

pub async fn list_laundromats(
    State(state): State<AppState>,
    query: Result<Query<LaundromatsQuery>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Query(query) = query?;

    let laundromats = state.manager.laundromats(&query.into()).await?;
    Ok(Json(json!({ "laundromats": laundromats })))
}

pub async fn nearest_laundromats(
    State(state): State<AppState>,
    query: Result<Query<NearestQuery>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Query(query) = query?;
    let origin = Coordinates::new(query.latitude, query.longitude)?;

    let laundromats = state.manager.nearest_laundromats(origin, query.limit).await?;
    Ok(Json(json!({ "laundromats": laundromats })))
}

pub async fn get_laundromat(
    State(state): State<AppState>,
    laundromat_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<LaundromatDetails>> {
    let Path(laundromat_id) = laundromat_id?;

    let details = state.manager.laundromat(laundromat_id).await?;
    Ok(Json(details))
}

pub async fn machine_availability(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Query(query) = query?;

    let availability = state.manager.availability(query.laundromat_id).await?;
    Ok(Json(json!({ "availability": availability })))
}

pub async fn set_machine_status(
    State(state): State<AppState>,
    machine_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SetMachineStatusRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Path(machine_id) = machine_id?;
    let Json(request) = payload?;

    let machine = state.manager.set_machine_status(machine_id, request.status).await?;
    Ok(Json(json!({ "machine": machine })))
}

pub async fn health_check() -> &'static str {
    "OK"
}
