use serde::Serialize;
use shared::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::store::BookingStore;

pub const DEFAULT_NEAREST_LIMIT: usize = 5;
pub const MAX_NEAREST_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct LaundromatWithAvailability {
    #[serde(flatten)]
    pub laundromat: Laundromat,
    pub availability: Availability,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyLaundromat {
    #[serde(flatten)]
    pub laundromat: Laundromat,
    pub distance_km: f64,
    pub availability: Availability,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaundromatDetails {
    pub laundromat: Laundromat,
    pub machines: Vec<Machine>,
}

/// Entry point for every booking and catalogue operation. Owns no state
/// beyond the store handle it was built with.
pub struct BookingManager {
    store: Arc<dyn BookingStore>,
    policy: StatusPolicy,
}

impl BookingManager {
    pub fn new(store: Arc<dyn BookingStore>, policy: StatusPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    pub async fn create_booking(&self, request: NewBooking) -> BookingResult<Booking> {
        let machine_id = request.machine_id;
        let window = request.window;

        match self.store.admit(request, self.policy).await {
            Ok(booking) => {
                info!(
                    "Booking {} admitted for machine {} ({})",
                    booking.id, booking.machine_id, window
                );
                Ok(booking)
            }
            Err(e) => {
                log_rejection("admit", machine_id, &e);
                Err(e)
            }
        }
    }

    pub async fn cancel_booking(&self, booking_id: Uuid, requester_id: Uuid) -> BookingResult<Booking> {
        match self.store.cancel(booking_id, requester_id).await {
            Ok(booking) => {
                info!("Booking {} cancelled, machine {} released", booking.id, booking.machine_id);
                Ok(booking)
            }
            Err(e) => {
                log_rejection("cancel", booking_id, &e);
                Err(e)
            }
        }
    }

    pub async fn booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.store.booking(booking_id).await
    }

    pub async fn bookings_for_user(
        &self,
        user_id: Uuid,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<BookingDetails>> {
        self.store.bookings_for_user(user_id, status).await
    }

    pub async fn laundromats(
        &self,
        filter: &LaundromatFilter,
    ) -> BookingResult<Vec<LaundromatWithAvailability>> {
        let laundromats = self.store.laundromats(filter).await?;
        let mut by_laundromat = self.machines_by_laundromat().await?;

        Ok(laundromats
            .into_iter()
            .map(|laundromat| {
                let machines = by_laundromat.remove(&laundromat.id).unwrap_or_default();
                LaundromatWithAvailability {
                    availability: Availability::tally(&machines),
                    laundromat,
                }
            })
            .collect())
    }

    pub async fn nearest_laundromats(
        &self,
        origin: Coordinates,
        limit: Option<usize>,
    ) -> BookingResult<Vec<NearbyLaundromat>> {
        let limit = limit.unwrap_or(DEFAULT_NEAREST_LIMIT);
        if limit == 0 || limit > MAX_NEAREST_LIMIT {
            return Err(BookingError::Validation(format!(
                "limit must be between 1 and {MAX_NEAREST_LIMIT}."
            )));
        }

        let laundromats = self.store.laundromats(&LaundromatFilter::default()).await?;
        let mut by_laundromat = self.machines_by_laundromat().await?;

        let mut nearby: Vec<NearbyLaundromat> = laundromats
            .into_iter()
            .map(|laundromat| {
                let position = Coordinates {
                    latitude: laundromat.latitude,
                    longitude: laundromat.longitude,
                };
                let machines = by_laundromat.remove(&laundromat.id).unwrap_or_default();
                NearbyLaundromat {
                    distance_km: origin.distance_km(&position),
                    availability: Availability::tally(&machines),
                    laundromat,
                }
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        nearby.truncate(limit);

        Ok(nearby)
    }

    pub async fn laundromat(&self, laundromat_id: Uuid) -> BookingResult<LaundromatDetails> {
        let laundromat = self.store.laundromat(laundromat_id).await?;
        let machines = self.store.machines(Some(laundromat_id)).await?;
        Ok(LaundromatDetails {
            laundromat,
            machines,
        })
    }

    /// Tally of cached machine statuses, for one laundromat or all of them.
    pub async fn availability(&self, laundromat_id: Option<Uuid>) -> BookingResult<Availability> {
        if let Some(id) = laundromat_id {
            self.store.laundromat(id).await?;
        }
        let machines = self.store.machines(laundromat_id).await?;
        Ok(Availability::tally(&machines))
    }

    pub async fn set_machine_status(
        &self,
        machine_id: Uuid,
        status: MaintenanceStatus,
    ) -> BookingResult<Machine> {
        let machine = self.store.set_machine_status(machine_id, status).await?;
        info!("Machine {} is now {}", machine.id, machine.status);
        Ok(machine)
    }

    async fn machines_by_laundromat(&self) -> BookingResult<HashMap<Uuid, Vec<Machine>>> {
        let mut grouped: HashMap<Uuid, Vec<Machine>> = HashMap::new();
        for machine in self.store.machines(None).await? {
            grouped.entry(machine.laundromat_id).or_default().push(machine);
        }
        Ok(grouped)
    }
}

fn log_rejection(operation: &str, subject: Uuid, err: &BookingError) {
    match err {
        BookingError::Store(_) => error!("{} failed for {}: {}", operation, subject, err),
        _ => warn!("{} rejected for {}: {}", operation, subject, err),
    }
}
