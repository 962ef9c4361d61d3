use async_trait::async_trait;
use shared::*;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{attach_details, BookingStore, Fixtures};

#[derive(Default)]
struct Tables {
    laundromats: HashMap<Uuid, Laundromat>,
    machines: HashMap<Uuid, Machine>,
    bookings: HashMap<Uuid, Booking>,
}

impl Tables {
    fn has_active_bookings(&self, machine_id: Uuid) -> bool {
        self.bookings
            .values()
            .any(|b| b.machine_id == machine_id && b.is_active())
    }
}

/// Process-local store. Every mutation holds the write lock for its whole
/// read-check-write sequence.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn admit(&self, request: NewBooking, policy: StatusPolicy) -> BookingResult<Booking> {
        let mut tables = self.tables.write().await;

        let machine = tables
            .machines
            .get(&request.machine_id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound("Machine not found.".to_string()))?;

        let existing: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.machine_id == machine.id)
            .cloned()
            .collect();
        check_admission(&machine, &request, &existing, policy)?;

        let booking = Booking::new(&request);
        tables.bookings.insert(booking.id, booking.clone());
        if let Some(machine) = tables.machines.get_mut(&booking.machine_id) {
            machine.status = derive_machine_status(machine.status, true);
        }

        Ok(booking)
    }

    async fn cancel(&self, booking_id: Uuid, requester_id: Uuid) -> BookingResult<Booking> {
        let mut tables = self.tables.write().await;

        let booking = tables
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| BookingError::NotFound("Booking not found.".to_string()))?;
        check_cancellation(booking, requester_id)?;
        booking.cancel();
        let booking = booking.clone();

        let still_booked = tables.has_active_bookings(booking.machine_id);
        if let Some(machine) = tables.machines.get_mut(&booking.machine_id) {
            machine.status = derive_machine_status(machine.status, still_booked);
        }

        Ok(booking)
    }

    async fn booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.tables
            .read()
            .await
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound("Booking not found.".to_string()))
    }

    async fn bookings_for_user(
        &self,
        user_id: Uuid,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<BookingDetails>> {
        let tables = self.tables.read().await;

        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start_time);

        Ok(attach_details(bookings, &tables.machines, &tables.laundromats))
    }

    async fn laundromats(&self, filter: &LaundromatFilter) -> BookingResult<Vec<Laundromat>> {
        let tables = self.tables.read().await;

        let mut laundromats: Vec<Laundromat> = tables
            .laundromats
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        laundromats.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(laundromats)
    }

    async fn laundromat(&self, laundromat_id: Uuid) -> BookingResult<Laundromat> {
        self.tables
            .read()
            .await
            .laundromats
            .get(&laundromat_id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound("Laundromat not found.".to_string()))
    }

    async fn machines(&self, laundromat_id: Option<Uuid>) -> BookingResult<Vec<Machine>> {
        let tables = self.tables.read().await;

        let mut machines: Vec<Machine> = tables
            .machines
            .values()
            .filter(|m| laundromat_id.map_or(true, |id| m.laundromat_id == id))
            .cloned()
            .collect();
        machines.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(machines)
    }

    async fn set_machine_status(
        &self,
        machine_id: Uuid,
        status: MaintenanceStatus,
    ) -> BookingResult<Machine> {
        let mut tables = self.tables.write().await;

        let has_active = tables.has_active_bookings(machine_id);
        let machine = tables
            .machines
            .get_mut(&machine_id)
            .ok_or_else(|| BookingError::NotFound("Machine not found.".to_string()))?;
        machine.status = status.resolve(has_active);

        Ok(machine.clone())
    }

    async fn load_fixtures(&self, fixtures: Fixtures) -> BookingResult<()> {
        let mut tables = self.tables.write().await;

        for laundromat in fixtures.laundromats {
            tables.laundromats.entry(laundromat.id).or_insert(laundromat);
        }
        for machine in fixtures.machines {
            tables.machines.entry(machine.id).or_insert(machine);
        }
        Ok(())
    }
}
