//! Admission and cancellation rules for machine bookings.
//!
//! These functions only decide. Stores call them while holding whatever lock
//! or transaction makes the read-check-write sequence atomic for one machine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{Booking, BookingError, Machine, MachineStatus, NewBooking, ParseEnumError};

/// How much weight the cached machine status carries during admission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Only `out_of_order` machines are refused; a `booked` machine may
    /// still take any window that does not overlap its active bookings.
    #[default]
    Derived,
    /// Any status other than `available` refuses the request.
    Strict,
}

impl StatusPolicy {
    pub fn admits(&self, status: MachineStatus) -> bool {
        match self {
            Self::Derived => status != MachineStatus::OutOfOrder,
            Self::Strict => status == MachineStatus::Available,
        }
    }
}

/// Out-of-band maintenance request for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    OutOfOrder,
    #[serde(alias = "available")]
    InService,
}

impl MaintenanceStatus {
    /// Returning to service recomputes the status from reservations.
    pub fn resolve(&self, has_active_bookings: bool) -> MachineStatus {
        match self {
            Self::OutOfOrder => MachineStatus::OutOfOrder,
            Self::InService => derive_machine_status(MachineStatus::Available, has_active_bookings),
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "derived" => Ok(Self::Derived),
            "strict" => Ok(Self::Strict),
            other => Err(ParseEnumError::new("status policy", other)),
        }
    }
}

/// Checks run in order: ownership of the machine, status, overlap.
/// `existing` may hold any bookings of the machine; only active ones count.
pub fn check_admission(
    machine: &Machine,
    request: &NewBooking,
    existing: &[Booking],
    policy: StatusPolicy,
) -> Result<(), BookingError> {
    if machine.laundromat_id != request.laundromat_id {
        return Err(BookingError::Validation(
            "Machine does not belong to the given laundromat.".to_string(),
        ));
    }

    if !policy.admits(machine.status) {
        return Err(BookingError::Conflict("Machine is not available.".to_string()));
    }

    let clash = existing
        .iter()
        .filter(|b| b.machine_id == machine.id && b.is_active())
        .find(|b| b.window().overlaps(&request.window));

    if let Some(existing) = clash {
        return Err(BookingError::Conflict(format!(
            "This machine is already booked for the selected time slot ({}).",
            existing.window()
        )));
    }

    Ok(())
}

pub fn check_cancellation(booking: &Booking, requester_id: Uuid) -> Result<(), BookingError> {
    if booking.user_id != requester_id {
        return Err(BookingError::Authorization("Unauthorized.".to_string()));
    }
    if !booking.is_active() {
        return Err(BookingError::Conflict("Booking is not active.".to_string()));
    }
    Ok(())
}

/// Cached status after a booking change. Maintenance state wins over
/// reservations.
pub fn derive_machine_status(current: MachineStatus, has_active_bookings: bool) -> MachineStatus {
    match current {
        MachineStatus::OutOfOrder => MachineStatus::OutOfOrder,
        _ if has_active_bookings => MachineStatus::Booked,
        _ => MachineStatus::Available,
    }
}
