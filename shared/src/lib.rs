use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

mod admission;
mod availability;
mod error;
mod geo;

pub use admission::*;
pub use availability::*;
pub use error::*;
pub use geo::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laundromat {
    pub id: Uuid,
    pub name: String,
    pub borough: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineKind {
    Washer,
    Dryer,
}

/// Cached machine state. Reservations decide availability for a window;
/// this value is only kept in step with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Available,
    #[serde(alias = "in_use")]
    Booked,
    #[serde(alias = "out_of_service")]
    OutOfOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Uuid,
    pub laundromat_id: Uuid,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: MachineKind,
    pub status: MachineStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub machine_id: Uuid,
    pub laundromat_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Half-open interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// An admission request whose fields have already been validated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub machine_id: Uuid,
    pub laundromat_id: Uuid,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSummary {
    pub id: Uuid,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: MachineKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaundromatSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub machine: Option<MachineSummary>,
    pub laundromat: Option<LaundromatSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaundromatFilter {
    pub borough: Option<String>,
    pub name: Option<String>,
}

impl MachineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Washer => "washer",
            Self::Dryer => "dryer",
        }
    }
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::OutOfOrder => "out_of_order",
        }
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for MachineKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "washer" => Ok(Self::Washer),
            "dryer" => Ok(Self::Dryer),
            other => Err(ParseEnumError::new("machine type", other)),
        }
    }
}

impl FromStr for MachineStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "booked" | "in_use" => Ok(Self::Booked),
            "out_of_order" | "out_of_service" => Ok(Self::OutOfOrder),
            other => Err(ParseEnumError::new("machine status", other)),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseEnumError::new("booking status", other)),
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::Validation(
                "Start time must be before end time.".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Touching windows (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

impl Booking {
    pub fn new(request: &NewBooking) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            machine_id: request.machine_id,
            laundromat_id: request.laundromat_id,
            start_time: request.window.start(),
            end_time: request.window.end(),
            status: BookingStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    pub fn cancel(&mut self) {
        self.status = BookingStatus::Cancelled;
        self.updated_at = Utc::now();
    }
}

impl From<&Machine> for MachineSummary {
    fn from(machine: &Machine) -> Self {
        Self {
            id: machine.id,
            label: machine.label.clone(),
            kind: machine.kind,
        }
    }
}

impl From<&Laundromat> for LaundromatSummary {
    fn from(laundromat: &Laundromat) -> Self {
        Self {
            id: laundromat.id,
            name: laundromat.name.clone(),
            address: laundromat.address.clone(),
        }
    }
}

impl LaundromatFilter {
    pub fn matches(&self, laundromat: &Laundromat) -> bool {
        let borough_ok = self
            .borough
            .as_deref()
            .map_or(true, |b| laundromat.borough.eq_ignore_ascii_case(b));
        let name_ok = self.name.as_deref().map_or(true, |n| {
            laundromat.name.to_lowercase().contains(&n.to_lowercase())
        });
        borough_ok && name_ok
    }
}
