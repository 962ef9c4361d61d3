use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared::*;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct BookingRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub machine_id: Uuid,
    pub laundromat_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::laundromats)]
pub struct LaundromatRow {
    pub id: Uuid,
    pub name: String,
    pub borough: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::machines)]
pub struct MachineRow {
    pub id: Uuid,
    pub laundromat_id: Uuid,
    pub label: String,
    pub kind: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Booking> for BookingRow {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            machine_id: booking.machine_id,
            laundromat_id: booking.laundromat_id,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status.as_str().to_string(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            machine_id: row.machine_id,
            laundromat_id: row.laundromat_id,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status.parse().map_err(BookingError::store)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Laundromat> for LaundromatRow {
    fn from(laundromat: &Laundromat) -> Self {
        Self {
            id: laundromat.id,
            name: laundromat.name.clone(),
            borough: laundromat.borough.clone(),
            address: laundromat.address.clone(),
            latitude: laundromat.latitude,
            longitude: laundromat.longitude,
            created_at: laundromat.created_at,
            updated_at: laundromat.updated_at,
        }
    }
}

impl From<LaundromatRow> for Laundromat {
    fn from(row: LaundromatRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            borough: row.borough,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Machine> for MachineRow {
    fn from(machine: &Machine) -> Self {
        Self {
            id: machine.id,
            laundromat_id: machine.laundromat_id,
            label: machine.label.clone(),
            kind: machine.kind.as_str().to_string(),
            status: machine.status.as_str().to_string(),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }
}

impl TryFrom<MachineRow> for Machine {
    type Error = BookingError;

    fn try_from(row: MachineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            laundromat_id: row.laundromat_id,
            label: row.label,
            kind: row.kind.parse().map_err(BookingError::store)?,
            status: row.status.parse().map_err(BookingError::store)?,
        })
    }
}

pub fn into_domain<R, T>(rows: Vec<R>) -> Result<Vec<T>, BookingError>
where
    T: TryFrom<R, Error = BookingError>,
{
    rows.into_iter().map(T::try_from).collect()
}
