use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::{exists, select};
use diesel::prelude::*;
use diesel_async::pooled_connection::{bb8::Pool, AsyncDieselConnectionManager, PoolError};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use shared::*;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;

/// Static data loaded at startup: laundromats and their machines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub laundromats: Vec<Laundromat>,
    #[serde(default)]
    pub machines: Vec<Machine>,
}

/// Record store behind the booking manager.
///
/// `admit`, `cancel` and `set_machine_status` must each run as one atomic
/// unit with respect to every other mutation of the same machine.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn admit(&self, request: NewBooking, policy: StatusPolicy) -> BookingResult<Booking>;

    async fn cancel(&self, booking_id: Uuid, requester_id: Uuid) -> BookingResult<Booking>;

    async fn booking(&self, booking_id: Uuid) -> BookingResult<Booking>;

    /// Ordered by start time ascending.
    async fn bookings_for_user(
        &self,
        user_id: Uuid,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<BookingDetails>>;

    /// Ordered by name.
    async fn laundromats(&self, filter: &LaundromatFilter) -> BookingResult<Vec<Laundromat>>;

    async fn laundromat(&self, laundromat_id: Uuid) -> BookingResult<Laundromat>;

    /// Ordered by label. `None` returns every machine.
    async fn machines(&self, laundromat_id: Option<Uuid>) -> BookingResult<Vec<Machine>>;

    async fn set_machine_status(
        &self,
        machine_id: Uuid,
        status: MaintenanceStatus,
    ) -> BookingResult<Machine>;

    /// Inserts fixtures, skipping ids that already exist.
    async fn load_fixtures(&self, fixtures: Fixtures) -> BookingResult<()>;
}

pub(crate) fn attach_details(
    bookings: Vec<Booking>,
    machines: &HashMap<Uuid, Machine>,
    laundromats: &HashMap<Uuid, Laundromat>,
) -> Vec<BookingDetails> {
    bookings
        .into_iter()
        .map(|booking| BookingDetails {
            machine: machines.get(&booking.machine_id).map(MachineSummary::from),
            laundromat: laundromats
                .get(&booking.laundromat_id)
                .map(LaundromatSummary::from),
            booking,
        })
        .collect()
}

fn pool_error(err: bb8::RunError<PoolError>) -> BookingError {
    BookingError::store(format!("connection pool: {err}"))
}

fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, pool_size: u32) -> BookingResult<Self> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(config)
            .await
            .map_err(BookingError::store)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn admit(&self, request: NewBooking, policy: StatusPolicy) -> BookingResult<Booking> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        // Read committed. The overlap query runs after the machine row lock is
        // held, so it sees every admission committed before ours; the
        // exclusion constraint on bookings backs it up.
        let booking = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    let machine: Machine = machines::table
                        .find(request.machine_id)
                        .for_update()
                        .first::<MachineRow>(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| BookingError::NotFound("Machine not found.".to_string()))?
                        .try_into()?;

                    let overlapping: Vec<Booking> = into_domain(
                        bookings::table
                            .filter(bookings::machine_id.eq(machine.id))
                            .filter(bookings::status.eq(BookingStatus::Active.as_str()))
                            .filter(bookings::start_time.lt(request.window.end()))
                            .filter(bookings::end_time.gt(request.window.start()))
                            .load::<BookingRow>(conn)
                            .await?,
                    )?;

                    check_admission(&machine, &request, &overlapping, policy)?;

                    let booking = Booking::new(&request);
                    diesel::insert_into(bookings::table)
                        .values(BookingRow::from(&booking))
                        .execute(conn)
                        .await?;

                    let status = derive_machine_status(machine.status, true);
                    diesel::update(machines::table.find(machine.id))
                        .set((
                            machines::status.eq(status.as_str()),
                            machines::updated_at.eq(Some(Utc::now())),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(booking)
                })
            })
            .await?;

        Ok(booking)
    }

    async fn cancel(&self, booking_id: Uuid, requester_id: Uuid) -> BookingResult<Booking> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let booking = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    let machine_id = bookings::table
                        .find(booking_id)
                        .select(bookings::machine_id)
                        .first::<Uuid>(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| BookingError::NotFound("Booking not found.".to_string()))?;

                    // Machine before booking, the same order admission locks in.
                    let machine = machines::table
                        .find(machine_id)
                        .for_update()
                        .first::<MachineRow>(conn)
                        .await
                        .optional()?;

                    let mut booking: Booking = bookings::table
                        .find(booking_id)
                        .for_update()
                        .first::<BookingRow>(conn)
                        .await?
                        .try_into()?;

                    check_cancellation(&booking, requester_id)?;
                    booking.cancel();

                    diesel::update(bookings::table.find(booking.id))
                        .set((
                            bookings::status.eq(booking.status.as_str()),
                            bookings::updated_at.eq(booking.updated_at),
                        ))
                        .execute(conn)
                        .await?;

                    if let Some(row) = machine {
                        let machine = Machine::try_from(row)?;
                        let still_booked = select(exists(
                            bookings::table
                                .filter(bookings::machine_id.eq(machine.id))
                                .filter(bookings::status.eq(BookingStatus::Active.as_str())),
                        ))
                        .get_result::<bool>(conn)
                        .await?;

                        let status = derive_machine_status(machine.status, still_booked);
                        diesel::update(machines::table.find(machine.id))
                            .set((
                                machines::status.eq(status.as_str()),
                                machines::updated_at.eq(Some(Utc::now())),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    Ok(booking)
                })
            })
            .await?;

        Ok(booking)
    }

    async fn booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        bookings::table
            .find(booking_id)
            .first::<BookingRow>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| BookingError::NotFound("Booking not found.".to_string()))?
            .try_into()
    }

    async fn bookings_for_user(
        &self,
        user_id: Uuid,
        status: Option<BookingStatus>,
    ) -> BookingResult<Vec<BookingDetails>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = bookings::table
            .filter(bookings::user_id.eq(user_id))
            .order(bookings::start_time.asc())
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(bookings::status.eq(status.as_str()));
        }
        let bookings: Vec<Booking> = into_domain(query.load::<BookingRow>(&mut conn).await?)?;

        let machine_ids: Vec<Uuid> = bookings.iter().map(|b| b.machine_id).collect();
        let laundromat_ids: Vec<Uuid> = bookings.iter().map(|b| b.laundromat_id).collect();

        let machines: Vec<Machine> = into_domain(
            machines::table
                .filter(machines::id.eq_any(machine_ids))
                .load::<MachineRow>(&mut conn)
                .await?,
        )?;
        let laundromats = laundromats::table
            .filter(laundromats::id.eq_any(laundromat_ids))
            .load::<LaundromatRow>(&mut conn)
            .await?;

        let machines: HashMap<Uuid, Machine> = machines.into_iter().map(|m| (m.id, m)).collect();
        let laundromats: HashMap<Uuid, Laundromat> = laundromats
            .into_iter()
            .map(|row| (row.id, Laundromat::from(row)))
            .collect();

        Ok(attach_details(bookings, &machines, &laundromats))
    }

    async fn laundromats(&self, filter: &LaundromatFilter) -> BookingResult<Vec<Laundromat>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = laundromats::table
            .order(laundromats::name.asc())
            .into_boxed();
        if let Some(borough) = &filter.borough {
            query = query.filter(laundromats::borough.ilike(escape_like(borough)));
        }
        if let Some(name) = &filter.name {
            query = query.filter(laundromats::name.ilike(format!("%{}%", escape_like(name))));
        }

        let rows = query.load::<LaundromatRow>(&mut conn).await?;
        Ok(rows.into_iter().map(Laundromat::from).collect())
    }

    async fn laundromat(&self, laundromat_id: Uuid) -> BookingResult<Laundromat> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        laundromats::table
            .find(laundromat_id)
            .first::<LaundromatRow>(&mut conn)
            .await
            .optional()?
            .map(Laundromat::from)
            .ok_or_else(|| BookingError::NotFound("Laundromat not found.".to_string()))
    }

    async fn machines(&self, laundromat_id: Option<Uuid>) -> BookingResult<Vec<Machine>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = machines::table.order(machines::label.asc()).into_boxed();
        if let Some(laundromat_id) = laundromat_id {
            query = query.filter(machines::laundromat_id.eq(laundromat_id));
        }

        into_domain(query.load::<MachineRow>(&mut conn).await?)
    }

    async fn set_machine_status(
        &self,
        machine_id: Uuid,
        status: MaintenanceStatus,
    ) -> BookingResult<Machine> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let machine = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    let mut machine: Machine = machines::table
                        .find(machine_id)
                        .for_update()
                        .first::<MachineRow>(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| BookingError::NotFound("Machine not found.".to_string()))?
                        .try_into()?;

                    let has_active = select(exists(
                        bookings::table
                            .filter(bookings::machine_id.eq(machine.id))
                            .filter(bookings::status.eq(BookingStatus::Active.as_str())),
                    ))
                    .get_result::<bool>(conn)
                    .await?;

                    machine.status = status.resolve(has_active);
                    diesel::update(machines::table.find(machine.id))
                        .set((
                            machines::status.eq(machine.status.as_str()),
                            machines::updated_at.eq(Some(Utc::now())),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(machine)
                })
            })
            .await?;

        Ok(machine)
    }

    async fn load_fixtures(&self, fixtures: Fixtures) -> BookingResult<()> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let laundromats: Vec<LaundromatRow> =
            fixtures.laundromats.iter().map(LaundromatRow::from).collect();
        let machines: Vec<MachineRow> = fixtures.machines.iter().map(MachineRow::from).collect();

        let mut inserted_laundromats = 0;
        if !laundromats.is_empty() {
            inserted_laundromats = diesel::insert_into(laundromats::table)
                .values(&laundromats)
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await?;
        }
        let mut inserted_machines = 0;
        if !machines.is_empty() {
            inserted_machines = diesel::insert_into(machines::table)
                .values(&machines)
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await?;
        }

        info!(
            "Loaded fixtures: {} laundromats, {} machines",
            inserted_laundromats, inserted_machines
        );
        Ok(())
    }
}
