use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use dashmap::DashMap;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::{AppointmentStatus, BookedAppointment, BookingRequest, TimeInterval};

/// The calendar collaborator: read a day's booked appointments, persist one
/// new appointment. The store, not the engine, guarantees at-most-one
/// appointment per final slot — persist is a single atomic create and reports
/// a conflict when the slot was concurrently taken.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// All appointments booked on `day`, ascending by start. A store failure
    /// is a `Lookup` error, never an implicit empty list.
    async fn booked_for_day(&self, day: NaiveDate) -> Result<Vec<BookedAppointment>, EngineError>;

    /// Atomically create a confirmed appointment occupying `slot`.
    async fn persist(
        &self,
        slot: TimeInterval,
        request: &BookingRequest,
    ) -> Result<BookedAppointment, EngineError>;
}

/// Reference store keeping one sorted appointment list per day. The per-day
/// shard lock makes the conflict check and the insert a single atomic step,
/// so concurrent attempts on the same slot cannot both succeed.
pub struct InMemoryCalendar {
    days: DashMap<NaiveDate, Vec<BookedAppointment>>,
    tz: Tz,
}

impl InMemoryCalendar {
    pub fn new(tz: Tz) -> Self {
        Self {
            days: DashMap::new(),
            tz,
        }
    }

    fn day_of(&self, slot: &TimeInterval) -> NaiveDate {
        slot.start.with_timezone(&self.tz).date_naive()
    }

    /// Seed an already-existing appointment (tests, demo data). Maintains
    /// ascending start order within the day.
    pub fn seed(&self, appointment: BookedAppointment) {
        let day = self.day_of(&appointment.interval);
        let mut entry = self.days.entry(day).or_default();
        let pos = entry
            .binary_search_by_key(&appointment.interval.start, |a| a.interval.start)
            .unwrap_or_else(|e| e);
        entry.insert(pos, appointment);
    }
}

#[async_trait]
impl CalendarStore for InMemoryCalendar {
    async fn booked_for_day(&self, day: NaiveDate) -> Result<Vec<BookedAppointment>, EngineError> {
        Ok(self.days.get(&day).map(|e| e.value().clone()).unwrap_or_default())
    }

    async fn persist(
        &self,
        slot: TimeInterval,
        request: &BookingRequest,
    ) -> Result<BookedAppointment, EngineError> {
        let day = self.day_of(&slot);
        let mut entry = self.days.entry(day).or_default();

        if entry
            .iter()
            .any(|a| a.is_blocking() && a.interval.overlaps(&slot))
        {
            return Err(EngineError::PersistConflict(slot));
        }

        let appointment = BookedAppointment {
            id: Ulid::new(),
            customer_name: request.customer_name.clone(),
            address: request.address.clone(),
            interval: slot,
            service: request.service,
            status: AppointmentStatus::Confirmed,
            notes: request.notes.clone(),
        };
        let pos = entry
            .binary_search_by_key(&slot.start, |a| a.interval.start)
            .unwrap_or_else(|e| e);
        entry.insert(pos, appointment.clone());
        Ok(appointment)
    }
}
