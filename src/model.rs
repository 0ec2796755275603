use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open interval `[start, end)` in absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "TimeInterval start must be before end");
        Self { start, end }
    }

    /// Fallible constructor for untrusted input; rejects empty and inverted
    /// intervals.
    pub fn checked_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Overlapping portion of two intervals, `None` when disjoint or merely
    /// adjacent.
    pub fn intersect(&self, other: &TimeInterval) -> Option<TimeInterval> {
        TimeInterval::checked_new(self.start.max(other.start), self.end.min(other.end))
    }
}

/// The service catalogue. Each kind carries a fixed appointment duration;
/// anything we don't recognize books a one-hour visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceKind {
    Cleaning,
    Repair,
    Plumbing,
    Electrical,
    Landscaping,
    Other,
}

impl ServiceKind {
    pub fn duration(&self) -> Duration {
        Duration::minutes(match self {
            ServiceKind::Cleaning => 120,
            ServiceKind::Repair => 90,
            ServiceKind::Plumbing => 60,
            ServiceKind::Electrical => 60,
            ServiceKind::Landscaping => 180,
            ServiceKind::Other => 60,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Cleaning => "cleaning",
            ServiceKind::Repair => "repair",
            ServiceKind::Plumbing => "plumbing",
            ServiceKind::Electrical => "electrical",
            ServiceKind::Landscaping => "landscaping",
            ServiceKind::Other => "other",
        }
    }
}

impl From<String> for ServiceKind {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "cleaning" => ServiceKind::Cleaning,
            "repair" => ServiceKind::Repair,
            "plumbing" => ServiceKind::Plumbing,
            "electrical" => ServiceKind::Electrical,
            "landscaping" => ServiceKind::Landscaping,
            _ => ServiceKind::Other,
        }
    }
}

impl From<ServiceKind> for String {
    fn from(k: ServiceKind) -> Self {
        k.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

/// An appointment as stored by the calendar collaborator. The engine reads
/// these and creates exactly one new row per successful booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedAppointment {
    pub id: Ulid,
    pub customer_name: String,
    pub address: String,
    pub interval: TimeInterval,
    pub service: ServiceKind,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl BookedAppointment {
    /// Cancelled appointments do not block availability.
    pub fn is_blocking(&self) -> bool {
        self.status == AppointmentStatus::Confirmed
    }
}

/// A customer's preferred visit time in calendar-local terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePreference {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl TimePreference {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    /// Resolve to an absolute instant in the calendar timezone. DST-ambiguous
    /// local times resolve to the earlier instant; nonexistent local times
    /// (spring-forward gaps) yield `None`.
    pub fn instant(&self, tz: Tz) -> Option<DateTime<Utc>> {
        tz.from_local_datetime(&self.date.and_time(self.time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// The daily window during which appointments may be scheduled, interpreted
/// in a single calendar timezone for the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub tz: Tz,
}

impl BusinessHours {
    pub fn new(open: NaiveTime, close: NaiveTime, tz: Tz) -> Self {
        debug_assert!(open < close, "business hours must open before they close");
        Self { open, close, tz }
    }

    /// The business-hours interval for a given day. `None` only when a DST
    /// transition swallows the whole window, which sane hours never hit.
    pub fn window(&self, day: NaiveDate) -> Option<TimeInterval> {
        let open = TimePreference::new(day, self.open).instant(self.tz)?;
        let close = TimePreference::new(day, self.close).instant(self.tz)?;
        TimeInterval::checked_new(open, close)
    }
}

/// A structured booking request, either from a direct form submission or
/// normalized from the intent extractor's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub customer_name: String,
    pub address: String,
    pub service: ServiceKind,
    #[serde(default)]
    pub preferences: Vec<TimePreference>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    /// Ensure at least one preference exists: an empty list becomes
    /// "next day, 09:00" relative to `today`.
    pub fn normalized(mut self, today: NaiveDate) -> Self {
        if self.preferences.is_empty()
            && let Some(next_day) = today.succ_opt()
            && let Some(nine) = NaiveTime::from_hms_opt(9, 0, 0)
        {
            self.preferences.push(TimePreference::new(next_day, nine));
        }
        self
    }
}

/// What the route collaborator knows about fitting a new stop into the day.
/// Immutable once produced; one per booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFeasibility {
    /// Windows during which travel logistics permit a new appointment.
    pub available_windows: Vec<TimeInterval>,
    /// Estimated one-way travel time to the candidate address, minutes.
    pub travel_minutes: i64,
    /// Suggested alternatives for the caller to surface on a failed attempt.
    pub alternatives: Vec<TimePreference>,
}

/// Terminal result of a booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SchedulingOutcome {
    Booked { appointment: BookedAppointment },
    NoSlotAvailable { alternatives: Vec<TimePreference> },
}
