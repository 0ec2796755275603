use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};

use crate::engine::interval::subtract_all;
use crate::model::{
    BookedAppointment, BusinessHours, RouteFeasibility, TimeInterval, TimePreference,
};

/// Estimates when a candidate address is reachable given the day's existing
/// appointment locations. Advisory, not authoritative: the engine fails open
/// when an estimate cannot be produced.
#[async_trait]
pub trait RouteEstimator: Send + Sync {
    async fn estimate(
        &self,
        address: &str,
        day: NaiveDate,
        booked: &[BookedAppointment],
    ) -> Result<RouteFeasibility, RouteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Candidate address could not be resolved to a location.
    Geocode(String),
    /// Estimator backend failed.
    Backend(String),
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteError::Geocode(addr) => write!(f, "could not geocode address: {addr}"),
            RouteError::Backend(msg) => write!(f, "route estimator backend failed: {msg}"),
        }
    }
}

impl std::error::Error for RouteError {}

/// Whether a booking attempt runs with a true feasibility estimate or a
/// degraded no-constraint default. An explicit variant rather than
/// exception-driven control flow, so callers can tell the two apart in logs
/// and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteConstraint {
    Estimated(RouteFeasibility),
    Unavailable,
}

impl RouteConstraint {
    pub fn is_degraded(&self) -> bool {
        match self {
            RouteConstraint::Estimated(f) => f.available_windows.is_empty(),
            RouteConstraint::Unavailable => true,
        }
    }

    pub fn alternatives(&self) -> &[TimePreference] {
        match self {
            RouteConstraint::Estimated(f) => &f.alternatives,
            RouteConstraint::Unavailable => &[],
        }
    }
}

/// Mock-quality reference estimator. Travel time is a deterministic function
/// of the address text, and a new stop is deemed unreachable within one
/// travel time of an existing stop on either side. Good enough to exercise
/// the engine; not a real router.
pub struct HeuristicRouter {
    hours: BusinessHours,
}

impl HeuristicRouter {
    pub fn new(hours: BusinessHours) -> Self {
        Self { hours }
    }

    fn travel_minutes(address: &str) -> i64 {
        let sum: u32 = address.bytes().map(u32::from).sum();
        15 + i64::from(sum % 31)
    }
}

#[async_trait]
impl RouteEstimator for HeuristicRouter {
    async fn estimate(
        &self,
        address: &str,
        day: NaiveDate,
        booked: &[BookedAppointment],
    ) -> Result<RouteFeasibility, RouteError> {
        if address.trim().is_empty() {
            return Err(RouteError::Geocode("<empty>".into()));
        }
        let Some(window) = self.hours.window(day) else {
            return Err(RouteError::Backend(format!("no business window on {day}")));
        };

        let travel = Duration::minutes(Self::travel_minutes(address));
        // One cut per stop: the appointment itself plus a travel-time margin
        // on either side.
        let margins: Vec<TimeInterval> = booked
            .iter()
            .filter(|b| b.is_blocking())
            .filter_map(|b| {
                TimeInterval::checked_new(b.interval.start - travel, b.interval.end + travel)
            })
            .collect();
        let available_windows = subtract_all(vec![window], &margins);

        let ten = NaiveTime::from_hms_opt(10, 0, 0)
            .ok_or_else(|| RouteError::Backend("bad clock".into()))?;
        let alternatives = (1..=3u64)
            .filter_map(|offset| day.checked_add_days(chrono::Days::new(offset)))
            .map(|d| TimePreference::new(d, ten))
            .collect();

        Ok(RouteFeasibility {
            available_windows,
            travel_minutes: travel.num_minutes(),
            alternatives,
        })
    }
}
