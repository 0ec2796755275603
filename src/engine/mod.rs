pub mod availability;
mod error;
pub mod interval;
pub mod resolver;
pub mod route_filter;

pub use availability::compute_availability;
pub use error::EngineError;
pub use resolver::{SlotChoice, resolve_slot};
pub use route_filter::filter_by_route;

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::calendar::CalendarStore;
use crate::model::{BookingRequest, BusinessHours, SchedulingOutcome, TimeInterval};
use crate::observability;
use crate::route::{RouteConstraint, RouteEstimator};

/// Stage of a booking attempt; strictly sequential, no branching back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Requested,
    AvailabilityComputed,
    RouteFiltered,
    SlotResolved,
    Persisted,
    Rejected,
}

/// The scheduling engine. Stateless between calls: every attempt is an
/// independent computation over the collaborators' responses, so identical
/// inputs always resolve the same slot, up to the final persist side effect.
pub struct Engine {
    calendar: Arc<dyn CalendarStore>,
    router: Arc<dyn RouteEstimator>,
    hours: BusinessHours,
}

impl Engine {
    pub fn new(
        calendar: Arc<dyn CalendarStore>,
        router: Arc<dyn RouteEstimator>,
        hours: BusinessHours,
    ) -> Self {
        Self {
            calendar,
            router,
            hours,
        }
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    /// Free intervals for a day, for read-only display.
    pub async fn list_availability(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<TimeInterval>, EngineError> {
        let booked = self.calendar.booked_for_day(day).await?;
        Ok(compute_availability(day, &self.hours, &booked))
    }

    /// Run one booking attempt:
    /// `Requested → AvailabilityComputed → RouteFiltered → SlotResolved →
    /// Persisted | Rejected`.
    ///
    /// The calendar read and the persist propagate their errors; the
    /// route-feasibility stage never does — an estimator failure degrades to
    /// no additional constraint, logged here so the trade of precision for
    /// availability stays visible.
    pub async fn attempt_booking(
        &self,
        request: &BookingRequest,
        day: NaiveDate,
    ) -> Result<SchedulingOutcome, EngineError> {
        // Timed here so every exit, booked or not, records attempt latency.
        let started = Instant::now();
        let result = self.run_attempt(request, day).await;
        metrics::histogram!(observability::ATTEMPT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn run_attempt(
        &self,
        request: &BookingRequest,
        day: NaiveDate,
    ) -> Result<SchedulingOutcome, EngineError> {
        metrics::counter!(observability::BOOKING_ATTEMPTS_TOTAL).increment(1);
        debug!(
            stage = ?Stage::Requested,
            customer = %request.customer_name,
            service = request.service.label(),
            %day,
            "booking attempt started"
        );

        let booked = match self.calendar.booked_for_day(day).await {
            Ok(booked) => booked,
            Err(e) => return Err(self.reject(e)),
        };
        let free = compute_availability(day, &self.hours, &booked);
        debug!(stage = ?Stage::AvailabilityComputed, free = free.len(), booked = booked.len(), "availability computed");

        let constraint = match self.router.estimate(&request.address, day, &booked).await {
            Ok(feasibility) => RouteConstraint::Estimated(feasibility),
            Err(e) => {
                warn!(error = %e, "route estimator unavailable, scheduling without route constraint");
                RouteConstraint::Unavailable
            }
        };
        if constraint.is_degraded() {
            metrics::counter!(observability::ROUTE_FALLBACK_TOTAL).increment(1);
        }
        let constrained = filter_by_route(&free, &constraint);
        debug!(
            stage = ?Stage::RouteFiltered,
            constrained = constrained.len(),
            degraded = constraint.is_degraded(),
            "route filter applied"
        );

        let duration = request.service.duration();
        let Some(choice) = resolve_slot(&request.preferences, &constrained, duration, self.hours.tz)
        else {
            info!(%day, customer = %request.customer_name, "no slot available");
            metrics::counter!(observability::NO_SLOT_TOTAL).increment(1);
            return Ok(SchedulingOutcome::NoSlotAvailable {
                alternatives: constraint.alternatives().to_vec(),
            });
        };
        let slot = choice.slot();
        debug!(
            stage = ?Stage::SlotResolved,
            start = %slot.start,
            matched_preference = ?choice.preferred_index(),
            "slot resolved"
        );

        match self.calendar.persist(slot, request).await {
            Ok(appointment) => {
                info!(
                    stage = ?Stage::Persisted,
                    id = %appointment.id,
                    start = %slot.start,
                    customer = %request.customer_name,
                    "appointment booked"
                );
                metrics::counter!(observability::BOOKINGS_CONFIRMED_TOTAL).increment(1);
                Ok(SchedulingOutcome::Booked { appointment })
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    fn reject(&self, e: EngineError) -> EngineError {
        info!(stage = ?Stage::Rejected, error = %e, retryable = e.is_retryable(), "booking attempt rejected");
        metrics::counter!(observability::BOOKINGS_REJECTED_TOTAL, "reason" => e.label())
            .increment(1);
        e
    }
}
