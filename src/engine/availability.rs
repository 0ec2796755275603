use chrono::NaiveDate;

use crate::model::{BookedAppointment, BusinessHours, TimeInterval};

use super::interval::subtract_all;

/// Derive the free intervals for a day: start from the single business-hours
/// window and fold out every confirmed booked interval that overlaps it.
///
/// Output is ascending by start with no overlaps and no zero-length members.
/// Deterministic and idempotent: identical input yields an identically
/// ordered result. Returns empty when the business-hours window cannot be
/// constructed for `day` (degenerate DST edge).
pub fn compute_availability(
    day: NaiveDate,
    hours: &BusinessHours,
    booked: &[BookedAppointment],
) -> Vec<TimeInterval> {
    let Some(window) = hours.window(day) else {
        return Vec::new();
    };
    let cuts: Vec<TimeInterval> = booked
        .iter()
        .filter(|b| b.is_blocking() && b.interval.overlaps(&window))
        .map(|b| b.interval)
        .collect();
    subtract_all(vec![window], &cuts)
}
