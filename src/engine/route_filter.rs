use crate::model::TimeInterval;
use crate::route::RouteConstraint;

use super::interval::{intersect_sets, merge};

/// Narrow the free set to slots that lie inside both a free interval and a
/// feasibility window. A degraded constraint (estimator unavailable, or no
/// windows returned) fails open: the free set passes through unchanged.
/// Logging the degraded mode is the caller's job; this stays pure.
pub fn filter_by_route(free: &[TimeInterval], constraint: &RouteConstraint) -> Vec<TimeInterval> {
    match constraint {
        RouteConstraint::Estimated(feas) if !feas.available_windows.is_empty() => {
            let mut windows = feas.available_windows.clone();
            windows.sort_by_key(|w| w.start);
            intersect_sets(free, &merge(&windows))
        }
        _ => free.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteFeasibility;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn iv(sh: u32, sm: u32, eh: u32, em: u32) -> TimeInterval {
        TimeInterval::new(t(sh, sm), t(eh, em))
    }

    fn estimated(windows: Vec<TimeInterval>) -> RouteConstraint {
        RouteConstraint::Estimated(RouteFeasibility {
            available_windows: windows,
            travel_minutes: 25,
            alternatives: Vec::new(),
        })
    }

    #[test]
    fn intersects_free_with_windows() {
        let free = vec![iv(9, 0, 10, 0), iv(11, 0, 17, 0)];
        let constraint = estimated(vec![iv(9, 30, 14, 0)]);
        assert_eq!(
            filter_by_route(&free, &constraint),
            vec![iv(9, 30, 10, 0), iv(11, 0, 14, 0)]
        );
    }

    #[test]
    fn ordering_is_preserved() {
        let free = vec![iv(9, 0, 10, 0), iv(11, 0, 12, 0), iv(14, 0, 17, 0)];
        let constraint = estimated(vec![iv(9, 0, 12, 0), iv(14, 0, 17, 0)]);
        let out = filter_by_route(&free, &constraint);
        assert_eq!(out, free);
    }

    #[test]
    fn unavailable_fails_open() {
        let free = vec![iv(9, 0, 10, 0), iv(11, 0, 17, 0)];
        assert_eq!(filter_by_route(&free, &RouteConstraint::Unavailable), free);
    }

    #[test]
    fn empty_windows_fail_open() {
        let free = vec![iv(9, 0, 17, 0)];
        assert_eq!(filter_by_route(&free, &estimated(Vec::new())), free);
    }

    #[test]
    fn unsorted_windows_are_normalized() {
        let free = vec![iv(9, 0, 17, 0)];
        let constraint = estimated(vec![iv(13, 0, 14, 0), iv(9, 30, 10, 30)]);
        assert_eq!(
            filter_by_route(&free, &constraint),
            vec![iv(9, 30, 10, 30), iv(13, 0, 14, 0)]
        );
    }

    #[test]
    fn disjoint_windows_empty_the_set() {
        let free = vec![iv(9, 0, 10, 0)];
        let constraint = estimated(vec![iv(15, 0, 16, 0)]);
        assert!(filter_by_route(&free, &constraint).is_empty());
    }
}
