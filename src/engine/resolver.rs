use chrono::Duration;
use chrono_tz::Tz;

use crate::model::{TimeInterval, TimePreference};

/// How the resolver arrived at its slot: an exact preference hit, or the
/// fallback to earliest availability once every preference was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChoice {
    Preferred { index: usize, slot: TimeInterval },
    Fallback { slot: TimeInterval },
}

impl SlotChoice {
    pub fn slot(&self) -> TimeInterval {
        match self {
            SlotChoice::Preferred { slot, .. } | SlotChoice::Fallback { slot } => *slot,
        }
    }

    pub fn preferred_index(&self) -> Option<usize> {
        match self {
            SlotChoice::Preferred { index, .. } => Some(*index),
            SlotChoice::Fallback { .. } => None,
        }
    }
}

/// Pick the booking slot from ranked preferences and the constrained free set.
///
/// First-match-wins over the given preference order: a preference is taken
/// when its duration-extended interval `[t, t+duration)` lies entirely inside
/// one constrained interval (half-open, so a preference starting exactly at
/// an interval's end is rejected while one ending exactly at it is accepted).
/// Preferences whose local time does not exist on that date are skipped.
///
/// When no preference matches, falls back to the start of the earliest
/// constrained interval that can hold `duration` — availability takes
/// priority over exact preference once all preferences are exhausted, but
/// never at the cost of the containment invariant. `None` means no slot;
/// a non-positive `duration` never resolves.
pub fn resolve_slot(
    preferences: &[TimePreference],
    constrained: &[TimeInterval],
    duration: Duration,
    tz: Tz,
) -> Option<SlotChoice> {
    if duration <= Duration::zero() {
        return None;
    }
    for (index, pref) in preferences.iter().enumerate() {
        let Some(start) = pref.instant(tz) else {
            continue;
        };
        let candidate = TimeInterval::checked_new(start, start + duration)?;
        if constrained.iter().any(|iv| iv.contains(&candidate)) {
            return Some(SlotChoice::Preferred {
                index,
                slot: candidate,
            });
        }
    }

    constrained
        .iter()
        .find(|iv| iv.duration() >= duration)
        .map(|iv| SlotChoice::Fallback {
            slot: TimeInterval::new(iv.start, iv.start + duration),
        })
}
