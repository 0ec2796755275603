use crate::model::TimeInterval;

// ── Interval Algebra ─────────────────────────────────────────────
//
// Pure functions, no side effects. All intervals are half-open.

/// Remove the overlap of `cut` from `base`, producing zero, one, or two
/// pieces. Disjoint inputs return `[base]`; a covering `cut` returns nothing.
pub fn subtract(base: TimeInterval, cut: TimeInterval) -> Vec<TimeInterval> {
    if !base.overlaps(&cut) {
        return vec![base];
    }
    let mut pieces = Vec::with_capacity(2);
    if let Some(before) = TimeInterval::checked_new(base.start, cut.start) {
        pieces.push(before);
    }
    if let Some(after) = TimeInterval::checked_new(cut.end, base.end) {
        pieces.push(after);
    }
    pieces
}

/// Fold `subtract` over every cut, starting from `base`. Accumulates a fresh
/// sequence each step, so no index shifting while iterating. The final set is
/// independent of cut order; output stays sorted when `base` is sorted.
pub fn subtract_all(base: Vec<TimeInterval>, cuts: &[TimeInterval]) -> Vec<TimeInterval> {
    cuts.iter().fold(base, |acc, cut| {
        acc.into_iter().flat_map(|iv| subtract(iv, *cut)).collect()
    })
}

/// Coalesce overlapping or adjacent intervals. Input must be sorted by start.
pub fn merge(sorted: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut merged: Vec<TimeInterval> = Vec::new();
    for &iv in sorted {
        if let Some(last) = merged.last_mut()
            && iv.start <= last.end
        {
            last.end = last.end.max(iv.end);
            continue;
        }
        merged.push(iv);
    }
    merged
}

/// Pairwise intersection of two sorted disjoint interval sets. Output keeps
/// ascending start order.
pub fn intersect_sets(a: &[TimeInterval], b: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if let Some(x) = a[i].intersect(&b[j]) {
            out.push(x);
        }
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}
