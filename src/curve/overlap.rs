use crate::curve::fx_section::FxSection;

/// Half-open interval overlap test between `[t1, t1 + l1)` and `[t2, t2 + l2)`.
///
/// Touching intervals do not overlap. The arguments are swapped so the shorter interval is always
/// tested second.
pub fn has_overwrap(t1: f64, l1: f64, t2: f64, l2: f64) -> bool {
    if l1 < l2 {
        return has_overwrap(t2, l2, t1, l1);
    }
    t2 < t1 + l1 && t1 < t2 + l2
}

/// First row at or above `min_row` where `[time, time + length)` overlaps no section.
///
/// Never fails; the caller decides whether the returned row is within its row budget.
pub fn free_row(fxs: &[FxSection], time: f64, length: f64, min_row: usize) -> usize {
    let mut by_row: Vec<&FxSection> = fxs.iter().collect();
    by_row.sort_by(|a, b| a.row.cmp(&b.row).then(a.time.total_cmp(&b.time)));

    let mut row = min_row;
    for fx in by_row {
        if fx.row < row {
            continue;
        }
        if row < fx.row {
            break;
        }
        if has_overwrap(time, length, fx.time, fx.length) {
            row += 1;
        }
    }
    row
}

#[cfg(test)]
#[path = "../../tests/unit/curve/overlap.rs"]
mod tests;
