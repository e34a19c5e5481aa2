//! Cubic bezier easing between two curve nodes.
//!
//! The time axis of a segment is normalized to `[0, 1]` and inverted numerically: a coarse
//! lookup table brackets the curve parameter, then Newton-Raphson (or bisection near flat
//! slopes) refines it. The value axis is evaluated directly from the recovered parameter.

use crate::curve::node::BezierNode;

const TABLE_SIZE: usize = 21;
const NEWTON_ITER: usize = 4;
const NEWTON_MIN_SLOPE: f64 = 0.001;
const SUBDIV_ITER: usize = 10;
const SUBDIV_EPSILON: f64 = 0.000_001;

/// One axis of a cubic bezier with endpoints fixed at `0` and `1`.
fn coord(t: f64, p1: f64, p2: f64) -> f64 {
    let omt = 1.0 - t;
    3.0 * omt * omt * t * p1 + 3.0 * omt * t * t * p2 + t * t * t
}

fn slope(t: f64, p1: f64, p2: f64) -> f64 {
    let omt = 1.0 - t;
    3.0 * omt * omt * p1 + 6.0 * omt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

/// Cubic bezier with arbitrary endpoints, used for the value axis.
fn cubic(t: f64, q0: f64, q1: f64, q2: f64, q3: f64) -> f64 {
    let omt = 1.0 - t;
    omt * omt * omt * q0 + 3.0 * omt * omt * t * q1 + 3.0 * omt * t * t * q2 + t * t * t * q3
}

fn newton(x: f64, mut t: f64, x1: f64, x2: f64) -> f64 {
    for _ in 0..NEWTON_ITER {
        let d = slope(t, x1, x2);
        if d == 0.0 {
            return t;
        }
        t -= (coord(t, x1, x2) - x) / d;
    }
    t
}

fn subdivide(x: f64, mut lo: f64, mut hi: f64, x1: f64, x2: f64) -> f64 {
    let mut t = 0.5 * (lo + hi);
    for _ in 0..SUBDIV_ITER {
        t = 0.5 * (lo + hi);
        let err = coord(t, x1, x2) - x;
        if err.abs() <= SUBDIV_EPSILON {
            break;
        }
        if err > 0.0 {
            hi = t;
        } else {
            lo = t;
        }
    }
    t
}

/// Find the curve parameter `t` with `x(t) == x` on the normalized time axis.
fn solve_param(x1: f64, x2: f64, x: f64) -> f64 {
    // x(t) is monotone only while both time controls stay inside the segment.
    let x1 = x1.clamp(0.0, 1.0);
    let x2 = x2.clamp(0.0, 1.0);
    let step = 1.0 / (TABLE_SIZE - 1) as f64;

    let mut table = [0.0; TABLE_SIZE];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = coord(i as f64 * step, x1, x2);
    }

    let mut sample = 0;
    for i in 1..TABLE_SIZE {
        sample = i - 1;
        if x < table[i] {
            break;
        }
    }

    let span = table[sample + 1] - table[sample];
    let dist = if span > 0.0 {
        (x - table[sample]) / span
    } else {
        0.0
    };
    let guess = (sample as f64 + dist) * step;

    let t = if slope(guess, x1, x2) >= NEWTON_MIN_SLOPE {
        newton(x, guess, x1, x2)
    } else {
        subdivide(x, sample as f64 * step, (sample + 1) as f64 * step, x1, x2)
    };
    t.clamp(0.0, 1.0)
}

/// Evaluate a normalized cubic bezier easing at `x`.
///
/// `(x1, y1)` and `(x2, y2)` are the control points of a curve running from `(0, 0)` to `(1, 1)`.
/// Linear control points and NaN control points both return `x` as-is.
pub fn raw_cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    if [x1, y1, x2, y2].iter().any(|c| c.is_nan()) {
        return x;
    }
    if x1 == y1 && x2 == y2 {
        return x;
    }
    let t = solve_param(x1, x2, x);
    coord(t, y1, y2)
}

/// Interpolate between two consecutive nodes at global curve time `time`.
///
/// Returns the node values exactly at (and beyond) the segment ends.
pub fn cubic_bezier(node0: &BezierNode, node1: &BezierNode, time: f64) -> f64 {
    if time <= node0.time {
        return node0.value;
    }
    if node1.time <= time {
        return node1.value;
    }

    let dt = node1.time - node0.time;
    let out = node0.out_handle.unwrap_or_default();
    let inn = node1.in_handle.unwrap_or_default();

    let x = (time - node0.time) / dt;
    let x1 = out.time / dt;
    let x2 = 1.0 + inn.time / dt;

    let q0 = node0.value;
    let q1 = node0.value + out.value;
    let q2 = node1.value + inn.value;
    let q3 = node1.value;
    let dv = q3 - q0;

    if [x1, x2, q1, q2].iter().any(|c| c.is_nan()) {
        return q0 + dv * x;
    }

    let linear = if dv != 0.0 {
        x1 == out.value / dv && x2 == 1.0 + inn.value / dv
    } else {
        out.value == 0.0 && inn.value == 0.0 && out.time == 0.0 && inn.time == 0.0
    };
    if linear {
        return q0 + dv * x;
    }

    let t = solve_param(x1, x2, x);
    cubic(t, q0, q1, q2, q3)
}

#[cfg(test)]
#[path = "../../tests/unit/bezier/solver.rs"]
mod tests;
