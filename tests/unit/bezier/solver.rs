use super::*;
use crate::curve::node::BezierHandle;
use crate::foundation::core::NodeId;
use approx::assert_abs_diff_eq;

fn node(time: f64, value: f64, in_h: Option<(f64, f64)>, out_h: Option<(f64, f64)>) -> BezierNode {
    BezierNode {
        id: NodeId(0),
        time,
        value,
        in_handle: in_h.map(|(t, v)| BezierHandle::new(t, v)),
        out_handle: out_h.map(|(t, v)| BezierHandle::new(t, v)),
    }
}

#[test]
fn raw_linear_control_points_return_x() {
    for x in [0.0, 0.125, 0.5, 0.9, 1.0] {
        assert_eq!(raw_cubic_bezier(0.25, 0.25, 0.75, 0.75, x), x);
    }
}

#[test]
fn raw_clamps_query() {
    assert_eq!(raw_cubic_bezier(0.3, 0.3, 0.6, 0.6, -1.0), 0.0);
    assert_eq!(raw_cubic_bezier(0.3, 0.3, 0.6, 0.6, 2.0), 1.0);
}

#[test]
fn raw_nan_control_points_fail_soft() {
    assert_eq!(raw_cubic_bezier(f64::NAN, 0.0, 1.0, 1.0, 0.25), 0.25);
    assert_eq!(raw_cubic_bezier(0.42, 0.0, 0.58, f64::NAN, 0.75), 0.75);
}

#[test]
fn raw_inverts_time_axis() {
    // ease-in-out: y(x) must satisfy x(t) == query for the recovered t.
    let (x1, y1, x2, y2) = (0.42, 0.0, 0.58, 1.0);
    for i in 1..20 {
        let x = i as f64 / 20.0;
        let y = raw_cubic_bezier(x1, y1, x2, y2, x);
        // Brute-force reference.
        let mut best = (f64::INFINITY, 0.0);
        for j in 0..=100_000 {
            let t = j as f64 / 100_000.0;
            let err = (coord(t, x1, x2) - x).abs();
            if err < best.0 {
                best = (err, coord(t, y1, y2));
            }
        }
        assert_abs_diff_eq!(y, best.1, epsilon = 1e-4);
    }
    assert_abs_diff_eq!(raw_cubic_bezier(x1, y1, x2, y2, 0.5), 0.5, epsilon = 1e-9);
}

#[test]
fn raw_handles_flat_slope_near_ends() {
    // x1 = 0 gives zero slope at t = 0; bisection takes over.
    let y = raw_cubic_bezier(0.0, 0.5, 1.0, 0.5, 0.001);
    assert!(y.is_finite());
    assert!((0.0..=1.0).contains(&y));
}

#[test]
fn cubic_bezier_is_exact_at_boundaries() {
    let a = node(0.2, 3.0, None, Some((0.1, 5.0)));
    let b = node(0.7, -1.0, Some((-0.3, 2.0)), None);
    assert_eq!(cubic_bezier(&a, &b, 0.2), 3.0);
    assert_eq!(cubic_bezier(&a, &b, 0.7), -1.0);
    assert_eq!(cubic_bezier(&a, &b, 0.0), 3.0);
    assert_eq!(cubic_bezier(&a, &b, 1.0), -1.0);
}

#[test]
fn cubic_bezier_without_handles_is_lerp() {
    let a = node(0.0, 1.0, None, None);
    let b = node(2.0, 5.0, None, None);
    for t in [0.25, 0.5, 1.0, 1.5] {
        let x = t / 2.0;
        assert_eq!(cubic_bezier(&a, &b, t), 1.0 + 4.0 * x);
    }
}

#[test]
fn cubic_bezier_with_linear_handles_is_lerp() {
    // Handles lying on the chord are linear once normalized.
    let a = node(0.0, 0.0, None, Some((0.25, 0.5)));
    let b = node(1.0, 2.0, Some((-0.25, -0.5)), None);
    for t in [0.1, 0.3, 0.6, 0.95] {
        assert_eq!(cubic_bezier(&a, &b, t), 2.0 * t);
    }
}

#[test]
fn cubic_bezier_flat_segment_with_value_handles_bulges() {
    let a = node(0.0, 0.0, None, Some((0.3, 1.0)));
    let b = node(1.0, 0.0, Some((-0.3, 1.0)), None);
    let mid = cubic_bezier(&a, &b, 0.5);
    assert_abs_diff_eq!(mid, 0.75, epsilon = 1e-6);
}

#[test]
fn cubic_bezier_nan_handle_falls_back_to_lerp() {
    let a = node(0.0, 0.0, None, Some((f64::NAN, 0.0)));
    let b = node(1.0, 1.0, None, None);
    assert_eq!(cubic_bezier(&a, &b, 0.25), 0.25);
}
