use super::*;
use crate::curve::curve::{Curve, CurveConfig, DEFAULT_MAX_FX_ROWS};
use crate::fx::registry::FxRegistry;
use approx::assert_abs_diff_eq;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// A set holding one linear ramp from (0, 0) to (1, 1).
fn ramp_set() -> (CurveSet, CurveId) {
    let config = CurveConfig {
        resolution: 100.0,
        max_fx_rows: DEFAULT_MAX_FX_ROWS,
        registry: Arc::new(FxRegistry::new()),
    };
    let mut curve = Curve::new(CurveId(7), 1.0, &config).unwrap();
    let last = curve.nodes()[1].id;
    curve.set_node_value(last, 1.0).unwrap();
    let mut set = CurveSet::new();
    set.insert(curve);
    (set, CurveId(7))
}

#[test]
fn three_item_scenario() {
    let (curves, a) = ramp_set();
    let mut channel = Channel::new(3.0).unwrap();
    channel.create_constant_item(0.0, 1.0, 0.0).unwrap();
    channel.create_curve_item(1.0, 1.0, a).unwrap();
    channel.create_constant_item(2.0, 1.0, 1.0).unwrap();

    assert_eq!(channel.get_value(0.5, &curves), 0.0);
    assert_abs_diff_eq!(
        channel.get_value(1.5, &curves),
        curves.get(a).unwrap().get_value(0.5)
    );
    assert_abs_diff_eq!(channel.get_value(1.5, &curves), 0.5, epsilon = 1e-6);
    assert_eq!(channel.get_value(2.5, &curves), 1.0);
    assert_eq!(channel.length(), 3.0);
}

#[test]
fn gaps_hold_the_previous_item() {
    let (curves, _) = ramp_set();
    let mut channel = Channel::new(5.0).unwrap();
    channel.create_constant_item(1.0, 1.0, 5.0).unwrap();
    assert_eq!(channel.get_value(0.5, &curves), 0.0);
    assert_eq!(channel.get_value(1.0, &curves), 5.0);
    assert_eq!(channel.get_value(4.0, &curves), 5.0);
}

#[test]
fn curve_items_apply_their_transform() {
    let (curves, a) = ramp_set();
    let mut channel = Channel::new(3.0).unwrap();
    let id = channel.create_curve_item(1.0, 1.0, a).unwrap();
    channel.set_item_transform(id, 2.0, 0.1, 3.0).unwrap();

    assert_abs_diff_eq!(channel.get_value(1.2, &curves), 1.5, epsilon = 1e-5);
    // Past the item end the terminal value holds; the curve itself clamps at 1.
    assert_abs_diff_eq!(channel.get_value(2.5, &curves), 3.0, epsilon = 1e-6);
}

#[test]
fn missing_curve_reads_zero() {
    let (curves, _) = ramp_set();
    let mut channel = Channel::new(1.0).unwrap();
    channel.create_curve_item(0.0, 1.0, CurveId(99)).unwrap();
    assert_eq!(channel.get_value(0.5, &curves), 0.0);
    assert!(channel.uses_curve(CurveId(99)));
    assert!(!channel.uses_curve(CurveId(7)));
}

#[test]
fn items_never_overlap() {
    let mut channel = Channel::new(3.0).unwrap();
    channel.create_constant_item(1.0, 1.0, 0.0).unwrap();
    assert!(channel.create_constant_item(0.5, 1.0, 0.0).is_err());
    assert!(channel.create_constant_item(1.5, 0.2, 0.0).is_err());
    assert!(channel.create_constant_item(2.5, 1.0, 0.0).is_err());
    assert!(channel.create_constant_item(0.0, 0.0, 0.0).is_err());
    assert!(channel.create_constant_item(0.0, 1.0, f64::NAN).is_err());
    channel.create_constant_item(0.0, 1.0, 0.0).unwrap();
    channel.create_constant_item(2.0, 1.0, 0.0).unwrap();
    let times: Vec<f64> = channel.items().iter().map(|i| i.time).collect();
    assert_eq!(times, vec![0.0, 1.0, 2.0]);
}

#[test]
fn move_and_resize_are_clamped() {
    let mut channel = Channel::new(4.0).unwrap();
    let a = channel.create_constant_item(0.0, 1.0, 0.0).unwrap();
    let b = channel.create_constant_item(2.0, 1.0, 0.0).unwrap();

    assert_eq!(channel.move_item(b, 0.5).unwrap(), 1.0);
    assert_eq!(channel.move_item(b, 3.5).unwrap(), 3.0);
    assert_eq!(channel.resize_item(a, 10.0).unwrap(), 3.0);
    assert_eq!(channel.resize_item(b, 10.0).unwrap(), 1.0);
    assert!(channel.move_item(ItemId(42), 0.0).is_err());
}

#[test]
fn kind_specific_setters_check_the_kind() {
    let mut channel = Channel::new(2.0).unwrap();
    let constant = channel.create_constant_item(0.0, 1.0, 0.0).unwrap();
    let curve = channel.create_curve_item(1.0, 1.0, CurveId(0)).unwrap();

    assert!(channel.set_item_value(curve, 1.0).is_err());
    assert!(channel.set_item_transform(constant, 1.0, 0.0, 1.0).is_err());
    channel.set_item_value(constant, 4.0).unwrap();
    assert_eq!(
        channel.item(constant).unwrap().kind,
        ItemKind::Constant { value: 4.0 }
    );
    channel.set_item_reset(curve, true).unwrap();
    assert!(channel.item(curve).unwrap().reset);
}

#[test]
fn remove_then_restore_item() {
    let mut channel = Channel::new(2.0).unwrap();
    let id = channel.create_constant_item(0.5, 1.0, 2.0).unwrap();
    let item = channel.remove_item(id).unwrap();
    assert!(channel.items().is_empty());
    channel.restore_item(item).unwrap();
    assert_eq!(channel.item(id), Some(&item));
    assert!(channel.restore_item(item).is_err());
    let next = channel.create_constant_item(1.5, 0.5, 0.0).unwrap();
    assert_ne!(next, id);
}

#[test]
fn trim_drops_and_clips_items() {
    let mut channel = Channel::new(4.0).unwrap();
    channel.create_constant_item(0.0, 2.0, 0.0).unwrap();
    channel.create_constant_item(3.0, 1.0, 0.0).unwrap();
    channel.trim(1.5).unwrap();
    assert_eq!(channel.items().len(), 1);
    assert_eq!(channel.items()[0].length, 1.5);
    assert_eq!(channel.limit(), 1.5);
    assert!(channel.trim(-1.0).is_err());
}

#[test]
fn starts_not_used() {
    let mut channel = Channel::new(1.0).unwrap();
    assert!(!channel.is_used());
    assert!(channel.statuses().has(StatusCode::NotUsed));
    assert!(channel.mark_used());
    assert!(!channel.mark_used());
    assert!(channel.is_used());
}

#[test]
fn update_reports_item_crossings() {
    let (curves, _) = ramp_set();
    let mut channel = Channel::new(3.0).unwrap();
    let a = channel.create_constant_item(0.0, 1.0, 1.0).unwrap();
    let b = channel.create_constant_item(2.0, 1.0, 2.0).unwrap();
    channel.set_item_reset(b, true).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    channel.on(move |e| {
        if !matches!(e, ChannelEvent::Update { .. }) {
            sink.borrow_mut().push(e.clone());
        }
    });

    assert_eq!(channel.update(0.5, &curves), 1.0);
    channel.update(0.7, &curves);
    assert_eq!(channel.update(1.5, &curves), 1.0);
    channel.update(2.5, &curves);
    channel.update(2.2, &curves);

    assert_eq!(
        *seen.borrow(),
        vec![
            ChannelEvent::ItemEnter { id: a, reset: false },
            ChannelEvent::ItemLeave { id: a },
            ChannelEvent::ItemEnter { id: b, reset: true },
            ChannelEvent::ItemLeave { id: b },
            ChannelEvent::ItemEnter { id: b, reset: true },
        ]
    );
    assert_eq!(channel.last_time(), 2.2);
    assert_eq!(channel.last_value(), 2.0);
}
