use super::*;
use crate::curve::node::BezierHandle;
use approx::assert_abs_diff_eq;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn options() -> AutomatonOptions {
    AutomatonOptions {
        length: 2.0,
        resolution: 100.0,
        ..AutomatonOptions::default()
    }
}

/// Automaton with one curve ramping from 0 to 1 over the whole timeline.
fn with_ramp() -> (Automaton, CurveId) {
    let mut a = Automaton::new(options()).unwrap();
    let c = a.create_curve().unwrap();
    let last = a.curve(c).unwrap().nodes()[1].id;
    a.curve_mut(c).unwrap().set_node_value(last, 1.0).unwrap();
    (a, c)
}

#[test]
fn rejects_bad_options() {
    let bad_length = AutomatonOptions {
        length: 0.0,
        ..options()
    };
    assert!(Automaton::new(bad_length).is_err());
    let no_rows = AutomatonOptions {
        max_fx_rows: 0,
        ..options()
    };
    assert!(Automaton::new(no_rows).is_err());
}

#[test]
fn auto_creates_channels_lazily() {
    let mut a = Automaton::new(options()).unwrap();
    assert_eq!(a.auto("missing"), 0.0);
    let channel = a.channel("missing").unwrap();
    assert!(channel.is_used());
    assert!(channel.items().is_empty());
}

#[test]
fn update_reads_only_used_channels() {
    let mut a = Automaton::new(options()).unwrap();
    a.create_channel("read").unwrap();
    a.create_channel("ignored").unwrap();
    a.create_constant_item("read", 0.0, 1.0, 3.0).unwrap();
    a.create_constant_item("ignored", 0.0, 1.0, 5.0).unwrap();

    a.update(0.5);
    assert_eq!(a.channel("read").unwrap().last_value(), 0.0);
    assert_eq!(a.auto("read"), 3.0);
    a.update(1.5);
    assert_eq!(a.auto("read"), 3.0);
    assert_eq!(a.channel("ignored").unwrap().last_value(), 0.0);
    assert_eq!(a.channel_value("ignored", 0.5), Some(5.0));
    assert_eq!(a.channel_value("nope", 0.5), None);
}

#[test]
fn update_clamps_and_wraps_into_the_loop() {
    let mut a = Automaton::new(options()).unwrap();
    a.set_loop_region(Some(LoopRegion::new(0.5, 1.0).unwrap()))
        .unwrap();

    a.update(0.25);
    assert_eq!(a.time(), 0.25);
    a.update(1.25);
    assert_eq!(a.time(), 0.75);
    a.update(-1.0);
    assert_eq!(a.time(), 0.0);
    a.update(f64::NAN);
    assert_eq!(a.time(), 0.0);
    a.update(f64::INFINITY);
    assert_eq!(a.time(), 0.5);

    a.set_loop_region(None).unwrap();
    a.update(1.25);
    assert_eq!(a.time(), 1.25);
    a.update(f64::INFINITY);
    assert_eq!(a.time(), 2.0);
    a.update(f64::NEG_INFINITY);
    assert_eq!(a.time(), 0.0);
}

#[test]
fn first_auto_reads_the_current_time() {
    let data = json!({
        "version": "4.0.0",
        "length": 2.0,
        "resolution": 100.0,
        "curves": [],
        "channels": {
            "x": { "items": [{ "time": 0.0, "length": 2.0, "value": 5.0 }] }
        }
    });
    let mut a = Automaton::from_value(data, options()).unwrap();
    a.update(0.5);
    assert_eq!(a.auto("x"), 5.0);
    assert_eq!(a.auto("x"), 5.0);
}

#[test]
fn loop_region_must_lie_on_the_timeline() {
    let mut a = Automaton::new(options()).unwrap();
    let outside = LoopRegion::new(1.0, 3.0).unwrap();
    assert!(a.set_loop_region(Some(outside)).is_err());
    assert_eq!(a.loop_region(), None);
}

#[test]
fn remove_curve_is_rejected_while_referenced() {
    let (mut a, c) = with_ramp();
    a.create_channel("x").unwrap();
    let item = a.create_curve_item("x", 0.0, c).unwrap();

    assert!(a.remove_curve(c).is_err());
    assert_eq!(a.channels_using_curve(c), vec!["x"]);
    assert!(a.curve(c).is_some());

    a.channel_mut("x").unwrap().remove_item(item).unwrap();
    assert!(a.channels_using_curve(c).is_empty());
    a.remove_curve(c).unwrap();
    assert!(a.curve(c).is_none());
    assert!(a.remove_curve(c).is_err());
}

#[test]
fn curve_items_are_clipped_to_the_timeline() {
    let (mut a, c) = with_ramp();
    a.create_channel("x").unwrap();
    let id = a.create_curve_item("x", 0.5, c).unwrap();
    assert_eq!(a.channel("x").unwrap().item(id).unwrap().length, 1.5);
    assert!(a.create_curve_item("x", 0.5, CurveId(99)).is_err());
    assert!(a.create_curve_item("nope", 0.5, c).is_err());
}

#[test]
fn set_length_trims_everything_past_the_end() {
    let (mut a, c) = with_ramp();
    a.create_channel("x").unwrap();
    a.create_constant_item("x", 0.5, 1.0, 3.0).unwrap();
    a.create_constant_item("x", 1.5, 0.5, 4.0).unwrap();
    a.set_label("keep", 0.5).unwrap();
    a.set_label("drop", 1.5).unwrap();
    a.set_loop_region(Some(LoopRegion::new(0.5, 1.5).unwrap()))
        .unwrap();

    a.set_length(1.0).unwrap();

    let curve = a.curve(c).unwrap();
    assert_eq!(curve.length(), 1.0);
    assert_eq!(curve.nodes().len(), 2);
    assert_eq!(curve.nodes()[1].time, 1.0);
    assert_abs_diff_eq!(curve.nodes()[1].value, 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(curve.get_value(1.0), 0.5, epsilon = 1e-6);

    let items = a.channel("x").unwrap().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].length, 0.5);
    assert_eq!(a.labels().keys().collect::<Vec<_>>(), vec!["keep"]);
    assert_eq!(
        a.loop_region(),
        Some(LoopRegion {
            begin: 0.5,
            end: 1.0
        })
    );
}

#[test]
fn set_length_extends_curves_that_spanned_the_timeline() {
    let (mut a, c) = with_ramp();
    a.set_length(1.0).unwrap();
    a.set_length(3.0).unwrap();

    let curve = a.curve(c).unwrap();
    assert_eq!(curve.length(), 3.0);
    assert_abs_diff_eq!(curve.get_value(2.5), 0.5, epsilon = 1e-6);
}

#[test]
fn set_length_leaves_shorter_curves_alone_when_growing() {
    let mut a = Automaton::new(options()).unwrap();
    let short = CurveId(10);
    let nodes = vec![
        BezierNode::new(NodeId(0), 0.0, 0.0),
        BezierNode::new(NodeId(1), 0.5, 1.0),
    ];
    a.restore_curve(short, 0.5, nodes, Vec::new()).unwrap();

    a.set_length(3.0).unwrap();
    assert_eq!(a.curve(short).unwrap().length(), 0.5);
    a.set_length(0.25).unwrap();
    assert_eq!(a.curve(short).unwrap().length(), 0.25);

    // Fresh ids never collide with the restored one.
    let next = a.create_curve().unwrap();
    assert!(next > short);
}

#[test]
fn set_length_validates_before_touching_anything() {
    let (mut a, c) = with_ramp();
    assert!(a.set_length(f64::NAN).is_err());
    assert!(a.set_length(-1.0).is_err());
    assert_eq!(a.length(), 2.0);
    assert_eq!(a.curve(c).unwrap().length(), 2.0);
}

#[test]
fn set_resolution_resizes_every_curve() {
    let (mut a, c) = with_ramp();
    a.set_resolution(50.0).unwrap();
    assert_eq!(a.resolution(), 50.0);
    assert_eq!(a.curve(c).unwrap().values().len(), 101);
    assert!(a.set_resolution(0.0).is_err());
    assert_eq!(a.resolution(), 50.0);
}

#[test]
fn add_fx_definition_activates_pending_sections() {
    let (mut a, c) = with_ramp();
    a.curve_mut(c)
        .unwrap()
        .create_fx("lift", 0.0, 1.0, BTreeMap::new())
        .unwrap()
        .unwrap();
    assert_abs_diff_eq!(a.curve(c).unwrap().get_value(0.5), 0.25, epsilon = 1e-6);

    a.add_fx_definition("lift", FxDefinition::new("Lift", |ctx| ctx.value + 1.0));
    assert!(a.registry().contains("lift"));
    assert_abs_diff_eq!(a.curve(c).unwrap().get_value(0.5), 1.25, epsilon = 1e-6);
}

#[test]
fn channel_names_are_unique() {
    let mut a = Automaton::new(options()).unwrap();
    a.create_channel("a").unwrap();
    a.create_channel("b").unwrap();
    assert!(a.create_channel("a").is_err());
    assert!(a.create_channel("").is_err());

    assert!(a.rename_channel("a", "b").is_err());
    a.rename_channel("a", "c").unwrap();
    assert!(a.channel("a").is_none());
    assert!(a.channel("c").is_some());
    a.rename_channel("c", "c").unwrap();

    a.remove_channel("c").unwrap();
    assert!(a.remove_channel("c").is_err());
    assert_eq!(
        a.channels().map(|(name, _)| name).collect::<Vec<_>>(),
        vec!["b"]
    );
}

#[test]
fn labels_must_lie_on_the_timeline() {
    let mut a = Automaton::new(options()).unwrap();
    a.set_label("intro", 0.0).unwrap();
    a.set_label("intro", 1.0).unwrap();
    assert!(a.set_label("late", 2.5).is_err());
    assert_eq!(a.labels().get("intro"), Some(&1.0));
    assert_eq!(a.delete_label("intro"), Some(1.0));
    assert_eq!(a.delete_label("intro"), None);
}

#[test]
fn emits_events() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut a = Automaton::new(options()).unwrap();
    let sink = Rc::clone(&seen);
    a.on(move |e| sink.borrow_mut().push(e.clone()));

    let c = a.create_curve().unwrap();
    a.create_channel("x").unwrap();
    a.update(0.5);

    assert_eq!(
        *seen.borrow(),
        vec![
            AutomatonEvent::CreateCurve { id: c },
            AutomatonEvent::CreateChannel { name: "x".into() },
            AutomatonEvent::Update { time: 0.5 },
        ]
    );
}

#[test]
fn serialized_data_round_trips_exactly() {
    let (mut a, c) = with_ramp();
    let curve = a.curve_mut(c).unwrap();
    let n = curve.create_node(0.7, 0.3).unwrap();
    curve
        .set_out_handle(n, Some(BezierHandle::new(0.1, 0.05)))
        .unwrap();
    curve.create_fx("sine", 0.2, 0.5, BTreeMap::new()).unwrap();
    a.create_channel("x").unwrap();
    a.create_curve_item("x", 0.0, c).unwrap();
    a.create_channel("y").unwrap();
    a.create_constant_item("y", 0.25, 0.5, -1.5).unwrap();
    a.set_label("drop", 1.25).unwrap();
    a.set_gui_settings(json!({ "snap": true }));

    let text = a.to_json().unwrap();
    let b = Automaton::from_json(&text, options()).unwrap();
    assert_eq!(a.serialize(), b.serialize());
    assert_eq!(b.to_json().unwrap(), text);
    assert_eq!(
        a.curve(c).unwrap().values(),
        b.curve(CurveId(0)).unwrap().values()
    );
}

#[test]
fn missing_item_lengths_get_defaults() {
    let text = r#"{
        "version": "4.0.0",
        "length": 4.0,
        "resolution": 100.0,
        "curves": [
            { "length": 1.5, "nodes": [{ "time": 0.0, "value": 0.0 }, { "time": 1.5, "value": 1.0 }] }
        ],
        "channels": {
            "x": { "items": [
                { "time": 3.5, "value": 1.0 },
                { "time": 0.0, "value": 2.0 },
                { "time": 1.0, "curve": 0 }
            ] }
        }
    }"#;
    let a = Automaton::from_json(text, options()).unwrap();
    let lengths: Vec<f64> = a
        .channel("x")
        .unwrap()
        .items()
        .iter()
        .map(|i| i.length)
        .collect();
    assert_eq!(lengths, vec![1.0, 1.5, 0.5]);

    assert_eq!(a.channel_value("x", 0.5), Some(2.0));
    assert_abs_diff_eq!(a.channel_value("x", 1.75).unwrap(), 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(a.channel_value("x", 3.0).unwrap(), 1.0, epsilon = 1e-6);
    assert_eq!(a.channel_value("x", 3.75), Some(1.0));
}

#[test]
fn oversized_noise_parameters_still_load() {
    let text = r#"{ "version": "4.0.0", "length": 1.0, "resolution": 100.0,
        "curves": [{ "fxs": [{ "def": "noise", "time": 0.0, "length": 1.0,
            "params": { "reso": 1e300, "freq": 1e300 } }] }],
        "channels": {} }"#;
    let a = Automaton::from_json(text, options()).unwrap();
    let curve = a.curve(CurveId(0)).unwrap();
    assert!(curve.values().iter().all(|v| v.is_finite()));
}

#[test]
fn dangling_curve_reference_is_a_serde_error() {
    let text = r#"{ "version": "4.0.0", "length": 1.0, "curves": [],
        "channels": { "x": { "items": [{ "time": 0.0, "curve": 3 }] } } }"#;
    let err = Automaton::from_json(text, options()).unwrap_err();
    assert!(matches!(err, CurvefxError::Serde(_)));
}

#[test]
fn legacy_data_loads_through_the_upgrade() {
    let text = r#"{ "length": 2.0, "channels": {
        "p": { "nodes": [{ "time": 0.0, "value": 1.0 }, { "time": 2.0, "value": 1.0 }] }
    } }"#;
    let a = Automaton::from_json(text, options()).unwrap();
    assert_eq!(a.curves().len(), 1);
    assert_abs_diff_eq!(a.channel_value("p", 1.0).unwrap(), 1.0, epsilon = 1e-6);
}

#[test]
fn unreadable_data_falls_back_to_default() {
    let a = Automaton::from_json_or_default("{ not json", options());
    assert_eq!(a.length(), DEFAULT_LENGTH);
    assert!(a.curves().is_empty());

    assert!(Automaton::from_json("[1, 2]", options()).is_err());
    let err = Automaton::from_path("/nonexistent/curvefx.json", options()).unwrap_err();
    assert!(matches!(err, CurvefxError::Validation(_)));
}
