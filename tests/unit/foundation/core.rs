use super::*;

#[test]
fn id_gen_never_reuses_reserved_ids() {
    let mut ids = IdGen::default();
    assert_eq!(ids.issue(), 0);
    ids.reserve(10);
    assert_eq!(ids.issue(), 11);
    ids.reserve(3);
    assert_eq!(ids.issue(), 12);
}

#[test]
fn loop_region_validates_bounds() {
    assert!(LoopRegion::new(1.0, 1.0).is_err());
    assert!(LoopRegion::new(f64::NAN, 1.0).is_err());
    assert!(LoopRegion::new(0.5, 1.0).is_ok());
}

#[test]
fn loop_region_wraps_only_past_end() {
    let r = LoopRegion::new(1.0, 2.0).unwrap();
    assert_eq!(r.wrap(0.5), 0.5);
    assert_eq!(r.wrap(1.5), 1.5);
    assert_eq!(r.wrap(2.0), 1.0);
    assert_eq!(r.wrap(3.25), 1.25);
}

#[test]
fn ids_display_with_kind() {
    assert_eq!(NodeId(3).to_string(), "NodeId#3");
}
