use super::*;
use crate::foundation::core::FxId;
use crate::foundation::math::Xorshift32;
use std::collections::BTreeMap;

fn fx(time: f64, length: f64, row: usize) -> FxSection {
    FxSection {
        id: FxId(0),
        def: "add".to_string(),
        time,
        length,
        row,
        bypass: false,
        params: BTreeMap::new(),
    }
}

#[test]
fn overlap_is_symmetric() {
    let cases = [
        (0.0, 1.0, 0.5, 1.0),
        (0.0, 1.0, 1.0, 1.0),
        (0.0, 3.0, 1.0, 0.5),
        (2.0, 0.5, 0.0, 1.0),
        (0.0, 1.0, 0.0, 1.0),
        (0.25, 0.1, 0.0, 0.3),
    ];
    for (t1, l1, t2, l2) in cases {
        assert_eq!(has_overwrap(t1, l1, t2, l2), has_overwrap(t2, l2, t1, l1));
    }
}

#[test]
fn touching_is_not_overlapping() {
    for l in [0.1, 1.0, 5.0] {
        assert!(!has_overwrap(0.5, 1.0, 1.5, l));
        assert!(!has_overwrap(1.5, l, 0.5, 1.0));
    }
}

#[test]
fn identical_and_contained_intervals_overlap() {
    assert!(has_overwrap(0.0, 1.0, 0.0, 1.0));
    assert!(has_overwrap(0.0, 1.0, 0.25, 0.5));
    assert!(has_overwrap(0.0, 1.0, 0.0, 0.5));
}

#[test]
fn free_row_skips_occupied_rows() {
    let fxs = vec![fx(0.0, 1.0, 0), fx(0.5, 1.0, 1), fx(2.0, 1.0, 2)];
    assert_eq!(free_row(&fxs, 0.2, 0.5, 0), 2);
    assert_eq!(free_row(&fxs, 1.0, 0.2, 0), 0);
    assert_eq!(free_row(&fxs, 0.2, 0.5, 2), 2);
    assert_eq!(free_row(&fxs, 2.5, 0.1, 2), 3);
}

#[test]
fn free_row_never_returns_overlapping_row() {
    let mut rng = Xorshift32::new(99);
    let mut fxs: Vec<FxSection> = Vec::new();
    for _ in 0..300 {
        let time = (rng.next_f64() * 10.0).floor() / 4.0;
        let length = 0.25 + (rng.next_f64() * 8.0).floor() / 4.0;
        let min_row = (rng.next_f64() * 3.0) as usize;
        let row = free_row(&fxs, time, length, min_row);
        assert!(row >= min_row);
        assert!(
            fxs.iter()
                .filter(|f| f.row == row)
                .all(|f| !has_overwrap(time, length, f.time, f.length))
        );
        fxs.push(fx(time, length, row));
    }
}
