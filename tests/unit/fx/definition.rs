use super::*;

fn def() -> FxDefinition {
    FxDefinition::new("Test", |ctx| ctx.value)
        .param("amount", FxParamDef::float("Amount", 0.5).min(0.0).max(1.0))
        .param("count", FxParamDef::int("Count", 2).min(1.0))
        .param("on", FxParamDef::boolean("On", true))
}

#[test]
fn resolve_fills_defaults_and_drops_unknown_keys() {
    let mut raw = BTreeMap::new();
    raw.insert("junk".to_string(), FxParamValue::Float(9.0));
    let p = def().resolve_params(&raw);
    assert_eq!(p.f64("amount"), 0.5);
    assert_eq!(p.int("count"), 2);
    assert!(p.bool("on"));
    assert_eq!(p.get("junk"), None);
}

#[test]
fn resolve_clamps_and_rounds() {
    let mut raw = BTreeMap::new();
    raw.insert("amount".to_string(), FxParamValue::Float(3.0));
    raw.insert("count".to_string(), FxParamValue::Float(-4.6));
    raw.insert("on".to_string(), FxParamValue::Int(0));
    let p = def().resolve_params(&raw);
    assert_eq!(p.f64("amount"), 1.0);
    assert_eq!(p.int("count"), 1);
    assert!(!p.bool("on"));
}

#[test]
fn resolve_nan_uses_default() {
    let mut raw = BTreeMap::new();
    raw.insert("amount".to_string(), FxParamValue::Float(f64::NAN));
    assert_eq!(def().resolve_params(&raw).f64("amount"), 0.5);
}

#[test]
fn param_values_parse_from_json_scalars() {
    let v: BTreeMap<String, FxParamValue> =
        serde_json::from_str(r#"{"a": 1, "b": 2.5, "c": true}"#).unwrap();
    assert_eq!(v["a"], FxParamValue::Int(1));
    assert_eq!(v["b"], FxParamValue::Float(2.5));
    assert_eq!(v["c"], FxParamValue::Boolean(true));
}

#[test]
fn state_slot_is_typed() {
    let mut s = FxState::default();
    assert!(s.get_mut::<u32>().is_none());
    *s.get_or_init(|| 1u32) += 1;
    assert_eq!(*s.get_or_init(|| 100u32), 2);
    assert_eq!(*s.get_or_init(|| 7i64), 7);
}
