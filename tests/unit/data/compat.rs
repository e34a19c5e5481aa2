use super::*;

#[test]
fn null_becomes_default_data() {
    let data = upgrade(Value::Null).unwrap();
    assert_eq!(data["version"], json!(DATA_VERSION));
    assert_eq!(data["length"], json!(1.0));
    assert_eq!(data["resolution"], json!(1000.0));
    assert_eq!(data["curves"], json!([]));
}

#[test]
fn non_objects_are_rejected() {
    assert!(matches!(
        upgrade(json!([1, 2])),
        Err(CurvefxError::Serde(_))
    ));
    assert!(upgrade(json!("automaton")).is_err());
}

#[test]
fn current_data_is_unchanged() {
    let data = json!({
        "version": "4.0.0",
        "resolution": 100.0,
        "length": 2.0,
        "curves": [{ "nodes": [{ "time": 0.0, "value": 1.0 }], "fxs": [] }],
        "channels": { "a": { "items": [{ "curve": 0 }] } },
        "labels": { "drop": 1.5 },
        "guiSettings": { "snapTime": true },
    });
    assert_eq!(upgrade(data.clone()).unwrap(), data);
}

#[test]
fn legacy_channels_become_curves() {
    let data = json!({
        "v": "3.0.0",
        "length": 2.0,
        "resolution": 100,
        "params": {
            "b": { "nodes": [{ "time": 0.0, "value": 0.0 }, { "time": 2.0, "value": 1.0 }], "fxs": [] },
            "a": {
                "nodes": [
                    { "time": 0.0, "value": 1.0, "out": { "time": 0.5, "value": 0.0 } },
                    { "time": 1.0, "value": 0.0, "in": { "time": 0.25, "value": 0.0 } },
                ],
                "fxs": [{ "def": "add", "time": 0.0, "length": 0.5, "params": { "value": 1.0 } }],
            },
        },
    });
    let up = upgrade(data).unwrap();

    assert_eq!(up["version"], json!(DATA_VERSION));
    assert!(up.get("v").is_none());
    assert!(up.get("params").is_none());
    assert_eq!(up["resolution"], json!(100));
    assert_eq!(up["curves"].as_array().unwrap().len(), 2);
    // Channels are visited in name order.
    assert_eq!(up["channels"]["a"]["items"][0]["curve"], json!(0));
    assert_eq!(up["channels"]["b"]["items"][0]["curve"], json!(1));
    assert_eq!(up["channels"]["a"]["items"][0]["length"], json!(2.0));
    assert_eq!(up["curves"][0]["length"], json!(2.0));
    assert_eq!(up["curves"][0]["nodes"][1]["in"]["time"], json!(-0.25));
    assert_eq!(up["curves"][0]["nodes"][0]["out"]["time"], json!(0.5));
    assert_eq!(up["curves"][0]["fxs"][0]["def"], json!("add"));
}

#[test]
fn upgrade_is_idempotent() {
    let data = json!({
        "channels": {
            "x": { "nodes": [{ "time": 0.0, "value": 0.0 }, { "time": 3.0, "value": 1.0 }] },
        },
    });
    let once = upgrade(data).unwrap();
    let twice = upgrade(once.clone()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once["length"], json!(3.0));
}

#[test]
fn missing_length_is_derived() {
    let data = json!({
        "version": "4.0.0",
        "curves": [{ "nodes": [{ "time": 0.0 }, { "time": 1.5 }] }],
        "channels": { "a": { "items": [{ "time": 2.0, "length": 0.5 }] } },
    });
    assert_eq!(upgrade(data).unwrap()["length"], json!(2.5));

    let empty = json!({ "version": "4.0.0", "curves": [] });
    assert_eq!(upgrade(empty).unwrap()["length"], json!(DEFAULT_LENGTH));
}

#[test]
fn versions_are_parsed_loosely() {
    let obj = |v: Value| {
        let mut m = Map::new();
        m.insert("version".into(), v);
        m
    };
    assert_eq!(major_version(&obj(json!("3.2.1"))), Some(3));
    assert_eq!(major_version(&obj(json!("v4.0.0"))), Some(4));
    assert_eq!(major_version(&obj(json!(2))), Some(2));
    assert_eq!(major_version(&obj(json!(true))), None);
}
