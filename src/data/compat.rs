//! Upgrade of older automaton data to the current shape.
//!
//! Works on raw JSON so shapes that no longer deserialize can still be read. The upgrade is pure
//! and idempotent: current data only gains a derived `length` when it lacks one.

use serde_json::{Map, Value, json};

use crate::data::model::{DATA_VERSION, DEFAULT_LENGTH, DEFAULT_RESOLUTION};
use crate::foundation::error::{CurvefxError, CurvefxResult};

/// First major version that stores curves separately from channels.
const CURVES_MAJOR: u64 = 4;

/// Bring `data` to the current version.
///
/// `null` becomes the default automaton. Anything that is not an object is rejected.
#[tracing::instrument(level = "debug", skip(data))]
pub fn upgrade(data: Value) -> CurvefxResult<Value> {
    let mut obj = match data {
        Value::Null => return Ok(default_data()),
        Value::Object(obj) => obj,
        other => {
            return Err(CurvefxError::serde(format!(
                "automaton data must be a JSON object, got {}",
                kind_name(&other)
            )));
        }
    };

    let major = major_version(&obj);
    let legacy = match major {
        Some(m) => m < CURVES_MAJOR,
        None => !obj.contains_key("curves"),
    };
    if legacy {
        tracing::info!(version = ?major, "upgrading legacy automaton data");
        obj = upgrade_legacy(obj)?;
    } else if !obj.contains_key("version") {
        obj.insert("version".into(), json!(DATA_VERSION));
    }

    if !obj.get("length").is_some_and(Value::is_number) {
        let length = derive_length(&obj);
        obj.insert("length".into(), json!(length));
    }
    Ok(Value::Object(obj))
}

fn default_data() -> Value {
    json!({
        "version": DATA_VERSION,
        "resolution": DEFAULT_RESOLUTION,
        "length": DEFAULT_LENGTH,
        "curves": [],
        "channels": {},
        "labels": {},
    })
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Major component of `version` (or the older `v` key), e.g. `3` for `"3.1.0"`.
fn major_version(obj: &Map<String, Value>) -> Option<u64> {
    let raw = obj.get("version").or_else(|| obj.get("v"))?;
    match raw {
        Value::String(s) => s.trim_start_matches('v').split('.').next()?.parse().ok(),
        Value::Number(n) => n.as_f64().map(|f| f.max(0.0).floor() as u64),
        _ => None,
    }
}

/// Pre-4 data keeps nodes and fxs on each channel (`channels` or the older `params`).
///
/// Each such channel becomes one curve plus a channel holding a single curve item that spans it.
fn upgrade_legacy(mut obj: Map<String, Value>) -> CurvefxResult<Map<String, Value>> {
    let legacy_channels = obj
        .remove("channels")
        .or_else(|| obj.remove("params"))
        .unwrap_or_else(|| json!({}));
    let Value::Object(legacy_channels) = legacy_channels else {
        return Err(CurvefxError::serde("legacy channels must be a JSON object"));
    };
    let length = obj.get("length").and_then(Value::as_f64);

    let mut curves = Vec::new();
    let mut channels = Map::new();
    for (name, channel) in legacy_channels {
        let nodes: Vec<Value> = channel
            .get("nodes")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().map(upgrade_node).collect())
            .unwrap_or_default();
        let fxs = channel.get("fxs").cloned().unwrap_or_else(|| json!([]));
        let curve_length = nodes
            .iter()
            .filter_map(|n| n.get("time").and_then(Value::as_f64))
            .fold(0.0_f64, f64::max);

        let index = curves.len();
        let span = length.unwrap_or(curve_length);
        let mut item = json!({ "time": 0.0, "curve": index });
        if span > 0.0 {
            item["length"] = json!(span);
        }
        let mut curve = json!({ "nodes": nodes, "fxs": fxs });
        if let Some(length) = length {
            curve["length"] = json!(length);
        }
        curves.push(curve);
        channels.insert(name, json!({ "items": [item] }));
    }

    obj.remove("v");
    obj.insert("version".into(), json!(DATA_VERSION));
    obj.entry("resolution")
        .or_insert_with(|| json!(DEFAULT_RESOLUTION));
    obj.insert("curves".into(), Value::Array(curves));
    obj.insert("channels".into(), Value::Object(channels));
    obj.entry("labels").or_insert_with(|| json!({}));
    Ok(obj)
}

/// Older data stored in-handle times as positive distances.
fn upgrade_node(node: &Value) -> Value {
    let mut node = node.clone();
    for (key, sign) in [("in", -1.0), ("out", 1.0)] {
        if let Some(t) = node.get(key).and_then(|h| h.get("time")).and_then(Value::as_f64) {
            node[key]["time"] = json!(sign * t.abs());
        }
    }
    node
}

/// Longest extent over curves (explicit length or last node) and channel items.
fn derive_length(obj: &Map<String, Value>) -> f64 {
    let curve_ends = obj
        .get("curves")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|curve| {
            curve.get("length").and_then(Value::as_f64).unwrap_or_else(|| {
                curve
                    .get("nodes")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|n| n.get("time").and_then(Value::as_f64))
                    .fold(0.0, f64::max)
            })
        });
    let item_ends = obj
        .get("channels")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|channels| channels.values())
        .filter_map(|channel| channel.get("items").and_then(Value::as_array))
        .flatten()
        .map(|item| {
            let time = item.get("time").and_then(Value::as_f64).unwrap_or(0.0);
            time + item.get("length").and_then(Value::as_f64).unwrap_or(0.0)
        });

    let length = curve_ends.chain(item_ends).fold(0.0, f64::max);
    if length > 0.0 && length.is_finite() {
        length
    } else {
        DEFAULT_LENGTH
    }
}

#[cfg(test)]
#[path = "../../tests/unit/data/compat.rs"]
mod tests;
