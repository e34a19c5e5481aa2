//! JSON-facing shape of an automaton.
//!
//! Curves are addressed by position and nothing carries runtime ids. Loading goes through
//! [`crate::data::compat::upgrade`] first, so these structs only ever describe the current
//! version.

use std::collections::BTreeMap;

use crate::curve::node::BezierHandle;
use crate::fx::definition::FxParamValue;

/// Version written by this crate.
pub const DATA_VERSION: &str = "4.0.0";

/// Fallback timeline length in seconds.
pub const DEFAULT_LENGTH: f64 = 1.0;

/// Fallback samples per second.
pub const DEFAULT_RESOLUTION: f64 = 1000.0;

fn default_version() -> String {
    DATA_VERSION.to_string()
}

fn default_length() -> f64 {
    DEFAULT_LENGTH
}

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A whole automaton.
pub struct SerializedAutomaton {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_length")]
    pub length: f64,
    #[serde(default)]
    pub curves: Vec<SerializedCurve>,
    #[serde(default)]
    pub channels: BTreeMap<String, SerializedChannel>,
    #[serde(default)]
    pub labels: BTreeMap<String, f64>,
    /// Editor state, carried through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub gui_settings: serde_json::Value,
}

impl Default for SerializedAutomaton {
    fn default() -> Self {
        Self {
            version: default_version(),
            resolution: DEFAULT_RESOLUTION,
            length: DEFAULT_LENGTH,
            curves: Vec::new(),
            channels: BTreeMap::new(),
            labels: BTreeMap::new(),
            gui_settings: serde_json::Value::Null,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SerializedCurve {
    /// Curve length; the automaton length when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default)]
    pub nodes: Vec<SerializedNode>,
    #[serde(default)]
    pub fxs: Vec<SerializedFx>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SerializedNode {
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub value: f64,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub in_handle: Option<BezierHandle>,
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub out_handle: Option<BezierHandle>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SerializedFx {
    pub def: String,
    pub time: f64,
    pub length: f64,
    #[serde(default)]
    pub row: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bypass: bool,
    #[serde(default)]
    pub params: BTreeMap<String, FxParamValue>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SerializedChannel {
    #[serde(default)]
    pub items: Vec<SerializedItem>,
}

/// A channel item. `curve` set means a curve item, otherwise `value` is a constant.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SerializedItem {
    #[serde(default)]
    pub time: f64,
    /// Curve items default to the curve length, constants to the gap before the next item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reset: bool,
}
