//! curvefx is a keyframe animation engine: bezier curves with stacked fx, sequenced into named
//! channels that a host reads every frame.
//!
//! # Data flow
//!
//! 1. **Author**: nodes and fx sections are edited on a [`Curve`], items on a [`Channel`].
//! 2. **Precalc**: every edit rebuilds the curve's sample buffer (node pass, then fx pass in time
//!    order, then NaN containment).
//! 3. **Play**: [`Automaton::update`] advances time and each used channel samples its active item.
//! 4. **Persist**: [`Automaton::serialize`] and [`Automaton::from_json`] speak the versioned JSON
//!    format; older data goes through [`upgrade`] first.
//!
//! [`AutomatonEditor`] wraps an automaton with an undo/redo [`HistoryStack`].
//!
//! Everything is single-threaded and synchronous. `unsafe` is forbidden in this crate.
#![forbid(unsafe_code)]

mod automaton;
mod bezier;
mod channel;
mod curve;
mod data;
mod foundation;
mod fx;
mod history;

pub use automaton::automaton::{Automaton, AutomatonEvent, AutomatonOptions};
pub use automaton::editor::AutomatonEditor;
pub use bezier::solver::{cubic_bezier, raw_cubic_bezier};
pub use channel::channel::{Channel, ChannelEvent};
pub use channel::item::{ChannelItem, ItemKind};
pub use curve::curve::{Curve, CurveConfig, CurveEvent, DEFAULT_MAX_FX_ROWS, sample_count};
pub use curve::fx_section::FxSection;
pub use curve::node::{BezierHandle, BezierNode};
pub use curve::overlap::{free_row, has_overwrap};
pub use curve::set::CurveSet;
pub use data::compat::upgrade;
pub use data::model::{
    DATA_VERSION, DEFAULT_LENGTH, DEFAULT_RESOLUTION, SerializedAutomaton, SerializedChannel,
    SerializedCurve, SerializedFx, SerializedItem, SerializedNode,
};
pub use foundation::core::{CurveId, FxId, ItemId, LoopRegion, NodeId};
pub use foundation::error::{CurvefxError, CurvefxResult};
pub use foundation::events::{ListenerId, Observers};
pub use foundation::math::Xorshift32;
pub use foundation::status::{Status, StatusCode, StatusLevel, Statuses};
pub use fx::builtin;
pub use fx::definition::{
    FxContext, FxDefinition, FxFunc, FxParamDef, FxParamKind, FxParamValue, FxParams, FxState,
};
pub use fx::registry::FxRegistry;
pub use history::stack::{HistoryEntry, HistoryFn, HistoryStack};
