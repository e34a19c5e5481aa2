//! The aggregate root: curves, channels, labels, loop region and the playback time.
//!
//! `Automaton` has no knowledge of history; [`crate::AutomatonEditor`] wraps it for that.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::channel::channel::Channel;
use crate::channel::item::{ChannelItem, ItemKind};
use crate::curve::curve::{Curve, CurveConfig, DEFAULT_MAX_FX_ROWS};
use crate::curve::fx_section::FxSection;
use crate::curve::node::BezierNode;
use crate::curve::set::CurveSet;
use crate::data::compat::upgrade;
use crate::data::model::{
    DATA_VERSION, DEFAULT_LENGTH, DEFAULT_RESOLUTION, SerializedAutomaton, SerializedChannel,
    SerializedCurve, SerializedFx, SerializedItem, SerializedNode,
};
use crate::foundation::core::{
    CurveId, FxId, IdGen, ItemId, LoopRegion, NodeId, ensure_finite, ensure_positive,
};
use crate::foundation::error::{CurvefxError, CurvefxResult};
use crate::foundation::events::{ListenerId, Observers};
use crate::fx::definition::FxDefinition;
use crate::fx::registry::FxRegistry;

/// Construction settings for an [`Automaton`].
#[derive(Clone, Debug)]
pub struct AutomatonOptions {
    /// Timeline length used when no data is loaded.
    pub length: f64,
    /// Samples per second used when no data is loaded.
    pub resolution: f64,
    /// Fx rows available on every curve.
    pub max_fx_rows: usize,
    /// Fx definitions available to precalc.
    pub registry: FxRegistry,
}

impl Default for AutomatonOptions {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            resolution: DEFAULT_RESOLUTION,
            max_fx_rows: DEFAULT_MAX_FX_ROWS,
            registry: FxRegistry::with_builtins(),
        }
    }
}

/// Events emitted by an [`Automaton`].
#[derive(Clone, Debug, PartialEq)]
pub enum AutomatonEvent {
    /// Playback time advanced (after loop wrapping).
    Update { time: f64 },
    CreateCurve { id: CurveId },
    RemoveCurve { id: CurveId },
    CreateChannel { name: String },
    RemoveChannel { name: String },
    RenameChannel { from: String, to: String },
    ChangeLength { length: f64 },
    ChangeResolution { resolution: f64 },
    AddFxDefinition { key: String },
    UpdateLabel { name: String, time: Option<f64> },
    ChangeLoopRegion { region: Option<LoopRegion> },
}

/// Curves plus named channels over a bounded timeline.
#[derive(Debug)]
pub struct Automaton {
    length: f64,
    resolution: f64,
    max_fx_rows: usize,
    registry: Arc<FxRegistry>,
    curves: CurveSet,
    curve_ids: IdGen,
    channels: BTreeMap<String, Channel>,
    labels: BTreeMap<String, f64>,
    loop_region: Option<LoopRegion>,
    time: f64,
    gui_settings: serde_json::Value,
    observers: Observers<AutomatonEvent>,
}

impl Automaton {
    /// Empty automaton with the option's length and resolution.
    pub fn new(options: AutomatonOptions) -> CurvefxResult<Self> {
        ensure_positive("length", options.length)?;
        ensure_positive("resolution", options.resolution)?;
        if options.max_fx_rows == 0 {
            return Err(CurvefxError::validation("max fx rows must be > 0"));
        }
        Ok(Self::from_checked(options))
    }

    fn from_checked(options: AutomatonOptions) -> Self {
        Self {
            length: options.length,
            resolution: options.resolution,
            max_fx_rows: options.max_fx_rows,
            registry: Arc::new(options.registry),
            curves: CurveSet::new(),
            curve_ids: IdGen::default(),
            channels: BTreeMap::new(),
            labels: BTreeMap::new(),
            loop_region: None,
            time: 0.0,
            gui_settings: serde_json::Value::Null,
            observers: Observers::default(),
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn max_fx_rows(&self) -> usize {
        self.max_fx_rows
    }

    /// Current playback time.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn registry(&self) -> &FxRegistry {
        &self.registry
    }

    pub fn curves(&self) -> &CurveSet {
        &self.curves
    }

    pub fn curve(&self, id: CurveId) -> Option<&Curve> {
        self.curves.get(id)
    }

    pub fn curve_mut(&mut self, id: CurveId) -> Option<&mut Curve> {
        self.curves.get_mut(id)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.channels.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(name)
    }

    pub fn labels(&self) -> &BTreeMap<String, f64> {
        &self.labels
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    /// Opaque editor settings carried through serialization.
    pub fn gui_settings(&self) -> &serde_json::Value {
        &self.gui_settings
    }

    pub fn set_gui_settings(&mut self, settings: serde_json::Value) {
        self.gui_settings = settings;
    }

    pub fn on(&mut self, listener: impl FnMut(&AutomatonEvent) + 'static) -> ListenerId {
        self.observers.on(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.observers.off(id)
    }

    pub(crate) fn curve_or_err(&mut self, id: CurveId) -> CurvefxResult<&mut Curve> {
        self.curves
            .get_mut(id)
            .ok_or_else(|| CurvefxError::validation(format!("unknown {id}")))
    }

    pub(crate) fn channel_or_err(&mut self, name: &str) -> CurvefxResult<&mut Channel> {
        self.channels
            .get_mut(name)
            .ok_or_else(|| CurvefxError::validation(format!("unknown channel '{name}'")))
    }

    fn curve_config(&self) -> CurveConfig {
        CurveConfig {
            resolution: self.resolution,
            max_fx_rows: self.max_fx_rows,
            registry: Arc::clone(&self.registry),
        }
    }

    // Playback

    /// Advance playback to `time` and read every used channel.
    ///
    /// Negative and NaN times clamp to 0, infinite times to the timeline end. With a loop region,
    /// times at or past its end wrap back into it.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn update(&mut self, time: f64) {
        let time = if time.is_nan() { 0.0 } else { time.max(0.0) };
        let time = if time.is_finite() { time } else { self.length };
        let time = self.loop_region.map_or(time, |region| region.wrap(time));
        self.time = time;

        for channel in self.channels.values_mut().filter(|c| c.is_used()) {
            channel.update(time, &self.curves);
        }
        self.observers.emit(&AutomatonEvent::Update { time });
    }

    /// Value of channel `name` at `time`, or `None` when there is no such channel.
    pub fn channel_value(&self, name: &str, time: f64) -> Option<f64> {
        self.channels
            .get(name)
            .map(|c| c.get_value(time, &self.curves))
    }

    /// Host accessor: the last value of channel `name`.
    ///
    /// Unknown names materialize an empty channel. Either way the channel is marked used, so
    /// later [`Automaton::update`] calls keep it current.
    pub fn auto(&mut self, name: &str) -> f64 {
        if !self.channels.contains_key(name) {
            self.insert_channel(name.to_string(), Channel::with_limit(self.length));
        }
        match self.channels.get_mut(name) {
            Some(channel) => {
                // First read: the channel was skipped by every earlier update.
                if channel.mark_used() {
                    channel.update(self.time, &self.curves);
                }
                channel.last_value()
            }
            None => 0.0,
        }
    }

    // Curves

    /// New flat curve spanning the timeline.
    pub fn create_curve(&mut self) -> CurvefxResult<CurveId> {
        let id = CurveId(self.curve_ids.issue());
        let curve = Curve::new(id, self.length, &self.curve_config())?;
        self.curves.insert(curve);
        self.observers.emit(&AutomatonEvent::CreateCurve { id });
        Ok(id)
    }

    /// Re-create a curve under a known id from a snapshot of its nodes and sections.
    pub(crate) fn restore_curve(
        &mut self,
        id: CurveId,
        length: f64,
        nodes: Vec<BezierNode>,
        fxs: Vec<FxSection>,
    ) -> CurvefxResult<()> {
        if self.curves.contains(id) {
            return Err(CurvefxError::validation(format!("{id} already exists")));
        }
        let mut curve = Curve::new(id, length, &self.curve_config())?;
        curve.replace_nodes(nodes)?;
        curve.replace_fxs(fxs)?;
        self.curve_ids.reserve(id.0);
        self.curves.insert(curve);
        self.observers.emit(&AutomatonEvent::CreateCurve { id });
        Ok(())
    }

    /// Remove a curve. Rejected while any channel item references it.
    pub fn remove_curve(&mut self, id: CurveId) -> CurvefxResult<()> {
        if !self.curves.contains(id) {
            return Err(CurvefxError::validation(format!("unknown {id}")));
        }
        if let Some(name) = self.channels_using_curve(id).first() {
            return Err(CurvefxError::validation(format!(
                "{id} is still used by channel '{name}'"
            )));
        }
        self.curves.remove(id);
        self.observers.emit(&AutomatonEvent::RemoveCurve { id });
        Ok(())
    }

    /// Names of channels with at least one item referencing `id`.
    pub fn channels_using_curve(&self, id: CurveId) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|(_, c)| c.uses_curve(id))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Recompute every curve buffer.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn precalc_all(&mut self) {
        for curve in self.curves.iter_mut() {
            curve.precalc();
        }
    }

    /// Register an fx definition and precalc every curve so sections using it go live.
    pub fn add_fx_definition(&mut self, key: impl Into<String>, def: FxDefinition) {
        let key = key.into();
        Arc::make_mut(&mut self.registry).insert(key.clone(), def);
        for curve in self.curves.iter_mut() {
            curve.set_registry(Arc::clone(&self.registry));
            curve.precalc();
        }
        tracing::debug!(%key, "registered fx definition");
        self.observers.emit(&AutomatonEvent::AddFxDefinition { key });
    }

    // Channels

    pub fn create_channel(&mut self, name: &str) -> CurvefxResult<()> {
        check_channel_name(name)?;
        if self.channels.contains_key(name) {
            return Err(CurvefxError::validation(format!(
                "channel '{name}' already exists"
            )));
        }
        self.insert_channel(name.to_string(), Channel::with_limit(self.length));
        Ok(())
    }

    fn insert_channel(&mut self, name: String, channel: Channel) {
        self.channels.insert(name.clone(), channel);
        self.observers.emit(&AutomatonEvent::CreateChannel { name });
    }

    /// Remove a channel and return it.
    pub fn remove_channel(&mut self, name: &str) -> CurvefxResult<Channel> {
        let channel = self
            .channels
            .remove(name)
            .ok_or_else(|| CurvefxError::validation(format!("unknown channel '{name}'")))?;
        self.observers.emit(&AutomatonEvent::RemoveChannel {
            name: name.to_string(),
        });
        Ok(channel)
    }

    pub fn rename_channel(&mut self, from: &str, to: &str) -> CurvefxResult<()> {
        check_channel_name(to)?;
        if from == to {
            return Ok(());
        }
        if self.channels.contains_key(to) {
            return Err(CurvefxError::validation(format!(
                "channel '{to}' already exists"
            )));
        }
        let channel = self
            .channels
            .remove(from)
            .ok_or_else(|| CurvefxError::validation(format!("unknown channel '{from}'")))?;
        self.channels.insert(to.to_string(), channel);
        self.observers.emit(&AutomatonEvent::RenameChannel {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    /// Add a curve item spanning the curve (clipped to the timeline) at `time`.
    pub fn create_curve_item(
        &mut self,
        channel: &str,
        time: f64,
        curve: CurveId,
    ) -> CurvefxResult<ItemId> {
        let curve_length = self
            .curves
            .get(curve)
            .map(Curve::length)
            .ok_or_else(|| CurvefxError::validation(format!("unknown {curve}")))?;
        ensure_finite("item time", time)?;
        let length = curve_length.min(self.length - time);
        self.channel_or_err(channel)?
            .create_curve_item(time, length, curve)
    }

    pub fn create_constant_item(
        &mut self,
        channel: &str,
        time: f64,
        length: f64,
        value: f64,
    ) -> CurvefxResult<ItemId> {
        self.channel_or_err(channel)?
            .create_constant_item(time, length, value)
    }

    // Timeline

    /// Change the timeline length.
    ///
    /// Curves longer than the new length are trimmed and curves that spanned the old timeline
    /// follow it when it grows. Channel items, labels and the loop region are clipped.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_length(&mut self, length: f64) -> CurvefxResult<()> {
        ensure_positive("length", length)?;
        let old = self.length;
        for curve in self.curves.iter_mut() {
            if length < curve.length() || (curve.length() == old && length > old) {
                curve.set_length(length)?;
            }
        }
        for channel in self.channels.values_mut() {
            channel.trim(length)?;
        }
        self.labels.retain(|_, t| *t <= length);
        self.loop_region = self.loop_region.and_then(|r| {
            if r.begin >= length {
                None
            } else {
                Some(LoopRegion {
                    begin: r.begin,
                    end: r.end.min(length),
                })
            }
        });
        self.length = length;
        self.observers.emit(&AutomatonEvent::ChangeLength { length });
        Ok(())
    }

    /// Change the sample rate of every curve.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_resolution(&mut self, resolution: f64) -> CurvefxResult<()> {
        ensure_positive("resolution", resolution)?;
        for curve in self.curves.iter_mut() {
            curve.set_resolution(resolution)?;
        }
        self.resolution = resolution;
        self.observers
            .emit(&AutomatonEvent::ChangeResolution { resolution });
        Ok(())
    }

    /// Set or move a label. Times must lie on the timeline.
    pub fn set_label(&mut self, name: &str, time: f64) -> CurvefxResult<()> {
        ensure_finite("label time", time)?;
        if !(0.0..=self.length).contains(&time) {
            return Err(CurvefxError::validation(format!(
                "label time {time} is outside [0, {}]",
                self.length
            )));
        }
        self.labels.insert(name.to_string(), time);
        self.observers.emit(&AutomatonEvent::UpdateLabel {
            name: name.to_string(),
            time: Some(time),
        });
        Ok(())
    }

    /// Remove a label, returning its time.
    pub fn delete_label(&mut self, name: &str) -> Option<f64> {
        let time = self.labels.remove(name)?;
        self.observers.emit(&AutomatonEvent::UpdateLabel {
            name: name.to_string(),
            time: None,
        });
        Some(time)
    }

    /// Set or clear the loop region. A region must lie on the timeline.
    pub fn set_loop_region(&mut self, region: Option<LoopRegion>) -> CurvefxResult<()> {
        if let Some(r) = region {
            LoopRegion::new(r.begin, r.end)?;
            if r.begin < 0.0 || r.end > self.length {
                return Err(CurvefxError::validation(format!(
                    "loop region [{}, {}) is outside [0, {}]",
                    r.begin, r.end, self.length
                )));
            }
        }
        self.loop_region = region;
        self.observers
            .emit(&AutomatonEvent::ChangeLoopRegion { region });
        Ok(())
    }

    // Data

    /// Current-version data describing this automaton.
    pub fn serialize(&self) -> SerializedAutomaton {
        let curves = self
            .curves
            .iter()
            .map(|curve| SerializedCurve {
                length: (curve.length() != self.length).then_some(curve.length()),
                nodes: curve.nodes().iter().map(serialize_node).collect(),
                fxs: curve.fxs().iter().map(serialize_fx).collect(),
            })
            .collect();
        let channels = self
            .channels
            .iter()
            .map(|(name, channel)| {
                let items = channel
                    .items()
                    .iter()
                    .map(|item| self.serialize_item(item))
                    .collect();
                (name.clone(), SerializedChannel { items })
            })
            .collect();

        SerializedAutomaton {
            version: DATA_VERSION.to_string(),
            resolution: self.resolution,
            length: self.length,
            curves,
            channels,
            labels: self.labels.clone(),
            gui_settings: self.gui_settings.clone(),
        }
    }

    fn serialize_item(&self, item: &ChannelItem) -> SerializedItem {
        let mut out = SerializedItem {
            time: item.time,
            length: Some(item.length),
            reset: item.reset,
            ..SerializedItem::default()
        };
        match item.kind {
            ItemKind::Constant { value } => out.value = Some(value),
            ItemKind::Curve {
                curve,
                speed,
                offset,
                amp,
            } => {
                out.curve = self.curves.index_of(curve);
                out.speed = Some(speed);
                out.offset = Some(offset);
                out.amp = Some(amp);
            }
        }
        out
    }

    /// Build an automaton from current-version data.
    ///
    /// `options` supply the fx registry and row budget; length and resolution come from `data`.
    #[tracing::instrument(level = "debug", skip(data, options))]
    pub fn deserialize(
        data: SerializedAutomaton,
        options: AutomatonOptions,
    ) -> CurvefxResult<Self> {
        let mut automaton = Self::new(AutomatonOptions {
            length: data.length,
            resolution: data.resolution,
            ..options
        })?;

        let mut curve_ids = Vec::with_capacity(data.curves.len());
        for curve in data.curves {
            let id = CurveId(automaton.curve_ids.issue());
            let length = curve.length.unwrap_or(automaton.length);
            let nodes = curve.nodes.into_iter().map(deserialize_node).collect();
            let fxs = curve.fxs.into_iter().map(deserialize_fx).collect();
            let curve = Curve::load(id, length, &automaton.curve_config(), nodes, fxs)?;
            automaton.curves.insert(curve);
            curve_ids.push(id);
        }

        for (name, channel) in data.channels {
            let mut items = channel.items;
            items.sort_by(|a, b| a.time.total_cmp(&b.time));
            let mut built = Channel::with_limit(automaton.length);
            for (i, item) in items.iter().enumerate() {
                let next = items.get(i + 1).map_or(automaton.length, |n| n.time);
                automaton.load_item(&mut built, item, next, &curve_ids)?;
            }
            automaton.channels.insert(name, built);
        }

        automaton.labels = data.labels;
        automaton.gui_settings = data.gui_settings;
        tracing::debug!(
            curves = automaton.curves.len(),
            channels = automaton.channels.len(),
            "loaded automaton"
        );
        Ok(automaton)
    }

    fn load_item(
        &self,
        channel: &mut Channel,
        item: &SerializedItem,
        next: f64,
        curve_ids: &[CurveId],
    ) -> CurvefxResult<()> {
        let (kind, default_length) = match item.curve {
            Some(index) => {
                let id = curve_ids.get(index).copied().ok_or_else(|| {
                    CurvefxError::serde(format!("item references missing curve #{index}"))
                })?;
                let curve_length = self.curves.get(id).map_or(self.length, Curve::length);
                let kind = ItemKind::Curve {
                    curve: id,
                    speed: item.speed.unwrap_or(1.0),
                    offset: item.offset.unwrap_or(0.0),
                    amp: item.amp.unwrap_or(1.0),
                };
                (kind, curve_length.min(self.length - item.time))
            }
            None => {
                let kind = ItemKind::Constant {
                    value: item.value.unwrap_or(0.0),
                };
                (kind, next - item.time)
            }
        };
        let length = item.length.unwrap_or(default_length);
        channel.create_item(item.time, length, kind, item.reset)?;
        Ok(())
    }

    /// Upgrade raw JSON data and build an automaton from it.
    pub fn from_value(data: serde_json::Value, options: AutomatonOptions) -> CurvefxResult<Self> {
        let data = upgrade(data)?;
        let data: SerializedAutomaton = serde_json::from_value(data)
            .map_err(|e| CurvefxError::serde(format!("parse automaton data: {e}")))?;
        Self::deserialize(data, options)
    }

    /// Parse automaton JSON text.
    pub fn from_json(text: &str, options: AutomatonOptions) -> CurvefxResult<Self> {
        let data: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CurvefxError::serde(format!("parse automaton JSON: {e}")))?;
        Self::from_value(data, options)
    }

    /// Parse automaton JSON from a reader.
    pub fn from_reader<R: std::io::Read>(r: R, options: AutomatonOptions) -> CurvefxResult<Self> {
        let data: serde_json::Value = serde_json::from_reader(r)
            .map_err(|e| CurvefxError::serde(format!("parse automaton JSON: {e}")))?;
        Self::from_value(data, options)
    }

    /// Parse automaton JSON from a file on disk.
    pub fn from_path(path: impl AsRef<Path>, options: AutomatonOptions) -> CurvefxResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CurvefxError::validation(format!("open automaton JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f), options)
    }

    /// Parse automaton JSON text, falling back to an empty default automaton when the text
    /// cannot be read.
    pub fn from_json_or_default(text: &str, options: AutomatonOptions) -> Self {
        match Self::from_json(text, options.clone()) {
            Ok(automaton) => automaton,
            Err(err) => {
                tracing::warn!(error = %err, "unreadable automaton data, starting empty");
                Self::from_checked(AutomatonOptions {
                    length: DEFAULT_LENGTH,
                    resolution: DEFAULT_RESOLUTION,
                    max_fx_rows: options.max_fx_rows.max(1),
                    ..options
                })
            }
        }
    }

    /// Pretty-printed current-version JSON.
    pub fn to_json(&self) -> CurvefxResult<String> {
        serde_json::to_string_pretty(&self.serialize())
            .map_err(|e| CurvefxError::serde(format!("serialize automaton: {e}")))
    }
}

fn check_channel_name(name: &str) -> CurvefxResult<()> {
    if name.is_empty() {
        return Err(CurvefxError::validation("channel name is empty"));
    }
    Ok(())
}

fn serialize_node(node: &BezierNode) -> SerializedNode {
    SerializedNode {
        time: node.time,
        value: node.value,
        in_handle: node.in_handle,
        out_handle: node.out_handle,
    }
}

fn deserialize_node(node: SerializedNode) -> BezierNode {
    BezierNode {
        in_handle: node.in_handle,
        out_handle: node.out_handle,
        ..BezierNode::new(NodeId(0), node.time, node.value)
    }
}

fn serialize_fx(fx: &FxSection) -> SerializedFx {
    SerializedFx {
        def: fx.def.clone(),
        time: fx.time,
        length: fx.length,
        row: fx.row,
        bypass: fx.bypass,
        params: fx.params.clone(),
    }
}

fn deserialize_fx(fx: SerializedFx) -> FxSection {
    FxSection {
        id: FxId(0),
        def: fx.def,
        time: fx.time,
        length: fx.length,
        row: fx.row,
        bypass: fx.bypass,
        params: fx.params,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/automaton/automaton.rs"]
mod tests;
