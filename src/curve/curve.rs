//! Bezier node curve with an fx stack and a precalculated sample buffer.
//!
//! Every mutator validates its input first and leaves the curve untouched on error. Successful
//! mutations end with a full [`Curve::precalc`]; the buffer is never patched partially.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bezier::solver::cubic_bezier;
use crate::curve::fx_section::FxSection;
use crate::curve::node::{BezierHandle, BezierNode};
use crate::curve::overlap::{free_row, has_overwrap};
use crate::foundation::core::{CurveId, FxId, IdGen, NodeId, ensure_finite, ensure_positive};
use crate::foundation::error::{CurvefxError, CurvefxResult};
use crate::foundation::events::{ListenerId, Observers};
use crate::foundation::status::{StatusCode, StatusLevel, Statuses};
use crate::fx::definition::FxParamValue;
use crate::fx::pass::{SectionSpan, run_section};
use crate::fx::registry::FxRegistry;

/// Row budget used when nothing else is configured.
pub const DEFAULT_MAX_FX_ROWS: usize = 5;

/// Events emitted by a [`Curve`].
#[derive(Clone, Debug, PartialEq)]
pub enum CurveEvent {
    CreateNode { id: NodeId },
    UpdateNode { id: NodeId },
    RemoveNode { id: NodeId },
    /// The whole node list was swapped (history replay).
    ReplaceNodes,
    CreateFx { id: FxId },
    UpdateFx { id: FxId },
    RemoveFx { id: FxId },
    /// The whole fx list was swapped (history replay).
    ReplaceFxs,
    ChangeLength { length: f64 },
    ChangeStatus,
    Precalc,
}

/// Settings a curve shares with its owner.
#[derive(Clone, Debug)]
pub struct CurveConfig {
    /// Samples per second.
    pub resolution: f64,
    pub max_fx_rows: usize,
    /// Snapshot of the fx definitions; replaced wholesale when the owner registers more.
    pub registry: Arc<FxRegistry>,
}

/// Number of samples covering `[0, length]` at `resolution` samples per second.
pub fn sample_count(length: f64, resolution: f64) -> usize {
    (resolution * length).ceil().max(0.0) as usize + 1
}

/// Interpolated read of a sample buffer.
///
/// Times at or before 0 return the first sample, times at or past `length` the last one.
pub(crate) fn sample_buffer(
    values: &[f32],
    no_interp: &[bool],
    resolution: f64,
    length: f64,
    time: f64,
) -> f64 {
    let Some(last) = values.len().checked_sub(1) else {
        return 0.0;
    };
    if time.is_nan() || time <= 0.0 {
        return f64::from(values[0]);
    }
    let index = time * resolution;
    let floor = index.floor();
    if time >= length || floor >= last as f64 {
        return f64::from(values[last]);
    }

    let i = floor as usize;
    let v0 = f64::from(values[i]);
    let v1 = if no_interp[i] {
        2.0 * v0 - f64::from(values[i.saturating_sub(1)])
    } else {
        f64::from(values[i + 1])
    };
    v0 + (v1 - v0) * (index - floor)
}

/// A bezier curve plus fx sections over `[0, length]`.
#[derive(Debug)]
pub struct Curve {
    id: CurveId,
    length: f64,
    resolution: f64,
    max_fx_rows: usize,
    registry: Arc<FxRegistry>,
    nodes: Vec<BezierNode>,
    fxs: Vec<FxSection>,
    values: Vec<f32>,
    no_interp: Vec<bool>,
    node_ids: IdGen,
    fx_ids: IdGen,
    last_query: Cell<Option<(f64, f64)>>,
    statuses: Statuses,
    observers: Observers<CurveEvent>,
}

impl Curve {
    /// New curve with a flat pair of nodes at value 0 on both ends.
    pub fn new(id: CurveId, length: f64, config: &CurveConfig) -> CurvefxResult<Self> {
        let mut curve = Self::empty(id, length, config)?;
        for time in [0.0, length] {
            let id = NodeId(curve.node_ids.issue());
            curve.nodes.push(BezierNode::new(id, time, 0.0));
        }
        curve.precalc();
        Ok(curve)
    }

    /// Build a curve from stored nodes and sections, issuing fresh ids.
    ///
    /// Node times are clamped into `[0, length]` and a node is synthesized at time 0 when the
    /// first stored node starts later (same samples, since the buffer holds the first value
    /// there anyway). Sections are clipped to the curve. Each one lands on the first free row at or
    /// above its stored row (capped to the row budget), and is dropped when no row is free.
    pub fn load(
        id: CurveId,
        length: f64,
        config: &CurveConfig,
        nodes: Vec<BezierNode>,
        fxs: Vec<FxSection>,
    ) -> CurvefxResult<Self> {
        let mut curve = Self::empty(id, length, config)?;

        for mut node in nodes {
            ensure_finite("node time", node.time)?;
            ensure_finite("node value", node.value)?;
            check_handle(node.in_handle)?;
            check_handle(node.out_handle)?;
            node.id = NodeId(curve.node_ids.issue());
            node.time = node.time.clamp(0.0, length);
            node.in_handle = node.in_handle.map(BezierHandle::as_in);
            node.out_handle = node.out_handle.map(BezierHandle::as_out);
            curve.nodes.push(node);
        }
        curve.nodes.sort_by(|a, b| a.time.total_cmp(&b.time));
        match curve.nodes.first().copied() {
            None => {
                for time in [0.0, length] {
                    let id = NodeId(curve.node_ids.issue());
                    curve.nodes.push(BezierNode::new(id, time, 0.0));
                }
            }
            Some(first) if first.time > 0.0 => {
                let id = NodeId(curve.node_ids.issue());
                curve.nodes.insert(0, BezierNode::new(id, 0.0, first.value));
            }
            Some(_) => {}
        }
        curve.fix_boundary_handles();

        for mut fx in fxs {
            ensure_finite("fx time", fx.time)?;
            ensure_finite("fx length", fx.length)?;
            fx.time = fx.time.max(0.0);
            fx.length = fx.length.min(length - fx.time);
            if fx.length <= 0.0 {
                tracing::warn!(curve = %id, def = %fx.def, "dropping fx section outside the curve");
                continue;
            }
            let wanted = fx.row.min(curve.max_fx_rows - 1);
            let row = free_row(&curve.fxs, fx.time, fx.length, wanted);
            if row >= curve.max_fx_rows {
                tracing::warn!(
                    curve = %id,
                    def = %fx.def,
                    row = fx.row,
                    "dropping fx section with no free row"
                );
                continue;
            }
            if row != fx.row {
                tracing::warn!(
                    curve = %id,
                    from = fx.row,
                    to = row,
                    "moving fx section to a free row"
                );
            }
            fx.row = row;
            fx.id = FxId(curve.fx_ids.issue());
            curve.fxs.push(fx);
        }
        curve.sort_fxs();

        curve.precalc();
        Ok(curve)
    }

    fn empty(id: CurveId, length: f64, config: &CurveConfig) -> CurvefxResult<Self> {
        ensure_positive("curve length", length)?;
        ensure_positive("resolution", config.resolution)?;
        if config.max_fx_rows == 0 {
            return Err(CurvefxError::validation("max fx rows must be > 0"));
        }
        let len = sample_count(length, config.resolution);
        Ok(Self {
            id,
            length,
            resolution: config.resolution,
            max_fx_rows: config.max_fx_rows,
            registry: Arc::clone(&config.registry),
            nodes: Vec::new(),
            fxs: Vec::new(),
            values: vec![0.0; len],
            no_interp: vec![false; len],
            node_ids: IdGen::default(),
            fx_ids: IdGen::default(),
            last_query: Cell::new(None),
            statuses: Statuses::default(),
            observers: Observers::default(),
        })
    }

    pub fn id(&self) -> CurveId {
        self.id
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

    /// Nodes sorted by time. The first node sits at time 0.
    pub fn nodes(&self) -> &[BezierNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&BezierNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Sections sorted by `(time, row)`, which is also their evaluation order.
    pub fn fxs(&self) -> &[FxSection] {
        &self.fxs
    }

    pub fn fx(&self, id: FxId) -> Option<&FxSection> {
        self.fxs.iter().find(|f| f.id == id)
    }

    /// The precalculated sample buffer.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn statuses(&self) -> &Statuses {
        &self.statuses
    }

    pub fn on(&mut self, listener: impl FnMut(&CurveEvent) + 'static) -> ListenerId {
        self.observers.on(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.observers.off(id)
    }

    /// First row at or above `min_row` where `[time, time + length)` fits.
    pub fn free_row(&self, time: f64, length: f64, min_row: usize) -> usize {
        free_row(&self.fxs, time, length, min_row)
    }

    /// Sample the curve at `time`, interpolating the precalculated buffer.
    pub fn get_value(&self, time: f64) -> f64 {
        if let Some((t, v)) = self.last_query.get()
            && t == time
        {
            return v;
        }
        let v = sample_buffer(
            &self.values,
            &self.no_interp,
            self.resolution,
            self.length,
            time,
        );
        self.last_query.set(Some((time, v)));
        v
    }

    /// Rebuild the sample buffer from nodes and fx sections.
    #[tracing::instrument(level = "debug", skip(self), fields(curve = %self.id))]
    pub fn precalc(&mut self) {
        self.generate_curve();
        self.apply_fxs();
        self.contain_nan();
        self.last_query.set(None);
        self.observers.emit(&CurveEvent::Precalc);
    }

    fn generate_curve(&mut self) {
        let res = self.resolution;
        let last = self.values.len() - 1;
        let index_of = |time: f64| ((res * time).floor().max(0.0) as usize).min(last);
        self.no_interp.fill(false);

        let Some(first) = self.nodes.first() else {
            self.values.fill(0.0);
            return;
        };
        let mut i_tail = index_of(first.time);
        self.values[..=i_tail].fill(first.value as f32);

        for pair in self.nodes.windows(2) {
            let (n0, n1) = (&pair[0], &pair[1]);
            let i0 = i_tail;
            i_tail = index_of(n1.time);
            self.values[i0] = n0.value as f32;

            if i0 == i_tail {
                if i_tail != 0 {
                    self.no_interp[i_tail - 1] = true;
                }
            } else {
                for i in i0 + 1..=i_tail {
                    self.values[i] = cubic_bezier(n0, n1, i as f64 / res) as f32;
                }
            }
        }

        if let Some(last_node) = self.nodes.last() {
            self.values[i_tail + 1..].fill(last_node.value as f32);
        }
    }

    fn apply_fxs(&mut self) {
        let Self {
            fxs,
            values,
            no_interp,
            registry,
            resolution,
            length,
            ..
        } = self;
        let resolution = *resolution;
        let length = *length;

        for fx in fxs.iter() {
            if fx.bypass {
                continue;
            }
            let Some(def) = registry.get(&fx.def) else {
                tracing::debug!(def = %fx.def, "fx definition not registered, skipping section");
                continue;
            };
            let Some(span) = SectionSpan::new(fx.time, fx.length, resolution, values.len()) else {
                continue;
            };
            let params = def.resolve_params(&fx.params);
            let out = {
                let committed: &[f32] = &values[..];
                let flags: &[bool] = &no_interp[..];
                let lookup =
                    |t: f64| sample_buffer(committed, flags, resolution, length, t);
                run_section(def, &params, span, resolution, committed, &lookup)
            };
            values[span.i0..span.i1].copy_from_slice(&out);
        }
    }

    fn contain_nan(&mut self) {
        let mut count = 0usize;
        for v in &mut self.values {
            if v.is_nan() {
                *v = 0.0;
                count += 1;
            }
        }

        let changed = if count > 0 {
            tracing::warn!(curve = %self.id, count, "NaN samples replaced with 0");
            self.statuses.set(
                StatusCode::NanDetected,
                StatusLevel::Warning,
                format!("{count} NaN samples were replaced with 0"),
            )
        } else {
            self.statuses.clear(StatusCode::NanDetected)
        };
        if changed {
            self.observers.emit(&CurveEvent::ChangeStatus);
        }
    }

    // Nodes

    /// Insert a node without handles.
    pub fn create_node(&mut self, time: f64, value: f64) -> CurvefxResult<NodeId> {
        self.check_node_time(time)?;
        ensure_finite("node value", value)?;
        let id = NodeId(self.node_ids.issue());
        self.insert_node(BezierNode::new(id, time, value));
        self.observers.emit(&CurveEvent::CreateNode { id });
        self.precalc();
        Ok(id)
    }

    /// Re-insert a node with a known id, typically one returned by [`Curve::remove_node`].
    pub fn restore_node(&mut self, node: BezierNode) -> CurvefxResult<()> {
        if self.node(node.id).is_some() {
            return Err(CurvefxError::validation(format!(
                "{} already exists in {}",
                node.id, self.id
            )));
        }
        self.check_node_time(node.time)?;
        ensure_finite("node value", node.value)?;
        check_handle(node.in_handle)?;
        check_handle(node.out_handle)?;

        self.node_ids.reserve(node.id.0);
        let id = node.id;
        self.insert_node(BezierNode {
            in_handle: node.in_handle.map(BezierHandle::as_in),
            out_handle: node.out_handle.map(BezierHandle::as_out),
            ..node
        });
        self.observers.emit(&CurveEvent::CreateNode { id });
        self.precalc();
        Ok(())
    }

    /// Move a node in time and value. The first node stays pinned at time 0.
    pub fn move_node(&mut self, id: NodeId, time: f64, value: f64) -> CurvefxResult<()> {
        let index = self.node_index(id)?;
        self.check_node_time(time)?;
        ensure_finite("node value", value)?;
        if index == 0 && time != 0.0 {
            return Err(CurvefxError::validation("the first node is pinned to time 0"));
        }

        let mut node = self.nodes.remove(index);
        node.time = time;
        node.value = value;
        if index == 0 {
            self.nodes.insert(0, node);
        } else {
            self.insert_node(node);
        }
        self.fix_boundary_handles();
        self.observers.emit(&CurveEvent::UpdateNode { id });
        self.precalc();
        Ok(())
    }

    pub fn set_node_time(&mut self, id: NodeId, time: f64) -> CurvefxResult<()> {
        let value = self.nodes[self.node_index(id)?].value;
        self.move_node(id, time, value)
    }

    pub fn set_node_value(&mut self, id: NodeId, value: f64) -> CurvefxResult<()> {
        let time = self.nodes[self.node_index(id)?].time;
        self.move_node(id, time, value)
    }

    /// Set or clear the in-handle. The time component is clamped to `<= 0`.
    pub fn set_in_handle(&mut self, id: NodeId, handle: Option<BezierHandle>) -> CurvefxResult<()> {
        let index = self.node_index(id)?;
        check_handle(handle)?;
        if index == 0 && handle.is_some() {
            return Err(CurvefxError::validation("the first node has no in-handle"));
        }
        self.nodes[index].in_handle = handle.map(BezierHandle::as_in);
        self.observers.emit(&CurveEvent::UpdateNode { id });
        self.precalc();
        Ok(())
    }

    /// Set or clear the out-handle. The time component is clamped to `>= 0`.
    pub fn set_out_handle(
        &mut self,
        id: NodeId,
        handle: Option<BezierHandle>,
    ) -> CurvefxResult<()> {
        let index = self.node_index(id)?;
        check_handle(handle)?;
        if index + 1 == self.nodes.len() && handle.is_some() {
            return Err(CurvefxError::validation("the last node has no out-handle"));
        }
        self.nodes[index].out_handle = handle.map(BezierHandle::as_out);
        self.observers.emit(&CurveEvent::UpdateNode { id });
        self.precalc();
        Ok(())
    }

    /// Remove a node and return it. The first node cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> CurvefxResult<BezierNode> {
        let index = self.node_index(id)?;
        if index == 0 {
            return Err(CurvefxError::validation("the first node cannot be removed"));
        }
        let node = self.nodes.remove(index);
        self.fix_boundary_handles();
        self.observers.emit(&CurveEvent::RemoveNode { id });
        self.precalc();
        Ok(node)
    }

    /// Swap the whole node list, keeping ids. Used by history replay.
    pub(crate) fn replace_nodes(&mut self, nodes: Vec<BezierNode>) -> CurvefxResult<()> {
        match nodes.first() {
            Some(first) if first.time == 0.0 => {}
            _ => {
                return Err(CurvefxError::validation(
                    "a node list must start with a node at time 0",
                ));
            }
        }
        for pair in nodes.windows(2) {
            if pair[1].time < pair[0].time {
                return Err(CurvefxError::validation("nodes must be sorted by time"));
            }
        }
        for node in &nodes {
            self.check_node_time(node.time)?;
            ensure_finite("node value", node.value)?;
            self.node_ids.reserve(node.id.0);
        }
        self.nodes = nodes;
        self.fix_boundary_handles();
        self.observers.emit(&CurveEvent::ReplaceNodes);
        self.precalc();
        Ok(())
    }

    fn insert_node(&mut self, node: BezierNode) {
        let at = self
            .nodes
            .partition_point(|n| n.time <= node.time)
            .max(1)
            .min(self.nodes.len());
        self.nodes.insert(at, node);
        self.fix_boundary_handles();
    }

    fn fix_boundary_handles(&mut self) {
        if let Some(first) = self.nodes.first_mut() {
            first.in_handle = None;
        }
        if let Some(last) = self.nodes.last_mut() {
            last.out_handle = None;
        }
    }

    fn node_index(&self, id: NodeId) -> CurvefxResult<usize> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| CurvefxError::validation(format!("unknown {id} in {}", self.id)))
    }

    fn check_node_time(&self, time: f64) -> CurvefxResult<()> {
        ensure_finite("node time", time)?;
        if !(0.0..=self.length).contains(&time) {
            return Err(CurvefxError::validation(format!(
                "node time {time} is outside [0, {}]",
                self.length
            )));
        }
        Ok(())
    }

    // Fx sections

    /// Place a new section on the first free row.
    ///
    /// `params` override the definition's defaults. Returns `Ok(None)` without touching the
    /// curve when every row up to the row budget is occupied at that time.
    pub fn create_fx(
        &mut self,
        def: &str,
        time: f64,
        length: f64,
        params: BTreeMap<String, FxParamValue>,
    ) -> CurvefxResult<Option<FxId>> {
        if def.is_empty() {
            return Err(CurvefxError::validation("fx definition key is empty"));
        }
        self.check_fx_span(time, length)?;
        check_params(&params)?;

        let row = free_row(&self.fxs, time, length, 0);
        if row >= self.max_fx_rows {
            tracing::warn!(curve = %self.id, time, length, "too many fx stacks at this time");
            return Ok(None);
        }

        let mut merged = self
            .registry
            .get(def)
            .map(|d| d.default_params())
            .unwrap_or_default();
        merged.extend(params);

        let id = FxId(self.fx_ids.issue());
        self.fxs.push(FxSection {
            id,
            def: def.to_string(),
            time,
            length,
            row,
            bypass: false,
            params: merged,
        });
        self.sort_fxs();
        self.observers.emit(&CurveEvent::CreateFx { id });
        self.precalc();
        Ok(Some(id))
    }

    /// Re-insert a section with a known id and row, typically one returned by
    /// [`Curve::remove_fx`].
    pub fn restore_fx(&mut self, fx: FxSection) -> CurvefxResult<()> {
        if self.fx(fx.id).is_some() {
            return Err(CurvefxError::validation(format!(
                "{} already exists in {}",
                fx.id, self.id
            )));
        }
        self.check_fx_section(&fx)?;
        self.fx_ids.reserve(fx.id.0);
        let id = fx.id;
        self.fxs.push(fx);
        self.sort_fxs();
        self.observers.emit(&CurveEvent::CreateFx { id });
        self.precalc();
        Ok(())
    }

    /// Move a section, clamped between its same-row neighbours and the curve bounds.
    ///
    /// Returns the time actually applied.
    pub fn move_fx(&mut self, id: FxId, time: f64) -> CurvefxResult<f64> {
        let index = self.fx_index(id)?;
        ensure_finite("fx time", time)?;
        let (lo, hi) = self.row_bounds(index);
        let fx = &mut self.fxs[index];
        let time = time.clamp(lo, (hi - fx.length).max(lo));
        fx.time = time;
        self.sort_fxs();
        self.observers.emit(&CurveEvent::UpdateFx { id });
        self.precalc();
        Ok(time)
    }

    /// Change a section's length, clamped to the next same-row section or the curve end.
    ///
    /// Returns the length actually applied.
    pub fn resize_fx(&mut self, id: FxId, length: f64) -> CurvefxResult<f64> {
        let index = self.fx_index(id)?;
        ensure_positive("fx length", length)?;
        let (_, hi) = self.row_bounds(index);
        let fx = &mut self.fxs[index];
        let length = length.min(hi - fx.time);
        fx.length = length;
        self.observers.emit(&CurveEvent::UpdateFx { id });
        self.precalc();
        Ok(length)
    }

    /// Move a section to another row. The row must be free over the section's span.
    pub fn change_fx_row(&mut self, id: FxId, row: usize) -> CurvefxResult<()> {
        let index = self.fx_index(id)?;
        if row >= self.max_fx_rows {
            return Err(CurvefxError::validation(format!(
                "row {row} is outside the row budget of {}",
                self.max_fx_rows
            )));
        }
        let fx = &self.fxs[index];
        let blocked = self.fxs.iter().any(|other| {
            other.id != id
                && other.row == row
                && has_overwrap(fx.time, fx.length, other.time, other.length)
        });
        if blocked {
            return Err(CurvefxError::validation(format!(
                "row {row} is occupied over [{}, {})",
                fx.time,
                fx.end()
            )));
        }
        self.fxs[index].row = row;
        self.sort_fxs();
        self.observers.emit(&CurveEvent::UpdateFx { id });
        self.precalc();
        Ok(())
    }

    pub fn set_fx_bypass(&mut self, id: FxId, bypass: bool) -> CurvefxResult<()> {
        let index = self.fx_index(id)?;
        self.fxs[index].bypass = bypass;
        self.observers.emit(&CurveEvent::UpdateFx { id });
        self.precalc();
        Ok(())
    }

    pub fn set_fx_param(
        &mut self,
        id: FxId,
        key: &str,
        value: FxParamValue,
    ) -> CurvefxResult<()> {
        let index = self.fx_index(id)?;
        check_param(key, value)?;
        self.fxs[index].params.insert(key.to_string(), value);
        self.observers.emit(&CurveEvent::UpdateFx { id });
        self.precalc();
        Ok(())
    }

    /// Remove a section and return it.
    pub fn remove_fx(&mut self, id: FxId) -> CurvefxResult<FxSection> {
        let index = self.fx_index(id)?;
        let fx = self.fxs.remove(index);
        self.observers.emit(&CurveEvent::RemoveFx { id });
        self.precalc();
        Ok(fx)
    }

    /// Swap the whole section list, keeping ids. Used by history replay.
    pub(crate) fn replace_fxs(&mut self, fxs: Vec<FxSection>) -> CurvefxResult<()> {
        for (i, fx) in fxs.iter().enumerate() {
            self.check_fx_span(fx.time, fx.length)?;
            check_params(&fx.params)?;
            if fx.row >= self.max_fx_rows {
                return Err(CurvefxError::validation(format!(
                    "row {} is outside the row budget",
                    fx.row
                )));
            }
            let clash = fxs[..i]
                .iter()
                .any(|o| o.row == fx.row && has_overwrap(fx.time, fx.length, o.time, o.length));
            if clash {
                return Err(CurvefxError::validation(format!(
                    "{} overlaps another section in row {}",
                    fx.id, fx.row
                )));
            }
        }
        for fx in &fxs {
            self.fx_ids.reserve(fx.id.0);
        }
        self.fxs = fxs;
        self.sort_fxs();
        self.observers.emit(&CurveEvent::ReplaceFxs);
        self.precalc();
        Ok(())
    }

    fn fx_index(&self, id: FxId) -> CurvefxResult<usize> {
        self.fxs
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| CurvefxError::validation(format!("unknown {id} in {}", self.id)))
    }

    /// Free interval around section `index` in its row: previous end and next start.
    fn row_bounds(&self, index: usize) -> (f64, f64) {
        let fx = &self.fxs[index];
        let mut lo = 0.0_f64;
        let mut hi = self.length;
        for (i, other) in self.fxs.iter().enumerate() {
            if i == index || other.row != fx.row {
                continue;
            }
            if other.time < fx.time {
                lo = lo.max(other.end());
            } else {
                hi = hi.min(other.time);
            }
        }
        (lo, hi)
    }

    fn check_fx_span(&self, time: f64, length: f64) -> CurvefxResult<()> {
        ensure_finite("fx time", time)?;
        ensure_positive("fx length", length)?;
        if time < 0.0 || time + length > self.length {
            return Err(CurvefxError::validation(format!(
                "fx span [{time}, {}) is outside [0, {}]",
                time + length,
                self.length
            )));
        }
        Ok(())
    }

    fn check_fx_section(&self, fx: &FxSection) -> CurvefxResult<()> {
        self.check_fx_span(fx.time, fx.length)?;
        check_params(&fx.params)?;
        if fx.row >= self.max_fx_rows {
            return Err(CurvefxError::validation(format!(
                "row {} is outside the row budget of {}",
                fx.row, self.max_fx_rows
            )));
        }
        let blocked = self
            .fxs
            .iter()
            .any(|o| o.row == fx.row && has_overwrap(fx.time, fx.length, o.time, o.length));
        if blocked {
            return Err(CurvefxError::validation(format!(
                "row {} is occupied over [{}, {})",
                fx.row,
                fx.time,
                fx.end()
            )));
        }
        Ok(())
    }

    fn sort_fxs(&mut self) {
        self.fxs
            .sort_by(|a, b| a.time.total_cmp(&b.time).then(a.row.cmp(&b.row)));
    }

    // Sizing

    /// Change the curve length.
    ///
    /// Shrinking removes nodes past the new end, synthesizes a boundary node carrying the
    /// pre-trim node-curve value, and clips or drops fx sections. Growing keeps every node; the
    /// last value holds over the added time.
    pub(crate) fn set_length(&mut self, length: f64) -> CurvefxResult<()> {
        ensure_positive("curve length", length)?;

        if length < self.length {
            let boundary = self.node_value_at(length);
            let before = self.nodes.len();
            self.nodes.retain(|n| n.time <= length);
            let trimmed = self.nodes.len() != before;
            if trimmed && self.nodes.last().is_some_and(|n| n.time < length) {
                let id = NodeId(self.node_ids.issue());
                self.nodes.push(BezierNode::new(id, length, boundary));
            }
            self.fix_boundary_handles();

            self.fxs.retain(|fx| fx.time < length);
            for fx in &mut self.fxs {
                fx.length = fx.length.min(length - fx.time);
            }
        }

        self.length = length;
        self.resize_buffers();
        self.observers.emit(&CurveEvent::ChangeLength { length });
        self.precalc();
        Ok(())
    }

    pub(crate) fn set_resolution(&mut self, resolution: f64) -> CurvefxResult<()> {
        ensure_positive("resolution", resolution)?;
        self.resolution = resolution;
        self.resize_buffers();
        self.precalc();
        Ok(())
    }

    /// Swap the fx definition snapshot. The caller is expected to precalc afterwards.
    pub(crate) fn set_registry(&mut self, registry: Arc<FxRegistry>) {
        self.registry = registry;
    }

    fn resize_buffers(&mut self) {
        let len = sample_count(self.length, self.resolution);
        self.values = vec![0.0; len];
        self.no_interp = vec![false; len];
    }

    /// Value of the node curve alone (no fx) at `time`.
    fn node_value_at(&self, time: f64) -> f64 {
        let i = self.nodes.partition_point(|n| n.time <= time);
        match (i.checked_sub(1), self.nodes.get(i)) {
            (Some(prev), Some(next)) => cubic_bezier(&self.nodes[prev], next, time),
            (Some(prev), None) => self.nodes[prev].value,
            (None, Some(next)) => next.value,
            (None, None) => 0.0,
        }
    }
}

fn check_handle(handle: Option<BezierHandle>) -> CurvefxResult<()> {
    if let Some(h) = handle {
        ensure_finite("handle time", h.time)?;
        ensure_finite("handle value", h.value)?;
    }
    Ok(())
}

fn check_param(key: &str, value: FxParamValue) -> CurvefxResult<()> {
    if let FxParamValue::Float(v) = value
        && !v.is_finite()
    {
        return Err(CurvefxError::validation(format!(
            "fx param '{key}' must be finite"
        )));
    }
    Ok(())
}

fn check_params(params: &BTreeMap<String, FxParamValue>) -> CurvefxResult<()> {
    params.iter().try_for_each(|(k, v)| check_param(k, *v))
}

#[cfg(test)]
#[path = "../../tests/unit/curve/curve.rs"]
mod tests;
