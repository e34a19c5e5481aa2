//! History-recording front end over [`Automaton`].
//!
//! Every structural edit goes through here and pushes one undo entry. Curve and channel edits
//! record the whole node, section or item list before and after, so replaying an entry restores
//! exactly what the edit saw, boundary-handle fixups included.

use std::collections::BTreeMap;

use crate::automaton::automaton::Automaton;
use crate::channel::item::ChannelItem;
use crate::curve::curve::Curve;
use crate::curve::fx_section::FxSection;
use crate::curve::node::{BezierHandle, BezierNode};
use crate::foundation::core::{CurveId, FxId, ItemId, LoopRegion, NodeId};
use crate::foundation::error::{CurvefxError, CurvefxResult};
use crate::fx::definition::{FxDefinition, FxParamValue};
use crate::history::stack::HistoryStack;

/// An [`Automaton`] plus its undo/redo log.
#[derive(Debug)]
pub struct AutomatonEditor {
    automaton: Automaton,
    history: HistoryStack<Automaton>,
}

impl AutomatonEditor {
    pub fn new(automaton: Automaton) -> Self {
        Self {
            automaton,
            history: HistoryStack::new(),
        }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn history(&self) -> &HistoryStack<Automaton> {
        &self.history
    }

    pub fn into_inner(self) -> Automaton {
        self.automaton
    }

    /// Revert the latest edit. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> CurvefxResult<bool> {
        self.history
            .undo(&mut self.automaton)
            .map_err(|e| CurvefxError::history(format!("undo failed: {e}")))
    }

    pub fn redo(&mut self) -> CurvefxResult<bool> {
        self.history
            .redo(&mut self.automaton)
            .map_err(|e| CurvefxError::history(format!("redo failed: {e}")))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Playback passes straight through; it is not an edit.
    pub fn update(&mut self, time: f64) {
        self.automaton.update(time);
    }

    pub fn auto(&mut self, name: &str) -> f64 {
        self.automaton.auto(name)
    }

    // Snapshot helpers

    fn edit_nodes<R>(
        &mut self,
        curve: CurveId,
        description: String,
        edit: impl FnOnce(&mut Curve) -> CurvefxResult<R>,
    ) -> CurvefxResult<R> {
        let target = self.automaton.curve_or_err(curve)?;
        let before = target.nodes().to_vec();
        let out = edit(target)?;
        let after = target.nodes().to_vec();
        if before != after {
            self.history.push(
                description,
                move |a| a.curve_or_err(curve)?.replace_nodes(after.clone()),
                move |a| a.curve_or_err(curve)?.replace_nodes(before.clone()),
            );
        }
        Ok(out)
    }

    fn edit_fxs<R>(
        &mut self,
        curve: CurveId,
        description: String,
        edit: impl FnOnce(&mut Curve) -> CurvefxResult<R>,
    ) -> CurvefxResult<R> {
        let target = self.automaton.curve_or_err(curve)?;
        let before = target.fxs().to_vec();
        let out = edit(target)?;
        let after = target.fxs().to_vec();
        if before != after {
            self.history.push(
                description,
                move |a| a.curve_or_err(curve)?.replace_fxs(after.clone()),
                move |a| a.curve_or_err(curve)?.replace_fxs(before.clone()),
            );
        }
        Ok(out)
    }

    fn edit_items<R>(
        &mut self,
        channel: &str,
        description: String,
        edit: impl FnOnce(&mut Automaton) -> CurvefxResult<R>,
    ) -> CurvefxResult<R> {
        let before = self.automaton.channel_or_err(channel)?.items().to_vec();
        let out = edit(&mut self.automaton)?;
        let after = self.automaton.channel_or_err(channel)?.items().to_vec();
        if before != after {
            let redo_name = channel.to_string();
            let undo_name = channel.to_string();
            self.history.push(
                description,
                move |a| a.channel_or_err(&redo_name)?.replace_items(after.clone()),
                move |a| a.channel_or_err(&undo_name)?.replace_items(before.clone()),
            );
        }
        Ok(out)
    }

    // Curves

    pub fn create_curve(&mut self) -> CurvefxResult<CurveId> {
        let id = self.automaton.create_curve()?;
        let (length, nodes, fxs) = curve_snapshot(self.automaton.curve_or_err(id)?);
        self.history.push(
            format!("Create {id}"),
            move |a| a.restore_curve(id, length, nodes.clone(), fxs.clone()),
            move |a| a.remove_curve(id),
        );
        Ok(id)
    }

    pub fn remove_curve(&mut self, id: CurveId) -> CurvefxResult<()> {
        let (length, nodes, fxs) = curve_snapshot(self.automaton.curve_or_err(id)?);
        self.automaton.remove_curve(id)?;
        self.history.push(
            format!("Remove {id}"),
            move |a| a.remove_curve(id),
            move |a| a.restore_curve(id, length, nodes.clone(), fxs.clone()),
        );
        Ok(())
    }

    pub fn add_fx_definition(&mut self, key: impl Into<String>, def: FxDefinition) {
        self.automaton.add_fx_definition(key, def);
    }

    // Nodes

    pub fn create_node(&mut self, curve: CurveId, time: f64, value: f64) -> CurvefxResult<NodeId> {
        self.edit_nodes(curve, "Add node".into(), |c| c.create_node(time, value))
    }

    pub fn move_node(
        &mut self,
        curve: CurveId,
        node: NodeId,
        time: f64,
        value: f64,
    ) -> CurvefxResult<()> {
        self.edit_nodes(curve, format!("Move {node}"), |c| {
            c.move_node(node, time, value)
        })
    }

    pub fn set_in_handle(
        &mut self,
        curve: CurveId,
        node: NodeId,
        handle: Option<BezierHandle>,
    ) -> CurvefxResult<()> {
        self.edit_nodes(curve, format!("Change handle of {node}"), |c| {
            c.set_in_handle(node, handle)
        })
    }

    pub fn set_out_handle(
        &mut self,
        curve: CurveId,
        node: NodeId,
        handle: Option<BezierHandle>,
    ) -> CurvefxResult<()> {
        self.edit_nodes(curve, format!("Change handle of {node}"), |c| {
            c.set_out_handle(node, handle)
        })
    }

    pub fn remove_node(&mut self, curve: CurveId, node: NodeId) -> CurvefxResult<()> {
        self.edit_nodes(curve, format!("Remove {node}"), |c| {
            c.remove_node(node).map(|_| ())
        })
    }

    // Fx sections

    /// Returns `Ok(None)` (and records nothing) when every row is occupied.
    pub fn create_fx(
        &mut self,
        curve: CurveId,
        def: &str,
        time: f64,
        length: f64,
        params: BTreeMap<String, FxParamValue>,
    ) -> CurvefxResult<Option<FxId>> {
        self.edit_fxs(curve, format!("Add fx '{def}'"), |c| {
            c.create_fx(def, time, length, params)
        })
    }

    pub fn move_fx(&mut self, curve: CurveId, fx: FxId, time: f64) -> CurvefxResult<f64> {
        self.edit_fxs(curve, format!("Move {fx}"), |c| c.move_fx(fx, time))
    }

    pub fn resize_fx(&mut self, curve: CurveId, fx: FxId, length: f64) -> CurvefxResult<f64> {
        self.edit_fxs(curve, format!("Resize {fx}"), |c| c.resize_fx(fx, length))
    }

    pub fn change_fx_row(&mut self, curve: CurveId, fx: FxId, row: usize) -> CurvefxResult<()> {
        self.edit_fxs(curve, format!("Change row of {fx}"), |c| {
            c.change_fx_row(fx, row)
        })
    }

    pub fn set_fx_bypass(&mut self, curve: CurveId, fx: FxId, bypass: bool) -> CurvefxResult<()> {
        self.edit_fxs(curve, format!("Toggle bypass of {fx}"), |c| {
            c.set_fx_bypass(fx, bypass)
        })
    }

    pub fn set_fx_param(
        &mut self,
        curve: CurveId,
        fx: FxId,
        key: &str,
        value: FxParamValue,
    ) -> CurvefxResult<()> {
        self.edit_fxs(curve, format!("Change '{key}' of {fx}"), |c| {
            c.set_fx_param(fx, key, value)
        })
    }

    pub fn remove_fx(&mut self, curve: CurveId, fx: FxId) -> CurvefxResult<()> {
        self.edit_fxs(curve, format!("Remove {fx}"), |c| {
            c.remove_fx(fx).map(|_| ())
        })
    }

    // Channels

    pub fn create_channel(&mut self, name: &str) -> CurvefxResult<()> {
        self.automaton.create_channel(name)?;
        let redo_name = name.to_string();
        let undo_name = name.to_string();
        self.history.push(
            format!("Create channel '{name}'"),
            move |a| a.create_channel(&redo_name),
            move |a| a.remove_channel(&undo_name).map(|_| ()),
        );
        Ok(())
    }

    pub fn remove_channel(&mut self, name: &str) -> CurvefxResult<()> {
        let removed = self.automaton.remove_channel(name)?;
        let items = removed.items().to_vec();
        let used = removed.is_used();
        let redo_name = name.to_string();
        let undo_name = name.to_string();
        self.history.push(
            format!("Remove channel '{name}'"),
            move |a| a.remove_channel(&redo_name).map(|_| ()),
            move |a| restore_channel(a, &undo_name, items.clone(), used),
        );
        Ok(())
    }

    pub fn rename_channel(&mut self, from: &str, to: &str) -> CurvefxResult<()> {
        if from == to {
            return Ok(());
        }
        self.automaton.rename_channel(from, to)?;
        let (f1, t1) = (from.to_string(), to.to_string());
        let (f2, t2) = (f1.clone(), t1.clone());
        self.history.push(
            format!("Rename channel '{from}' to '{to}'"),
            move |a| a.rename_channel(&f1, &t1),
            move |a| a.rename_channel(&t2, &f2),
        );
        Ok(())
    }

    // Items

    pub fn create_curve_item(
        &mut self,
        channel: &str,
        time: f64,
        curve: CurveId,
    ) -> CurvefxResult<ItemId> {
        self.edit_items(channel, format!("Add {curve} to '{channel}'"), |a| {
            a.create_curve_item(channel, time, curve)
        })
    }

    pub fn create_constant_item(
        &mut self,
        channel: &str,
        time: f64,
        length: f64,
        value: f64,
    ) -> CurvefxResult<ItemId> {
        self.edit_items(channel, format!("Add constant to '{channel}'"), |a| {
            a.create_constant_item(channel, time, length, value)
        })
    }

    pub fn move_item(&mut self, channel: &str, item: ItemId, time: f64) -> CurvefxResult<f64> {
        self.edit_items(channel, format!("Move {item}"), |a| {
            a.channel_or_err(channel)?.move_item(item, time)
        })
    }

    pub fn resize_item(&mut self, channel: &str, item: ItemId, length: f64) -> CurvefxResult<f64> {
        self.edit_items(channel, format!("Resize {item}"), |a| {
            a.channel_or_err(channel)?.resize_item(item, length)
        })
    }

    pub fn set_item_value(&mut self, channel: &str, item: ItemId, value: f64) -> CurvefxResult<()> {
        self.edit_items(channel, format!("Change value of {item}"), |a| {
            a.channel_or_err(channel)?.set_item_value(item, value)
        })
    }

    pub fn set_item_transform(
        &mut self,
        channel: &str,
        item: ItemId,
        speed: f64,
        offset: f64,
        amp: f64,
    ) -> CurvefxResult<()> {
        self.edit_items(channel, format!("Change transform of {item}"), |a| {
            a.channel_or_err(channel)?
                .set_item_transform(item, speed, offset, amp)
        })
    }

    pub fn set_item_reset(&mut self, channel: &str, item: ItemId, reset: bool) -> CurvefxResult<()> {
        self.edit_items(channel, format!("Toggle reset of {item}"), |a| {
            a.channel_or_err(channel)?.set_item_reset(item, reset)
        })
    }

    pub fn remove_item(&mut self, channel: &str, item: ItemId) -> CurvefxResult<()> {
        self.edit_items(channel, format!("Remove {item}"), |a| {
            a.channel_or_err(channel)?.remove_item(item).map(|_| ())
        })
    }

    // Timeline

    /// Change the timeline length. Trimming is not reversible, so history is dropped.
    pub fn set_length(&mut self, length: f64) -> CurvefxResult<()> {
        self.automaton.set_length(length)?;
        self.history.drop_all();
        Ok(())
    }

    /// Change the resolution. History entries hold node lists, not samples, and stay valid.
    pub fn set_resolution(&mut self, resolution: f64) -> CurvefxResult<()> {
        self.automaton.set_resolution(resolution)
    }

    pub fn set_label(&mut self, name: &str, time: f64) -> CurvefxResult<()> {
        let previous = self.automaton.labels().get(name).copied();
        self.automaton.set_label(name, time)?;
        let redo_name = name.to_string();
        let undo_name = name.to_string();
        self.history.push(
            format!("Set label '{name}'"),
            move |a| a.set_label(&redo_name, time),
            move |a| restore_label(a, &undo_name, previous),
        );
        Ok(())
    }

    /// Returns `false` (and records nothing) when there is no such label.
    pub fn delete_label(&mut self, name: &str) -> bool {
        let Some(time) = self.automaton.delete_label(name) else {
            return false;
        };
        let redo_name = name.to_string();
        let undo_name = name.to_string();
        self.history.push(
            format!("Delete label '{name}'"),
            move |a| restore_label(a, &redo_name, None),
            move |a| a.set_label(&undo_name, time),
        );
        true
    }

    pub fn set_loop_region(&mut self, region: Option<LoopRegion>) -> CurvefxResult<()> {
        let previous = self.automaton.loop_region();
        self.automaton.set_loop_region(region)?;
        self.history.push(
            "Change loop region",
            move |a| a.set_loop_region(region),
            move |a| a.set_loop_region(previous),
        );
        Ok(())
    }
}

type CurveSnapshot = (f64, Vec<BezierNode>, Vec<FxSection>);

fn curve_snapshot(curve: &Curve) -> CurveSnapshot {
    (curve.length(), curve.nodes().to_vec(), curve.fxs().to_vec())
}

fn restore_channel(
    automaton: &mut Automaton,
    name: &str,
    items: Vec<ChannelItem>,
    used: bool,
) -> CurvefxResult<()> {
    automaton.create_channel(name)?;
    let channel = automaton.channel_or_err(name)?;
    channel.replace_items(items)?;
    if used {
        channel.mark_used();
    }
    Ok(())
}

fn restore_label(automaton: &mut Automaton, name: &str, time: Option<f64>) -> CurvefxResult<()> {
    match time {
        Some(time) => automaton.set_label(name, time),
        None => {
            automaton.delete_label(name);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/automaton/editor.rs"]
mod tests;
