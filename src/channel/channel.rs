use crate::channel::item::{ChannelItem, ItemKind};
use crate::curve::overlap::has_overwrap;
use crate::curve::set::CurveSet;
use crate::foundation::core::{CurveId, IdGen, ItemId, ensure_finite, ensure_positive};
use crate::foundation::error::{CurvefxError, CurvefxResult};
use crate::foundation::events::{ListenerId, Observers};
use crate::foundation::status::{StatusCode, StatusLevel, Statuses};

/// Events emitted by a [`Channel`].
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    CreateItem { id: ItemId },
    UpdateItem { id: ItemId },
    RemoveItem { id: ItemId },
    /// The whole item list was swapped (history replay).
    ReplaceItems,
    /// Playback read the channel.
    Update { time: f64, value: f64 },
    /// Playback entered an item. `reset` mirrors the item's flag.
    ItemEnter { id: ItemId, reset: bool },
    /// Playback left an item.
    ItemLeave { id: ItemId },
    ChangeStatus,
}

/// A named sequence of non-overlapping items resolving to one scalar per time.
#[derive(Debug)]
pub struct Channel {
    items: Vec<ChannelItem>,
    /// Items may not extend past this time (the automaton length).
    limit: f64,
    ids: IdGen,
    current: Option<ItemId>,
    last_time: f64,
    last_value: f64,
    statuses: Statuses,
    observers: Observers<ChannelEvent>,
}

impl Channel {
    /// Empty channel on a timeline of `limit` seconds, flagged as not used yet.
    pub fn new(limit: f64) -> CurvefxResult<Self> {
        ensure_positive("channel limit", limit)?;
        Ok(Self::with_limit(limit))
    }

    /// Same as [`Channel::new`] for a limit the caller already validated.
    pub(crate) fn with_limit(limit: f64) -> Self {
        let mut statuses = Statuses::default();
        statuses.set(
            StatusCode::NotUsed,
            StatusLevel::Warning,
            "this channel is never read by the host",
        );
        Self {
            items: Vec::new(),
            limit,
            ids: IdGen::default(),
            current: None,
            last_time: 0.0,
            last_value: 0.0,
            statuses,
            observers: Observers::default(),
        }
    }

    /// Items sorted by time.
    pub fn items(&self) -> &[ChannelItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&ChannelItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// End of the last item, 0 when empty.
    pub fn length(&self) -> f64 {
        self.items.last().map_or(0.0, ChannelItem::end)
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    pub fn statuses(&self) -> &Statuses {
        &self.statuses
    }

    pub fn is_used(&self) -> bool {
        !self.statuses.has(StatusCode::NotUsed)
    }

    /// Clear the not-used status. Returns `true` the first time.
    pub fn mark_used(&mut self) -> bool {
        let changed = self.statuses.clear(StatusCode::NotUsed);
        if changed {
            self.observers.emit(&ChannelEvent::ChangeStatus);
        }
        changed
    }

    pub fn uses_curve(&self, curve: CurveId) -> bool {
        self.items.iter().any(|i| i.kind.curve_id() == Some(curve))
    }

    pub fn on(&mut self, listener: impl FnMut(&ChannelEvent) + 'static) -> ListenerId {
        self.observers.on(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.observers.off(id)
    }

    /// Value at `time`.
    ///
    /// The last item starting at or before `time` decides; past its end the item holds its
    /// terminal value. Before the first item the channel reads 0.
    pub fn get_value(&self, time: f64, curves: &CurveSet) -> f64 {
        match self.item_before(time) {
            Some(item) => item.value_at((time - item.time).min(item.length), curves),
            None => 0.0,
        }
    }

    /// Read the channel at `time` on behalf of playback and report item boundary crossings.
    pub fn update(&mut self, time: f64, curves: &CurveSet) -> f64 {
        let value = self.get_value(time, curves);
        let active = self
            .item_before(time)
            .filter(|item| time < item.end())
            .map(|item| (item.id, item.reset));

        let seeked_back = time < self.last_time;
        let entered = match (self.current, active) {
            (Some(prev), Some((id, _))) => prev != id || seeked_back,
            (None, Some(_)) => true,
            (_, None) => false,
        };
        if let Some(prev) = self.current
            && (entered || active.is_none())
        {
            self.observers.emit(&ChannelEvent::ItemLeave { id: prev });
        }
        if let Some((id, reset)) = active
            && entered
        {
            self.observers.emit(&ChannelEvent::ItemEnter { id, reset });
        }

        self.current = active.map(|(id, _)| id);
        self.last_time = time;
        self.last_value = value;
        self.observers.emit(&ChannelEvent::Update { time, value });
        value
    }

    fn item_before(&self, time: f64) -> Option<&ChannelItem> {
        let i = self.items.partition_point(|item| item.time <= time);
        i.checked_sub(1).map(|i| &self.items[i])
    }

    // Items

    pub fn create_constant_item(
        &mut self,
        time: f64,
        length: f64,
        value: f64,
    ) -> CurvefxResult<ItemId> {
        self.create_item(time, length, ItemKind::Constant { value }, false)
    }

    /// Curve item with the identity transform.
    pub fn create_curve_item(
        &mut self,
        time: f64,
        length: f64,
        curve: CurveId,
    ) -> CurvefxResult<ItemId> {
        self.create_item(time, length, ItemKind::curve(curve), false)
    }

    /// Insert an item of any kind with a fresh id.
    pub fn create_item(
        &mut self,
        time: f64,
        length: f64,
        kind: ItemKind,
        reset: bool,
    ) -> CurvefxResult<ItemId> {
        check_kind(kind)?;
        self.check_span(time, length)?;
        let id = ItemId(self.ids.issue());
        self.insert_item(ChannelItem {
            id,
            time,
            length,
            kind,
            reset,
        });
        self.observers.emit(&ChannelEvent::CreateItem { id });
        Ok(id)
    }

    /// Re-insert an item with a known id, typically one returned by [`Channel::remove_item`].
    pub fn restore_item(&mut self, item: ChannelItem) -> CurvefxResult<()> {
        if self.item(item.id).is_some() {
            return Err(CurvefxError::validation(format!(
                "{} already exists",
                item.id
            )));
        }
        check_kind(item.kind)?;
        self.check_span(item.time, item.length)?;
        self.ids.reserve(item.id.0);
        let id = item.id;
        self.insert_item(item);
        self.observers.emit(&ChannelEvent::CreateItem { id });
        Ok(())
    }

    /// Move an item, clamped between its neighbours and the timeline. Returns the applied time.
    pub fn move_item(&mut self, id: ItemId, time: f64) -> CurvefxResult<f64> {
        let index = self.item_index(id)?;
        ensure_finite("item time", time)?;
        let (lo, hi) = self.bounds(index);
        let item = &mut self.items[index];
        let time = time.clamp(lo, (hi - item.length).max(lo));
        item.time = time;
        self.observers.emit(&ChannelEvent::UpdateItem { id });
        Ok(time)
    }

    /// Change an item's length, clamped to the next item or the timeline end. Returns the
    /// applied length.
    pub fn resize_item(&mut self, id: ItemId, length: f64) -> CurvefxResult<f64> {
        let index = self.item_index(id)?;
        ensure_positive("item length", length)?;
        let (_, hi) = self.bounds(index);
        let item = &mut self.items[index];
        let length = length.min(hi - item.time);
        item.length = length;
        self.observers.emit(&ChannelEvent::UpdateItem { id });
        Ok(length)
    }

    /// Set the value of a constant item.
    pub fn set_item_value(&mut self, id: ItemId, value: f64) -> CurvefxResult<()> {
        let index = self.item_index(id)?;
        ensure_finite("item value", value)?;
        match &mut self.items[index].kind {
            ItemKind::Constant { value: v } => *v = value,
            ItemKind::Curve { .. } => {
                return Err(CurvefxError::validation(format!(
                    "{id} is a curve item and has no value"
                )));
            }
        }
        self.observers.emit(&ChannelEvent::UpdateItem { id });
        Ok(())
    }

    /// Set speed, offset and amp of a curve item.
    pub fn set_item_transform(
        &mut self,
        id: ItemId,
        speed: f64,
        offset: f64,
        amp: f64,
    ) -> CurvefxResult<()> {
        let index = self.item_index(id)?;
        ensure_finite("item speed", speed)?;
        ensure_finite("item offset", offset)?;
        ensure_finite("item amp", amp)?;
        match &mut self.items[index].kind {
            ItemKind::Curve {
                speed: s,
                offset: o,
                amp: a,
                ..
            } => {
                *s = speed;
                *o = offset;
                *a = amp;
            }
            ItemKind::Constant { .. } => {
                return Err(CurvefxError::validation(format!(
                    "{id} is a constant item and has no transform"
                )));
            }
        }
        self.observers.emit(&ChannelEvent::UpdateItem { id });
        Ok(())
    }

    pub fn set_item_reset(&mut self, id: ItemId, reset: bool) -> CurvefxResult<()> {
        let index = self.item_index(id)?;
        self.items[index].reset = reset;
        self.observers.emit(&ChannelEvent::UpdateItem { id });
        Ok(())
    }

    /// Remove an item and return it.
    pub fn remove_item(&mut self, id: ItemId) -> CurvefxResult<ChannelItem> {
        let index = self.item_index(id)?;
        let item = self.items.remove(index);
        if self.current == Some(id) {
            self.current = None;
        }
        self.observers.emit(&ChannelEvent::RemoveItem { id });
        Ok(item)
    }

    /// Swap the whole item list, keeping ids. Used by history replay.
    pub(crate) fn replace_items(&mut self, mut items: Vec<ChannelItem>) -> CurvefxResult<()> {
        items.sort_by(|a, b| a.time.total_cmp(&b.time));
        for (i, item) in items.iter().enumerate() {
            check_kind(item.kind)?;
            ensure_finite("item time", item.time)?;
            ensure_positive("item length", item.length)?;
            if item.time < 0.0 || item.end() > self.limit {
                return Err(CurvefxError::validation(format!(
                    "{} lies outside [0, {}]",
                    item.id, self.limit
                )));
            }
            if i > 0 && has_overwrap(item.time, item.length, items[i - 1].time, items[i - 1].length)
            {
                return Err(CurvefxError::validation(format!(
                    "{} overlaps {}",
                    item.id,
                    items[i - 1].id
                )));
            }
        }
        for item in &items {
            self.ids.reserve(item.id.0);
        }
        self.items = items;
        self.current = None;
        self.observers.emit(&ChannelEvent::ReplaceItems);
        Ok(())
    }

    /// Shrink or grow the timeline. Items starting at or past `limit` are dropped and the
    /// rest are clipped.
    pub(crate) fn trim(&mut self, limit: f64) -> CurvefxResult<()> {
        ensure_positive("channel limit", limit)?;
        let before = self.items.len();
        self.items.retain(|item| item.time < limit);
        for item in &mut self.items {
            item.length = item.length.min(limit - item.time);
        }
        if self.items.len() != before {
            tracing::debug!(dropped = before - self.items.len(), "trimmed channel items");
        }
        if self.current.is_some_and(|id| self.item(id).is_none()) {
            self.current = None;
        }
        self.limit = limit;
        Ok(())
    }

    fn insert_item(&mut self, item: ChannelItem) {
        let at = self.items.partition_point(|i| i.time <= item.time);
        self.items.insert(at, item);
    }

    fn item_index(&self, id: ItemId) -> CurvefxResult<usize> {
        self.items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| CurvefxError::validation(format!("unknown {id}")))
    }

    /// Free interval around item `index`: previous end and next start.
    fn bounds(&self, index: usize) -> (f64, f64) {
        let lo = index
            .checked_sub(1)
            .map_or(0.0, |prev| self.items[prev].end());
        let hi = self
            .items
            .get(index + 1)
            .map_or(self.limit, |next| next.time);
        (lo, hi)
    }

    fn check_span(&self, time: f64, length: f64) -> CurvefxResult<()> {
        ensure_finite("item time", time)?;
        ensure_positive("item length", length)?;
        if time < 0.0 || time + length > self.limit {
            return Err(CurvefxError::validation(format!(
                "item span [{time}, {}) is outside [0, {}]",
                time + length,
                self.limit
            )));
        }
        let blocked = self
            .items
            .iter()
            .find(|other| has_overwrap(time, length, other.time, other.length));
        if let Some(other) = blocked {
            return Err(CurvefxError::validation(format!(
                "item span [{time}, {}) overlaps {}",
                time + length,
                other.id
            )));
        }
        Ok(())
    }
}

fn check_kind(kind: ItemKind) -> CurvefxResult<()> {
    match kind {
        ItemKind::Constant { value } => {
            ensure_finite("item value", value)?;
        }
        ItemKind::Curve {
            speed, offset, amp, ..
        } => {
            ensure_finite("item speed", speed)?;
            ensure_finite("item offset", offset)?;
            ensure_finite("item amp", amp)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/channel/channel.rs"]
mod tests;
