//! Linear undo/redo log.
//!
//! Entries are opaque closures over a target `T`; the stack holds no domain knowledge. Pushing
//! while some entries are undone discards them, so there is never more than one future.

use crate::foundation::error::CurvefxResult;

/// Replay step applied to the edited target.
pub type HistoryFn<T> = Box<dyn Fn(&mut T) -> CurvefxResult<()>>;

/// One reversible edit.
pub struct HistoryEntry<T> {
    pub description: String,
    redo: HistoryFn<T>,
    undo: HistoryFn<T>,
}

impl<T> std::fmt::Debug for HistoryEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Undo/redo stack. `entries[index..]` are the redo steps.
pub struct HistoryStack<T> {
    entries: Vec<HistoryEntry<T>>,
    index: usize,
}

impl<T> Default for HistoryStack<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
        }
    }
}

impl<T> std::fmt::Debug for HistoryStack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStack")
            .field("entries", &self.entries)
            .field("index", &self.index)
            .finish()
    }
}

impl<T> HistoryStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit that has already been applied.
    pub fn push(
        &mut self,
        description: impl Into<String>,
        redo: impl Fn(&mut T) -> CurvefxResult<()> + 'static,
        undo: impl Fn(&mut T) -> CurvefxResult<()> + 'static,
    ) {
        let description = description.into();
        tracing::trace!(%description, index = self.index, "history push");
        self.entries.truncate(self.index);
        self.entries.push(HistoryEntry {
            description,
            redo: Box::new(redo),
            undo: Box::new(undo),
        });
        self.index += 1;
    }

    /// Revert the latest edit. Returns `Ok(false)` when there is nothing to undo.
    ///
    /// When the undo step fails the index is left where it was.
    pub fn undo(&mut self, target: &mut T) -> CurvefxResult<bool> {
        if self.index == 0 {
            return Ok(false);
        }
        let entry = &self.entries[self.index - 1];
        tracing::debug!(description = %entry.description, "undo");
        (entry.undo)(target)?;
        self.index -= 1;
        Ok(true)
    }

    /// Reapply the next undone edit. Returns `Ok(false)` when there is nothing to redo.
    ///
    /// When the redo step fails the index is left where it was.
    pub fn redo(&mut self, target: &mut T) -> CurvefxResult<bool> {
        let Some(entry) = self.entries.get(self.index) else {
            return Ok(false);
        };
        tracing::debug!(description = %entry.description, "redo");
        (entry.redo)(target)?;
        self.index += 1;
        Ok(true)
    }

    /// Forget every entry.
    pub fn drop_all(&mut self) {
        self.entries.clear();
        self.index = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.entries.len()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .map(|i| self.entries[i].description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.entries
            .get(self.index)
            .map(|e| e.description.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/stack.rs"]
mod tests;
