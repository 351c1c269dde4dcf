use std::collections::BTreeMap;

use super::{HistoryEntry, MissingDelta};
use crate::date::Date;

/// Dated entries of one entity, at most one per date.
#[derive(Debug, Clone)]
pub struct HistoryMap<E> {
    entries: BTreeMap<Date, E>,
}

impl<E> Default for HistoryMap<E> {
    fn default() -> Self {
        HistoryMap {
            entries: BTreeMap::new(),
        }
    }
}

impl<E: HistoryEntry> HistoryMap<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry at `date` or merge into the one already there.
    pub fn register(&mut self, date: Date, entry: E) -> Result<(), MissingDelta> {
        let before = Self::fold(self.entries.range(..date).map(|(_, e)| e));
        self.entries.entry(date).or_default().absorb(entry, &before)
    }

    pub fn get(&self, date: Date) -> Option<&E> {
        self.entries.get(&date)
    }

    /// The entry in effect at `date`: the latest one at or before it.
    pub fn entry_at(&self, date: Date) -> Option<(Date, &E)> {
        self.entries
            .range(..=date)
            .next_back()
            .map(|(d, e)| (*d, e))
    }

    pub fn earliest(&self) -> Option<(Date, &E)> {
        self.entries.first_key_value().map(|(d, e)| (*d, e))
    }

    /// Resolved attributes at `date`, or `None` if history starts later.
    pub fn state_at(&self, date: Date) -> Option<E::State> {
        self.entry_at(date)?;
        Some(Self::fold(self.entries.range(..=date).map(|(_, e)| e)))
    }

    fn fold<'e>(entries: impl Iterator<Item = &'e E>) -> E::State
    where
        E: 'e,
    {
        let mut state = E::State::default();
        for entry in entries {
            entry.apply(&mut state);
        }
        state
    }

    /// Entries in date order.
    pub fn iter(&self) -> impl Iterator<Item = (Date, &E)> + '_ {
        self.entries.iter().map(|(d, e)| (*d, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
