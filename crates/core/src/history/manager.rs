use std::collections::BTreeMap;

use super::{HistoryEntry, HistoryMap};
use crate::date::Date;
use crate::error::{Diagnostic, Diagnostics, HistoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Open,
    Locked,
}

/// Histories of every entity of one kind.
///
/// Entities are referenced by identifiers borrowed from the registry that
/// owns them.
#[derive(Debug, Clone)]
pub struct HistoryManager<'a, E> {
    histories: BTreeMap<&'a str, HistoryMap<E>>,
    lifecycle: Lifecycle,
}

impl<'a, E> Default for HistoryManager<'a, E> {
    fn default() -> Self {
        HistoryManager {
            histories: BTreeMap::new(),
            lifecycle: Lifecycle::Open,
        }
    }
}

impl<'a, E: HistoryEntry> HistoryManager<'a, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_locked(&self) -> bool {
        self.lifecycle == Lifecycle::Locked
    }

    pub fn register(&mut self, entity: &'a str, date: Date, entry: E) -> Result<(), HistoryError> {
        if self.is_locked() {
            return Err(HistoryError::Locked {
                kind: E::KIND,
                entity: entity.to_owned(),
                date,
            });
        }
        self.histories
            .entry(entity)
            .or_default()
            .register(date, entry)
            .map_err(|missing| HistoryError::MissingDelta {
                kind: E::KIND,
                entity: entity.to_owned(),
                date,
                field: missing.field,
                missing: missing.missing,
            })
    }

    /// Stop accepting registrations.
    ///
    /// Returns the `expected` entities that have no history, each also
    /// logged as a warning. Having none is legitimate for some entities so
    /// this does not fail the lock.
    pub fn lock(
        &mut self,
        expected: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<&'a str>, HistoryError> {
        if self.is_locked() {
            return Err(HistoryError::AlreadyLocked { kind: E::KIND });
        }
        self.lifecycle = Lifecycle::Locked;
        let missing: Vec<&'a str> = expected
            .into_iter()
            .filter(|entity| self.histories.get(entity).map_or(true, HistoryMap::is_empty))
            .collect();
        for entity in &missing {
            tracing::warn!(kind = E::KIND, entity = *entity, "no history entries");
        }
        tracing::info!(
            kind = E::KIND,
            entities = self.histories.len(),
            missing = missing.len(),
            "locked history"
        );
        Ok(missing)
    }

    pub fn get_history(&self, entity: &str) -> Option<&HistoryMap<E>> {
        self.histories.get(entity)
    }

    /// Entities with at least one registration, in identifier order.
    pub fn entities(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.histories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Effective state of one entity at `date`, falling back to its earliest
    /// entry when its history starts after `date`.
    pub fn state_at(&self, entity: &str, date: Date) -> Option<E::State> {
        let history = self.histories.get(entity)?;
        history
            .state_at(date)
            .or_else(|| history.earliest().and_then(|(first, _)| history.state_at(first)))
    }

    /// Effective state of every entity at `date`.
    ///
    /// Entities without any entry are left out and reported.
    pub fn snapshot(&self, date: Date) -> (BTreeMap<&'a str, E::State>, Diagnostics) {
        let mut states = BTreeMap::new();
        let mut diagnostics = Diagnostics::new();
        for &entity in self.histories.keys() {
            match self.state_at(entity, date) {
                Some(state) => {
                    states.insert(entity, state);
                }
                None => diagnostics.push(
                    Diagnostic::consistency(format!(
                        "{} {} has no history entries at {}",
                        E::KIND,
                        entity,
                        date
                    ))
                    .with_key(entity),
                ),
            }
        }
        (states, diagnostics)
    }
}
