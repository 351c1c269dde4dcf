//! Time-indexed history of simulation entities.
//!
//! Each entity kind has a [`HistoryManager`] holding one [`HistoryMap`] per
//! entity. A map holds sparse, dated [`HistoryEntry`] records: an unset
//! field inherits from earlier entries, a set field overrides from its date
//! on, and delta fields (such as cores) add to or remove from what came
//! before. Registering twice at one date merges into the existing entry.

mod country;
mod load;
mod manager;
mod map;
mod province;

pub use country::{CountryHistoryEntry, CountryHistoryManager, CountryState};
pub use load::{is_date_key, load_dated_history};
pub use manager::{HistoryManager, Lifecycle};
pub use map::HistoryMap;
pub use province::{ProvinceHistoryEntry, ProvinceHistoryManager, ProvinceState};

/// Delta removals in a registration that had nothing to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDelta {
    pub field: &'static str,
    pub missing: Vec<String>,
}

/// A sparse record registered at one date for one entity.
pub trait HistoryEntry: Default {
    /// Fully resolved attributes of the entity.
    type State: Default + Clone;

    /// Entity kind used in messages, e.g. `"province"`.
    const KIND: &'static str;

    /// Fold this entry onto the state in effect just before its date.
    fn apply(&self, state: &mut Self::State);

    /// Merge a later registration at the same date into this entry.
    ///
    /// Set fields of `newer` replace ours; delta grants are appended
    /// without deduplication. A delta removal first cancels a matching grant
    /// in this entry, otherwise it must name a value present in `before`,
    /// the state in effect just before this entry's date. Everything that
    /// can be merged is merged even when some removals are missing.
    fn absorb(&mut self, newer: Self, before: &Self::State) -> Result<(), MissingDelta>;
}

/// Replace `slot` when `value` is set.
pub(crate) fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
