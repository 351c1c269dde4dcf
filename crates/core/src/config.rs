use serde::{Deserialize, Serialize};

use crate::date::Date;
use crate::error::Diagnostic;

/// Timeline bounds for history loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Date the base entry of every history file is registered at.
    pub start_date: Date,
    /// Dated entries after this are rejected.
    pub end_date: Date,
}

impl LoadConfig {
    pub const DEFAULT_START: Date = Date::from_ymd(1836, 1, 1);
    pub const DEFAULT_END: Date = Date::from_ymd(1936, 1, 1);

    pub fn validate(&self) -> Result<(), Diagnostic> {
        if self.start_date > self.end_date {
            return Err(Diagnostic::range(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            start_date: LoadConfig::DEFAULT_START,
            end_date: LoadConfig::DEFAULT_END,
        }
    }
}
