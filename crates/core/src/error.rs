use serde::{Deserialize, Serialize};
use std::fmt;

use crate::date::Date;

/// Coarse classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Wrong node kind or shape.
    StructuralMismatch,
    /// Text does not parse as the requested primitive.
    Format,
    /// Value parsed but lies outside its domain.
    Range,
    /// Missing mandatory key, or repeat of a non-repeatable key.
    Cardinality,
    /// Identifier does not resolve in the registry it names.
    Reference,
    /// Data contradicts what was registered before it.
    Consistency,
    /// Operation attempted in the wrong lifecycle state.
    Lifecycle,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::StructuralMismatch => "structural_mismatch",
            DiagnosticKind::Format => "format",
            DiagnosticKind::Range => "range",
            DiagnosticKind::Cardinality => "cardinality",
            DiagnosticKind::Reference => "reference",
            DiagnosticKind::Consistency => "consistency",
            DiagnosticKind::Lifecycle => "lifecycle",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation failure, with as much location context as the
/// reporting site had.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            file: None,
            line: None,
            key: None,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::StructuralMismatch, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Format, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Range, message)
    }

    pub fn cardinality(message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Cardinality, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Reference, message)
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Consistency, message)
    }

    pub fn lifecycle(message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Lifecycle, message)
    }

    /// Attach a source line unless one is already recorded.
    pub fn at_line(mut self, line: Option<u32>) -> Self {
        if self.line.is_none() {
            self.line = line;
        }
        self
    }

    /// Attach the dictionary key being validated unless a deeper key is
    /// already recorded.
    pub fn with_key(mut self, key: &str) -> Self {
        if self.key.is_none() {
            self.key = Some(key.to_owned());
        }
        self
    }

    pub fn in_file(mut self, file: &str) -> Self {
        if self.file.is_none() {
            self.file = Some(file.to_owned());
        }
        self
    }

    /// Serialize to JSON for `--output json`.
    /// Always includes every field (null for missing), unlike the serde
    /// derive which skips absent ones.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "file":    self.file,
            "key":     self.key,
            "kind":    self.kind.as_str(),
            "line":    self.line,
            "message": self.message,
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: ", file, line)?,
            (Some(file), None) => write!(f, "{}: ", file)?,
            (None, Some(line)) => write!(f, "line {}: ", line)?,
            (None, None) => {}
        }
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(key) = &self.key {
            write!(f, " (key '{}')", key)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Diagnostics gathered by one validation, in the order they were reported.
///
/// Composite validators never stop at the first failure: every child result
/// is folded in with [`Diagnostics::record`] and the aggregate is returned by
/// [`Diagnostics::finish`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

/// Result of a validator. An `Err` always carries at least one diagnostic.
pub type Outcome<T = ()> = Result<T, Diagnostics>;

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Keep the value of a successful outcome, or absorb its diagnostics.
    pub fn record<T>(&mut self, outcome: Outcome<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(diagnostics) => {
                self.extend(diagnostics);
                None
            }
        }
    }

    /// Succeed with `value` if nothing was recorded.
    pub fn finish<T>(self, value: T) -> Outcome<T> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.kind == kind)
    }

    pub fn with_key(self, key: &str) -> Self {
        Diagnostics(self.0.into_iter().map(|d| d.with_key(key)).collect())
    }

    pub fn at_line(self, line: Option<u32>) -> Self {
        Diagnostics(self.0.into_iter().map(|d| d.at_line(line)).collect())
    }

    pub fn in_file(self, file: &str) -> Self {
        Diagnostics(self.0.into_iter().map(|d| d.in_file(file)).collect())
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Diagnostics(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Diagnostics(diagnostics)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d Diagnostic;
    type IntoIter = std::slice::Iter<'d, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

/// A value that is produced even when reading it went wrong, together with
/// whatever went wrong. Callers must check [`BestEffort::is_ok`] rather than
/// inspect the value for a default.
#[derive(Debug, Clone, PartialEq)]
pub struct BestEffort<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> BestEffort<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        BestEffort { value, diagnostics }
    }

    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_outcome(self) -> Outcome<T> {
        self.diagnostics.finish(self.value)
    }
}

/// Failures of history registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// Registration attempted after the manager was locked.
    #[error("cannot register {kind} history for {entity} at {date}: history is locked")]
    Locked {
        kind: &'static str,
        entity: String,
        date: Date,
    },

    /// A delta removal names a value that is not present at that date.
    #[error(
        "in {kind} history of {entity}, tried to remove nonexistent {field} at {date}: {}",
        .missing.join(", ")
    )]
    MissingDelta {
        kind: &'static str,
        entity: String,
        date: Date,
        field: &'static str,
        missing: Vec<String>,
    },

    #[error("{kind} history is already locked")]
    AlreadyLocked { kind: &'static str },
}

impl From<HistoryError> for Diagnostic {
    fn from(err: HistoryError) -> Self {
        let (kind, entity) = match &err {
            HistoryError::Locked { entity, .. } => (DiagnosticKind::Lifecycle, Some(entity.clone())),
            HistoryError::MissingDelta { entity, .. } => {
                (DiagnosticKind::Consistency, Some(entity.clone()))
            }
            HistoryError::AlreadyLocked { .. } => (DiagnosticKind::Lifecycle, None),
        };
        let diagnostic = Diagnostic::new(kind, err.to_string());
        match entity {
            Some(entity) => diagnostic.with_key(&entity),
            None => diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_succeeds_only_when_nothing_recorded() {
        let empty = Diagnostics::new();
        assert_eq!(empty.finish(7), Ok(7));

        let mut failed = Diagnostics::new();
        failed.push(Diagnostic::format("bad"));
        assert_eq!(failed.finish(7).unwrap_err().len(), 1);
    }

    #[test]
    fn record_keeps_value_and_collects_failures() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(diagnostics.record(Ok::<_, Diagnostics>(3)), Some(3));
        assert_eq!(
            diagnostics.record::<u8>(Err(Diagnostic::range("too big").into())),
            None
        );
        assert_eq!(
            diagnostics.record::<u8>(Err(Diagnostic::format("not a number").into())),
            None
        );
        let kinds: Vec<_> = diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::Range, DiagnosticKind::Format]);
    }

    #[test]
    fn context_is_only_attached_once() {
        let d = Diagnostic::format("bad")
            .with_key("inner")
            .with_key("outer")
            .at_line(Some(4))
            .at_line(Some(1));
        assert_eq!(d.key.as_deref(), Some("inner"));
        assert_eq!(d.line, Some(4));
    }

    #[test]
    fn json_value_has_every_field() {
        let d = Diagnostic::cardinality("missing mandatory key 'owner'");
        let json = d.to_json_value();
        assert_eq!(json["kind"], "cardinality");
        assert!(json["file"].is_null());
        assert!(json["line"].is_null());
        assert!(json["key"].is_null());
    }

    #[test]
    fn display_includes_location() {
        let d = Diagnostic::reference("unknown country 'XXX'")
            .in_file("1 - London.txt")
            .at_line(Some(3))
            .with_key("owner");
        assert_eq!(
            d.to_string(),
            "1 - London.txt:3: reference: unknown country 'XXX' (key 'owner')"
        );
    }

    #[test]
    fn history_errors_map_to_taxonomy() {
        let locked: Diagnostic = HistoryError::Locked {
            kind: "province",
            entity: "1".into(),
            date: Date::from_ymd(1836, 1, 1),
        }
        .into();
        assert_eq!(locked.kind, DiagnosticKind::Lifecycle);

        let missing: Diagnostic = HistoryError::MissingDelta {
            kind: "province",
            entity: "1".into(),
            date: Date::from_ymd(1840, 1, 1),
            field: "core",
            missing: vec!["FRA".into()],
        }
        .into();
        assert_eq!(missing.kind, DiagnosticKind::Consistency);
        assert!(missing.message.contains("FRA"));
        assert!(missing.message.contains("1840.1.1"));
        assert_eq!(missing.key.as_deref(), Some("1"));
    }
}
