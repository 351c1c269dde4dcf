//! annals-core: schema validation and dated history resolution for
//! simulation script data.
//!
//! Script text is parsed into a generic tree ([`parse_script`]), validated
//! with composable extractors and key schemas ([`validate`]), and turned
//! into typed records. Entity registries live in a [`Catalog`]; per-entity
//! dated records live in a [`HistoryManager`] and are resolved to the state
//! in effect at any date.
//!
//! # Public API
//!
//! - [`parse_script`] -- text to [`Node`] tree
//! - [`validate`] -- primitive extractors, list/dictionary combinators,
//!   [`KeySchema`]
//! - [`Catalog::load_catalog_file`] -- countries, provinces, buildings,
//!   reforms and name lists
//! - [`ProvinceHistoryManager`] / [`CountryHistoryManager`] --
//!   `load_history_file`, `lock_histories`, `get_history`, `snapshot`
//! - [`Diagnostic`] / [`Diagnostics`] -- every failure, as a value

pub mod ast;
pub mod catalog;
pub mod colour;
pub mod config;
pub mod date;
pub mod error;
pub mod history;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod validate;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{Node, NodeKind, NodeValue};
pub use catalog::{Building, Catalog, Country, Definition, Province, Reform};
pub use colour::Colour;
pub use config::LoadConfig;
pub use date::{Date, Timespan};
pub use error::{BestEffort, Diagnostic, DiagnosticKind, Diagnostics, HistoryError, Outcome};
pub use history::{
    CountryHistoryEntry, CountryHistoryManager, CountryState, HistoryEntry, HistoryManager,
    HistoryMap, ProvinceHistoryEntry, ProvinceHistoryManager, ProvinceState,
};
pub use registry::{HasIdentifier, IdentifierRegistry};
pub use validate::{Cardinality, KeySchema};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use parser::parse_script;
