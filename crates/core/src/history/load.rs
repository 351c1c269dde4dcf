use super::{HistoryEntry, HistoryManager};
use crate::ast::Node;
use crate::config::LoadConfig;
use crate::date::Date;
use crate::error::{BestEffort, Diagnostic, Diagnostics, HistoryError, Outcome};

/// Handler for keys an entry reader does not know.
pub type OtherKeys<'n, 'h> = dyn FnMut(&'n str, &'n Node) -> Outcome + 'h;

/// Keys that start a dated block, e.g. `1840.1.1 = { ... }`.
pub fn is_date_key(key: &str) -> bool {
    key.starts_with(|c: char| c.is_ascii_digit())
}

fn unknown_key(key: &str) -> Diagnostics {
    Diagnostic::structural(format!("invalid dictionary key '{}'", key)).into()
}

/// Load one history file for `entity`.
///
/// The root's own keys form the base entry, registered at the configured
/// start date; each `DATE = { ... }` child is an entry at that date.
/// `read_entry` validates one block, routing keys it does not recognise to
/// the handler it is given. Every block is registered even if it had
/// defects, and every defect of the file is returned.
pub fn load_dated_history<'a, 'n, E, R>(
    manager: &mut HistoryManager<'a, E>,
    entity: &'a str,
    config: &LoadConfig,
    root: &'n Node,
    mut read_entry: R,
) -> Outcome
where
    E: HistoryEntry,
    R: FnMut(&'n Node, &mut OtherKeys<'n, '_>) -> BestEffort<E>,
{
    if manager.is_locked() {
        return Err(Diagnostic::from(HistoryError::Locked {
            kind: E::KIND,
            entity: entity.to_owned(),
            date: config.start_date,
        })
        .into());
    }

    let mut diagnostics = Diagnostics::new();
    let mut dated: Vec<(&'n str, &'n Node)> = Vec::new();

    let base = read_entry(root, &mut |key: &'n str, value: &'n Node| {
        if is_date_key(key) {
            dated.push((key, value));
            Ok(())
        } else {
            Err(unknown_key(key))
        }
    });
    diagnostics.extend(base.diagnostics);
    if let Err(e) = manager.register(entity, config.start_date, base.value) {
        diagnostics.push(Diagnostic::from(e).at_line(root.line));
    }

    for (key, block) in dated {
        let parsed = Date::parse(key);
        if !parsed.is_ok() {
            diagnostics.extend(parsed.diagnostics.with_key(key).at_line(block.line));
            continue;
        }
        let date = parsed.value;
        if date > config.end_date {
            diagnostics.push(
                Diagnostic::range(format!(
                    "history date {} is after the end date {}",
                    date, config.end_date
                ))
                .with_key(key)
                .at_line(block.line),
            );
            continue;
        }

        let entry = read_entry(block, &mut |key: &'n str, _: &'n Node| {
            let message = if is_date_key(key) {
                format!("dated block '{}' cannot be nested", key)
            } else {
                format!("invalid dictionary key '{}'", key)
            };
            Err(Diagnostic::structural(message).into())
        });
        diagnostics.extend(entry.diagnostics.with_key(key));
        if let Err(e) = manager.register(entity, date, entry.value) {
            diagnostics.push(Diagnostic::from(e).at_line(block.line));
        }
    }

    tracing::debug!(
        kind = E::KIND,
        entity,
        entries = manager.get_history(entity).map_or(0, |h| h.len()),
        failures = diagnostics.len(),
        "loaded history file"
    );
    diagnostics.finish(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::history::map::tests::Entry;
    use crate::parser::parse_script;
    use crate::validate::{expect_identifier, Cardinality, KeySchema};

    fn read<'n>(node: &'n Node, other: &mut OtherKeys<'n, '_>) -> BestEffort<Entry> {
        let mut owner = None;
        let mut grants = Vec::new();
        let outcome = KeySchema::new()
            .key("owner", Cardinality::ZeroOrOne, |n| {
                owner = Some(leak(expect_identifier(n)?));
                Ok(())
            })
            .key("add_core", Cardinality::ZeroOrMore, |n| {
                grants.push(leak(expect_identifier(n)?));
                Ok(())
            })
            .fallback(|key, value| other(key, value))
            .validate(node);
        let entry = Entry {
            owner,
            grants,
            removals: Vec::new(),
        };
        BestEffort::new(entry, outcome.err().unwrap_or_default())
    }

    fn leak(text: &str) -> &'static str {
        Box::leak(text.to_owned().into_boxed_str())
    }

    fn load(manager: &mut HistoryManager<'static, Entry>, src: &str) -> Outcome {
        let root = parse_script(src, "1 - Test.txt").unwrap();
        load_dated_history(manager, "1", &LoadConfig::default(), &root, read)
    }

    #[test]
    fn base_entry_lands_on_start_date() {
        let mut manager = HistoryManager::new();
        load(&mut manager, "owner = ENG\n1840.1.1 = { owner = FRA }").unwrap();
        let history = manager.get_history("1").unwrap();
        let dates: Vec<_> = history.iter().map(|(d, _)| d.to_string()).collect();
        assert_eq!(dates, vec!["1836.1.1", "1840.1.1"]);
    }

    #[test]
    fn bad_blocks_are_reported_and_good_ones_kept() {
        let mut manager = HistoryManager::new();
        let err = load(
            &mut manager,
            "owner = ENG\n1840.13.1 = { owner = FRA }\n1950.1.1 = { owner = PRU }\n1850.1.1 = { owner = { } 1851.1.1 = { } }\nfoo = bar",
        )
        .unwrap_err();

        let history = manager.get_history("1").unwrap();
        assert_eq!(history.len(), 2); // base + 1850.1.1
        assert_eq!(history.get(Date::from_ymd(1850, 1, 1)).unwrap().owner, None);

        let mut kinds: Vec<_> = err.iter().map(|d| (d.kind, d.line)).collect();
        kinds.sort_by_key(|(_, line)| *line);
        assert_eq!(
            kinds,
            vec![
                (DiagnosticKind::Range, Some(2)),              // month 13
                (DiagnosticKind::Range, Some(3)),              // after end date
                (DiagnosticKind::StructuralMismatch, Some(4)), // owner = { }
                (DiagnosticKind::StructuralMismatch, Some(4)), // nested date
                (DiagnosticKind::StructuralMismatch, Some(5)), // foo
            ]
        );
    }

    #[test]
    fn locked_manager_fails_fast() {
        let mut manager = HistoryManager::new();
        manager.lock(["1"]).unwrap();
        let err = load(&mut manager, "owner = ENG").unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.has_kind(DiagnosticKind::Lifecycle));
        assert!(manager.get_history("1").is_none());
    }

    #[test]
    fn date_keys_start_with_a_digit() {
        assert!(is_date_key("1836.1.1"));
        assert!(is_date_key("1x"));
        assert!(!is_date_key("owner"));
        assert!(!is_date_key(""));
    }
}
