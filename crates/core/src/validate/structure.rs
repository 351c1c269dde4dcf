//! Combinators over lists and dictionaries.

use super::primitives::{expect_identifier_or_string, kind_mismatch};
use crate::ast::{Node, NodeValue};
use crate::error::{Diagnostic, Diagnostics, Outcome};

pub fn expect_list(node: &Node) -> Outcome<&[Node]> {
    match &node.value {
        NodeValue::List(items) => Ok(items),
        _ => Err(kind_mismatch(node, "list")),
    }
}

/// Apply `cb` to every child of a list, collecting every failure.
pub fn expect_list_of<'n, F>(node: &'n Node, mut cb: F) -> Outcome
where
    F: FnMut(&'n Node) -> Outcome,
{
    let items = expect_list(node)?;
    let mut diagnostics = Diagnostics::new();
    for item in items {
        diagnostics.record(cb(item).map_err(|d| d.at_line(item.line)));
    }
    diagnostics.finish(())
}

/// A list of exactly `length` children.
///
/// A length mismatch is reported, but `cb` still runs on the first
/// `min(length, actual)` children so their own defects surface too.
pub fn expect_list_of_length<'n, F>(node: &'n Node, length: usize, mut cb: F) -> Outcome
where
    F: FnMut(&'n Node) -> Outcome,
{
    let items = expect_list(node)?;
    let mut diagnostics = Diagnostics::new();
    if items.len() != length {
        diagnostics.push(
            Diagnostic::structural(format!(
                "list of length {} when expecting length {}",
                items.len(),
                length
            ))
            .at_line(node.line),
        );
    }
    for item in items.iter().take(length) {
        diagnostics.record(cb(item).map_err(|d| d.at_line(item.line)));
    }
    diagnostics.finish(())
}

pub fn expect_assign(node: &Node) -> Outcome<(&str, &Node)> {
    match &node.value {
        NodeValue::Assignment { key, value } => Ok((key, value)),
        _ => Err(kind_mismatch(node, "assignment")),
    }
}

/// A list of assignments, visited in source order.
///
/// Keys are not deduplicated here. Failures from `cb` are tagged with the
/// key they were reported under, and every child is visited even after one
/// fails.
pub fn expect_dictionary<'n, F>(node: &'n Node, mut cb: F) -> Outcome
where
    F: FnMut(&'n str, &'n Node) -> Outcome,
{
    let items = expect_list(node)?;
    let mut diagnostics = Diagnostics::new();
    for item in items {
        match &item.value {
            NodeValue::Assignment { key, value } => {
                diagnostics.record(
                    cb(key, value).map_err(|d| d.with_key(key).at_line(item.line)),
                );
            }
            _ => diagnostics.extend(kind_mismatch(item, "assignment")),
        }
    }
    diagnostics.finish(())
}

/// A list of non-empty identifiers or strings.
pub fn expect_name_list(node: &Node) -> Outcome<Vec<&str>> {
    let mut names = Vec::new();
    expect_list_of(node, |item| {
        let name = expect_identifier_or_string(item)?;
        if name.is_empty() {
            return Err(Diagnostic::format("empty name in name list")
                .at_line(item.line)
                .into());
        }
        names.push(name);
        Ok(())
    })?;
    Ok(names)
}
