//! Named collections of uniquely identified items with an open/locked
//! lifecycle.

use std::collections::HashMap;

use crate::ast::Node;
use crate::error::{Diagnostic, Outcome};
use crate::validate::expect_identifier_or_string;

pub trait HasIdentifier {
    fn identifier(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct IdentifierRegistry<T> {
    name: &'static str,
    items: Vec<T>,
    index: HashMap<String, usize>,
    locked: bool,
}

impl<T: HasIdentifier> IdentifierRegistry<T> {
    /// `name` is the plural used in messages, e.g. `"countries"`.
    pub fn new(name: &'static str) -> Self {
        IdentifierRegistry {
            name,
            items: Vec::new(),
            index: HashMap::new(),
            locked: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add(&mut self, item: T) -> Result<(), Diagnostic> {
        if self.locked {
            return Err(Diagnostic::lifecycle(format!(
                "cannot add '{}' to {}: registry is locked",
                item.identifier(),
                self.name
            )));
        }
        let identifier = item.identifier();
        if identifier.is_empty() {
            return Err(Diagnostic::consistency(format!(
                "empty identifier in {}",
                self.name
            )));
        }
        if self.index.contains_key(identifier) {
            return Err(Diagnostic::consistency(format!(
                "duplicate identifier '{}' in {}",
                identifier, self.name
            )));
        }
        self.index.insert(identifier.to_owned(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn lock(&mut self) -> Result<(), Diagnostic> {
        if self.locked {
            return Err(Diagnostic::lifecycle(format!(
                "{} registry is already locked",
                self.name
            )));
        }
        self.locked = true;
        tracing::info!(registry = self.name, items = self.items.len(), "locked registry");
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn get(&self, identifier: &str) -> Option<&T> {
        self.index.get(identifier).map(|&i| &self.items[i])
    }

    /// Items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn expect_item_str(&self, identifier: &str) -> Outcome<&T> {
        self.get(identifier).ok_or_else(|| {
            Diagnostic::reference(format!("unknown {} entry '{}'", self.name, identifier)).into()
        })
    }

    /// Resolve an identifier (or string) node to a registered item.
    pub fn expect_item(&self, node: &Node) -> Outcome<&T> {
        let identifier = expect_identifier_or_string(node)?;
        self.expect_item_str(identifier)
            .map_err(|d| d.at_line(node.line))
    }
}

impl<'r, T> IntoIterator for &'r IdentifierRegistry<T> {
    type Item = &'r T;
    type IntoIter = std::slice::Iter<'r, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    #[derive(Debug, PartialEq)]
    struct Good(&'static str);

    impl HasIdentifier for Good {
        fn identifier(&self) -> &str {
            self.0
        }
    }

    fn goods() -> IdentifierRegistry<Good> {
        let mut registry = IdentifierRegistry::new("goods");
        registry.add(Good("grain")).unwrap();
        registry.add(Good("iron")).unwrap();
        registry
    }

    #[test]
    fn items_keep_insertion_order() {
        let registry = goods();
        let names: Vec<_> = registry.iter().map(|g| g.0).collect();
        assert_eq!(names, vec!["grain", "iron"]);
        assert_eq!(registry.get("iron"), Some(&Good("iron")));
        assert_eq!(registry.get("coal"), None);
    }

    #[test]
    fn duplicate_and_empty_identifiers_are_rejected() {
        let mut registry = goods();
        assert_eq!(
            registry.add(Good("grain")).unwrap_err().kind,
            DiagnosticKind::Consistency
        );
        assert_eq!(registry.add(Good("")).unwrap_err().kind, DiagnosticKind::Consistency);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn locked_registry_refuses_additions() {
        let mut registry = goods();
        registry.lock().unwrap();
        assert!(registry.is_locked());
        assert_eq!(
            registry.add(Good("coal")).unwrap_err().kind,
            DiagnosticKind::Lifecycle
        );
        assert_eq!(registry.lock().unwrap_err().kind, DiagnosticKind::Lifecycle);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_reference_names_registry_and_line() {
        let registry = goods();
        assert_eq!(registry.expect_item(&Node::identifier("grain")).unwrap().0, "grain");
        let err = registry.expect_item(&Node::identifier("coal").at(7)).unwrap_err();
        let d = err.iter().next().unwrap();
        assert_eq!(d.kind, DiagnosticKind::Reference);
        assert_eq!(d.line, Some(7));
        assert!(d.message.contains("goods") && d.message.contains("coal"));
    }
}
