//! Dictionary validation against a declared key schema.
//!
//! A [`KeySchema`] lists the keys a dictionary may contain, how often each
//! may occur and the validator run on each occurrence. The dictionary is
//! walked once in source order; cardinality is checked after the walk. Keys
//! outside the schema go to the schema's [`Fallback`].

use std::collections::HashMap;

use super::structure::expect_dictionary;
use crate::ast::Node;
use crate::error::{Diagnostic, Diagnostics, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Cardinality {
    pub fn must_appear(self) -> bool {
        matches!(self, Cardinality::ExactlyOne | Cardinality::OneOrMore)
    }

    pub fn can_repeat(self) -> bool {
        matches!(self, Cardinality::ZeroOrMore | Cardinality::OneOrMore)
    }
}

pub type Validator<'n, 'f> = Box<dyn FnMut(&'n Node) -> Outcome + 'f>;
pub type KeyHandler<'n, 'f> = Box<dyn FnMut(&'n str, &'n Node) -> Outcome + 'f>;

/// What happens to a key the schema does not list.
pub enum Fallback<'n, 'f> {
    /// Report it as a structural mismatch.
    Reject,
    /// Accept it without looking at the value.
    Ignore,
    /// Hand key and value to a caller-supplied handler.
    Handler(KeyHandler<'n, 'f>),
}

impl<'n, 'f> Fallback<'n, 'f> {
    pub fn handler<H>(handler: H) -> Self
    where
        H: FnMut(&'n str, &'n Node) -> Outcome + 'f,
    {
        Fallback::Handler(Box::new(handler))
    }

    fn dispatch(&mut self, key: &'n str, value: &'n Node) -> Outcome {
        match self {
            Fallback::Reject => Err(Diagnostic::structural(format!(
                "invalid dictionary key '{}'",
                key
            ))
            .into()),
            Fallback::Ignore => Ok(()),
            Fallback::Handler(handler) => handler(key, value),
        }
    }
}

/// One schema entry.
pub struct KeyRule<'n, 'f> {
    key: &'f str,
    cardinality: Cardinality,
    validator: Validator<'n, 'f>,
}

impl<'n, 'f> KeyRule<'n, 'f> {
    pub fn new<V>(key: &'f str, cardinality: Cardinality, validator: V) -> Self
    where
        V: FnMut(&'n Node) -> Outcome + 'f,
    {
        KeyRule {
            key,
            cardinality,
            validator: Box::new(validator),
        }
    }
}

pub struct KeySchema<'n, 'f> {
    rules: Vec<KeyRule<'n, 'f>>,
    index: HashMap<&'f str, usize>,
    fallback: Fallback<'n, 'f>,
}

impl<'n, 'f> Default for KeySchema<'n, 'f> {
    fn default() -> Self {
        KeySchema::new()
    }
}

impl<'n, 'f> KeySchema<'n, 'f> {
    /// An empty schema that rejects unlisted keys.
    pub fn new() -> Self {
        KeySchema::with_fallback(Fallback::Reject)
    }

    pub fn with_fallback(fallback: Fallback<'n, 'f>) -> Self {
        KeySchema {
            rules: Vec::new(),
            index: HashMap::new(),
            fallback,
        }
    }

    /// Declare a key. Declaring the same key twice keeps the first rule.
    pub fn key<V>(self, key: &'f str, cardinality: Cardinality, validator: V) -> Self
    where
        V: FnMut(&'n Node) -> Outcome + 'f,
    {
        self.rule(KeyRule::new(key, cardinality, validator))
    }

    pub fn rule(mut self, rule: KeyRule<'n, 'f>) -> Self {
        if !self.index.contains_key(rule.key) {
            self.index.insert(rule.key, self.rules.len());
            self.rules.push(rule);
        }
        self
    }

    pub fn allow_other_keys(mut self) -> Self {
        self.fallback = Fallback::Ignore;
        self
    }

    pub fn fallback<H>(mut self, handler: H) -> Self
    where
        H: FnMut(&'n str, &'n Node) -> Outcome + 'f,
    {
        self.fallback = Fallback::handler(handler);
        self
    }

    /// Walk `node` once and check every declared cardinality.
    ///
    /// A repeat of a non-repeatable key is reported and its value is not
    /// validated. Every failure is collected; the result fails if any was.
    pub fn validate(self, node: &'n Node) -> Outcome {
        let KeySchema {
            mut rules,
            index,
            mut fallback,
        } = self;
        let mut counts = vec![0usize; rules.len()];
        let mut diagnostics = Diagnostics::new();

        diagnostics.record(expect_dictionary(node, |key, value| {
            let Some(&slot) = index.get(key) else {
                return fallback.dispatch(key, value);
            };
            counts[slot] += 1;
            let rule = &mut rules[slot];
            if counts[slot] > 1 && !rule.cardinality.can_repeat() {
                return Err(Diagnostic::cardinality(format!("duplicate key '{}'", key)).into());
            }
            (rule.validator)(value)
        }));

        for (rule, count) in rules.iter().zip(&counts) {
            if *count == 0 && rule.cardinality.must_appear() {
                diagnostics.push(
                    Diagnostic::cardinality(format!("missing mandatory key '{}'", rule.key))
                        .with_key(rule.key)
                        .at_line(node.line),
                );
            }
        }
        diagnostics.finish(())
    }
}

/// Validate `node` against `rules`, routing unlisted keys to `fallback`.
pub fn expect_dictionary_keys_and_default<'n, 'f>(
    node: &'n Node,
    fallback: Fallback<'n, 'f>,
    rules: impl IntoIterator<Item = KeyRule<'n, 'f>>,
) -> Outcome {
    rules
        .into_iter()
        .fold(KeySchema::with_fallback(fallback), KeySchema::rule)
        .validate(node)
}

/// Validate `node` against `rules`, rejecting unlisted keys.
pub fn expect_dictionary_keys<'n, 'f>(
    node: &'n Node,
    rules: impl IntoIterator<Item = KeyRule<'n, 'f>>,
) -> Outcome {
    expect_dictionary_keys_and_default(node, Fallback::Reject, rules)
}
