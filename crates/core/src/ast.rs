//! Parse tree types shared by the script parser and every validator.
//!
//! A tree is immutable once built. Dictionaries are not a separate node
//! kind: a [`NodeValue::List`] whose children are all assignments is read
//! as one, keys are not required to be unique and source order is kept.

use std::fmt;

// ──────────────────────────────────────────────
// Nodes
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: NodeValue,
    /// 1-based source line, absent for hand-built trees.
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Bare word: keywords, numbers, dates and identifiers all lex as these.
    Identifier(String),
    /// Quoted string literal, quotes stripped.
    String(String),
    /// `key = value`; the value is owned by the assignment.
    Assignment { key: String, value: Box<Node> },
    /// `{ ... }` block or the file root.
    List(Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Identifier,
    String,
    Assignment,
    List,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Identifier => "identifier",
            NodeKind::String => "string",
            NodeKind::Assignment => "assignment",
            NodeKind::List => "list",
        })
    }
}

impl Node {
    pub fn identifier(text: impl Into<String>) -> Self {
        Node {
            value: NodeValue::Identifier(text.into()),
            line: None,
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Node {
            value: NodeValue::String(text.into()),
            line: None,
        }
    }

    pub fn assignment(key: impl Into<String>, value: Node) -> Self {
        Node {
            value: NodeValue::Assignment {
                key: key.into(),
                value: Box::new(value),
            },
            line: None,
        }
    }

    pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
        Node {
            value: NodeValue::List(items.into_iter().collect()),
            line: None,
        }
    }

    /// Build a dictionary from `(key, value)` pairs.
    pub fn dictionary<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::list(entries.into_iter().map(|(k, v)| Node::assignment(k, v)))
    }

    pub fn at(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self.value {
            NodeValue::Identifier(_) => NodeKind::Identifier,
            NodeValue::String(_) => NodeKind::String,
            NodeValue::Assignment { .. } => NodeKind::Assignment,
            NodeValue::List(_) => NodeKind::List,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_is_list_of_assignments() {
        let node = Node::dictionary([("owner", Node::identifier("ENG"))]);
        match &node.value {
            NodeValue::List(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].kind(), NodeKind::Assignment);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn hand_built_nodes_have_no_line() {
        assert_eq!(Node::identifier("yes").line, None);
        assert_eq!(Node::identifier("yes").at(3).line, Some(3));
    }
}
