//! Validator combinators over the parse tree.
//!
//! A validator takes one node and either extracts a typed value or reports
//! why it could not. Primitive extractors read leaves; structural
//! combinators walk lists and dictionaries and accumulate every child
//! failure; [`KeySchema`] checks a dictionary against declared keys.
//!
//! Writing into caller-owned storage is done with the slot adapters
//! [`assign`], [`assign_opt`] and [`push`], which turn an extractor into a
//! `FnMut(&Node) -> Outcome` suitable for a schema key.

mod primitives;
mod schema;
mod structure;

pub use primitives::{
    expect_bool, expect_colour, expect_date, expect_fixed_point, expect_identifier,
    expect_identifier_or_string, expect_int, expect_string, expect_uint, read_colour, success,
};
pub use schema::{
    expect_dictionary_keys, expect_dictionary_keys_and_default, Cardinality, Fallback, KeyRule,
    KeySchema,
};
pub use structure::{
    expect_assign, expect_dictionary, expect_list, expect_list_of, expect_list_of_length,
    expect_name_list,
};

use crate::ast::Node;
use crate::error::Outcome;

/// Store the extracted value in `slot`, replacing what was there.
pub fn assign<'f, T, F>(slot: &'f mut T, extract: F) -> impl FnMut(&Node) -> Outcome + 'f
where
    F: Fn(&Node) -> Outcome<T> + 'f,
{
    move |node: &Node| {
        *slot = extract(node)?;
        Ok(())
    }
}

/// Store the extracted value as `Some`. A failed extraction leaves the slot
/// untouched.
pub fn assign_opt<'f, T, F>(slot: &'f mut Option<T>, extract: F) -> impl FnMut(&Node) -> Outcome + 'f
where
    F: Fn(&Node) -> Outcome<T> + 'f,
{
    move |node: &Node| {
        *slot = Some(extract(node)?);
        Ok(())
    }
}

/// Append the extracted value to `slot`.
pub fn push<'f, T, F>(slot: &'f mut Vec<T>, extract: F) -> impl FnMut(&Node) -> Outcome + 'f
where
    F: Fn(&Node) -> Outcome<T> + 'f,
{
    move |node: &Node| {
        slot.push(extract(node)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_extraction_leaves_slot_alone() {
        let mut level: Option<u8> = Some(3);
        {
            let mut write = assign_opt(&mut level, expect_uint::<u8>);
            assert!(write(&Node::identifier("many")).is_err());
        }
        assert_eq!(level, Some(3));
    }

    #[test]
    fn push_appends_in_call_order() {
        let mut names = Vec::new();
        {
            let mut write = push(&mut names, |n: &Node| expect_identifier(n).map(str::to_owned));
            write(&Node::identifier("a")).unwrap();
            assert!(write(&Node::string("b")).is_err());
            write(&Node::identifier("c")).unwrap();
        }
        assert_eq!(names, vec!["a", "c"]);
    }
}
