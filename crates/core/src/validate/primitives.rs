//! Extractors for leaf values.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::num::IntErrorKind;
use std::str::FromStr;

use super::structure::expect_list_of_length;
use crate::ast::{Node, NodeValue};
use crate::colour::Colour;
use crate::date::Date;
use crate::error::{BestEffort, Diagnostic, Diagnostics, Outcome};

pub(crate) fn kind_mismatch(node: &Node, expected: &str) -> Diagnostics {
    Diagnostic::structural(format!(
        "invalid node type {} when expecting {}",
        node.kind(),
        expected
    ))
    .at_line(node.line)
    .into()
}

pub fn expect_identifier(node: &Node) -> Outcome<&str> {
    match &node.value {
        NodeValue::Identifier(text) => Ok(text),
        _ => Err(kind_mismatch(node, "identifier")),
    }
}

pub fn expect_string(node: &Node) -> Outcome<&str> {
    match &node.value {
        NodeValue::String(text) => Ok(text),
        _ => Err(kind_mismatch(node, "string")),
    }
}

pub fn expect_identifier_or_string(node: &Node) -> Outcome<&str> {
    match &node.value {
        NodeValue::Identifier(text) | NodeValue::String(text) => Ok(text),
        _ => Err(kind_mismatch(node, "identifier or string")),
    }
}

pub fn expect_bool(node: &Node) -> Outcome<bool> {
    match expect_identifier(node)? {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(Diagnostic::format(format!("invalid bool identifier text: {}", other))
            .at_line(node.line)
            .into()),
    }
}

/// Signed integer of any width that `i64` converts into.
pub fn expect_int<T: TryFrom<i64>>(node: &Node) -> Outcome<T> {
    let text = expect_identifier(node)?;
    let wide = i64::from_str(text).map_err(|e| int_error(node, text, e.kind()))?;
    T::try_from(wide).map_err(|_| out_of_range::<T>(node, text))
}

/// Unsigned integer of any width that `u64` converts into.
pub fn expect_uint<T: TryFrom<u64>>(node: &Node) -> Outcome<T> {
    let text = expect_identifier(node)?;
    let wide = u64::from_str(text).map_err(|e| int_error(node, text, e.kind()))?;
    T::try_from(wide).map_err(|_| out_of_range::<T>(node, text))
}

fn int_error(node: &Node, text: &str, kind: &IntErrorKind) -> Diagnostics {
    let diagnostic = match kind {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            Diagnostic::range(format!("integer out of range: {}", text))
        }
        _ => Diagnostic::format(format!("invalid integer identifier text: {}", text)),
    };
    diagnostic.at_line(node.line).into()
}

fn out_of_range<T>(node: &Node, text: &str) -> Diagnostics {
    Diagnostic::range(format!(
        "integer {} out of range for {}",
        text,
        std::any::type_name::<T>()
    ))
    .at_line(node.line)
    .into()
}

/// Fixed-point number; the text rules are `Decimal`'s own.
pub fn expect_fixed_point(node: &Node) -> Outcome<Decimal> {
    let text = expect_identifier(node)?;
    Decimal::from_str(text).map_err(|_| {
        Diagnostic::format(format!("invalid fixed point identifier text: {}", text))
            .at_line(node.line)
            .into()
    })
}

pub fn expect_date(node: &Node) -> Outcome<Date> {
    let text = expect_identifier(node)?;
    Date::parse(text)
        .into_outcome()
        .map_err(|d| d.at_line(node.line))
}

/// Three numeric components packed into `0xRRGGBB`, first component highest.
pub fn expect_colour(node: &Node) -> Outcome<Colour> {
    read_colour(node).into_outcome()
}

/// Like [`expect_colour`] but keeps the partially packed value on failure.
///
/// Components in `[0, 1]` are fractions of 255 (rounded half away from
/// zero); larger components are truncated. An out-of-range component is
/// reported and read as 0. When fewer than three components could be read
/// the packed value is shifted so the components read stay in the high bytes.
pub fn read_colour(node: &Node) -> BestEffort<Colour> {
    let mut packed: u32 = 0;
    let mut components: u32 = 0;
    let max = Decimal::from(255);

    let outcome = expect_list_of_length(node, 3, |component| {
        let mut value = expect_fixed_point(component)?;
        let mut result = Ok(());
        if value < Decimal::ZERO || value > max {
            result = Err(Diagnostic::range(format!("invalid colour component: {}", value))
                .at_line(component.line)
                .into());
            value = Decimal::ZERO;
        }
        let byte = if value <= Decimal::ONE {
            (value * max).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        } else {
            value.trunc()
        };
        packed = (packed << 8) | byte.to_u32().unwrap_or(0);
        components += 1;
        result
    });

    if components < 3 {
        packed <<= 8 * (3 - components);
    }
    let diagnostics = match outcome {
        Ok(()) => Diagnostics::new(),
        Err(d) => d,
    };
    BestEffort::new(Colour(packed & Colour::MAX_RGB), diagnostics)
}

/// Always succeeds; for keys whose value is accepted but unused.
pub fn success(_node: &Node) -> Outcome {
    Ok(())
}
