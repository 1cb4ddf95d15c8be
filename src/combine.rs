//! Merge several tokens into one value-bearing token.
//!
//! Used when one interpreted value is spread over several tokens, such as
//! a date and a time, or the degree/minute/second parts of a latitude.

use std::rc::Rc;

use crate::error::{HighlightError, Result};
use crate::token::{SpanGroup, Token};

/// Build a [`Token`] whose sub-spans are those of `units`, in order.
///
/// Order is preserved as given; callers pass units in source order. The
/// result shares the character store of the first unit.
pub fn combine_tokens(units: &[&dyn SpanGroup]) -> Result<Token> {
    let first = units.first().ok_or(HighlightError::EmptyCombine)?;
    let file = Rc::clone(first.highlighted_file());
    let children = units
        .iter()
        .flat_map(|unit| unit.children().iter().cloned())
        .collect();
    Ok(Token::new(children, file))
}
