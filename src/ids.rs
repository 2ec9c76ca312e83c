//! Identifier derivation
//!
//! Identifiers are `<prefix><number>` padded to 3 digits (`B001`, `M042`,
//! `L107`) and must fit the 4-byte identifier field. A new identifier is
//! one past the largest number already present in the store, counting
//! deleted records too, so a freed slot never hands its old identifier to
//! a different record.

use crate::error::{Result, ShelfError};

/// Width of every identifier field in bytes
pub const ID_WIDTH: usize = 4;

/// Render `prefix` + `number` as an identifier
pub fn format_id(prefix: char, number: u32) -> Result<String> {
    let id = format!("{}{:03}", prefix, number);
    if id.len() > ID_WIDTH {
        return Err(ShelfError::IdentifiersExhausted { prefix });
    }
    Ok(id)
}

/// Numeric part of `id`, if it carries `prefix` followed by digits
pub fn id_number(prefix: char, id: &str) -> Option<u32> {
    let digits = id.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next identifier after every well-formed identifier in `existing`
pub fn next_id<'a, I>(prefix: char, existing: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| id_number(prefix, id))
        .max()
        .unwrap_or(0);

    format_id(prefix, max + 1)
}
