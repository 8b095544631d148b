//! Meal catalog for one character table
//!
//! A meal identifier is not unique across a table: the same dish can be
//! eaten on several days. The catalog lists each identifier once, and
//! [`find_meal`] resolves an identifier to the *first* row that carries it,
//! whatever its date. [`occurrences`] lets callers tell when that choice was
//! ambiguous.

use crate::record::Record;
use std::collections::HashSet;

/// Distinct non-empty meal identifiers in order of first appearance
pub fn distinct_meals(table: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    table
        .iter()
        .filter_map(|r| r.meal.as_deref())
        .filter(|m| !m.is_empty())
        .filter(|m| seen.insert(*m))
        .map(str::to_string)
        .collect()
}

/// First row whose meal identifier matches exactly
pub fn find_meal<'a>(table: &'a [Record], meal: &str) -> Option<&'a Record> {
    table.iter().find(|r| r.meal.as_deref() == Some(meal))
}

/// Number of rows sharing a meal identifier
pub fn occurrences(table: &[Record], meal: &str) -> usize {
    table
        .iter()
        .filter(|r| r.meal.as_deref() == Some(meal))
        .count()
}

/// Human-friendly label: punctuation dropped, underscores become spaces and
/// every word starts with a capital letter.
pub fn display_name(meal: &str) -> String {
    let mut out = String::with_capacity(meal.len());
    let mut prev_is_word = false;

    for c in meal.chars() {
        let c = match c {
            '_' => ' ',
            c if c.is_alphanumeric() || c.is_whitespace() => c,
            _ => continue,
        };
        let is_word = c.is_alphanumeric();
        if is_word && !prev_is_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }

    out
}

/// Picture shown on the meal card, e.g. `Chicken Salad` -> `chicken_salad.png`
pub fn image_file_name(meal: &str) -> String {
    let lower = meal.to_lowercase();
    let mut name = String::with_capacity(lower.len() + 4);
    let mut in_space = false;
    for c in lower.chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    name.push_str(".png");
    name
}
