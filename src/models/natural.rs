//! Natural (numeric-aware) name ordering.

use std::cmp::Ordering;
use std::ffi::OsStr;

use super::entry::EntryKind;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if digits {
            Chunk::Digits(head)
        } else {
            Chunk::Text(head)
        })
    })
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        // "007" after "7"
        .then_with(|| a.len().cmp(&b.len()))
}

fn compare_text(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    if case_sensitive {
        return a.cmp(b);
    }
    let mut lhs = a.chars().flat_map(char::to_lowercase);
    let mut rhs = b.chars().flat_map(char::to_lowercase);
    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x != y => return x.cmp(&y),
            _ => {}
        }
    }
}

/// Compares two names so that `file2` sorts before `file10`.
///
/// Never returns `Equal` for distinct names: when the natural comparison ties
/// (case or leading zeros only), raw byte order decides.
pub fn natural_compare(a: &OsStr, b: &OsStr, case_sensitive: bool) -> Ordering {
    let a_str = a.to_string_lossy();
    let b_str = b.to_string_lossy();

    let mut lhs = chunks(&a_str);
    let mut rhs = chunks(&b_str);
    let natural = loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => break Ordering::Equal,
            (None, Some(_)) => break Ordering::Less,
            (Some(_), None) => break Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x, y) {
                    (Chunk::Digits(x), Chunk::Digits(y)) => compare_digits(x, y),
                    (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
                    (Chunk::Text(x), Chunk::Text(y)) => compare_text(x, y, case_sensitive),
                };
                if ord != Ordering::Equal {
                    break ord;
                }
            }
        }
    };

    natural.then_with(|| a.cmp(b))
}

/// Folders (and project roots) first, then natural name order.
pub fn entry_order(
    a_kind: EntryKind,
    a_name: &OsStr,
    b_kind: EntryKind,
    b_name: &OsStr,
    case_sensitive: bool,
) -> Ordering {
    (!a_kind.is_dir())
        .cmp(&!b_kind.is_dir())
        .then_with(|| natural_compare(a_name, b_name, case_sensitive))
}

#[cfg(test)]
#[path = "../../tests/unit/models/natural.rs"]
mod tests;
