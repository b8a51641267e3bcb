//! Natural ordering of images by numbers embedded in their file names.
//!
//! Two keys are in use:
//!
//! * **First number**: the first run of decimal digits anywhere in the name
//!   (`img10.png` → 10). Any Unicode decimal digit counts, so fullwidth
//!   `p２.png` keys as 2. Names without digits key as 0. Used for split and
//!   merge ordering.
//! * **Two part**: `XX_YY` stems (`01_15.jpg` → `[1, 15]`, `-1_5.jpg` →
//!   `[-1, 5]`), compared as a tuple. Any other shape keys as `[0, 0]`. Used
//!   for chapter/page batch uploads.
//!
//! Both sorts are stable: equal keys keep their incoming relative order, so
//! sorting an already sorted sequence is a no-op. Nothing validates that the
//! resulting order is the intended reading order.

use crate::config::OrderingKey;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static DECIMAL_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").unwrap());

/// Key of the first digit run in `name`, or 0 when there is none.
///
/// Values too large for `u64` saturate at `u64::MAX`.
pub fn first_number_key(name: &str) -> u64 {
    FIRST_NUMBER
        .find(name)
        .and_then(|m| digits_value(m.as_str()))
        .unwrap_or(0)
}

/// Compound `[major, minor]` key for `XX_YY.ext` names.
///
/// The extension is removed first; the stem must split on `_` into exactly
/// two integers, otherwise the key is `[0, 0]`.
pub fn two_part_key(name: &str) -> [i64; 2] {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let parts: Vec<&str> = stem.split('_').collect();
    match parts.as_slice() {
        [a, b] => match (parse_signed(a), parse_signed(b)) {
            (Some(a), Some(b)) => [a, b],
            _ => [0, 0],
        },
        _ => [0, 0],
    }
}

/// Stable sort by [`first_number_key`].
pub fn sort_by_first_number<T>(items: &mut [T], name_of: impl Fn(&T) -> &str) {
    items.sort_by_key(|item| first_number_key(name_of(item)));
}

/// Stable sort by [`two_part_key`].
pub fn sort_by_two_part<T>(items: &mut [T], name_of: impl Fn(&T) -> &str) {
    items.sort_by_key(|item| two_part_key(name_of(item)));
}

/// Stable sort using the configured key.
pub fn natural_sort<T>(items: &mut [T], key: OrderingKey, name_of: impl Fn(&T) -> &str) {
    match key {
        OrderingKey::FirstNumber => sort_by_first_number(items, name_of),
        OrderingKey::TwoPart => sort_by_two_part(items, name_of),
    }
}

/// Sort plain file names in place.
pub fn sort_names(names: &mut [String], key: OrderingKey) {
    natural_sort(names, key, |n| n.as_str());
}

/// Parse an integer the way the two-part key expects: optional surrounding
/// whitespace, optional sign, digits. Saturates at the `i64` bounds.
fn parse_signed(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = i64::try_from(digits_value(digits)?).unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Value of a non-empty run of decimal digits, saturating at `u64::MAX`.
fn digits_value(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    let mut value: u64 = 0;
    for c in digits.chars() {
        let d = digit_value(c)?;
        value = value.saturating_mul(10).saturating_add(d as u64);
    }
    Some(value)
}

/// Numeric value of one Unicode decimal digit.
///
/// Decimal digits are encoded as contiguous `0..=9` runs, and adjacent runs
/// always start at a zero, so the distance to the start of the run modulo 10
/// is the value.
fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    let is_digit = |c: char| DECIMAL_DIGIT.is_match(c.encode_utf8(&mut [0; 4]));
    if !is_digit(c) {
        return None;
    }
    let mut steps = 0;
    let mut cur = c as u32;
    while let Some(prev) = cur.checked_sub(1).and_then(char::from_u32) {
        if !is_digit(prev) {
            break;
        }
        steps += 1;
        cur = prev as u32;
    }
    Some(steps % 10)
}
