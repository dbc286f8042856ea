//! Patient name canonicalization.
//!
//! A normalized name is a lookup key only. It is never displayed, and keys
//! are only comparable when both sides were built with the same
//! [`KeyPolicy`].

use std::borrow::Cow;

use serde::Deserialize;

/// Order in which a source types patient names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameConvention {
    /// "Last, First [Middle]": already surname first.
    #[default]
    LastCommaFirst,
    /// "First [Middle] Last": surname is the last whitespace token.
    FirstLastNoMiddle,
}

/// What happens to whitespace and commas between name parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorPolicy {
    /// Remove every separator: "DOE, JOHN" -> "DOEJOHN".
    #[default]
    Strip,
    /// Collapse each separator run to one space: "DOE,  JOHN" -> "DOE JOHN".
    SingleSpace,
}

/// Single-byte character set a key is restricted to. Characters outside it
/// are dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    #[default]
    Ascii,
    Latin1,
}

impl Charset {
    /// Applied to uppercased characters, so `ÿ` and `µ` fail Latin-1 as
    /// `Ÿ` and `Μ`.
    fn encodes(self, c: char) -> bool {
        match self {
            Self::Ascii => c.is_ascii(),
            Self::Latin1 => (c as u32) <= 0xFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyPolicy {
    pub separators: SeparatorPolicy,
    pub charset: Charset,
}

impl KeyPolicy {
    pub const fn new(separators: SeparatorPolicy, charset: Charset) -> Self {
        Self { separators, charset }
    }
}

/// Derive the comparison key for `raw`.
///
/// Never fails: blank or garbled names produce an empty or partial key and
/// simply match poorly.
pub fn normalize(raw: &str, convention: NameConvention, policy: KeyPolicy) -> String {
    let ordered = match convention {
        NameConvention::LastCommaFirst => Cow::Borrowed(raw),
        NameConvention::FirstLastNoMiddle => Cow::Owned(surname_first(raw)),
    };

    let mut key = String::with_capacity(ordered.len());
    let mut pending_separator = false;

    for c in ordered.chars().flat_map(char::to_uppercase) {
        if c == ',' || c.is_whitespace() {
            pending_separator = true;
            continue;
        }
        if c == '.' || !policy.charset.encodes(c) {
            continue;
        }
        if pending_separator && policy.separators == SeparatorPolicy::SingleSpace && !key.is_empty()
        {
            key.push(' ');
        }
        pending_separator = false;
        key.push(c);
    }

    key
}

/// "Jane Q Public" -> "Public Jane Q". Single-token names are returned as-is.
fn surname_first(raw: &str) -> String {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    match tokens.split_last() {
        Some((surname, given)) if !given.is_empty() => {
            format!("{surname} {}", given.join(" "))
        }
        _ => raw.trim().to_string(),
    }
}
