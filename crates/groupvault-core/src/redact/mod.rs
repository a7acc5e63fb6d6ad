//! Literal-text redaction for exported fields.
//!
//! Rules are ordered and applied sequentially; each rule sees the
//! previous rule's output. Patterns are literal substrings, never
//! regexes, and application is total: any string input succeeds.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// One literal substitution rule.
#[derive(Debug, Clone)]
pub struct Redaction {
    /// Literal text to find.
    pub pattern: String,
    /// Literal replacement.
    pub replacement: String,
    /// Whether matching ignores case.
    pub ignore_case: bool,
}

impl Redaction {
    /// Creates a rule.
    #[must_use]
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        ignore_case: bool,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            ignore_case,
        }
    }

    /// Applies this rule across the whole text.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        if text.is_empty() || self.pattern.is_empty() {
            return text.to_string();
        }

        if !self.ignore_case {
            return text.replace(&self.pattern, &self.replacement);
        }

        // Unicode folding can change byte lengths, so record the
        // original start offset of every folded byte and splice
        // matched spans out of the unfolded text
        let needle = self.pattern.to_lowercase();

        let mut folded = String::with_capacity(text.len());
        let mut starts = Vec::with_capacity(text.len() + 1);
        for (offset, c) in text.char_indices() {
            folded.extend(c.to_lowercase());
            starts.resize(folded.len(), offset);
        }
        starts.push(text.len());

        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        let mut orig_pos = 0;
        while let Some(found) = folded[pos..].find(&needle) {
            let start = pos + found;
            let end = start + needle.len();

            // Whole characters only: the fold of one original char
            // must not be split across a match edge
            let aligned = (start == 0 || starts[start] != starts[start - 1])
                && starts[end] != starts[end - 1];
            if aligned {
                out.push_str(&text[orig_pos..starts[start]]);
                out.push_str(&self.replacement);
                pos = end;
                orig_pos = starts[end];
            } else {
                pos = start + folded[start..].chars().next().map_or(1, char::len_utf8);
            }
        }
        out.push_str(&text[orig_pos..]);
        out
    }
}

/// An ordered rule set.
#[derive(Debug, Clone, Default)]
pub struct Redactions {
    rules: Vec<Redaction>,
}

impl Redactions {
    /// Creates a rule set from rules in application order.
    #[must_use]
    pub fn new(rules: Vec<Redaction>) -> Self {
        Self { rules }
    }

    /// Applies every rule in order, feeding each rule's output into
    /// the next.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The value side of a rule-file entry: either the replacement string
/// itself, or a nested one-entry mapping under an `ignorecase` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpecValue {
    Replacement(String),
    Wrapped(std::collections::BTreeMap<String, String>),
}

/// Loads an ordered rule set from a JSON rule file.
///
/// # Errors
///
/// Returns an error on I/O or JSON failure, or a spec entry that is
/// not a one-entry mapping.
pub fn load_redactions(path: &Path) -> Result<Redactions> {
    let text = fs::read_to_string(path)?;
    parse_redactions(&text)
}

/// Parses a rule set from JSON text. See [`load_redactions`].
///
/// # Errors
///
/// Returns an error on JSON failure or a malformed spec entry.
pub fn parse_redactions(text: &str) -> Result<Redactions> {
    let specs: Vec<std::collections::BTreeMap<String, SpecValue>> = serde_json::from_str(text)?;

    let mut rules = Vec::with_capacity(specs.len());
    for map in specs {
        if map.len() != 1 {
            return Err(Error::Config(format!(
                "Redaction spec must be a one-entry mapping, got {} entries",
                map.len()
            )));
        }

        // len() == 1 was just checked
        let Some((key, value)) = map.into_iter().next() else {
            continue;
        };

        match value {
            SpecValue::Replacement(replacement) => {
                rules.push(Redaction::new(key, replacement, false));
            }
            SpecValue::Wrapped(inner) => {
                if key != "ignorecase" || inner.len() != 1 {
                    return Err(Error::Config(format!(
                        "Unrecognized redaction wrapper '{key}'"
                    )));
                }
                if let Some((pattern, replacement)) = inner.into_iter().next() {
                    rules.push(Redaction::new(pattern, replacement, true));
                }
            }
        }
    }

    Ok(Redactions::new(rules))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_not_regex() {
        let rule = Redaction::new("a.c", "X", false);
        assert_eq!(rule.apply("a.c abc a.c"), "X abc X");
    }

    #[test]
    fn test_case_insensitive() {
        let rule = Redaction::new("secret", "[redacted]", true);
        assert_eq!(
            rule.apply("Secret, SECRET, secret"),
            "[redacted], [redacted], [redacted]"
        );
    }

    #[test]
    fn test_case_insensitive_unicode() {
        let rule = Redaction::new("müller", "[member]", true);
        assert_eq!(rule.apply("From MÜLLER and Müller"), "From [member] and [member]");

        // Surrounding non-ASCII text keeps its case and position
        let rule = Redaction::new("anne", "[member]", true);
        assert_eq!(rule.apply("Ærø: ANNE skrev"), "Ærø: [member] skrev");
    }

    #[test]
    fn test_case_sensitive_leaves_other_cases() {
        let rule = Redaction::new("secret", "[redacted]", false);
        assert_eq!(rule.apply("Secret vs secret"), "Secret vs [redacted]");
    }

    #[test]
    fn test_empty_input_unchanged() {
        let rules = Redactions::new(vec![Redaction::new("x", "y", false)]);
        assert_eq!(rules.apply(""), "");
    }

    #[test]
    fn test_rule_order_matters() {
        // [A, B] differs from [B, A]: B sees A's output
        let a = Redaction::new("alice", "bob", false);
        let b = Redaction::new("bob", "carol", false);

        let ab = Redactions::new(vec![a.clone(), b.clone()]);
        let ba = Redactions::new(vec![b, a]);

        assert_eq!(ab.apply("alice"), "carol");
        assert_eq!(ba.apply("alice"), "bob");
    }

    #[test]
    fn test_parse_rule_file() {
        let text = r#"[
            {"alice@example.com": "member1@redacted"},
            {"ignorecase": {"Alice": "member1"}}
        ]"#;

        let rules = parse_redactions(text).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules.apply("From ALICE <alice@example.com>"),
            "From member1 <member1@redacted>"
        );
    }

    #[test]
    fn test_parse_rejects_multi_entry_spec() {
        assert!(parse_redactions(r#"[{"a": "b", "c": "d"}]"#).is_err());
    }
}
