//! Text helpers: source unescaping, entity references, author display.
//!
//! Everything here is a pure function over its arguments; there is no
//! shared formatting state.

use groupvault_mime::encoding::decode_rfc2047;

/// Named entities recognized by [`unescape_entity_refs`].
///
/// A short table on purpose; unknown references are left verbatim.
const NAMED_ENTITIES: [(&str, char); 8] = [
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{A0}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
];

/// Reverses the five-entity escaping the upstream source applies to
/// raw payloads and display fields.
///
/// The ampersand substitution runs last so that double-escaped forms
/// like `&amp;lt;` come out as `&lt;` rather than `<`.
#[must_use]
pub fn unescape_source_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Escapes text for inclusion in HTML.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decodes numeric (`&#65;`, `&#x41;`) and a small set of named
/// character references, leaving anything unrecognized untouched.
///
/// Used to clean up text/plain bodies before re-escaping for display.
#[must_use]
pub fn unescape_entity_refs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        match tail[1..].find(';') {
            // Entity bodies are short; anything long is not a reference
            Some(end) if end > 0 && end <= 10 => {
                let name = &tail[1..=end];
                if let Some(c) = resolve_entity(name) {
                    out.push(c);
                } else {
                    out.push_str(&tail[..=end + 1]);
                }
                rest = &tail[end + 2..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolves one entity body (between `&` and `;`) to a character.
fn resolve_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        return char::from_u32(code);
    }

    NAMED_ENTITIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, c)| c)
}

/// Formats a message author for display.
///
/// Precedence: author name and profile together (collapsed when they
/// match), then author name, then profile, then the bare email, then
/// `"???"`. RFC 2047 encoded words in the author name are decoded when
/// they parse.
#[must_use]
pub fn display_author(
    author_name: Option<&str>,
    profile: Option<&str>,
    from_email: Option<&str>,
    include_email: bool,
) -> String {
    let author_name = author_name
        .filter(|s| !s.is_empty())
        .map(|s| decode_rfc2047(s).unwrap_or_else(|_| s.to_string()));
    let author_name = author_name.as_deref();
    let profile = profile.filter(|s| !s.is_empty());
    let from_email = from_email.filter(|s| !s.is_empty());

    let mut res = match (author_name, profile) {
        (Some(name), Some(prof)) if name == prof => name.to_string(),
        (Some(name), Some(prof)) => format!("{name} ({prof})"),
        (Some(name), None) => name.to_string(),
        (None, Some(prof)) => prof.to_string(),
        (None, None) => match from_email {
            Some(email) => return email.to_string(),
            None => "???".to_string(),
        },
    };

    if include_email {
        if let Some(email) = from_email {
            res.push_str(&format!(" <{email}>"));
        }
    }

    res
}

/// Masks an email address down to everything before the last `@`,
/// plus `@...`.
///
/// Empty input stays empty; a value with no `@` is kept whole before
/// the suffix.
#[must_use]
pub fn mask_email(email: &str) -> String {
    if email.is_empty() {
        return String::new();
    }

    let local = email.rsplit_once('@').map_or(email, |(local, _)| local);
    format!("{local}@...")
}

/// Sanitizes one virtual path component for the exported file tree.
///
/// Keeps `[A-Za-z0-9 ._-]`; everything else becomes `_`.
#[must_use]
pub fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_source_html() {
        assert_eq!(
            unescape_source_html("&lt;tag&gt; &quot;q&quot; &#39;a&#39; &amp; rest"),
            "<tag> \"q\" 'a' & rest"
        );
    }

    #[test]
    fn test_unescape_source_html_double_escaped_amp() {
        // &amp;lt; must come out as &lt;, not <
        assert_eq!(unescape_source_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_unescape_source_html_leaves_other_text() {
        assert_eq!(unescape_source_html("no entities here"), "no entities here");
        assert_eq!(unescape_source_html("&nbsp;"), "&nbsp;");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">'&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_unescape_entity_refs_numeric() {
        assert_eq!(unescape_entity_refs("&#65;&#x42;"), "AB");
        assert_eq!(unescape_entity_refs("&#x27;"), "'");
    }

    #[test]
    fn test_unescape_entity_refs_named_and_unknown() {
        assert_eq!(unescape_entity_refs("a &amp; b"), "a & b");
        assert_eq!(unescape_entity_refs("&bogus; stays"), "&bogus; stays");
        assert_eq!(unescape_entity_refs("lone & amp"), "lone & amp");
    }

    #[test]
    fn test_display_author_precedence() {
        assert_eq!(
            display_author(Some("John"), Some("jprofile"), None, false),
            "John (jprofile)"
        );
        assert_eq!(display_author(Some("John"), Some("John"), None, false), "John");
        assert_eq!(display_author(Some("John"), None, None, false), "John");
        assert_eq!(display_author(None, Some("jprofile"), None, false), "jprofile");
        assert_eq!(
            display_author(None, None, Some("j@x.com"), false),
            "j@x.com"
        );
        assert_eq!(display_author(None, None, None, false), "???");
    }

    #[test]
    fn test_display_author_with_email() {
        assert_eq!(
            display_author(Some("John"), None, Some("j@x.com"), true),
            "John <j@x.com>"
        );
    }

    #[test]
    fn test_display_author_decodes_rfc2047() {
        assert_eq!(
            display_author(Some("=?ISO-8859-1?Q?Ahnel=F6v?="), None, None, false),
            "Ahnelöv"
        );
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("alice@example.com"), "alice@...");
        assert_eq!(mask_email(""), "");
        assert_eq!(mask_email("no-at-sign"), "no-at-sign@...");
        // Only the last @ starts the domain
        assert_eq!(mask_email("a@b@c.com"), "a@b@...");
    }

    #[test]
    fn test_sanitize_path_component() {
        assert_eq!(sanitize_path_component("My File v1.2.txt"), "My File v1.2.txt");
        assert_eq!(sanitize_path_component("a/b\\c:d*e"), "a_b_c_d_e");
        assert_eq!(sanitize_path_component("naïve?"), "na_ve_");
    }
}
