//! Capture normalization: raw upstream records into canonical form.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use super::model::{PostDate, RawCapture, RawFileCapture};
use crate::archive::{FileEntry, Message};
use crate::error::{Error, Result};

/// The upstream's placeholder sender for unknown addresses.
const NO_REPLY_SENTINEL: &str = "no_reply@yahoogroups.com";

/// Escaped angle-bracket markers in the `from` field.
const ESC_LT: &str = "&lt;";
const ESC_GT: &str = "&gt;";
const ESC_QUOT: &str = "&quot;";

/// Normalizes one raw capture into a canonical [`Message`].
///
/// Timestamp coercion failures and author-name repair failures are
/// non-fatal and logged; structural violations in the `from` field are
/// not.
///
/// # Errors
///
/// [`Error::MalformedCapture`] for structural violations,
/// [`Error::DataIntegrity`] when the display name embedded in `from`
/// contradicts the author name. Callers should log the raw record and
/// skip it.
pub fn normalize(capture: RawCapture) -> Result<Message> {
    let post_timestamp = coerce_post_date(capture.msg_id, capture.post_date.as_ref());

    let from_email = normalize_from(
        capture.msg_id,
        &capture.from,
        capture.author_name.as_deref(),
    )?;

    let author_name = capture.author_name.map(|name| repair_author_name(&name));

    Ok(Message {
        id: capture.msg_id,
        author_name,
        profile: capture.profile,
        from_email,
        subject: capture.subject,
        post_timestamp,
        body: capture.message_body,
        raw_transport: capture.raw_email,
        next_in_time: link_id(capture.next_in_time),
        prev_in_time: link_id(capture.prev_in_time),
        next_in_topic: link_id(capture.next_in_topic),
        prev_in_topic: link_id(capture.prev_in_topic),
    })
}

/// Normalizes one raw file capture into a canonical [`FileEntry`].
///
/// # Errors
///
/// [`Error::MalformedCapture`] if the date string cannot be parsed.
pub fn normalize_file(capture: RawFileCapture) -> Result<FileEntry> {
    let posted_date = parse_file_date(&capture.date).ok_or_else(|| {
        Error::MalformedCapture(format!(
            "Unparseable date '{}' for file '{}'",
            capture.date, capture.file_path
        ))
    })?;

    Ok(FileEntry {
        path: capture.file_path,
        source_url: capture.url,
        mime: capture.mime,
        size_kb: capture.size,
        profile: capture.profile,
        posted_date,
    })
}

/// Coerces the post date to epoch seconds, or logs and gives up.
fn coerce_post_date(msg_id: u32, post_date: Option<&PostDate>) -> Option<i64> {
    match post_date {
        Some(PostDate::Int(ts)) => Some(*ts),
        Some(PostDate::Text(s)) => match s.trim().parse::<i64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                warn!(msg_id, post_date = %s, "Non-integer post date, leaving timestamp unset");
                None
            }
        },
        None => {
            warn!(msg_id, "Missing post date, leaving timestamp unset");
            None
        }
    }
}

/// Extracts the bare email from the `from` field, cross-checking any
/// embedded display name against the author name.
fn normalize_from(msg_id: u32, from: &str, author_name: Option<&str>) -> Result<Option<String>> {
    let email = if from.contains(ESC_LT) || from.contains(ESC_GT) {
        if !(from.contains(ESC_LT) && from.contains(ESC_GT)) {
            return Err(Error::MalformedCapture(format!(
                "Message {msg_id}: 'from' has one angle-bracket marker but not the other: {from}"
            )));
        }

        // Can't fail: ESC_LT presence was just checked
        let (display_name, remainder) = from.split_once(ESC_LT).unwrap_or((from, ""));
        let display_name = strip_quote_decoration(display_name.trim())?;

        // Encoded words can't be compared textually; an empty display
        // name carries no information to lose
        if !display_name.is_empty() && !display_name.contains("=?") {
            verify_display_name(msg_id, &display_name, author_name)?;
        }

        let (email, leftover) = remainder.split_once(ESC_GT).unwrap_or((remainder, ""));
        if !leftover.trim().is_empty() {
            return Err(Error::MalformedCapture(format!(
                "Message {msg_id}: trailing content after email in 'from': {leftover}"
            )));
        }

        email.to_string()
    } else {
        from.to_string()
    };

    if email == NO_REPLY_SENTINEL {
        return Ok(None);
    }

    Ok(Some(email))
}

/// Strips a surrounding `&quot;` pair, requiring it to be balanced.
fn strip_quote_decoration(name: &str) -> Result<String> {
    if let Some(inner) = name.strip_prefix(ESC_QUOT) {
        let inner = inner.strip_suffix(ESC_QUOT).ok_or_else(|| {
            Error::MalformedCapture(format!("Unbalanced quote decoration in display name: {name}"))
        })?;
        return Ok(inner.trim().to_string());
    }

    Ok(name.to_string())
}

/// Checks the display name against the author name, ignoring case and
/// (when an email is being compared) the domain part.
fn verify_display_name(msg_id: u32, display_name: &str, author_name: Option<&str>) -> Result<()> {
    let author = author_name.ok_or_else(|| {
        Error::MalformedCapture(format!(
            "Message {msg_id}: 'from' carries display name '{display_name}' but capture has no author name"
        ))
    })?;

    let mut display = display_name.trim().to_string();
    let mut check = author.trim().to_string();

    if display.contains('@') {
        if !check.contains('@') {
            return Err(Error::MalformedCapture(format!(
                "Message {msg_id}: display name '{display}' is an email but author name '{check}' is not"
            )));
        }
        display = display.split('@').next().unwrap_or(&display).trim().to_string();
        check = check.split('@').next().unwrap_or(&check).trim().to_string();
    }

    if !display.eq_ignore_ascii_case(&check) {
        return Err(Error::DataIntegrity(format!(
            "Message {msg_id}: display name '{display}' does not match author name '{check}'"
        )));
    }

    Ok(())
}

/// Repairs an author name left with raw `=HH` quoted-printable escapes
/// by an upstream decoding bug.
///
/// The whole string is reinterpreted as bytes through the escapes and
/// redecoded as UTF-8; any failure leaves the name unchanged.
fn repair_author_name(name: &str) -> String {
    if !has_hex_escape(name) {
        return name.to_string();
    }

    match substitute_hex_escapes(name) {
        Some(repaired) => {
            warn!(original = %name, repaired = %repaired, "Reinterpreted hex-escaped author name");
            repaired
        }
        None => {
            warn!(original = %name, "Failed to reinterpret hex-escaped author name, keeping as-is");
            name.to_string()
        }
    }
}

/// Whether the string contains `=HH` with two hex digits.
fn has_hex_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.windows(3).any(|w| {
        w[0] == b'=' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit()
    })
}

/// Replaces each `=HH` with its byte and redecodes the result as
/// UTF-8. `None` if the input is non-ASCII or the result is not valid
/// UTF-8.
fn substitute_hex_escapes(s: &str) -> Option<String> {
    if !s.is_ascii() {
        return None;
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if i + 2 < bytes.len()
            && bytes[i] == b'='
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

/// Maps an upstream link id to its canonical form: 0 is the upstream's
/// "not yet linked" sentinel and becomes `None`.
const fn link_id(id: Option<u32>) -> Option<u32> {
    match id {
        Some(0) | None => None,
        Some(id) => Some(id),
    }
}

/// Parses a file listing date in the formats the source emits.
fn parse_file_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s.trim(), format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}
