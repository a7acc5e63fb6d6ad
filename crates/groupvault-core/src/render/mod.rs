//! Best-effort HTML reconstruction from raw transport payloads.
//!
//! The source's own pre-rendered body is the fallback at every stage:
//! it is used outright for payloads the source truncated, and again
//! when the reconstruction turns out to be missing stripped
//! attachments. The policy wrapper [`render_with_fallback`] extends
//! that to any reconstruction failure for bulk export.

use groupvault_mime::Message as MimeMessage;
use tracing::debug;

use crate::archive::Message;
use crate::error::{Error, Result};
use crate::text::{escape_html, unescape_entity_refs, unescape_source_html};

/// Marker the source inserts when it cut a raw payload short.
const TRUNCATION_MARKER: &str = "(Message over 64 KB, truncated)";

/// Marker the source's renderer leaves where an attachment was
/// stripped from the raw payload.
const STRIPPED_ATTACHMENT_MARKER: &str = "Attachment content not displayed";

/// Reconstructs display HTML for a message from its raw transport
/// payload.
///
/// Truncated payloads short-circuit to the source's own rendering (it
/// is guaranteed less truncated than a payload cut off mid-structure),
/// as does a reconstruction that lost a stripped attachment.
///
/// # Errors
///
/// Returns an error if the payload does not parse, uses an unsupported
/// multipart subtype or content subtype, or cannot be charset-decoded.
pub fn render_message(message: &Message) -> Result<String> {
    if message.raw_transport.contains(TRUNCATION_MARKER) {
        return Ok(message.body.clone());
    }

    let raw = unescape_source_html(&message.raw_transport);
    let parsed = MimeMessage::parse(&raw)?;
    let html = render_mime(&parsed)?;

    if html.contains(STRIPPED_ATTACHMENT_MARKER) {
        // The reconstruction is missing content the source's own
        // renderer preserved
        return Ok(message.body.clone());
    }

    Ok(html)
}

/// Renders a message with the caller-selectable fallback policy: any
/// failure yields the source's pre-rendered body instead.
///
/// The second element is true when the fallback was taken for a
/// *failure* (not for the truncation/attachment short-circuits, which
/// are normal operation); batch callers collect those ids for
/// end-of-run reporting.
#[must_use]
pub fn render_with_fallback(message: &Message) -> (String, bool) {
    match render_message(message) {
        Ok(html) => (html, false),
        Err(err) => {
            debug!(id = message.id, error = %err, "Reconstruction failed, using source rendering");
            (message.body.clone(), true)
        }
    }
}

/// Renders one parsed MIME node to HTML.
fn render_mime(message: &MimeMessage) -> Result<String> {
    let content_type = message.content_type()?;

    if content_type.is_multipart() {
        if content_type.sub_type == "alternative" {
            // The last alternative is the most display-capable
            let last = message.parts.last().ok_or_else(|| {
                Error::UnsupportedMessage("multipart/alternative with no parts".to_string())
            })?;
            return render_mime(last);
        }

        return Err(Error::UnsupportedMessage(format!(
            "multipart subtype '{}'",
            content_type.sub_type
        )));
    }

    let text = message.decoded_text()?;

    match content_type.sub_type.as_str() {
        "html" => Ok(text),
        "plain" => {
            // Clean up stray character references, then escape and
            // turn newlines into line breaks
            let cleaned = unescape_entity_refs(&text);
            Ok(escape_html(&cleaned).replace('\n', "<br>"))
        }
        other => Err(Error::UnsupportedMessage(format!(
            "content type '{}/{other}'",
            content_type.main_type
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(raw_transport: &str) -> Message {
        Message {
            id: 1,
            author_name: None,
            profile: None,
            from_email: None,
            subject: String::new(),
            post_timestamp: None,
            body: "<p>source rendering</p>".to_string(),
            raw_transport: raw_transport.to_string(),
            next_in_time: None,
            prev_in_time: None,
            next_in_topic: None,
            prev_in_topic: None,
        }
    }

    /// Escapes a raw payload the way the source does before embedding.
    fn source_escape(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    #[test]
    fn test_truncated_payload_uses_source_body() {
        // Even though the payload would not parse at all
        let msg = message("garbage (Message over 64 KB, truncated) more garbage");
        assert_eq!(render_message(&msg).unwrap(), "<p>source rendering</p>");

        let (html, fell_back) = render_with_fallback(&msg);
        assert_eq!(html, "<p>source rendering</p>");
        assert!(!fell_back);
    }

    #[test]
    fn test_html_part_passes_through() {
        let raw = source_escape(concat!(
            "Content-Type: text/html; charset=utf-8\n",
            "\n",
            "<p>hello <b>world</b></p>",
        ));
        let msg = message(&raw);
        assert_eq!(render_message(&msg).unwrap(), "<p>hello <b>world</b></p>");
    }

    #[test]
    fn test_plain_part_is_escaped_with_breaks() {
        let raw = source_escape(concat!(
            "Content-Type: text/plain; charset=utf-8\n",
            "\n",
            "a < b\nand &#39;quoted&#39;",
        ));
        let msg = message(&raw);
        assert_eq!(
            render_message(&msg).unwrap(),
            "a &lt; b<br>and &#39;quoted&#39;"
        );
    }

    #[test]
    fn test_multipart_alternative_uses_last_part() {
        let raw = source_escape(concat!(
            "Content-Type: multipart/alternative; boundary=b1\n",
            "\n",
            "--b1\n",
            "Content-Type: text/plain; charset=utf-8\n",
            "\n",
            "plain\n",
            "--b1\n",
            "Content-Type: text/html; charset=utf-8\n",
            "\n",
            "<p>rich</p>\n",
            "--b1--\n",
        ));
        let msg = message(&raw);
        assert_eq!(render_message(&msg).unwrap(), "<p>rich</p>");
    }

    #[test]
    fn test_multipart_mixed_is_unsupported() {
        let raw = source_escape(concat!(
            "Content-Type: multipart/mixed; boundary=b1\n",
            "\n",
            "--b1\n",
            "Content-Type: text/plain; charset=utf-8\n",
            "\n",
            "part\n",
            "--b1--\n",
        ));
        let msg = message(&raw);
        assert!(matches!(
            render_message(&msg),
            Err(Error::UnsupportedMessage(_))
        ));

        // The bulk policy falls back instead and flags it
        let (html, fell_back) = render_with_fallback(&msg);
        assert_eq!(html, "<p>source rendering</p>");
        assert!(fell_back);
    }

    #[test]
    fn test_stripped_attachment_uses_source_body() {
        let raw = source_escape(concat!(
            "Content-Type: text/html; charset=utf-8\n",
            "\n",
            "<p>Attachment content not displayed</p>",
        ));
        let msg = message(&raw);
        assert_eq!(render_message(&msg).unwrap(), "<p>source rendering</p>");
    }

    #[test]
    fn test_headerless_payload_falls_back() {
        // Pre-MIME mail declares no content type and so no charset;
        // reconstruction fails and bulk export uses the source body
        let raw = source_escape("Subject: old mail\n\nplain body, no mime headers");
        let msg = message(&raw);
        assert!(matches!(render_message(&msg), Err(Error::Render(_))));

        let (html, fell_back) = render_with_fallback(&msg);
        assert_eq!(html, "<p>source rendering</p>");
        assert!(fell_back);
    }

    #[test]
    fn test_missing_charset_fails_render() {
        let raw = source_escape("Content-Type: text/plain\n\nbody");
        let msg = message(&raw);
        assert!(matches!(render_message(&msg), Err(Error::Render(_))));
    }

    #[test]
    fn test_latin1_quoted_printable_payload() {
        let raw = source_escape(concat!(
            "Content-Type: text/plain; charset=iso-8859-1\n",
            "Content-Transfer-Encoding: quoted-printable\n",
            "\n",
            "caf=E9",
        ));
        let msg = message(&raw);
        assert_eq!(render_message(&msg).unwrap(), "café");
    }
}
