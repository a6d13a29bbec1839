//! Header assembly from FETCH responses.
//!
//! A message header in the cache is built from one FETCH round trip:
//! flags, envelope, size, body structure, a short peek at part 1 for the
//! excerpt, and the `References` field for threading.

use std::collections::BTreeMap;

use mailmirror_imap::{BodyStructure, Envelope, FetchAttribute, FetchItem, Uid};
use mailmirror_mime::TransferEncoding;
use mailmirror_mime::encoding::{decode_charset, decode_rfc2047};

use crate::cache::{AddressRecord, HeaderRecord, PartMeta};
use crate::{Error, Result};

/// Bytes of part 1 peeked for the excerpt.
pub const EXCERPT_PEEK_BYTES: u32 = 1024;

/// Longest excerpt kept, in characters.
pub const EXCERPT_MAX_CHARS: usize = 256;

const EXCERPT_SECTION: &str = "1";
const REFERENCES_SECTION: &str = "HEADER.FIELDS (REFERENCES CONTENT-TRANSFER-ENCODING)";

/// FETCH attributes needed to assemble a [`HeaderRecord`].
#[must_use]
pub fn header_fetch_attributes() -> Vec<FetchAttribute> {
    vec![
        FetchAttribute::Flags,
        FetchAttribute::Envelope,
        FetchAttribute::Rfc822Size,
        FetchAttribute::BodyStructure,
        FetchAttribute::peek_section(EXCERPT_SECTION, Some((0, EXCERPT_PEEK_BYTES))),
        FetchAttribute::peek_section(REFERENCES_SECTION, None),
    ]
}

/// Flattens a body structure into its parts, keyed by IMAP part number.
///
/// A single-part message has one part, `"1"`. Children of a multipart are
/// numbered from 1, nested multiparts add a level (`"2.1"`), and the body
/// of an attached message is numbered under the attachment's own number.
/// Multipart containers themselves have no entry.
#[must_use]
pub fn body_parts(structure: &BodyStructure) -> BTreeMap<String, PartMeta> {
    let mut parts = BTreeMap::new();
    match structure {
        BodyStructure::Multipart { bodies, .. } => collect_children(bodies, None, &mut parts),
        single => collect(single, "1".to_string(), &mut parts),
    }
    parts
}

fn collect_children(
    bodies: &[BodyStructure],
    prefix: Option<&str>,
    parts: &mut BTreeMap<String, PartMeta>,
) {
    for (index, body) in bodies.iter().enumerate() {
        let number = match prefix {
            Some(prefix) => format!("{prefix}.{}", index + 1),
            None => (index + 1).to_string(),
        };
        collect(body, number, parts);
    }
}

fn collect(body: &BodyStructure, number: String, parts: &mut BTreeMap<String, PartMeta>) {
    match body {
        BodyStructure::Basic {
            media_type,
            media_subtype,
            params,
            encoding,
            size,
            ..
        } => {
            parts.insert(number, part_meta(media_type, media_subtype, params, encoding, *size));
        }
        BodyStructure::Text {
            subtype,
            params,
            encoding,
            size,
            ..
        } => {
            parts.insert(number, part_meta("text", subtype, params, encoding, *size));
        }
        BodyStructure::Message {
            params,
            encoding,
            size,
            body,
            ..
        } => {
            match body.as_ref() {
                BodyStructure::Multipart { bodies, .. } => {
                    collect_children(bodies, Some(&number), parts);
                }
                single => collect(single, format!("{number}.1"), parts),
            }
            parts.insert(number, part_meta("message", "rfc822", params, encoding, *size));
        }
        BodyStructure::Multipart { bodies, .. } => collect_children(bodies, Some(&number), parts),
    }
}

fn part_meta(
    media_type: &str,
    subtype: &str,
    params: &[(String, String)],
    encoding: &str,
    size: u32,
) -> PartMeta {
    PartMeta {
        media_type: media_type.to_ascii_lowercase(),
        subtype: subtype.to_ascii_lowercase(),
        encoding: encoding.to_ascii_lowercase(),
        charset: param(params, "charset"),
        size,
        name: param(params, "name").map(|name| decode_rfc2047(&name)),
    }
}

fn param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.clone())
}

/// Builds a [`HeaderRecord`] from the items of one FETCH response entry.
///
/// # Errors
///
/// Returns [`Error::InconsistentServerState`] when the server left out
/// BODYSTRUCTURE.
pub fn assemble_header(folder: &str, uid: Uid, items: &[FetchItem]) -> Result<HeaderRecord> {
    let structure = items
        .iter()
        .find_map(|item| match item {
            FetchItem::BodyStructure(structure) => Some(structure),
            _ => None,
        })
        .ok_or_else(|| {
            Error::InconsistentServerState(format!("no BODYSTRUCTURE for UID {uid} in {folder}"))
        })?;

    let envelope = items
        .iter()
        .find_map(|item| match item {
            FetchItem::Envelope(envelope) => Some(envelope.as_ref().clone()),
            _ => None,
        })
        .unwrap_or_default();

    let size = items
        .iter()
        .find_map(|item| match item {
            FetchItem::Rfc822Size(size) => Some(*size),
            _ => None,
        })
        .unwrap_or(0);

    let parts = body_parts(structure);
    let excerpt = FetchItem::section_data(items, EXCERPT_SECTION)
        .zip(parts.get(EXCERPT_SECTION))
        .and_then(|(data, meta)| build_excerpt(data, meta));
    let references = FetchItem::section_data(items, REFERENCES_SECTION)
        .map(parse_references)
        .unwrap_or_default();

    let Envelope {
        date,
        subject,
        from,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
        ..
    } = envelope;

    Ok(HeaderRecord {
        uid,
        folder: folder.to_string(),
        flags: FetchItem::flags(items).cloned().unwrap_or_default(),
        subject: subject.as_deref().map(decode_rfc2047),
        from: addresses(&from),
        to: addresses(&to),
        cc: addresses(&cc),
        bcc: addresses(&bcc),
        reply_to: addresses(&reply_to),
        date,
        message_id,
        in_reply_to,
        references,
        size,
        excerpt,
        parts,
    })
}

fn addresses(list: &[mailmirror_imap::Address]) -> Vec<AddressRecord> {
    list.iter().map(AddressRecord::from).collect()
}

/// Best-effort preview text from a truncated peek at a text part.
fn build_excerpt(data: &[u8], meta: &PartMeta) -> Option<String> {
    if meta.media_type != "text" {
        return None;
    }

    let encoding = TransferEncoding::parse(&meta.encoding);
    let decoded = encoding
        .decode(trim_partial(data, encoding))
        .ok()?;
    let mut text = decode_charset(&decoded, meta.charset.as_deref());
    if meta.subtype == "html" {
        text = strip_tags(&text);
    }

    let collapsed: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(EXCERPT_MAX_CHARS)
        .collect();
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Cuts a peeked slice back to the last complete unit of its encoding.
fn trim_partial(data: &[u8], encoding: TransferEncoding) -> &[u8] {
    match encoding {
        TransferEncoding::Base64 => {
            let significant = data.iter().filter(|b| !b.is_ascii_whitespace()).count();
            let mut excess = significant % 4;
            let mut end = data.len();
            while excess > 0 && end > 0 {
                end -= 1;
                if !data[end].is_ascii_whitespace() {
                    excess -= 1;
                }
            }
            &data[..end]
        }
        TransferEncoding::QuotedPrintable => {
            let tail_start = data.len().saturating_sub(2);
            match data[tail_start..].iter().position(|&b| b == b'=') {
                Some(pos) => &data[..tail_start + pos],
                None => data,
            }
        }
        _ => data,
    }
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

/// Extracts the message IDs of the `References` field from raw header lines.
fn parse_references(raw: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(raw);
    let mut references = Vec::new();
    let mut in_references = false;

    for line in text.lines() {
        if line.starts_with([' ', '\t']) {
            if in_references {
                references.extend(line.split_whitespace().map(str::to_string));
            }
            continue;
        }
        in_references = false;
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("references")
        {
            in_references = true;
            references.extend(value.split_whitespace().map(str::to_string));
        }
    }

    references
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mailmirror_imap::{Address, Flag, Flags};

    use super::*;

    fn text(subtype: &str, encoding: &str, charset: Option<&str>) -> BodyStructure {
        BodyStructure::Text {
            subtype: subtype.to_string(),
            params: charset
                .map(|c| vec![("CHARSET".to_string(), c.to_string())])
                .unwrap_or_default(),
            id: None,
            description: None,
            encoding: encoding.to_string(),
            size: 500,
            lines: 10,
        }
    }

    fn attachment(name: &str) -> BodyStructure {
        BodyStructure::Basic {
            media_type: "APPLICATION".to_string(),
            media_subtype: "PDF".to_string(),
            params: vec![("NAME".to_string(), name.to_string())],
            id: None,
            description: None,
            encoding: "BASE64".to_string(),
            size: 4096,
        }
    }

    fn multipart(subtype: &str, bodies: Vec<BodyStructure>) -> BodyStructure {
        BodyStructure::Multipart {
            bodies,
            subtype: subtype.to_string(),
        }
    }

    fn body(section: &str, data: &[u8]) -> FetchItem {
        FetchItem::Body {
            section: Some(section.to_string()),
            origin: None,
            data: Some(data.to_vec()),
        }
    }

    #[test]
    fn test_single_part_is_part_one() {
        let parts = body_parts(&text("PLAIN", "7BIT", Some("UTF-8")));
        assert_eq!(parts.len(), 1);
        let meta = &parts["1"];
        assert_eq!(meta.media_type, "text");
        assert_eq!(meta.subtype, "plain");
        assert_eq!(meta.charset.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_nested_multipart_numbering() {
        let structure = multipart(
            "MIXED",
            vec![
                multipart(
                    "ALTERNATIVE",
                    vec![text("PLAIN", "7BIT", None), text("HTML", "QUOTED-PRINTABLE", None)],
                ),
                attachment("=?utf-8?Q?r=C3=A9sum=C3=A9.pdf?="),
            ],
        );
        let parts = body_parts(&structure);

        assert_eq!(
            parts.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["1.1", "1.2", "2"]
        );
        assert_eq!(parts["1.2"].encoding, "quoted-printable");
        assert_eq!(parts["2"].name.as_deref(), Some("résumé.pdf"));
    }

    #[test]
    fn test_attached_message_numbering() {
        let structure = multipart(
            "MIXED",
            vec![
                text("PLAIN", "7BIT", None),
                BodyStructure::Message {
                    params: Vec::new(),
                    encoding: "7BIT".to_string(),
                    size: 900,
                    envelope: Box::default(),
                    body: Box::new(multipart(
                        "ALTERNATIVE",
                        vec![text("PLAIN", "7BIT", None), text("HTML", "7BIT", None)],
                    )),
                    lines: 30,
                },
            ],
        );
        let parts = body_parts(&structure);

        assert_eq!(
            parts.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["1", "2", "2.1", "2.2"]
        );
        assert_eq!(parts["2"].subtype, "rfc822");
    }

    #[test]
    fn test_assemble_header() {
        let envelope = Envelope {
            date: Some("Mon, 2 Feb 2026 09:00:00 +0000".to_string()),
            subject: Some("=?utf-8?Q?Caf=C3=A9_plans?=".to_string()),
            from: vec![Address {
                name: Some("Alice".to_string()),
                adl: None,
                mailbox: Some("alice".to_string()),
                host: Some("example.com".to_string()),
            }],
            message_id: Some("<m1@example.com>".to_string()),
            ..Envelope::default()
        };
        let items = vec![
            FetchItem::Uid(Uid::new(7).unwrap()),
            FetchItem::Flags(Flags::from_vec(vec![Flag::Seen])),
            FetchItem::Envelope(Box::new(envelope)),
            FetchItem::Rfc822Size(1234),
            FetchItem::BodyStructure(text("PLAIN", "QUOTED-PRINTABLE", Some("utf-8"))),
            body("1", b"See you at the caf=C3=A9\r\n  tomorrow"),
            body(
                REFERENCES_SECTION,
                b"References: <a@example.com>\r\n <b@example.com>\r\n\r\n",
            ),
        ];

        let header = assemble_header("INBOX", Uid::new(7).unwrap(), &items).unwrap();

        assert_eq!(header.subject.as_deref(), Some("Café plans"));
        assert_eq!(header.from[0].email.as_deref(), Some("alice@example.com"));
        assert_eq!(header.size, 1234);
        assert!(header.is_seen());
        assert_eq!(header.excerpt.as_deref(), Some("See you at the café tomorrow"));
        assert_eq!(header.references, vec!["<a@example.com>", "<b@example.com>"]);
        assert_eq!(header.folder, "INBOX");
    }

    #[test]
    fn test_assemble_without_bodystructure_fails() {
        let items = vec![FetchItem::Rfc822Size(10)];
        let err = assemble_header("INBOX", Uid::new(1).unwrap(), &items).unwrap_err();
        assert!(matches!(err, Error::InconsistentServerState(_)));
    }

    #[test]
    fn test_excerpt_from_truncated_base64() {
        let meta = PartMeta {
            media_type: "text".to_string(),
            subtype: "plain".to_string(),
            encoding: "base64".to_string(),
            charset: None,
            size: 100,
            name: None,
        };
        // "Hello, World!" with its last quad cut short.
        assert_eq!(
            build_excerpt(b"SGVsbG8s\r\nIFdvcmxkIQ", &meta).as_deref(),
            Some("Hello, World")
        );
    }

    #[test]
    fn test_excerpt_strips_html() {
        let meta = PartMeta {
            media_type: "text".to_string(),
            subtype: "html".to_string(),
            encoding: "7bit".to_string(),
            charset: None,
            size: 100,
            name: None,
        };
        assert_eq!(
            build_excerpt(b"<p>Hi <b>there</b></p>", &meta).as_deref(),
            Some("Hi there")
        );
    }

    #[test]
    fn test_excerpt_skips_non_text() {
        let meta = PartMeta {
            media_type: "image".to_string(),
            subtype: "png".to_string(),
            encoding: "base64".to_string(),
            charset: None,
            size: 100,
            name: None,
        };
        assert!(build_excerpt(b"iVBORw0KGgo=", &meta).is_none());
    }

    #[test]
    fn test_trim_partial_quoted_printable() {
        assert_eq!(
            trim_partial(b"caf=C", TransferEncoding::QuotedPrintable),
            b"caf"
        );
        assert_eq!(
            trim_partial(b"caf=C3", TransferEncoding::QuotedPrintable),
            b"caf=C3"
        );
    }

    #[test]
    fn test_parse_references_ignores_other_fields() {
        let raw = b"Content-Transfer-Encoding: 7bit\r\nReferences: <x@y>\r\n";
        assert_eq!(parse_references(raw), vec!["<x@y>"]);
        assert!(parse_references(b"\r\n").is_empty());
    }
}
