//! MIME decoding utilities.
//!
//! Supports the RFC 2045 content-transfer encodings, RFC 2047 encoded-word
//! headers and the handful of charsets mail clients meet in practice.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Content-Transfer-Encoding of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII, no transformation.
    SevenBit,
    /// 8-bit data, no transformation.
    EightBit,
    /// Arbitrary octets, no transformation.
    Binary,
    /// Base64 (RFC 2045 section 6.8).
    Base64,
    /// Quoted-Printable (RFC 2045 section 6.7).
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses an encoding name as it appears in BODYSTRUCTURE or headers.
    ///
    /// Unknown names are treated as identity encodings, as RFC 2045 asks
    /// readers to do.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }

    /// Decodes `data` according to this encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid for the encoding.
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(data.to_vec()),
            Self::Base64 => decode_base64(data),
            Self::QuotedPrintable => decode_quoted_printable(data),
        }
    }
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break
        match data.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => {
                i += 3;
                continue;
            }
            Some([b'\n', ..]) => {
                i += 2;
                continue;
            }
            _ => {}
        }

        // Hex encoded byte
        let hex = data
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::InvalidEncoding("Non-ASCII escape sequence".to_string()))?;
        let decoded = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(decoded);
        i += 3;
    }

    Ok(result)
}

/// Converts raw bytes in `charset` to a string.
///
/// UTF-8 and US-ASCII decode lossily; ISO-8859-1 and its common aliases map
/// bytes straight to code points. Anything else falls back to lossy UTF-8.
#[must_use]
pub fn decode_charset(data: &[u8], charset: Option<&str>) -> String {
    let charset = charset.map(|c| c.trim().to_ascii_lowercase());
    match charset.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "iso8859-1" | "windows-1252" | "cp1252") => {
            data.iter().map(|&b| char::from(b)).collect()
        }
        _ => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Format of each word: `=?charset?encoding?encoded-text?=`. Whitespace
/// between two adjacent encoded words is dropped, as the RFC requires.
/// Words that fail to decode are kept verbatim, so this never fails.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    let mut pending_space = String::new();
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        let Some((word, consumed)) = encoded_word(candidate) else {
            output.push_str(&pending_space);
            pending_space.clear();
            output.push_str(before);
            output.push_str("=?");
            rest = &candidate[2..];
            last_was_word = false;
            continue;
        };

        if last_was_word && before.chars().all(char::is_whitespace) {
            // Adjacent encoded words: drop the separating whitespace.
        } else {
            output.push_str(&pending_space);
            output.push_str(before);
        }
        pending_space.clear();

        match decode_word(word) {
            Some(decoded) => output.push_str(&decoded),
            None => output.push_str(&candidate[..consumed]),
        }
        rest = &candidate[consumed..];
        last_was_word = true;
    }

    output.push_str(&pending_space);
    output.push_str(rest);
    output
}

/// Splits `=?charset?enc?text?=` off the front of `s`, returning the inner
/// `charset?enc?text` and the number of bytes consumed.
fn encoded_word(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix("=?")?;
    let charset_end = inner.find('?')?;
    let after_charset = &inner[charset_end + 1..];
    let enc_end = after_charset.find('?')?;
    let after_enc = &after_charset[enc_end + 1..];
    let text_end = after_enc.find("?=")?;
    let inner_len = charset_end + 1 + enc_end + 1 + text_end;
    if inner[..inner_len].contains(char::is_whitespace) {
        return None;
    }
    Some((&inner[..inner_len], 2 + inner_len + 2))
}

fn decode_word(word: &str) -> Option<String> {
    let mut parts = word.splitn(3, '?');
    let charset = parts.next()?;
    let encoding = parts.next()?;
    let encoded_text = parts.next()?;

    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => decode_base64(encoded_text.as_bytes()).ok()?,
        "Q" => {
            let with_spaces = encoded_text.replace('_', " ");
            decode_quoted_printable(with_spaces.as_bytes()).ok()?
        }
        _ => return None,
    };

    Some(decode_charset(&bytes, Some(charset)))
}
