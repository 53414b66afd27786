//! # Multipart Bodies
//!
//! Splits a `multipart/*` body into its parts (RFC 2046 framing).
//!
//! The whole body is buffered before being split, which mirrors how the server builds these
//! responses: a handful of files zipped together by an automation chain, not an open-ended
//! stream. Each part keeps its own headers so the caller can recover the declared filename and
//! content type.
use crate::media_type::MediaType;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::io::Read;

/// Errors that can occur while splitting a multipart body.
#[derive(Debug, thiserror::Error)]
pub enum MultipartError {
    #[error("Content type '{0}' has no boundary parameter")]
    MissingBoundary(String),
    #[error("Opening boundary delimiter not found")]
    MissingOpeningDelimiter,
    #[error("Part {0} is not terminated by a boundary delimiter")]
    UnterminatedPart(usize),
    #[error("Failed to read multipart body: '{0}'")]
    Io(#[from] std::io::Error),
}

/// One part of a multipart body.
#[derive(Debug, Clone)]
pub struct BodyPart {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Reads `reader` to the end and splits it using the `boundary` parameter of `media_type`.
///
/// Parts are returned in wire order. The preamble and epilogue are ignored.
pub fn read_parts<R: Read>(
    media_type: &MediaType,
    mut reader: R,
) -> Result<Vec<BodyPart>, MultipartError> {
    let boundary = media_type
        .parameter("boundary")
        .filter(|b| !b.is_empty())
        .ok_or_else(|| MultipartError::MissingBoundary(media_type.to_string()))?;

    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;
    drop(reader);

    split_parts(&Bytes::from(content), boundary)
}

fn split_parts(content: &Bytes, boundary: &str) -> Result<Vec<BodyPart>, MultipartError> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let opening = find(content, delimiter, 0).ok_or(MultipartError::MissingOpeningDelimiter)?;
    let mut cursor = opening + delimiter.len();
    let mut parts = Vec::new();

    loop {
        // `--` right after a delimiter closes the body.
        if content[cursor..].starts_with(b"--") {
            return Ok(parts);
        }
        cursor = skip_line_end(content, cursor);

        let end = find_next_delimiter(content, delimiter, cursor)
            .ok_or(MultipartError::UnterminatedPart(parts.len()))?;

        parts.push(parse_part(content.slice(cursor..end.part_end)));
        cursor = end.next;
    }
}

struct DelimiterMatch {
    /// Where the part content ends, before the line break preceding the delimiter.
    part_end: usize,
    /// Just past the delimiter.
    next: usize,
}

fn find_next_delimiter(content: &[u8], delimiter: &[u8], from: usize) -> Option<DelimiterMatch> {
    let mut search = from;
    loop {
        let at = find(content, delimiter, search)?;
        // A delimiter only counts at the start of a line (or right at the part start, for an
        // empty part).
        if at == from || content[..at].ends_with(b"\n") {
            let part_end = if content[..at].ends_with(b"\r\n") && at >= from + 2 {
                at - 2
            } else if content[..at].ends_with(b"\n") && at > from {
                at - 1
            } else {
                at
            };
            return Some(DelimiterMatch {
                part_end,
                next: at + delimiter.len(),
            });
        }
        search = at + 1;
    }
}

fn parse_part(raw: Bytes) -> BodyPart {
    // A part with no headers starts directly with its blank line.
    for blank in [&b"\r\n"[..], &b"\n"[..]] {
        if raw.starts_with(blank) {
            return BodyPart {
                headers: HeaderMap::new(),
                body: raw.slice(blank.len()..),
            };
        }
    }

    let (header_end, body_start) = match find(&raw, b"\r\n\r\n", 0) {
        Some(at) => (at, at + 4),
        None => match find(&raw, b"\n\n", 0) {
            Some(at) => (at, at + 2),
            // No blank line at all: the part is headers only.
            None => (raw.len(), raw.len()),
        },
    };

    BodyPart {
        headers: parse_headers(&raw[..header_end]),
        body: raw.slice(body_start..),
    }
}

fn parse_headers(block: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let text = String::from_utf8_lossy(block);
    for line in text.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(value.trim()),
        ) else {
            continue;
        };
        headers.append(name, value);
    }
    headers
}

fn skip_line_end(content: &[u8], mut cursor: usize) -> usize {
    // Transport padding is allowed between the delimiter and the line break.
    while matches!(content.get(cursor), Some(b' ' | b'\t')) {
        cursor += 1;
    }
    if content[cursor..].starts_with(b"\r\n") {
        cursor + 2
    } else if content[cursor..].starts_with(b"\n") {
        cursor + 1
    } else {
        cursor
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
    use std::io::Cursor;

    fn media_type(boundary: &str) -> MediaType {
        MediaType::parse(&format!("multipart/mixed; boundary={boundary}"))
    }

    #[test]
    fn test_read_parts() {
        let body = "preamble\r\n\
            --XyZ\r\n\
            Content-Type: text/plain\r\n\
            Content-Disposition: attachment; filename=\"a.txt\"\r\n\
            \r\n\
            first\r\n\
            --XyZ\r\n\
            Content-Type: application/octet-stream\r\n\
            \r\n\
            second\r\nline\r\n\
            --XyZ--\r\n\
            epilogue";

        let parts = read_parts(&media_type("XyZ"), Cursor::new(body.as_bytes().to_vec())).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].headers[CONTENT_TYPE], "text/plain");
        assert_eq!(
            parts[0].headers[CONTENT_DISPOSITION],
            "attachment; filename=\"a.txt\""
        );
        assert_eq!(&parts[0].body[..], b"first");
        assert_eq!(&parts[1].body[..], b"second\r\nline");
    }

    #[test]
    fn test_part_without_headers_and_lf_line_endings() {
        let body = "--b\n\nraw\n--b\nX-Custom: 1\n\n\n--b--\n";
        let parts = read_parts(&media_type("b"), Cursor::new(body.as_bytes().to_vec())).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].headers.is_empty());
        assert_eq!(&parts[0].body[..], b"raw");
        assert_eq!(parts[1].headers["x-custom"], "1");
        assert!(parts[1].body.is_empty());
    }

    #[test]
    fn test_boundary_inside_content_is_ignored() {
        let body = "--b\r\n\r\nabc--b not a delimiter\r\n--b--";
        let parts = read_parts(&media_type("b"), Cursor::new(body.as_bytes().to_vec())).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(&parts[0].body[..], b"abc--b not a delimiter");
    }

    #[test]
    fn test_errors() {
        let no_boundary = MediaType::parse("multipart/mixed");
        assert!(matches!(
            read_parts(&no_boundary, Cursor::new(Vec::new())),
            Err(MultipartError::MissingBoundary(_))
        ));

        assert!(matches!(
            read_parts(&media_type("b"), Cursor::new(b"nothing here".to_vec())),
            Err(MultipartError::MissingOpeningDelimiter)
        ));

        assert!(matches!(
            read_parts(&media_type("b"), Cursor::new(b"--b\r\n\r\nhalf a part".to_vec())),
            Err(MultipartError::UnterminatedPart(0))
        ));
    }
}
