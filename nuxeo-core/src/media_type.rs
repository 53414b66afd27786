//! # Media Types
//!
//! Parsing and classification of `Content-Type` headers.
//!
//! The converter only cares about four families of payloads, see [`MediaKind`]. Parsing never
//! fails: an absent or malformed header yields `unknown/unknown`, which is classified as a
//! binary payload so the response still gets materialized instead of rejected.
use http::{HeaderMap, header::CONTENT_TYPE};
use std::fmt;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_JSON_NXENTITY: &str = "application/json+nxentity";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
pub const MULTIPART: &str = "multipart";

/// Content-type parameter carrying the Nuxeo entity type, e.g.
/// `application/json; nuxeo-entity=document`.
pub const NUXEO_ENTITY_PARAMETER: &str = "nuxeo-entity";

const UNKNOWN: &str = "unknown";

/// The payload families the converter knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `application/json+nxentity`.
    JsonEntity,
    /// `application/json` and any `application/*+json`.
    Json,
    /// `multipart/*`, one blob per part.
    Multipart,
    /// Everything else, including unknown content types.
    Binary,
}

impl MediaKind {
    pub fn is_json(&self) -> bool {
        matches!(self, MediaKind::Json | MediaKind::JsonEntity)
    }
}

/// A parsed `Content-Type` value.
///
/// Type and subtype are always present and lower-cased. Parameters keep their original value
/// with surrounding quotes removed, their names are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    type_: String,
    subtype: String,
    charset: Option<String>,
    entity_type: Option<String>,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    /// Parses a header value such as `application/json; charset=UTF-8`.
    ///
    /// Returns [`MediaType::unknown`] when the value has no usable `type/subtype` part.
    pub fn parse(value: &str) -> Self {
        let mut segments = value.split(';');
        let essence = segments.next().unwrap_or_default().trim();

        let Some((type_, subtype)) = essence.split_once('/') else {
            return Self::unknown();
        };
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if !is_token(type_) || !is_token(subtype) {
            return Self::unknown();
        }

        let mut media_type = Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            charset: None,
            entity_type: None,
            parameters: Vec::new(),
        };

        for segment in segments {
            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = unquote(value.trim()).to_string();
            if name.is_empty() {
                continue;
            }
            match name.as_str() {
                "charset" => media_type.charset = Some(value.clone()),
                NUXEO_ENTITY_PARAMETER => media_type.entity_type = Some(value.clone()),
                _ => {}
            }
            media_type.parameters.push((name, value));
        }

        media_type
    }

    /// Reads the `Content-Type` header, falling back to [`MediaType::unknown`] when it is absent
    /// or not valid UTF-8.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(Self::parse)
            .unwrap_or_else(Self::unknown)
    }

    /// The `unknown/unknown` media type.
    pub fn unknown() -> Self {
        Self {
            type_: UNKNOWN.to_string(),
            subtype: UNKNOWN.to_string(),
            charset: None,
            entity_type: None,
            parameters: Vec::new(),
        }
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// The entity type declared through the `nuxeo-entity` parameter, if any.
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Looks up a parameter by name, case-insensitively.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// `type/subtype`, without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    pub fn is_unknown(&self) -> bool {
        self.type_ == UNKNOWN && self.subtype == UNKNOWN
    }

    /// Compares type and subtype only; charset and other parameters are ignored.
    pub fn equals_type_subtype(&self, other: &MediaType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }

    pub fn kind(&self) -> MediaKind {
        if self.type_ == MULTIPART {
            return MediaKind::Multipart;
        }
        if self.type_ != "application" {
            return MediaKind::Binary;
        }
        match self.subtype.as_str() {
            "json+nxentity" => MediaKind::JsonEntity,
            "json" => MediaKind::Json,
            subtype if subtype.ends_with("+json") => MediaKind::Json,
            _ => MediaKind::Binary,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.parameters {
            write!(f, "; {name}={value}")?;
        }
        Ok(())
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, '/' | '"' | '(' | ')' | ',' | ';'))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_type_subtype() {
        let media_type = MediaType::parse("application/json");
        assert_eq!(media_type.type_(), "application");
        assert_eq!(media_type.subtype(), "json");
        assert_eq!(media_type.charset(), None);
    }

    #[test]
    fn test_type_subtype_charset() {
        let media_type = MediaType::parse("Application/JSON; charset=UTF-8");
        assert_eq!(media_type.type_(), "application");
        assert_eq!(media_type.subtype(), "json");
        assert_eq!(media_type.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_entity_type_parameter() {
        let media_type = MediaType::parse("application/json+nxentity; nuxeo-entity=\"document\"");
        assert_eq!(media_type.entity_type(), Some("document"));
        assert_eq!(media_type.kind(), MediaKind::JsonEntity);
    }

    #[test]
    fn test_malformed_headers_are_unknown_binary() {
        for header in ["", "json", "/json", "application/", "text/pl ain", ";charset=utf-8"] {
            let media_type = MediaType::parse(header);
            assert!(media_type.is_unknown(), "'{header}' should be unknown");
            assert_eq!(media_type.kind(), MediaKind::Binary);
        }
    }

    #[test]
    fn test_missing_header_is_unknown() {
        let media_type = MediaType::from_headers(&HeaderMap::new());
        assert!(media_type.is_unknown());
        assert_eq!(media_type.kind(), MediaKind::Binary);
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/mixed; boundary=\"abc 123\""),
        );
        let media_type = MediaType::from_headers(&headers);
        assert_eq!(media_type.kind(), MediaKind::Multipart);
        assert_eq!(media_type.parameter("BOUNDARY"), Some("abc 123"));
    }

    #[test]
    fn test_json_family_classification() {
        let json = [
            "application/json",
            "application/json; charset=utf-8",
            "APPLICATION/JSON",
            "application/json+nxentity",
            "application/vnd.nuxeo+json",
        ];
        for header in json {
            assert!(MediaType::parse(header).kind().is_json(), "{header}");
        }

        let not_json = [
            "application/octet-stream",
            "application/pdf",
            "text/plain",
            "text/json",
            "image/png",
            "multipart/mixed; boundary=x",
        ];
        for header in not_json {
            assert!(!MediaType::parse(header).kind().is_json(), "{header}");
        }
    }

    #[test]
    fn test_equals_type_subtype_ignores_parameters() {
        let a = MediaType::parse("application/json; charset=utf-8");
        let b = MediaType::parse("application/json");
        assert!(a.equals_type_subtype(&b));
        assert_ne!(a, b);
        assert!(!a.equals_type_subtype(&MediaType::parse(APPLICATION_JSON_NXENTITY)));
    }

    #[test]
    fn test_display() {
        let media_type = MediaType::parse("text/plain;charset=utf-8");
        assert_eq!(media_type.to_string(), "text/plain; charset=utf-8");
        assert_eq!(media_type.essence(), "text/plain");
    }
}
