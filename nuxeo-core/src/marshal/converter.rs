//! # Response Converter
//!
//! The dispatcher at the heart of the client. For every successful response it selects exactly
//! one conversion path, in this order:
//!
//! 1. **Multipart** (`multipart/*`): every part is materialized into a [`Blob`], the result is
//!    a [`Blobs`] collection in wire order.
//! 2. **Binary** (anything that is not JSON, missing content types included): the whole body
//!    is materialized into a single [`Blob`].
//! 3. **JSON, unknown target**: the shape is discovered from the entity type, looked up in the
//!    [`EntityRegistry`]. Unregistered entity types come back as the raw body text.
//! 4. **JSON, known target**: the body is decoded straight into the expected shape.
//!
//! Binary payloads are ruled out before anything reads the body as text, since reading is
//! single-pass and destructive.
//!
//! The converter owns the [`RawResponse`] for the duration of the call, the body is dropped
//! before returning on every path.
use super::{
    blob::{self, Blob, Blobs},
    multipart, sniff,
};
use crate::{
    entity::{Entity, EntityShape, registry::EntityRegistry},
    error::ConvertError,
    media_type::{MediaKind, MediaType},
};
use http::HeaderMap;
use std::io::{BufReader, Cursor, Read};
use tracing::debug;

/// Response header carrying the entity type of a JSON payload.
pub const ENTITY_TYPE_HEADER: &str = "entity-type";

/// A response as handed over by the transport.
#[derive(Debug)]
pub struct RawResponse<B> {
    headers: HeaderMap,
    body: B,
}

impl<B: Read> RawResponse<B> {
    pub fn new(headers: HeaderMap, body: B) -> Self {
        Self { headers, body }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn media_type(&self) -> MediaType {
        MediaType::from_headers(&self.headers)
    }
}

impl RawResponse<Cursor<Vec<u8>>> {
    /// Builds a response over an in-memory body.
    pub fn from_bytes(headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self::new(headers, Cursor::new(body.into()))
    }
}

impl<B: Read> From<http::Response<B>> for RawResponse<B> {
    fn from(response: http::Response<B>) -> Self {
        let (parts, body) = response.into_parts();
        Self::new(parts.headers, body)
    }
}

/// The shape the call site expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionTarget {
    /// The call site cannot know the shape (automation calls): it is discovered from the
    /// payload's entity type.
    Unknown,
    /// A statically known entity shape.
    Entity(EntityShape),
    /// An untyped JSON tree.
    Json,
}

/// The result of a conversion.
#[derive(Debug, Clone)]
pub enum Converted {
    Entity(Entity),
    Json(serde_json::Value),
    /// JSON whose entity type is not registered, exactly as received.
    Text(String),
    Blob(Blob),
    Blobs(Blobs),
}

impl Converted {
    /// Returns a short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Converted::Entity(entity) => entity.shape().name(),
            Converted::Json(_) => "Json",
            Converted::Text(_) => "Text",
            Converted::Blob(_) => "Blob",
            Converted::Blobs(_) => "Blobs",
        }
    }

    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Converted::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Converted::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn into_blobs(self) -> Option<Blobs> {
        match self {
            Converted::Blobs(blobs) => Some(blobs),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Converted::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Converted::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Converts raw responses into values.
///
/// Conversions are independent from each other, the only shared state is the
/// [`EntityRegistry`], which may be extended while conversions are in flight.
#[derive(Debug, Clone, Default)]
pub struct ResponseConverter {
    registry: EntityRegistry,
}

impl ResponseConverter {
    pub fn new(registry: EntityRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Teaches the converter a new entity type, or remaps an existing one.
    pub fn register_entity(&self, entity_type: impl Into<String>, shape: EntityShape) {
        self.registry.register(entity_type, shape);
    }

    /// Converts `response` according to its content type and the expected `target`.
    ///
    /// # Returns
    ///
    /// * `Ok(Converted)` - The single value selected by the dispatch rules.
    /// * `Err(ConvertError)` - The body could not be read, decoded or materialized.
    pub fn convert<B: Read>(
        &self,
        response: RawResponse<B>,
        target: ConversionTarget,
    ) -> Result<Converted, ConvertError> {
        let media_type = response.media_type();
        let RawResponse { headers, body } = response;

        match media_type.kind() {
            MediaKind::Multipart => read_blobs(&media_type, body).map(Converted::Blobs),
            MediaKind::Binary => read_blob(&media_type, &headers, body).map(Converted::Blob),
            MediaKind::Json | MediaKind::JsonEntity => match target {
                ConversionTarget::Unknown => self.read_unknown(&media_type, &headers, body),
                ConversionTarget::Entity(shape) => read_entity(&media_type, shape, body),
                ConversionTarget::Json => read_json(&media_type, body),
            },
        }
    }

    /// Resolves the shape of an automation result from its entity type.
    fn read_unknown<B: Read>(
        &self,
        media_type: &MediaType,
        headers: &HeaderMap,
        body: B,
    ) -> Result<Converted, ConvertError> {
        let declared = declared_entity_type(media_type, headers);
        let text = read_text(media_type, body)?;

        let entity_type = match declared {
            Some(entity_type) => Some(entity_type),
            None => sniff::sniff_entity_type(&text),
        };

        let shape = entity_type
            .as_deref()
            .and_then(|entity_type| self.registry.lookup(entity_type));

        debug!(
            entity_type = entity_type.as_deref().unwrap_or("<none>"),
            shape = shape.map(|s| s.name()).unwrap_or("<unregistered>"),
            "Resolving JSON payload of unknown shape"
        );

        match shape {
            Some(shape) => shape
                .decode(text.as_bytes())
                .map(Converted::Entity)
                .map_err(|source| ConvertError::Decode {
                    shape: shape.name(),
                    source,
                }),
            None => Ok(Converted::Text(text)),
        }
    }
}

/// The entity type declared by the server: the dedicated header first, then the
/// `nuxeo-entity` content type parameter.
fn declared_entity_type(media_type: &MediaType, headers: &HeaderMap) -> Option<String> {
    headers
        .get(ENTITY_TYPE_HEADER)
        .and_then(|value| value.to_str().ok())
        .or_else(|| media_type.entity_type())
        .map(str::trim)
        .filter(|entity_type| !entity_type.is_empty())
        .map(str::to_string)
}

fn read_entity<B: Read>(
    media_type: &MediaType,
    shape: EntityShape,
    body: B,
) -> Result<Converted, ConvertError> {
    let decoded = if is_single_byte(media_type) {
        let text = read_text(media_type, body)?;
        shape.decode(text.as_bytes())
    } else {
        shape.decode(BufReader::new(body))
    };

    decoded
        .map(Converted::Entity)
        .map_err(|source| decode_error(shape.name(), source))
}

fn read_json<B: Read>(media_type: &MediaType, body: B) -> Result<Converted, ConvertError> {
    let decoded = if is_single_byte(media_type) {
        let text = read_text(media_type, body)?;
        serde_json::from_str(&text)
    } else {
        serde_json::from_reader(BufReader::new(body))
    };

    decoded
        .map(Converted::Json)
        .map_err(|source| decode_error("Json", source))
}

/// A stream failing mid-read is an I/O error, not a malformed payload.
fn decode_error(shape: &'static str, source: serde_json::Error) -> ConvertError {
    if source.is_io() {
        ConvertError::Io(source.into())
    } else {
        ConvertError::Decode { shape, source }
    }
}

/// Whether the declared charset maps every byte to one character.
fn is_single_byte(media_type: &MediaType) -> bool {
    media_type.charset().is_some_and(|charset| {
        ["iso-8859-1", "latin1", "us-ascii"]
            .iter()
            .any(|single_byte| charset.eq_ignore_ascii_case(single_byte))
    })
}

/// Reads the whole body as text, honouring single-byte charsets; anything else is UTF-8.
fn read_text<B: Read>(media_type: &MediaType, mut body: B) -> Result<String, ConvertError> {
    let mut bytes = Vec::new();
    body.read_to_end(&mut bytes)?;
    drop(body);

    if is_single_byte(media_type) {
        Ok(bytes.iter().map(|&b| char::from(b)).collect())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn read_blob<B: Read>(
    media_type: &MediaType,
    headers: &HeaderMap,
    body: B,
) -> Result<Blob, ConvertError> {
    let mime_type =
        blob::mime_type_or_default((!media_type.is_unknown()).then(|| media_type.essence()));
    let filename = headers
        .get(http::header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(blob::content_disposition_filename);

    let file = blob::materialize(body, filename.as_deref())?;
    debug!(mime_type = %mime_type, path = %file.path().display(), "Materialized binary response");

    Ok(Blob::from_headers(file, headers, mime_type))
}

fn read_blobs<B: Read>(media_type: &MediaType, body: B) -> Result<Blobs, ConvertError> {
    let parts = multipart::read_parts(media_type, body)?;

    let mut blobs = Blobs::new();
    for part in parts {
        let part_type = MediaType::from_headers(&part.headers);
        let mime_type =
            blob::mime_type_or_default((!part_type.is_unknown()).then(|| part_type.essence()));
        let filename = part
            .headers
            .get(http::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(blob::content_disposition_filename);

        let file = blob::materialize(Cursor::new(part.body), filename.as_deref())?;
        blobs.push(Blob::from_headers(file, &part.headers, mime_type));
    }

    debug!(count = blobs.len(), "Materialized multipart response");
    Ok(blobs)
}
