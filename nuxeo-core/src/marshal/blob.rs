//! # Blobs
//!
//! Binary payloads are materialized into temporary files as soon as they are received.
//! A response body can only be read once, while callers routinely need to read a blob several
//! times or hand it over to another request, long after the response is gone.
//!
//! The temporary file lives as long as the last clone of the [`Blob`] pointing to it, and is
//! removed from disk when that clone is dropped.
use crate::{error::ConvertError, media_type::APPLICATION_OCTET_STREAM};
use http::{
    HeaderMap,
    header::{CONTENT_DISPOSITION, CONTENT_LENGTH},
};
use std::{
    fs::File,
    io::{self, Read, Write},
    path::Path,
    sync::Arc,
};
use tempfile::NamedTempFile;

const TEMP_FILE_PREFIX: &str = "nuxeo-";

/// A file-backed binary payload.
#[derive(Debug, Clone)]
pub struct Blob {
    file: Arc<NamedTempFile>,
    filename: Option<String>,
    mime_type: String,
    length: Option<u64>,
}

impl Blob {
    pub fn new(
        file: NamedTempFile,
        filename: Option<String>,
        mime_type: impl Into<String>,
        length: Option<u64>,
    ) -> Self {
        Self {
            file: Arc::new(file),
            filename,
            mime_type: mime_type.into(),
            length,
        }
    }

    /// Builds a blob from a part or response headers: the filename comes from
    /// `Content-Disposition`, the length from `Content-Length`.
    pub(crate) fn from_headers(
        file: NamedTempFile,
        headers: &HeaderMap,
        mime_type: impl Into<String>,
    ) -> Self {
        Self::new(
            file,
            filename_from_headers(headers),
            mime_type,
            content_length(headers),
        )
    }

    /// Builds a blob to upload from in-memory content.
    pub fn from_bytes(
        content: impl AsRef<[u8]>,
        filename: Option<String>,
        mime_type: impl Into<String>,
    ) -> Result<Self, ConvertError> {
        let content = content.as_ref();
        let file = materialize(content, filename.as_deref())?;
        Ok(Self::new(file, filename, mime_type, Some(content.len() as u64)))
    }

    /// Builds a blob to upload from a local file, named after it.
    pub fn from_file(
        path: impl AsRef<Path>,
        mime_type: impl Into<String>,
    ) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let source = File::open(path)?;
        let length = source.metadata()?.len();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);

        let file = materialize(source, filename.as_deref())?;
        Ok(Self::new(file, filename, mime_type, Some(length)))
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The advertised length in bytes, or `-1` when the server did not advertise one.
    pub fn length(&self) -> i64 {
        self.length
            .and_then(|length| i64::try_from(length).ok())
            .unwrap_or(-1)
    }

    /// Path of the backing temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Opens a fresh, independent reader over the content.
    pub fn open(&self) -> io::Result<File> {
        self.file.reopen()
    }

    /// Reads the whole content in memory.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut content = Vec::new();
        self.open()?.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Copies the content to `destination`, leaving the temporary file in place.
    pub fn save_to(&self, destination: impl AsRef<Path>) -> io::Result<u64> {
        std::fs::copy(self.path(), destination)
    }
}

/// An ordered collection of blobs, as received from a multipart response.
#[derive(Debug, Clone, Default)]
pub struct Blobs(Vec<Blob>);

impl Blobs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, blob: Blob) {
        self.0.push(blob);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Blob> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Blob> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Blob> {
        self.0
    }
}

impl IntoIterator for Blobs {
    type Item = Blob;
    type IntoIter = std::vec::IntoIter<Blob>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Blobs {
    type Item = &'a Blob;
    type IntoIter = std::slice::Iter<'a, Blob>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Copies `reader` into a new temporary file.
///
/// The reader is consumed and dropped whatever the outcome. On failure the partially written
/// file is dropped too, which removes it from disk.
///
/// # Arguments
///
/// * `reader` - The single-pass stream to persist.
/// * `suggested_name` - Used only to give the temporary file a matching extension.
pub fn materialize<R: Read>(
    mut reader: R,
    suggested_name: Option<&str>,
) -> Result<NamedTempFile, ConvertError> {
    let suffix = suggested_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .suffix(&suffix)
        .tempfile()
        .map_err(ConvertError::TempFile)?;

    io::copy(&mut reader, &mut file)?;
    file.flush()?;

    Ok(file)
}

/// Extracts the filename from a `Content-Disposition` header value.
///
/// Supports `filename="..."`, bare `filename=...` and RFC 5987 `filename*=UTF-8''...`
/// (the extended form wins when both are present).
pub fn content_disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for parameter in value.split(';').skip(1) {
        let Some((name, raw)) = parameter.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "filename" => {
                let unquoted = raw
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(raw);
                plain = Some(unquoted.to_string());
            }
            "filename*" => {
                let encoded = raw.split_once("''").map(|(_, v)| v).unwrap_or(raw);
                extended = urlencoding::decode(encoded).ok().map(|name| name.into_owned());
            }
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.trim().is_empty())
}

fn filename_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(content_disposition_filename)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// The mime type given to a blob whose content type is unknown.
pub(crate) fn mime_type_or_default(essence: Option<String>) -> String {
    essence.unwrap_or_else(|| APPLICATION_OCTET_STREAM.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_materialize_is_rereadable() {
        let file = materialize(Cursor::new(b"hello blob".to_vec()), Some("note.txt")).unwrap();
        assert!(file.path().to_string_lossy().ends_with(".txt"));

        let blob = Blob::new(file, Some("note.txt".to_string()), "text/plain", None);
        assert_eq!(blob.to_bytes().unwrap(), b"hello blob");
        assert_eq!(blob.to_bytes().unwrap(), b"hello blob");
        assert_eq!(blob.length(), -1);
    }

    #[test]
    fn test_temp_file_removed_with_last_clone() {
        let file = materialize(Cursor::new(b"x".to_vec()), None).unwrap();
        let blob = Blob::new(file, None, APPLICATION_OCTET_STREAM, Some(1));
        let path = blob.path().to_path_buf();
        let clone = blob.clone();

        drop(blob);
        assert!(path.exists());
        drop(clone);
        assert!(!path.exists());
    }

    #[test]
    fn test_materialize_failing_reader() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let err = materialize(Failing, Some("a.bin")).unwrap_err();
        assert!(matches!(err, ConvertError::Io(e) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_blob_from_file() {
        let mut source = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        source.write_all(b"a,b\n1,2\n").unwrap();

        let blob = Blob::from_file(source.path(), "text/csv").unwrap();
        assert_eq!(blob.filename(), source.path().file_name().and_then(|n| n.to_str()));
        assert_eq!(blob.mime_type(), "text/csv");
        assert_eq!(blob.length(), 8);
        assert_eq!(blob.to_bytes().unwrap(), b"a,b\n1,2\n");
        assert_ne!(blob.path(), source.path());
    }

    #[test]
    fn test_content_disposition_filename() {
        assert_eq!(
            content_disposition_filename("attachment; filename=\"report.pdf\"").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(
            content_disposition_filename("form-data; name=\"file\"; filename=a.txt").as_deref(),
            Some("a.txt")
        );
        assert_eq!(
            content_disposition_filename(
                "attachment; filename=\"fallback.txt\"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt"
            )
            .as_deref(),
            Some("résumé.txt")
        );
        assert_eq!(content_disposition_filename("inline"), None);
        assert_eq!(content_disposition_filename("attachment; filename=\"\""), None);
    }
}
