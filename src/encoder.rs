//! Turns a selected image file into the base64 payload sent to the
//! generation service.

use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};

use crate::error::EncodeError;

/// Where the bytes of a selected file live.
#[derive(Clone, Debug)]
pub enum FileSource {
    /// Uploaded through the browser and held in memory.
    Memory(Arc<[u8]>),
    /// A file on local disk, read when the payload is built.
    Path(PathBuf),
}

/// A user-selected file.
#[derive(Clone, Debug)]
pub struct FileHandle {
    pub name: String,
    pub declared_mime: Option<String>,
    pub source: FileSource,
}

impl FileHandle {
    pub fn from_bytes(name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_mime: mime,
            source: FileSource::Memory(bytes.into()),
        }
    }

    /// A file on disk. Without a declared type, the MIME type is taken from
    /// the file extension so the view can show it before the file is read.
    pub fn from_path(path: impl Into<PathBuf>, mime: Option<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let declared_mime = mime.or_else(|| {
            image::ImageFormat::from_path(&path)
                .ok()
                .map(|format| format.to_mime_type().to_string())
        });
        Self {
            name,
            declared_mime,
            source: FileSource::Path(path),
        }
    }

    /// Read the whole file.
    pub async fn read(&self) -> Result<Arc<[u8]>, EncodeError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
            FileSource::Path(path) => Ok(tokio::fs::read(path).await?.into()),
        }
    }

    /// MIME type shown to the view before the file has been read.
    pub fn mime_hint(&self) -> &str {
        self.declared_mime
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

/// An image ready to be attached to a generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

/// Read `file` fully and encode it as base64 with its MIME type.
pub async fn encode(file: &FileHandle) -> Result<EncodedImage, EncodeError> {
    let bytes = file.read().await?;
    let mime_type = resolve_mime(file.declared_mime.as_deref(), &bytes)?;
    let encoded = general_purpose::STANDARD.encode(&bytes);

    Ok(EncodedImage {
        data: strip_data_uri_prefix(&encoded).to_string(),
        mime_type,
    })
}

/// Remove a leading `data:<mime>;base64,` header, if any.
pub fn strip_data_uri_prefix(payload: &str) -> &str {
    if !payload.starts_with("data:") {
        return payload;
    }
    match payload.find(";base64,") {
        Some(idx) => &payload[idx + ";base64,".len()..],
        None => payload,
    }
}

/// Decode an upload that arrived as a textual data URL.
///
/// Returns `None` when `raw` is not a base64 data URL.
pub fn decode_data_uri(raw: &[u8]) -> Option<(String, Vec<u8>)> {
    if !raw.starts_with(b"data:") {
        return None;
    }
    let text = std::str::from_utf8(raw).ok()?.trim();
    let (header, _) = text.split_once(";base64,")?;
    let mime = header.trim_start_matches("data:").to_string();
    let bytes = general_purpose::STANDARD
        .decode(strip_data_uri_prefix(text))
        .ok()?;
    Some((mime, bytes))
}

/// Pick the MIME type sent alongside the payload.
///
/// A declared `image/*` type wins; otherwise the format is sniffed from the
/// file contents.
pub fn resolve_mime(declared: Option<&str>, bytes: &[u8]) -> Result<String, EncodeError> {
    if let Some(mime) = declared.filter(|m| m.starts_with("image/")) {
        return Ok(mime.to_string());
    }
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .map_err(|_| EncodeError::UnsupportedMedia(declared.unwrap_or("unknown").to_string()))
}
