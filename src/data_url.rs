//! Data-URL handling for image turns
//!
//! Images travel through the conversation as `data:<mime>;base64,<payload>`
//! strings. This module turns uploaded bytes into that form and splits it back
//! into mime type and payload for the model request.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Mime type assumed when a data-URL does not declare one
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

const BASE64_MARKER: &str = ";base64";

/// A data-URL split into its declared mime type and base64 payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,
    #[error("data URL has no payload separator")]
    MissingSeparator,
}

impl<'a> DataUrl<'a> {
    /// Split `data:<mime>;base64,<payload>`.
    ///
    /// A header that does not spell out `<mime>;base64` falls back to
    /// [`DEFAULT_IMAGE_MIME`]; the payload is whatever follows the first comma.
    pub fn parse(url: &'a str) -> Result<Self, DataUrlError> {
        let rest = url.strip_prefix("data:").ok_or(DataUrlError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingSeparator)?;

        let mime_type = header
            .strip_suffix(BASE64_MARKER)
            .filter(|mime| !mime.is_empty() && !mime.contains(';'))
            .unwrap_or(DEFAULT_IMAGE_MIME);

        Ok(Self { mime_type, payload })
    }
}

/// Encode raw bytes as a base64 data-URL
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type}{BASE64_MARKER},{}", STANDARD.encode(bytes))
}

/// An image as received from the browser, before conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// Content type declared by the browser, if any
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageReadError {
    #[error("image upload is empty")]
    Empty,
    #[error("unsupported content type: {0}")]
    NotAnImage(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
}

/// Turns an uploaded image into a data-URL.
#[async_trait]
pub trait ImageReader: Send + Sync {
    async fn read_data_url(&self, upload: ImageUpload) -> Result<String, ImageReadError>;
}

/// Production reader: validates the upload and base64-encodes it off the
/// session task.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64ImageReader;

impl Base64ImageReader {
    fn resolve_mime(upload: &ImageUpload) -> Result<String, ImageReadError> {
        let declared = upload
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream");

        match declared {
            Some(ct) if ct.starts_with("image/") => Ok(ct.to_string()),
            Some(ct) => Err(ImageReadError::NotAnImage(ct.to_string())),
            None => {
                // Browsers sometimes omit the type; guess from the file name.
                let guessed = upload
                    .file_name
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .filter(|mime| mime.type_() == mime_guess::mime::IMAGE);
                Ok(guessed.map_or_else(|| DEFAULT_IMAGE_MIME.to_string(), |m| m.to_string()))
            }
        }
    }
}

#[async_trait]
impl ImageReader for Base64ImageReader {
    async fn read_data_url(&self, upload: ImageUpload) -> Result<String, ImageReadError> {
        if upload.bytes.is_empty() {
            return Err(ImageReadError::Empty);
        }
        let mime = Self::resolve_mime(&upload)?;

        let encoded = tokio::task::spawn_blocking(move || encode(&mime, &upload.bytes)).await?;
        Ok(encoded)
    }
}

impl From<tokio::task::JoinError> for ImageReadError {
    fn from(e: tokio::task::JoinError) -> Self {
        ImageReadError::Encode(e.to_string())
    }
}
