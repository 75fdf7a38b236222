use std::path::Path;

use derive_more::Display;
use log::trace;
use thiserror::Error;

/// The media type result.
pub type MediaTypeResult<T> = Result<T, MediaTypeError>;

/// The media type specific errors that can occur.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaTypeError {
    #[error("Value \"{0}\" is not a valid media type")]
    InvalidMediaType(String),
    #[error("Filename \"{0}\" is invalid and cannot be converted to a media type")]
    InvalidFile(String),
    #[error("Media type couldn't be found for extension {0}")]
    NotFound(String),
}

/// Represent a MIME type, as originally defined in RFC 2046
/// and subsequently used in other Internet protocols including HTTP.
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{}/{}", mime_type, subtype)]
pub struct MediaType {
    mime_type: String,
    subtype: String,
}

impl MediaType {
    /// Parse the given value into a media type.
    ///
    /// Example:
    /// ```rust
    /// use popcorn_stream_core::core::stream::MediaType;
    ///
    /// let media_type = MediaType::parse("video/mp4").unwrap();
    /// assert_eq!("video/mp4", media_type.to_string());
    /// ```
    pub fn parse(value: &str) -> MediaTypeResult<Self> {
        let tokens = value
            .split('/')
            .filter(|e| !e.is_empty())
            .collect::<Vec<&str>>();
        if tokens.len() != 2 || tokens.iter().any(|e| e.contains(char::is_whitespace)) {
            return Err(MediaTypeError::InvalidMediaType(value.to_string()));
        }

        Ok(Self {
            mime_type: tokens[0].to_string(),
            subtype: tokens[1].to_string(),
        })
    }

    /// Retrieve the octet-stream media type.
    pub fn octet_stream() -> Self {
        Self {
            mime_type: "application".to_string(),
            subtype: "octet-stream".to_string(),
        }
    }
}

/// The media type factory which converts file extensions into a [MediaType].
#[derive(Debug, Default)]
pub struct MediaTypeFactory;

impl MediaTypeFactory {
    /// Retrieve the media type for the given filename.
    /// The mime type will be determined based on the extension of the file.
    ///
    /// It returns the [MediaType] if found, else the [MediaTypeError].
    pub fn media_type(&self, filename: &str) -> MediaTypeResult<MediaType> {
        let filename = filename.to_lowercase();
        let extension = Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                trace!("Unable to extract extension from {}", filename);
                MediaTypeError::InvalidFile(filename.clone())
            })?;

        mime_guess::from_ext(extension)
            .first()
            .map(|mime| MediaType {
                mime_type: mime.type_().to_string(),
                subtype: mime.subtype().to_string(),
            })
            .ok_or_else(|| MediaTypeError::NotFound(extension.to_string()))
    }
}
