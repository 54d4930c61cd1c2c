use std::fmt;

use crate::error::RecognitionError;

/// The closed set of image encodings accepted at the service boundary.
///
/// Anything outside this allow-list is rejected before the codec runs,
/// regardless of whether the underlying library could handle it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    /// Output encoding used when a request leaves the type unspecified.
    pub const DEFAULT_OUTPUT: MediaType = MediaType::Jpeg;

    /// Parses a declared MIME type against the allow-list.
    ///
    /// `image/jpg` is accepted as a common alias for `image/jpeg`.
    pub fn parse(mime: &str) -> Result<Self, RecognitionError> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            other => Err(RecognitionError::UnsupportedMediaType(other.to_string())),
        }
    }

    pub fn as_mime(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    /// Conventional file extension for this encoding.
    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            MediaType::Jpeg => image::ImageFormat::Jpeg,
            MediaType::Png => image::ImageFormat::Png,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}
