use thiserror::Error;

/// How a failure should be reported at the service boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller sent something we cannot work with.
    InvalidInput,
    /// A defect on our side of the boundary (codec bug, detector fault,
    /// label table mismatch).
    Internal,
}

/// Failure taxonomy for the recognition pipeline.
///
/// Every variant is terminal for its request except `EmptyDetectionRegion`,
/// which the pipeline recovers from by dropping the offending detection.
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("input image is empty")]
    EmptyInput,

    #[error("unsupported media type: {0:?}")]
    UnsupportedMediaType(String),

    #[error("failed to decode image: {0}")]
    DecodeFailure(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    EncodeFailure(#[source] image::ImageError),

    /// Non-fatal: the clipped bounding box has zero area.
    #[error("detection region is empty after clipping to image bounds")]
    EmptyDetectionRegion,

    #[error("failed to encode entity crop: {0}")]
    EntityEncodingFailure(#[source] Box<RecognitionError>),

    #[error("detector failure: {0}")]
    DetectorFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Defensive catch-all for failures that indicate a bug on our side
    /// rather than bad input.
    #[error("internal codec error: {0}")]
    InternalCodecError(String),
}

impl RecognitionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RecognitionError::EmptyInput
            | RecognitionError::UnsupportedMediaType(_)
            | RecognitionError::DecodeFailure(_)
            | RecognitionError::EmptyDetectionRegion => ErrorClass::InvalidInput,
            RecognitionError::EncodeFailure(_)
            | RecognitionError::EntityEncodingFailure(_)
            | RecognitionError::DetectorFailure(_)
            | RecognitionError::InternalCodecError(_) => ErrorClass::Internal,
        }
    }
}
