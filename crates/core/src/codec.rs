//! In-memory image decode/encode on top of the `image` crate.
//!
//! Both directions are pure transforms: bytes in, raster out, and back.
//! Failure classification is the point of this module — callers rely on
//! the split between "bad input" and "our bug" (`InternalCodecError`).

use std::io::Cursor;

use crate::error::RecognitionError;
use crate::shared::frame::Frame;
use crate::shared::media_type::MediaType;

/// Decodes an encoded image payload into an RGB frame.
///
/// A declared media type is validated against the allow-list before any
/// bytes are looked at; without one the format is sniffed from the payload.
pub fn decode(bytes: &[u8], declared_media_type: Option<&str>) -> Result<Frame, RecognitionError> {
    if bytes.is_empty() {
        return Err(RecognitionError::EmptyInput);
    }

    let declared = declared_media_type.map(MediaType::parse).transpose()?;

    let decoded = match declared {
        Some(media_type) => image::load_from_memory_with_format(bytes, media_type.image_format()),
        None => image::load_from_memory(bytes),
    }
    .map_err(classify_decode_error)?;

    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(RecognitionError::InternalCodecError(format!(
            "decoder produced a degenerate {width}x{height} image"
        )));
    }

    Ok(Frame::new(rgb.into_raw(), width, height, 3))
}

/// Re-encodes a frame into the requested media type.
pub fn encode(frame: &Frame, media_type: MediaType) -> Result<Vec<u8>, RecognitionError> {
    let image = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| {
            RecognitionError::InternalCodecError(format!(
                "frame buffer does not match {}x{} RGB dimensions",
                frame.width(),
                frame.height()
            ))
        })?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), media_type.image_format())
        .map_err(RecognitionError::EncodeFailure)?;

    Ok(bytes)
}

fn classify_decode_error(err: image::ImageError) -> RecognitionError {
    match err {
        // Corrupt payloads and unrecognized signatures are the caller's fault.
        image::ImageError::Decoding(_) | image::ImageError::Unsupported(_) => {
            RecognitionError::DecodeFailure(err)
        }
        other => RecognitionError::InternalCodecError(other.to_string()),
    }
}
