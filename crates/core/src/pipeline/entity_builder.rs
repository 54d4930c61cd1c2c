use crate::codec;
use crate::detection::domain::entity_detector::RawDetection;
use crate::detection::domain::label_table::LabelTable;
use crate::error::RecognitionError;
use crate::shared::entity::Entity;
use crate::shared::frame::Frame;
use crate::shared::media_type::MediaType;

/// Converts one raw detection plus its source frame into an [`Entity`]:
/// label resolution, box clipping, cropping, crop re-encoding.
///
/// Holds only the process-scoped label table; everything else is
/// per-request input.
pub struct EntityBuilder {
    labels: LabelTable,
}

impl EntityBuilder {
    pub fn new(labels: LabelTable) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Builds the entity for one detection.
    ///
    /// `EmptyDetectionRegion` means the clipped box had zero area and the
    /// detection should be dropped; every other error is a defect that
    /// must abort the surrounding request.
    pub fn build(
        &self,
        detection: &RawDetection,
        source: &Frame,
        output_media_type: MediaType,
    ) -> Result<Entity, RecognitionError> {
        let label = self.labels.resolve(detection.class_index).ok_or_else(|| {
            // An index the table can't resolve is detector output we never
            // agreed to, not a caller mistake.
            RecognitionError::InternalCodecError(format!(
                "class index {} outside label table of {} entries",
                detection.class_index,
                self.labels.len()
            ))
        })?;

        let (x1, y1, x2, y2) = clip_box(&detection.bbox, source.width(), source.height())
            .ok_or(RecognitionError::EmptyDetectionRegion)?;

        let crop = source.crop(x1, y1, x2, y2);
        let image = codec::encode(&crop, output_media_type)
            .map_err(|err| RecognitionError::EntityEncodingFailure(Box::new(err)))?;

        Ok(Entity {
            label: label.to_string(),
            x1,
            y1,
            x2,
            y2,
            confidence: detection.confidence,
            image,
            media_type: output_media_type,
        })
    }
}

/// Truncates box coordinates to integer pixel indices and clips them to the
/// image bounds. Returns `None` when the clipped box has zero area.
///
/// Truncation, not rounding: the detector's native coordinate convention.
fn clip_box(bbox: &[f32; 4], width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x1 = (bbox[0].trunc() as i64).clamp(0, width as i64) as u32;
    let y1 = (bbox[1].trunc() as i64).clamp(0, height as i64) as u32;
    let x2 = (bbox[2].trunc() as i64).clamp(0, width as i64) as u32;
    let y2 = (bbox[3].trunc() as i64).clamp(0, height as i64) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some((x1, y1, x2, y2))
}
