use std::sync::Arc;

use tracing::{debug, error, info_span};

use crate::codec;
use crate::detection::domain::entity_detector::EntityDetector;
use crate::error::RecognitionError;
use crate::pipeline::entity_builder::EntityBuilder;
use crate::shared::entity::Entity;
use crate::shared::media_type::MediaType;

/// Single-request recognition pipeline: decode → detect → build entities.
///
/// Holds no per-request state; the detector and label table are loaded
/// once at startup and shared read-only across workers, so one use case
/// instance serves the whole process.
pub struct RecognizeEntitiesUseCase {
    detector: Arc<dyn EntityDetector>,
    builder: EntityBuilder,
}

impl RecognizeEntitiesUseCase {
    pub fn new(detector: Arc<dyn EntityDetector>, builder: EntityBuilder) -> Self {
        Self { detector, builder }
    }

    /// Runs the full request-to-result pipeline for one image.
    ///
    /// Decode failures are the caller's fault; detector and entity-build
    /// failures are ours and abort the request, except zero-area clipped
    /// boxes, which drop only the offending detection. An empty result is
    /// a valid outcome, not an error.
    pub fn execute(
        &self,
        image: &[u8],
        declared_media_type: Option<&str>,
        output_media_type: MediaType,
    ) -> Result<Vec<Entity>, RecognitionError> {
        let span = info_span!(
            "recognize",
            input_bytes = image.len(),
            output_media_type = %output_media_type,
        );
        let _guard = span.enter();

        debug!("decode start");
        let frame = codec::decode(image, declared_media_type).map_err(record_failure)?;

        debug!(
            width = frame.width(),
            height = frame.height(),
            "inference start"
        );
        let detections = self
            .detector
            .detect(&frame)
            .map_err(|err| record_failure(RecognitionError::DetectorFailure(err)))?;

        if detections.is_empty() {
            debug!("no detections");
            return Ok(Vec::new());
        }

        let mut entities = Vec::with_capacity(detections.len());
        let mut dropped = 0usize;
        for (index, detection) in detections.iter().enumerate() {
            match self.builder.build(detection, &frame, output_media_type) {
                Ok(entity) => entities.push(entity),
                Err(RecognitionError::EmptyDetectionRegion) => {
                    // Zero-area crop: drop this one, keep the request alive.
                    debug!(index, "dropping empty detection region");
                    dropped += 1;
                }
                Err(err) => return Err(record_failure(err)),
            }
        }

        debug!(
            entities = entities.len(),
            dropped, "entity build complete"
        );
        Ok(entities)
    }
}

/// Attach the triggering fault to the current span before re-raising.
fn record_failure(err: RecognitionError) -> RecognitionError {
    error!(error = %err, "recognition failed");
    err
}
