use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::debug;

use spotter_core::error::{ErrorClass, RecognitionError};
use spotter_core::pipeline::recognize_entities_use_case::RecognizeEntitiesUseCase;
use spotter_core::shared::entity::Entity;
use spotter_core::shared::media_type::MediaType;

use crate::pb;
use crate::pb::entity_recognition_server::EntityRecognition;

/// gRPC adapter around the recognition pipeline.
///
/// Owns nothing mutable: the pipeline (and through it the detector and
/// label table) is process-scoped and shared across all in-flight calls.
pub struct RecognitionService {
    pipeline: Arc<RecognizeEntitiesUseCase>,
}

impl RecognitionService {
    pub fn new(pipeline: Arc<RecognizeEntitiesUseCase>) -> Self {
        Self { pipeline }
    }
}

#[tonic::async_trait]
impl EntityRecognition for RecognitionService {
    async fn recognize(
        &self,
        request: Request<pb::RecognizeRequest>,
    ) -> Result<Response<pb::RecognizeResponse>, Status> {
        let request = request.into_inner();
        debug!(
            input_bytes = request.image.len(),
            media_type = %request.media_type,
            "recognize request"
        );

        let declared = none_if_empty(request.media_type);
        let output_media_type = match none_if_empty(request.output_media_type) {
            Some(mime) => MediaType::parse(&mime).map_err(|err| status_for(&err))?,
            None => MediaType::DEFAULT_OUTPUT,
        };

        // Inference is blocking and not cancellable once started; run it on
        // the runtime's blocking pool so request tasks stay responsive.
        let pipeline = self.pipeline.clone();
        let image = request.image;
        let entities = tokio::task::spawn_blocking(move || {
            pipeline.execute(&image, declared.as_deref(), output_media_type)
        })
        .await
        .map_err(|err| Status::internal(format!("recognition task failed: {err}")))?
        .map_err(|err| status_for(&err))?;

        Ok(Response::new(pb::RecognizeResponse {
            entities: entities.into_iter().map(to_wire).collect(),
        }))
    }
}

/// Map the pipeline's error classes onto transport status codes.
///
/// The message carries the proximate cause chain and nothing else.
pub fn status_for(err: &RecognitionError) -> Status {
    match err.class() {
        ErrorClass::InvalidInput => Status::invalid_argument(err.to_string()),
        ErrorClass::Internal => Status::internal(err.to_string()),
    }
}

fn to_wire(entity: Entity) -> pb::Entity {
    pb::Entity {
        label: entity.label,
        x1: entity.x1 as f32,
        x2: entity.x2 as f32,
        y1: entity.y1 as f32,
        y2: entity.y2 as f32,
        confidence: entity.confidence,
        image: entity.image,
        media_type: entity.media_type.as_mime().to_string(),
    }
}

fn none_if_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use spotter_core::detection::domain::entity_detector::{EntityDetector, RawDetection};
    use spotter_core::detection::domain::label_table::LabelTable;
    use spotter_core::pipeline::entity_builder::EntityBuilder;
    use spotter_core::shared::frame::Frame;

    struct StubDetector {
        detections: Vec<RawDetection>,
    }

    impl EntityDetector for StubDetector {
        fn detect(
            &self,
            _frame: &Frame,
        ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.detections.clone())
        }
    }

    struct FailingDetector;

    impl EntityDetector for FailingDetector {
        fn detect(
            &self,
            _frame: &Frame,
        ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error + Send + Sync>> {
            Err("accelerator unavailable".into())
        }
    }

    fn service_with(detector: impl EntityDetector + 'static) -> RecognitionService {
        let pipeline = RecognizeEntitiesUseCase::new(
            Arc::new(detector),
            EntityBuilder::new(LabelTable::coco()),
        );
        RecognitionService::new(Arc::new(pipeline))
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(w, h, image::Rgb([10, 60, 110]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn request(image: Vec<u8>, media_type: &str, output: &str) -> Request<pb::RecognizeRequest> {
        Request::new(pb::RecognizeRequest {
            image,
            media_type: media_type.to_string(),
            output_media_type: output.to_string(),
        })
    }

    #[tokio::test]
    async fn test_recognize_returns_wire_entities() {
        let service = service_with(StubDetector {
            detections: vec![RawDetection {
                bbox: [10.0, 10.0, 50.0, 80.0],
                confidence: 0.87,
                class_index: 0,
            }],
        });

        let response = service
            .recognize(request(png_bytes(100, 100), "image/png", ""))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.entities.len(), 1);
        let entity = &response.entities[0];
        assert_eq!(entity.label, "person");
        assert_eq!(entity.x1, 10.0);
        assert_eq!(entity.y1, 10.0);
        assert_eq!(entity.x2, 50.0);
        assert_eq!(entity.y2, 80.0);
        assert!((entity.confidence - 0.87).abs() < 1e-6);
        assert!(!entity.image.is_empty());
        // Unspecified output type defaults to JPEG
        assert_eq!(entity.media_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_empty_image_is_invalid_argument() {
        let service = service_with(StubDetector { detections: vec![] });

        let status = service
            .recognize(request(Vec::new(), "", ""))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(status.message().contains("empty"));
    }

    #[tokio::test]
    async fn test_bad_output_media_type_is_invalid_argument() {
        let service = service_with(StubDetector { detections: vec![] });

        let status = service
            .recognize(request(png_bytes(10, 10), "", "image/webp"))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(status.message().contains("image/webp"));
    }

    #[tokio::test]
    async fn test_detector_failure_is_internal() {
        let service = service_with(FailingDetector);

        let status = service
            .recognize(request(png_bytes(10, 10), "", ""))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().contains("accelerator unavailable"));
    }

    #[tokio::test]
    async fn test_no_detections_is_empty_response() {
        let service = service_with(StubDetector { detections: vec![] });

        let response = service
            .recognize(request(png_bytes(10, 10), "", ""))
            .await
            .unwrap()
            .into_inner();

        assert!(response.entities.is_empty());
    }

    #[test]
    fn test_status_mapping_per_error_class() {
        let user = RecognitionError::EmptyInput;
        assert_eq!(status_for(&user).code(), tonic::Code::InvalidArgument);

        let internal = RecognitionError::InternalCodecError("bug".into());
        assert_eq!(status_for(&internal).code(), tonic::Code::Internal);
    }
}
