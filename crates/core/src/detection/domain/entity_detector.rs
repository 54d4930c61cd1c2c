use crate::shared::frame::Frame;

/// One scored box straight out of the detection model.
///
/// Coordinates are image-space `(x1, y1, x2, y2)` but are NOT guaranteed
/// to lie within the image bounds; clipping is the entity builder's job.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_index: usize,
}

/// Domain interface for the opaque detection capability.
///
/// Implementations are loaded once at startup and shared read-only across
/// workers, hence `&self` and `Send + Sync`. Invoked exactly once per
/// request; a failure is always fatal for that request.
pub trait EntityDetector: Send + Sync {
    fn detect(
        &self,
        frame: &Frame,
    ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error + Send + Sync>>;
}
