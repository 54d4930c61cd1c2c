/// Multi-class object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, and decoding of the two
/// common YOLO-family output layouts:
/// - raw detection heads `[1, 4 + num_classes, N]` (or the untransposed
///   variant), which need per-class scoring and NMS here;
/// - end-to-end heads `[1, N, 6]` with rows `[x1, y1, x2, y2, score, class]`,
///   which arrive already suppressed.
///
/// Returned boxes are image-space but deliberately NOT clipped to the
/// image bounds; clipping belongs to the entity builder.
use std::path::Path;

use crate::detection::domain::entity_detector::{EntityDetector, RawDetection};
use crate::shared::frame::Frame;

use super::execution_provider::{execution_providers, Device};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold below which candidates are discarded.
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// NMS IoU threshold for raw detection heads.
const NMS_IOU_THRESH: f32 = 0.45;

/// Feature count of the end-to-end output layout.
const END_TO_END_FEATURES: usize = 6;

/// Object detector backed by an ONNX Runtime session.
///
/// The session is loaded once and is safe to share across worker threads;
/// `run` only reads model state.
pub struct OnnxEntityDetector {
    session: ort::session::Session,
    confidence: f32,
    input_size: u32,
}

impl OnnxEntityDetector {
    /// Load a detection ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// NCHW). Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, device: Device, confidence: f32) -> Result<Self, BoxedError> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(execution_providers(device))?
            .commit_from_file(model_path)?;

        // Try to read input size from model metadata (NCHW: [1, 3, H, W])
        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl EntityDetector for OnnxEntityDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, BoxedError> {
        // 1. Preprocess: letterbox + normalize → NCHW float32
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("detection model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        if shape.len() != 3 {
            return Err(format!("unexpected detection output shape: {shape:?}").into());
        }
        // Raw heads come transposed as [1, features, candidates]; end-to-end
        // heads as [1, candidates, features]. Features never outnumber
        // candidates in practice.
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };

        let data = tensor
            .as_slice()
            .ok_or("cannot view detection output as a contiguous slice")?;

        // 3. Decode candidates above the confidence threshold
        let mut detections = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };

            let Some(candidate) = decode_row(&row) else {
                continue;
            };
            if candidate.confidence < self.confidence {
                continue;
            }

            // Convert from letterbox coords back to original frame coords
            let [x1, y1, x2, y2] = candidate.bbox;
            detections.push(RawDetection {
                bbox: [
                    (x1 - pad_x as f32) / scale,
                    (y1 - pad_y as f32) / scale,
                    (x2 - pad_x as f32) / scale,
                    (y2 - pad_y as f32) / scale,
                ],
                confidence: candidate.confidence,
                class_index: candidate.class_index,
            });
        }

        // 4. NMS — only raw heads need it; end-to-end heads are final
        if num_feats == END_TO_END_FEATURES {
            Ok(detections)
        } else {
            Ok(nms(&mut detections, NMS_IOU_THRESH))
        }
    }
}

// ---------------------------------------------------------------------------
// Output decoding
// ---------------------------------------------------------------------------

fn decode_row(row: &[f32]) -> Option<RawDetection> {
    if row.len() < 5 {
        return None;
    }
    if row.len() == END_TO_END_FEATURES {
        decode_end_to_end_row(row)
    } else {
        decode_scored_row(row)
    }
}

/// Row format: `[x1, y1, x2, y2, score, class]`.
fn decode_end_to_end_row(row: &[f32]) -> Option<RawDetection> {
    Some(RawDetection {
        bbox: [row[0], row[1], row[2], row[3]],
        confidence: row[4],
        class_index: row[5] as usize,
    })
}

/// Row format: `[cx, cy, w, h, class_0_score, ..., class_n_score]`.
fn decode_scored_row(row: &[f32]) -> Option<RawDetection> {
    let (class_index, confidence) = row[4..]
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    let cx = row[0];
    let cy = row[1];
    let w = row[2];
    let h = row[3];

    Some(RawDetection {
        bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
        confidence,
        class_index,
    })
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f32, u32, u32) {
    let fw = frame.width() as f32;
    let fh = frame.height() as f32;
    let target = target_size as f32;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Pad with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f32 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f32 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy class-aware NMS: sort by confidence descending, suppress
/// overlapping boxes of the same class.
fn nms(detections: &mut [RawDetection], iou_thresh: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());
        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[j].class_index != detections[i].class_index {
                continue;
            }
            if bbox_iou(&detections[i].bbox, &detections[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
