//! ONNX Runtime face embedder.
//!
//! Two models from the model directory:
//! - `detector.onnx`: input `[1, 3, 240, 320]`, outputs scores
//!   `[1, N, 2]` (background, face) and boxes `[1, N, 4]` as relative
//!   corners.
//! - `recognizer.onnx`: input `[1, 3, 112, 112]`, output `[1, 128]`.
//!
//! Sessions sit behind a Mutex because `Session::run` needs `&mut self`
//! while `FaceEmbedder` exposes `&self`.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::TensorRef;

use super::descriptor::{FaceDescriptor, DESCRIPTOR_LEN};
use super::embedder::FaceEmbedder;
use super::preprocess::{self, FaceBox, Normalization};
use super::FaceError;

const DETECTOR_FILE: &str = "detector.onnx";
const RECOGNIZER_FILE: &str = "recognizer.onnx";

const DETECTOR_WIDTH: u32 = 320;
const DETECTOR_HEIGHT: u32 = 240;
const RECOGNIZER_SIZE: u32 = 112;

/// Detector input: `(v * 255 - 127) / 128`.
const DETECTOR_NORM: Normalization = Normalization {
    mean: [127.0 / 255.0; 3],
    std: [128.0 / 255.0; 3],
};

/// Crop margin around the detected box, as a fraction of its size.
const CROP_MARGIN: f32 = 0.1;
pub const DEFAULT_MIN_SCORE: f32 = 0.7;

pub struct OnnxFaceEmbedder {
    detector: Mutex<Session>,
    recognizer: Mutex<Session>,
    min_score: f32,
}

fn load_session(path: &Path) -> Result<Session, FaceError> {
    if !path.exists() {
        return Err(FaceError::ModelNotFound(path.to_path_buf()));
    }
    Session::builder()
        .map_err(|e: ort::Error| FaceError::ModelInit(e.to_string()))?
        .with_intra_threads(2)
        .map_err(|e: ort::Error| FaceError::ModelInit(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e: ort::Error| FaceError::ModelInit(format!("ONNX load failed: {e}")))
}

impl OnnxFaceEmbedder {
    /// `model_dir` must contain `detector.onnx` and `recognizer.onnx`.
    pub fn load(model_dir: &Path) -> Result<Self, FaceError> {
        let detector = load_session(&model_dir.join(DETECTOR_FILE))?;
        let recognizer = load_session(&model_dir.join(RECOGNIZER_FILE))?;
        tracing::info!(model_dir = %model_dir.display(), "ONNX face models loaded");
        Ok(Self {
            detector: Mutex::new(detector),
            recognizer: Mutex::new(recognizer),
            min_score: DEFAULT_MIN_SCORE,
        })
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Highest-scoring face above `min_score`.
    fn detect(&self, image: &image::RgbImage) -> Result<Option<FaceBox>, FaceError> {
        let (img_w, img_h) = image.dimensions();
        let input = preprocess::to_chw_tensor(image, DETECTOR_WIDTH, DETECTOR_HEIGHT, DETECTOR_NORM);
        let array = ndarray::Array4::from_shape_vec(
            (1, 3, DETECTOR_HEIGHT as usize, DETECTOR_WIDTH as usize),
            input,
        )
        .map_err(|e| FaceError::Inference(e.to_string()))?;
        let tensor =
            TensorRef::from_array_view(&array).map_err(|e| FaceError::Inference(e.to_string()))?;

        let mut session = self
            .detector
            .lock()
            .map_err(|_| FaceError::Inference("Detector lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| FaceError::Inference(format!("Detector inference failed: {e}")))?;

        let (score_shape, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceError::Inference(format!("Score extraction: {e}")))?;
        let (box_shape, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceError::Inference(format!("Box extraction: {e}")))?;

        if score_shape.len() != 3 || score_shape[2] != 2 || box_shape.len() != 3 || box_shape[2] != 4 {
            return Err(FaceError::Inference(format!(
                "Unexpected detector output shapes: {score_shape:?}, {box_shape:?}"
            )));
        }
        let candidates = (score_shape[1] as usize).min(box_shape[1] as usize);

        let mut best: Option<FaceBox> = None;
        for i in 0..candidates {
            let score = scores[i * 2 + 1];
            if score < self.min_score || best.is_some_and(|b| b.score >= score) {
                continue;
            }
            let corners = [boxes[i * 4], boxes[i * 4 + 1], boxes[i * 4 + 2], boxes[i * 4 + 3]];
            best = Some(FaceBox::from_relative_corners(corners, score, img_w, img_h));
        }
        Ok(best)
    }

    fn recognize(&self, face: &image::RgbImage) -> Result<FaceDescriptor, FaceError> {
        let input =
            preprocess::to_chw_tensor(face, RECOGNIZER_SIZE, RECOGNIZER_SIZE, Normalization::SYMMETRIC);
        let size = RECOGNIZER_SIZE as usize;
        let array = ndarray::Array4::from_shape_vec((1, 3, size, size), input)
            .map_err(|e| FaceError::Inference(e.to_string()))?;
        let tensor =
            TensorRef::from_array_view(&array).map_err(|e| FaceError::Inference(e.to_string()))?;

        let mut session = self
            .recognizer
            .lock()
            .map_err(|_| FaceError::Inference("Recognizer lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| FaceError::Inference(format!("Recognizer inference failed: {e}")))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceError::Inference(format!("Output extraction: {e}")))?;

        if shape.last().map(|d| *d as usize) != Some(DESCRIPTOR_LEN) {
            return Err(FaceError::Inference(format!(
                "Unexpected output shape: {shape:?}, expected [1, {DESCRIPTOR_LEN}]"
            )));
        }
        let mut values = data[..DESCRIPTOR_LEN].to_vec();
        preprocess::l2_normalize(&mut values);
        FaceDescriptor::new(values)
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn embed(&self, image: &[u8]) -> Result<Option<FaceDescriptor>, FaceError> {
        let rgb = preprocess::decode(image)?;
        let Some(face) = self.detect(&rgb)? else {
            tracing::debug!("No face detected");
            return Ok(None);
        };
        tracing::debug!(score = face.score, "Face detected");
        let crop = preprocess::crop_face(&rgb, &face, CROP_MARGIN)?;
        self.recognize(&crop).map(Some)
    }
}
