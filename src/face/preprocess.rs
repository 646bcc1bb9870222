//! Image preparation for the face models: decode, crop around the
//! detected face, resize, and lay out as a normalized CHW float tensor.

use image::imageops::FilterType;
use image::RgbImage;
use serde::Serialize;

use super::FaceError;

/// Per-channel normalization applied after scaling pixels to `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    /// Maps `0..=255` onto roughly `-1..=1`.
    pub const SYMMETRIC: Self = Self {
        mean: [0.5, 0.5, 0.5],
        std: [0.5, 0.5, 0.5],
    };
}

/// A detected face in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

impl FaceBox {
    /// From corners given as fractions of the image size, as detectors
    /// usually report them.
    pub fn from_relative_corners(corners: [f32; 4], score: f32, image_w: u32, image_h: u32) -> Self {
        let [x1, y1, x2, y2] = corners;
        let (w, h) = (image_w as f32, image_h as f32);
        Self {
            x: x1 * w,
            y: y1 * h,
            width: (x2 - x1) * w,
            height: (y2 - y1) * h,
            score,
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<RgbImage, FaceError> {
    if bytes.is_empty() {
        return Err(FaceError::Decode("empty image".to_string()));
    }
    let img = image::load_from_memory(bytes).map_err(|e| FaceError::Decode(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Crop the face, grown by `margin` (fraction of the box size) on every
/// side and clamped to the image.
pub fn crop_face(image: &RgbImage, face: &FaceBox, margin: f32) -> Result<RgbImage, FaceError> {
    let (img_w, img_h) = image.dimensions();
    let pad_x = face.width * margin;
    let pad_y = face.height * margin;

    let x1 = (face.x - pad_x).max(0.0).floor() as u32;
    let y1 = (face.y - pad_y).max(0.0).floor() as u32;
    let x2 = ((face.x + face.width + pad_x).min(img_w as f32).ceil() as u32).min(img_w);
    let y2 = ((face.y + face.height + pad_y).min(img_h as f32).ceil() as u32).min(img_h);

    if x2 <= x1 || y2 <= y1 {
        return Err(FaceError::InvalidRegion(format!(
            "box {face:?} lies outside a {img_w}x{img_h} image"
        )));
    }
    Ok(image::imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// Resize to `width` x `height` and flatten to `[3, height, width]`.
pub fn to_chw_tensor(image: &RgbImage, width: u32, height: u32, norm: Normalization) -> Vec<f32> {
    let resized = if image.dimensions() == (width, height) {
        image.clone()
    } else {
        image::imageops::resize(image, width, height, FilterType::Triangle)
    };

    let plane = (width * height) as usize;
    let mut tensor = vec![0.0f32; 3 * plane];
    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            tensor[c * plane + i] = (v - norm.mean[c]) / norm.std[c];
        }
    }
    tensor
}

/// Scale to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}
