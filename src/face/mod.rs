//! Face-embedding helper.
//!
//! A face is reduced to a fixed-length descriptor; two faces belong to
//! the same person when their descriptors are close in Euclidean
//! distance. Model inference sits behind the `FaceEmbedder` trait so the
//! ONNX implementation (feature `onnx-faces`) can be swapped for the
//! deterministic mock in tests.

pub mod descriptor;
pub mod embedder;
#[cfg(feature = "onnx-faces")]
pub mod onnx;
pub mod preprocess;

use std::path::PathBuf;

use thiserror::Error;

pub use descriptor::{
    best_match, euclidean_distance, is_same_person, FaceDescriptor, FaceMatch,
    DEFAULT_MATCH_THRESHOLD, DESCRIPTOR_LEN,
};
pub use embedder::{FaceEmbedder, MockFaceEmbedder};
#[cfg(feature = "onnx-faces")]
pub use onnx::OnnxFaceEmbedder;

#[derive(Error, Debug)]
pub enum FaceError {
    #[error("Descriptor length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Descriptor must have {expected} values, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Descriptor contains a non-finite value")]
    NonFinite,

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Invalid face region: {0}")]
    InvalidRegion(String),

    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Model initialization failed: {0}")]
    ModelInit(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}
