use super::descriptor::{FaceDescriptor, DESCRIPTOR_LEN};
use super::preprocess::l2_normalize;
use super::FaceError;

/// Image bytes in, descriptor out.
pub trait FaceEmbedder: Send + Sync {
    /// `Ok(None)` when no face is found in the image.
    fn embed(&self, image: &[u8]) -> Result<Option<FaceDescriptor>, FaceError>;
}

/// Mock embedder for testing: derives a deterministic unit-length
/// descriptor from the image bytes. Empty input counts as "no face".
#[derive(Debug, Default)]
pub struct MockFaceEmbedder {
    never_detects: bool,
}

impl MockFaceEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An embedder that never finds a face.
    pub fn without_faces() -> Self {
        Self { never_detects: true }
    }
}

impl FaceEmbedder for MockFaceEmbedder {
    fn embed(&self, image: &[u8]) -> Result<Option<FaceDescriptor>, FaceError> {
        if self.never_detects || image.is_empty() {
            return Ok(None);
        }
        FaceDescriptor::new(deterministic_descriptor(image)).map(Some)
    }
}

fn deterministic_descriptor(bytes: &[u8]) -> Vec<f32> {
    let mut values = vec![0.0f32; DESCRIPTOR_LEN];
    for (i, slot) in values.iter_mut().enumerate() {
        let byte = bytes[i % bytes.len()];
        *slot = (byte as f32 + i as f32) / 255.0;
    }
    l2_normalize(&mut values);
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::descriptor::{is_same_person, DEFAULT_MATCH_THRESHOLD};

    #[test]
    fn mock_is_deterministic() {
        let embedder = MockFaceEmbedder::new();
        let a = embedder.embed(b"portrait-1").unwrap().unwrap();
        let b = embedder.embed(b"portrait-1").unwrap().unwrap();
        assert_eq!(a, b);
        assert!(is_same_person(a.as_slice(), b.as_slice(), DEFAULT_MATCH_THRESHOLD).unwrap());
    }

    #[test]
    fn mock_is_unit_length() {
        let d = MockFaceEmbedder::new().embed(b"abc").unwrap().unwrap();
        let norm: f32 = d.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mock_reports_no_face() {
        assert!(MockFaceEmbedder::new().embed(&[]).unwrap().is_none());
        assert!(MockFaceEmbedder::without_faces().embed(b"x").unwrap().is_none());
    }

    #[test]
    fn mock_works_as_trait_object() {
        let embedder: Box<dyn FaceEmbedder> = Box::new(MockFaceEmbedder::new());
        let a = embedder.embed(&[0u8; 64]).unwrap().unwrap();
        let b = embedder.embed(&[200u8; 64]).unwrap().unwrap();
        assert_ne!(a, b);
    }
}
