use serde::{Deserialize, Serialize};

use super::FaceError;

/// Values per face descriptor.
pub const DESCRIPTOR_LEN: usize = 128;

/// Distances below this are treated as the same person.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// A 128-value face descriptor. Serializes as a plain JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FaceDescriptor(Vec<f32>);

impl FaceDescriptor {
    pub fn new(values: Vec<f32>) -> Result<Self, FaceError> {
        if values.len() != DESCRIPTOR_LEN {
            return Err(FaceError::WrongLength {
                expected: DESCRIPTOR_LEN,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FaceError::NonFinite);
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn distance(&self, other: &FaceDescriptor) -> f32 {
        squared_sum(&self.0, &other.0).sqrt()
    }
}

impl AsRef<[f32]> for FaceDescriptor {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

impl TryFrom<Vec<f32>> for FaceDescriptor {
    type Error = FaceError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FaceDescriptor> for Vec<f32> {
    fn from(d: FaceDescriptor) -> Self {
        d.0
    }
}

fn squared_sum(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, FaceError> {
    if a.len() != b.len() {
        return Err(FaceError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(squared_sum(a, b).sqrt())
}

/// Strictly below `threshold`.
pub fn is_same_person(a: &[f32], b: &[f32], threshold: f32) -> Result<bool, FaceError> {
    Ok(euclidean_distance(a, b)? < threshold)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceMatch {
    /// Position in the candidate list.
    pub index: usize,
    pub distance: f32,
}

/// Closest candidate whose distance is below `threshold`.
/// Ties go to the earlier candidate.
pub fn best_match<T: AsRef<[f32]>>(
    query: &[f32],
    candidates: &[T],
    threshold: f32,
) -> Result<Option<FaceMatch>, FaceError> {
    let mut best: Option<FaceMatch> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let distance = euclidean_distance(query, candidate.as_ref())?;
        if distance >= threshold {
            continue;
        }
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(FaceMatch { index, distance });
        }
    }
    Ok(best)
}
