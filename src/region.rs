use crate::error::Failure;
use serde::{Serialize, Serializer};

/// A point in normalized image coordinates (0.0-1.0 on both axes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x, self.y].serialize(serializer)
    }
}

/// Quadrilateral around a text region, corners in engine emission order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BoundingBox {
    pub corners: [Point; 4],
}

impl BoundingBox {
    /// Axis-aligned box from a normalized top-left corner and size
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            corners: [
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        }
    }
}

/// One recognized text span
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedRegion {
    pub text: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// Result of one recognition call
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// Regions in the engine's reading order; empty when the image has no text
    Success(Vec<RecognizedRegion>),
    Failure(Failure),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn regions(&self) -> Option<&[RecognizedRegion]> {
        match self {
            Self::Success(regions) => Some(regions.as_slice()),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<Vec<RecognizedRegion>, Failure> {
        match self {
            Self::Success(regions) => Ok(regions),
            Self::Failure(failure) => Err(failure),
        }
    }
}

impl From<Result<Vec<RecognizedRegion>, Failure>> for InvocationOutcome {
    fn from(result: Result<Vec<RecognizedRegion>, Failure>) -> Self {
        match result {
            Ok(regions) => Self::Success(regions),
            Err(failure) => Self::Failure(failure),
        }
    }
}
