//! OCR output model: detections from the OCR collaborator and the fragment
//! set the extraction pipeline works on.
//!
//! Text recognition itself happens outside this crate. Whatever engine is used
//! hands back a list of `(text, confidence, polygon)` detections, which are
//! validated into a [`FragmentSet`] here.

mod fragment;
mod layout;

pub use fragment::{BoundingBox, FragmentSet, TextFragment};
pub use layout::{Line, ReadingOrder};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OcrError;

/// Polygon as emitted by an OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPolygon {
    /// List of `[x, y]` points, normally four corners clockwise from top-left.
    Points(Vec<[f32; 2]>),
    /// Flat coordinates: eight values for a quadrilateral, or four values for
    /// an axis-aligned `[x_min, y_min, x_max, y_max]` rectangle.
    Flat(Vec<f32>),
}

impl Default for RawPolygon {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

impl RawPolygon {
    /// Convert to a quadrilateral bounding box.
    ///
    /// Shapes that cannot be interpreted degrade to an empty box at the origin.
    pub fn to_bounding_box(&self) -> BoundingBox {
        match self {
            Self::Points(points) if points.len() >= 4 => BoundingBox::from_points([
                points[0], points[1], points[2], points[3],
            ]),
            Self::Points(points) if points.len() == 2 => {
                BoundingBox::from_rect(points[0][0], points[0][1], points[1][0], points[1][1])
            }
            Self::Flat(values) if values.len() >= 8 => BoundingBox::from_points([
                [values[0], values[1]],
                [values[2], values[3]],
                [values[4], values[5]],
                [values[6], values[7]],
            ]),
            Self::Flat(values) if values.len() == 4 => {
                BoundingBox::from_rect(values[0], values[1], values[2], values[3])
            }
            other => {
                warn!("Unrecognized polygon shape {:?}, using an empty box", other);
                BoundingBox::default()
            }
        }
    }
}

/// One detection reported by the OCR collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrDetection {
    /// Recognized text.
    #[serde(alias = "content")]
    pub text: String,

    /// Recognition confidence; expected within 0.0 - 1.0.
    #[serde(default, alias = "score")]
    pub confidence: f32,

    /// Bounding polygon in image pixels.
    #[serde(default, alias = "bbox", alias = "box", alias = "polygon")]
    pub points: RawPolygon,
}

impl OcrDetection {
    /// Create a detection with an axis-aligned box `[x_min, y_min, x_max, y_max]`.
    pub fn with_rect(text: impl Into<String>, confidence: f32, rect: [f32; 4]) -> Self {
        Self {
            text: text.into(),
            confidence,
            points: RawPolygon::Flat(rect.to_vec()),
        }
    }
}

/// Columnar output of PaddleOCR / PaddleX pipelines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaddleOutput {
    #[serde(alias = "rec_text")]
    pub rec_texts: Vec<String>,
    #[serde(default, alias = "rec_score")]
    pub rec_scores: Vec<f32>,
    #[serde(default, alias = "dt_polys")]
    pub rec_polys: Vec<RawPolygon>,
}

/// OCR output in any of the accepted serialized shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OcrOutput {
    /// `[{"text": ..., "confidence": ..., "bbox": ...}, ...]`
    Detections(Vec<OcrDetection>),
    /// Classic PaddleOCR lines: `[[polygon, [text, score]], ...]`
    Lines(Vec<(RawPolygon, (String, f32))>),
    /// PaddleX columnar result.
    Paddle(PaddleOutput),
}

impl OcrOutput {
    /// Flatten into a list of detections.
    pub fn into_detections(self) -> Vec<OcrDetection> {
        match self {
            Self::Detections(detections) => detections,
            Self::Lines(lines) => lines
                .into_iter()
                .map(|(points, (text, confidence))| OcrDetection {
                    text,
                    confidence,
                    points,
                })
                .collect(),
            Self::Paddle(output) => {
                let PaddleOutput {
                    rec_texts,
                    rec_scores,
                    rec_polys,
                } = output;
                rec_texts
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| OcrDetection {
                        text,
                        confidence: rec_scores.get(i).copied().unwrap_or(0.0),
                        points: rec_polys.get(i).cloned().unwrap_or_default(),
                    })
                    .collect()
            }
        }
    }
}

/// An OCR collaborator turning some input (usually a decoded image) into
/// detections.
pub trait TextRecognizer {
    /// What the recognizer reads.
    type Input: ?Sized;

    /// Recognize text in the input.
    fn recognize(&self, input: &Self::Input) -> Result<Vec<OcrDetection>, OcrError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{FragmentSet, OcrDetection};

    /// Lay out receipt lines top to bottom, 20px apart, fragments 100px apart.
    pub fn receipt(lines: &[&[&str]]) -> FragmentSet {
        receipt_with_confidence(lines, 0.9)
    }

    pub fn receipt_with_confidence(lines: &[&[&str]], confidence: f32) -> FragmentSet {
        let mut detections = Vec::new();
        for (row, line) in lines.iter().enumerate() {
            for (col, text) in line.iter().enumerate() {
                let x = col as f32 * 100.0;
                let y = row as f32 * 20.0;
                detections.push(OcrDetection::with_rect(
                    *text,
                    confidence,
                    [x, y, x + 90.0, y + 10.0],
                ));
            }
        }
        FragmentSet::from_detections(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_detection_list() {
        let json = r#"[
            {"text": "TOKO ABC", "confidence": 0.98, "bbox": [[10, 10], [120, 10], [120, 30], [10, 30]]},
            {"content": "Total", "score": 0.9, "box": [10, 200, 60, 220]}
        ]"#;

        let output: OcrOutput = serde_json::from_str(json).unwrap();
        let detections = output.into_detections();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].text, "TOKO ABC");
        assert_eq!(detections[1].points.to_bounding_box().center(), (35.0, 210.0));
    }

    #[test]
    fn test_parse_paddle_lines() {
        let json = r#"[
            [[[0, 0], [50, 0], [50, 10], [0, 10]], ["INDOMARET", 0.97]],
            [[[0, 20], [50, 20], [50, 30], [0, 30]], ["Rp 15.000", 0.91]]
        ]"#;

        let detections = serde_json::from_str::<OcrOutput>(json)
            .unwrap()
            .into_detections();

        assert_eq!(detections[1].text, "Rp 15.000");
        assert_eq!(detections[1].confidence, 0.91);
    }

    #[test]
    fn test_parse_paddlex_columns() {
        let json = r#"{
            "rec_texts": ["ALFAMART", "Total"],
            "rec_scores": [0.99],
            "dt_polys": [[0, 0, 80, 0, 80, 12, 0, 12]]
        }"#;

        let detections = serde_json::from_str::<OcrOutput>(json)
            .unwrap()
            .into_detections();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].confidence, 0.99);
        assert_eq!(detections[1].confidence, 0.0);
        assert_eq!(detections[1].points, RawPolygon::default());
    }

    #[test]
    fn test_bad_polygon_degrades_to_empty_box() {
        let polygon = RawPolygon::Flat(vec![1.0, 2.0, 3.0]);
        assert_eq!(polygon.to_bounding_box(), BoundingBox::default());
    }
}
