//! Validated OCR fragments.

use tracing::debug;

use super::layout::ReadingOrder;
use super::OcrDetection;

/// Quadrilateral bounding box (x1, y1, x2, y2, x3, y3, x4, y4), clockwise
/// from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub points: [f32; 8],
}

impl BoundingBox {
    /// Build from four corner points.
    pub fn from_points(points: [[f32; 2]; 4]) -> Self {
        Self {
            points: [
                points[0][0], points[0][1], points[1][0], points[1][1], points[2][0],
                points[2][1], points[3][0], points[3][1],
            ],
        }
    }

    /// Build from an axis-aligned rectangle.
    pub fn from_rect(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self::from_points([[x_min, y_min], [x_max, y_min], [x_max, y_max], [x_min, y_max]])
    }

    /// Get the center point of the bounding box.
    pub fn center(&self) -> (f32, f32) {
        let p = &self.points;
        let x = (p[0] + p[2] + p[4] + p[6]) / 4.0;
        let y = (p[1] + p[3] + p[5] + p[7]) / 4.0;
        (x, y)
    }

    /// Get the height along the left edge.
    ///
    /// Follows the edge rather than the enclosing rectangle so that skewed
    /// lines do not look taller than they are.
    pub fn height(&self) -> f32 {
        let dx = self.points[6] - self.points[0];
        let dy = self.points[7] - self.points[1];
        (dx * dx + dy * dy).sqrt()
    }

    /// Get the leftmost x coordinate.
    pub fn left(&self) -> f32 {
        let p = &self.points;
        p[0].min(p[2]).min(p[4]).min(p[6])
    }
}

/// One recognized text span.
///
/// Fragments are read-only: the pipeline derives new values from them and never
/// changes them.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    index: usize,
    content: String,
    confidence: f32,
    bbox: BoundingBox,
}

impl TextFragment {
    /// Position in the fragment set (OCR emission order).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Recognized text, trimmed, never empty.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// OCR confidence within 0.0 - 1.0.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

/// The fragments of one receipt, in OCR emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentSet {
    fragments: Vec<TextFragment>,
}

impl FragmentSet {
    /// Validate raw detections into a fragment set.
    ///
    /// Blank detections are dropped; confidences are clamped into 0.0 - 1.0
    /// (NaN becomes 0.0).
    pub fn from_detections<I>(detections: I) -> Self
    where
        I: IntoIterator<Item = OcrDetection>,
    {
        let mut fragments = Vec::new();
        let mut dropped = 0usize;

        for detection in detections {
            let content = detection.text.trim();
            if content.is_empty() {
                dropped += 1;
                continue;
            }

            let confidence = if detection.confidence.is_nan() {
                0.0
            } else {
                detection.confidence.clamp(0.0, 1.0)
            };

            fragments.push(TextFragment {
                index: fragments.len(),
                content: content.to_string(),
                confidence,
                bbox: detection.points.to_bounding_box(),
            });
        }

        debug!(
            "Built fragment set with {} fragments ({} blank dropped)",
            fragments.len(),
            dropped
        );

        Self { fragments }
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments in emission order.
    pub fn fragments(&self) -> &[TextFragment] {
        &self.fragments
    }

    pub fn get(&self, index: usize) -> Option<&TextFragment> {
        self.fragments.get(index)
    }

    /// Mean OCR confidence of the given fragments.
    pub fn mean_confidence(&self, indices: &[usize]) -> Option<f32> {
        let confidences: Vec<f32> = indices
            .iter()
            .filter_map(|&i| self.get(i))
            .map(TextFragment::confidence)
            .collect();

        if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        }
    }

    /// Derive reading order, grouping fragments into lines when their vertical
    /// centers lie within `line_tolerance` median heights of each other.
    pub fn reading_order(&self, line_tolerance: f32) -> ReadingOrder<'_> {
        ReadingOrder::build(self, line_tolerance)
    }
}

impl FromIterator<OcrDetection> for FragmentSet {
    fn from_iter<T: IntoIterator<Item = OcrDetection>>(iter: T) -> Self {
        Self::from_detections(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fragments_dropped() {
        let set = FragmentSet::from_detections(vec![
            OcrDetection::with_rect("  ", 0.9, [0.0, 0.0, 10.0, 10.0]),
            OcrDetection::with_rect("TOKO", 0.9, [0.0, 20.0, 10.0, 30.0]),
            OcrDetection::with_rect("", 0.9, [0.0, 40.0, 10.0, 50.0]),
        ]);

        assert_eq!(set.len(), 1);
        assert_eq!(set.fragments()[0].content(), "TOKO");
        assert_eq!(set.fragments()[0].index(), 0);
    }

    #[test]
    fn test_confidence_clamped() {
        let set: FragmentSet = vec![
            OcrDetection::with_rect("a", 1.7, [0.0, 0.0, 1.0, 1.0]),
            OcrDetection::with_rect("b", -0.2, [0.0, 0.0, 1.0, 1.0]),
            OcrDetection::with_rect("c", f32::NAN, [0.0, 0.0, 1.0, 1.0]),
        ]
        .into_iter()
        .collect();

        let confidences: Vec<f32> = set.fragments().iter().map(|f| f.confidence()).collect();
        assert_eq!(confidences, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_content_trimmed() {
        let set = FragmentSet::from_detections(vec![OcrDetection::with_rect(
            "  Total \n",
            0.8,
            [0.0, 0.0, 1.0, 1.0],
        )]);
        assert_eq!(set.fragments()[0].content(), "Total");
    }

    #[test]
    fn test_mean_confidence() {
        let set = FragmentSet::from_detections(vec![
            OcrDetection::with_rect("a", 0.8, [0.0, 0.0, 1.0, 1.0]),
            OcrDetection::with_rect("b", 0.6, [0.0, 0.0, 1.0, 1.0]),
        ]);

        let mean = set.mean_confidence(&[0, 1]).unwrap();
        assert!((mean - 0.7).abs() < 1e-6);
        assert_eq!(set.mean_confidence(&[]), None);
        assert_eq!(set.mean_confidence(&[7]), None);
    }

    #[test]
    fn test_box_geometry() {
        let bbox = BoundingBox::from_rect(10.0, 20.0, 50.0, 32.0);
        assert_eq!(bbox.center(), (30.0, 26.0));
        assert_eq!(bbox.height(), 12.0);
        assert_eq!(bbox.left(), 10.0);
    }
}
