//! Reading-order reconstruction from fragment geometry.
//!
//! OCR engines emit fragments in no guaranteed order. Lines are rebuilt by
//! bucketing vertical centers: a fragment joins the current line when its
//! center lies within `tolerance × median height` of the line's mean center,
//! then each line is ordered left to right.

use std::cmp::Ordering;

use tracing::debug;

use super::fragment::{FragmentSet, TextFragment};

/// One reconstructed text line, fragments left to right.
#[derive(Debug, Clone)]
pub struct Line<'a> {
    fragments: Vec<&'a TextFragment>,
}

impl<'a> Line<'a> {
    pub fn fragments(&self) -> &[&'a TextFragment] {
        &self.fragments
    }

    /// Fragment contents joined with single spaces.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.content())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Emission indices of the line's fragments.
    pub fn indices(&self) -> Vec<usize> {
        self.fragments.iter().map(|f| f.index()).collect()
    }
}

/// Fragments of a [`FragmentSet`] grouped into lines, top to bottom.
///
/// Borrowing the set, this is cheap to iterate repeatedly and can be shared by
/// all detectors of one request.
#[derive(Debug, Clone)]
pub struct ReadingOrder<'a> {
    lines: Vec<Line<'a>>,
}

impl<'a> ReadingOrder<'a> {
    pub(crate) fn build(set: &'a FragmentSet, tolerance: f32) -> Self {
        let fragments = set.fragments();

        let Some(median) = median_height(fragments) else {
            // No usable geometry: trust emission order, one fragment per line.
            debug!("No fragment geometry, falling back to emission order");
            return Self {
                lines: fragments
                    .iter()
                    .map(|f| Line { fragments: vec![f] })
                    .collect(),
            };
        };

        let band = tolerance * median;

        let mut by_center: Vec<&TextFragment> = fragments.iter().collect();
        by_center.sort_by(|a, b| {
            a.bbox()
                .center()
                .1
                .total_cmp(&b.bbox().center().1)
                .then(a.index().cmp(&b.index()))
        });

        let mut lines: Vec<Line<'a>> = Vec::new();
        let mut current: Vec<&TextFragment> = Vec::new();
        let mut center_sum = 0.0f32;

        for fragment in by_center {
            let y = fragment.bbox().center().1;
            if !current.is_empty() {
                let line_center = center_sum / current.len() as f32;
                if (y - line_center).abs() > band {
                    lines.push(Line::ordered(std::mem::take(&mut current)));
                    center_sum = 0.0;
                }
            }
            center_sum += y;
            current.push(fragment);
        }

        if !current.is_empty() {
            lines.push(Line::ordered(current));
        }

        debug!(
            "Grouped {} fragments into {} lines (band {:.1}px)",
            fragments.len(),
            lines.len(),
            band
        );

        Self { lines }
    }

    pub fn lines(&self) -> &[Line<'a>] {
        &self.lines
    }

    /// Fragments in reading order.
    pub fn iter(&self) -> impl Iterator<Item = &'a TextFragment> + '_ {
        self.lines.iter().flat_map(|line| line.fragments.iter().copied())
    }

    /// Fragments in reading order with their line number.
    pub fn iter_with_line(&self) -> impl Iterator<Item = (usize, &'a TextFragment)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .flat_map(|(n, line)| line.fragments.iter().map(move |f| (n, *f)))
    }

    pub fn len(&self) -> usize {
        self.lines.iter().map(|line| line.fragments.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Full text, one reconstructed line per text line.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> Line<'a> {
    fn ordered(mut fragments: Vec<&'a TextFragment>) -> Self {
        fragments.sort_by(|a, b| {
            a.bbox()
                .left()
                .total_cmp(&b.bbox().left())
                .then(a.index().cmp(&b.index()))
        });
        Self { fragments }
    }
}

fn median_height(fragments: &[TextFragment]) -> Option<f32> {
    let mut heights: Vec<f32> = fragments
        .iter()
        .map(|f| f.bbox().height())
        .filter(|h| h.is_finite() && *h > 0.0)
        .collect();

    if heights.is_empty() {
        return None;
    }

    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        Some((heights[mid - 1] + heights[mid]) / 2.0)
    } else {
        Some(heights[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrDetection;
    use pretty_assertions::assert_eq;

    fn texts(order: &ReadingOrder<'_>) -> Vec<Vec<String>> {
        order
            .lines()
            .iter()
            .map(|line| {
                line.fragments()
                    .iter()
                    .map(|f| f.content().to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_shuffled_emission_is_reordered() {
        let set = FragmentSet::from_detections(vec![
            OcrDetection::with_rect("27.500", 0.9, [200.0, 100.0, 260.0, 120.0]),
            OcrDetection::with_rect("WARUNG", 0.9, [10.0, 0.0, 120.0, 20.0]),
            OcrDetection::with_rect("Total", 0.9, [10.0, 102.0, 60.0, 122.0]),
            OcrDetection::with_rect("Jl. Mawar 3", 0.9, [10.0, 30.0, 150.0, 50.0]),
        ]);

        let order = set.reading_order(0.5);
        assert_eq!(
            texts(&order),
            vec![
                vec!["WARUNG".to_string()],
                vec!["Jl. Mawar 3".to_string()],
                vec!["Total".to_string(), "27.500".to_string()],
            ]
        );
        assert_eq!(order.len(), 4);
        assert_eq!(order.text(), "WARUNG\nJl. Mawar 3\nTotal 27.500");
    }

    #[test]
    fn test_jitter_within_tolerance_keeps_one_line() {
        // Heights 20, band 10: centers 10 and 17 share a line, 35 does not.
        let set = FragmentSet::from_detections(vec![
            OcrDetection::with_rect("Subtotal", 0.9, [0.0, 0.0, 80.0, 20.0]),
            OcrDetection::with_rect("25.000", 0.9, [150.0, 7.0, 210.0, 27.0]),
            OcrDetection::with_rect("Tax", 0.9, [0.0, 25.0, 40.0, 45.0]),
        ]);

        let order = set.reading_order(0.5);
        assert_eq!(order.lines().len(), 2);
        assert_eq!(order.lines()[0].text(), "Subtotal 25.000");
        assert_eq!(order.lines()[1].indices(), vec![2]);
    }

    #[test]
    fn test_zero_tolerance_splits_every_row() {
        let set = FragmentSet::from_detections(vec![
            OcrDetection::with_rect("a", 0.9, [0.0, 0.0, 10.0, 10.0]),
            OcrDetection::with_rect("b", 0.9, [20.0, 1.0, 30.0, 11.0]),
        ]);
        assert_eq!(set.reading_order(0.0).lines().len(), 2);
        assert_eq!(set.reading_order(0.5).lines().len(), 1);
    }

    #[test]
    fn test_missing_geometry_uses_emission_order() {
        let set = FragmentSet::from_detections(vec![
            OcrDetection::with_rect("first", 0.9, [0.0, 0.0, 0.0, 0.0]),
            OcrDetection::with_rect("second", 0.9, [0.0, 0.0, 0.0, 0.0]),
        ]);

        let order = set.reading_order(0.5);
        let flat: Vec<&str> = order.iter().map(|f| f.content()).collect();
        assert_eq!(flat, vec!["first", "second"]);
        assert_eq!(order.lines().len(), 2);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let set = FragmentSet::from_detections(vec![
            OcrDetection::with_rect("x", 0.9, [0.0, 0.0, 10.0, 10.0]),
            OcrDetection::with_rect("y", 0.9, [0.0, 30.0, 10.0, 40.0]),
        ]);
        let order = set.reading_order(0.5);

        let first: Vec<usize> = order.iter().map(|f| f.index()).collect();
        let second: Vec<usize> = order.iter().map(|f| f.index()).collect();
        assert_eq!(first, second);

        let with_lines: Vec<(usize, usize)> =
            order.iter_with_line().map(|(n, f)| (n, f.index())).collect();
        assert_eq!(with_lines, vec![(0, 0), (1, 1)]);
    }
}
