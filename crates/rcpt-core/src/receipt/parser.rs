//! Extraction orchestrator.
//!
//! One request moves through `Start → FragmentsReady → DetectorsRun →
//! Aggregated → Done`. Each stage is its own type and can only be produced
//! from the previous one, so no stage can be skipped.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::confidence::{field_confidence, FieldConfidence};
use super::locale::LocaleNormalizer;
use super::rules::{
    AmountDetector, DateDetector, Detection, FieldDetector, MerchantDetector,
};
use crate::error::OcrError;
use crate::models::{ExtractionConfig, ExtractionResult, TotalAmount};
use crate::ocr::{FragmentSet, ReadingOrder, TextRecognizer};

/// Per-request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Collect [`Diagnostics`] alongside the result.
    pub debug_mode: bool,
}

/// Pipeline stages of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Start,
    FragmentsReady,
    DetectorsRun,
    Aggregated,
    Done,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::FragmentsReady => "fragments_ready",
            Self::DetectorsRun => "detectors_run",
            Self::Aggregated => "aggregated",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Time spent reaching a stage, in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage: ExtractionStage,
    pub micros: u64,
}

/// Wall time of each detector, in microseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectorTimings {
    pub merchant: u64,
    pub date: u64,
    pub total: u64,
}

/// Optional diagnostic output of one extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Fragment text in reading order, one reconstructed line per text line.
    pub raw_text: String,
    /// Fragment contents in OCR emission order.
    pub fragments: Vec<String>,
    /// Date string as matched on the receipt.
    pub transaction_date_raw: Option<String>,
    pub field_confidence: FieldConfidence,
    pub stages: Vec<StageTiming>,
    pub detectors: DetectorTimings,
    /// Rejected candidates reported by the detectors.
    pub warnings: Vec<String>,
}

/// Result of one extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub result: ExtractionResult,
    /// Present when [`ExtractOptions::debug_mode`] is set.
    pub diagnostics: Option<Diagnostics>,
}

/// Receipt parser running the three field detectors over a fragment set.
///
/// Holds only immutable configuration, so one parser can serve any number of
/// requests, from any number of threads.
#[derive(Debug, Clone)]
pub struct ReceiptParser {
    config: Arc<ExtractionConfig>,
    line_tolerance: f32,
    parallel: bool,
    merchant: MerchantDetector,
    date: DateDetector,
    amount: AmountDetector,
}

impl ReceiptParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self::with_config(Arc::new(ExtractionConfig::default()))
    }

    /// Create a parser from shared configuration.
    pub fn with_config(config: Arc<ExtractionConfig>) -> Self {
        let normalizer = LocaleNormalizer::new(&config.locale);

        Self {
            line_tolerance: config.layout.line_tolerance,
            parallel: config.parallel_detectors,
            merchant: MerchantDetector::new(&config.merchant),
            date: DateDetector::new(normalizer.clone()),
            amount: AmountDetector::new(&config.amount, normalizer),
            config,
        }
    }

    /// Set the line grouping tolerance.
    pub fn with_line_tolerance(mut self, tolerance: f32) -> Self {
        self.line_tolerance = tolerance;
        self
    }

    /// Run the detectors on separate threads.
    pub fn with_parallel_detectors(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the structured fields of one receipt.
    ///
    /// Never fails: fields that cannot be found are absent and the score
    /// reflects only what was found.
    pub fn extract(&self, fragments: &FragmentSet, options: ExtractOptions) -> Extraction {
        let started = Instant::now();
        let mut clock = StageClock::new(started);

        info!("Extracting fields from {} fragments", fragments.len());

        let start = Start { fragments };
        clock.mark(ExtractionStage::Start);

        let ready = start.layout(self.line_tolerance);
        clock.mark(ExtractionStage::FragmentsReady);

        let run = ready.detect(self);
        clock.mark(ExtractionStage::DetectorsRun);

        let aggregated = run.aggregate();
        clock.mark(ExtractionStage::Aggregated);

        let (result, details) = aggregated.finish();
        clock.mark(ExtractionStage::Done);

        info!(
            "Extraction finished in {:?}: merchant={} date={} total={} score={:.3}",
            started.elapsed(),
            result.merchant_name.is_some(),
            result.transaction_date.is_some(),
            result.total_amount.is_some(),
            result.confidence_score
        );

        let diagnostics = options.debug_mode.then(|| Diagnostics {
            raw_text: details.raw_text,
            fragments: fragments
                .fragments()
                .iter()
                .map(|f| f.content().to_string())
                .collect(),
            transaction_date_raw: details.date_raw,
            field_confidence: details.field_confidence,
            stages: clock.into_timings(),
            detectors: details.timings,
            warnings: details.warnings,
        });

        Extraction {
            result,
            diagnostics,
        }
    }

    /// Run an OCR collaborator, then extract.
    ///
    /// OCR errors are returned unchanged.
    pub fn extract_with<R>(
        &self,
        recognizer: &R,
        input: &R::Input,
        options: ExtractOptions,
    ) -> Result<Extraction, OcrError>
    where
        R: TextRecognizer + ?Sized,
    {
        let detections = recognizer.recognize(input)?;
        let fragments = FragmentSet::from_detections(detections);
        Ok(self.extract(&fragments, options))
    }
}

impl Default for ReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

struct StageClock {
    last: Instant,
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn new(started: Instant) -> Self {
        Self {
            last: started,
            timings: Vec::with_capacity(5),
        }
    }

    fn mark(&mut self, stage: ExtractionStage) {
        let now = Instant::now();
        let micros = micros(now - self.last);
        debug!("Stage {} reached after {}us", stage, micros);
        self.timings.push(StageTiming { stage, micros });
        self.last = now;
    }

    fn into_timings(self) -> Vec<StageTiming> {
        self.timings
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, u64) {
    let start = Instant::now();
    let value = f();
    (value, micros(start.elapsed()))
}

struct Start<'a> {
    fragments: &'a FragmentSet,
}

struct FragmentsReady<'a> {
    fragments: &'a FragmentSet,
    order: ReadingOrder<'a>,
}

struct DetectorsRun<'a> {
    fragments: &'a FragmentSet,
    order: ReadingOrder<'a>,
    merchant: Detection<String>,
    date: Detection<NaiveDate>,
    total: Detection<TotalAmount>,
    timings: DetectorTimings,
}

struct Aggregated {
    merchant: Option<String>,
    date: Option<NaiveDate>,
    total: Option<TotalAmount>,
    details: Details,
}

/// What the diagnostics need beyond the result.
struct Details {
    raw_text: String,
    date_raw: Option<String>,
    field_confidence: FieldConfidence,
    timings: DetectorTimings,
    warnings: Vec<String>,
}

impl<'a> Start<'a> {
    fn layout(self, line_tolerance: f32) -> FragmentsReady<'a> {
        FragmentsReady {
            fragments: self.fragments,
            order: self.fragments.reading_order(line_tolerance),
        }
    }
}

impl<'a> FragmentsReady<'a> {
    fn detect(self, parser: &ReceiptParser) -> DetectorsRun<'a> {
        let order = &self.order;

        let ((merchant, m_us), (date, d_us), (total, t_us)) = if parser.parallel {
            std::thread::scope(|s| {
                let merchant = s.spawn(|| timed(|| parser.merchant.detect(order)));
                let date = s.spawn(|| timed(|| parser.date.detect(order)));
                let total = timed(|| parser.amount.detect(order));
                (
                    merchant
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                    date.join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                    total,
                )
            })
        } else {
            (
                timed(|| parser.merchant.detect(order)),
                timed(|| parser.date.detect(order)),
                timed(|| parser.amount.detect(order)),
            )
        };

        debug!(
            "Detectors: {} {}us, {} {}us, {} {}us",
            parser.merchant.name(),
            m_us,
            parser.date.name(),
            d_us,
            parser.amount.name(),
            t_us
        );

        DetectorsRun {
            fragments: self.fragments,
            order: self.order,
            merchant,
            date,
            total,
            timings: DetectorTimings {
                merchant: m_us,
                date: d_us,
                total: t_us,
            },
        }
    }
}

impl DetectorsRun<'_> {
    fn aggregate(self) -> Aggregated {
        let fragments = self.fragments;
        let field_confidence = FieldConfidence {
            merchant: self.merchant.candidate.as_ref().map(|c| field_confidence(fragments, c)),
            date: self.date.candidate.as_ref().map(|c| field_confidence(fragments, c)),
            total: self.total.candidate.as_ref().map(|c| field_confidence(fragments, c)),
        };

        let mut warnings = self.merchant.warnings;
        warnings.extend(self.date.warnings);
        warnings.extend(self.total.warnings);

        let date_raw = self.date.candidate.as_ref().map(|c| c.source.clone());

        Aggregated {
            merchant: self.merchant.candidate.map(|c| c.value),
            date: self.date.candidate.map(|c| c.value),
            total: self.total.candidate.map(|c| c.value),
            details: Details {
                raw_text: self.order.text(),
                date_raw,
                field_confidence,
                timings: self.timings,
                warnings,
            },
        }
    }
}

impl Aggregated {
    fn finish(self) -> (ExtractionResult, Details) {
        let result = ExtractionResult {
            merchant_name: self.merchant,
            transaction_date: self.date,
            total_amount: self.total,
            confidence_score: self.details.field_confidence.score(),
        };
        (result, self.details)
    }
}
