//! CLI subcommands and the pieces they share.

pub mod batch;
pub mod config;
pub mod process;

use std::fs;
use std::path::Path;

use tracing::debug;

use rcpt_core::models::RcptConfig;
use rcpt_core::ocr::{OcrDetection, OcrOutput, TextRecognizer};
use rcpt_core::OcrError;

/// Load configuration from an explicit path, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    if let Some(path) = config_path {
        return Ok(RcptConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(RcptConfig::from_file(&default_path)?)
    } else {
        Ok(RcptConfig::default())
    }
}

/// Reads OCR results saved as JSON by an external engine.
///
/// Accepts a detection list, PaddleOCR lines, or PaddleX columns.
pub struct OcrJsonFile;

impl TextRecognizer for OcrJsonFile {
    type Input = Path;

    fn recognize(&self, path: &Path) -> Result<Vec<OcrDetection>, OcrError> {
        let content = fs::read_to_string(path)
            .map_err(|e| OcrError::InvalidImage(format!("{}: {}", path.display(), e)))?;

        let output: OcrOutput = serde_json::from_str(&content).map_err(|e| {
            OcrError::InvalidImage(format!("{}: not an OCR result: {}", path.display(), e))
        })?;

        let detections = output.into_detections();
        debug!("Read {} detections from {}", detections.len(), path.display());
        Ok(detections)
    }
}
