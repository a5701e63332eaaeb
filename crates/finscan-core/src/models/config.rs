//! Configuration structures for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for finscan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinscanConfig {
    /// Database and upload storage.
    pub storage: StorageConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Processing pipeline configuration.
    pub pipeline: PipelineConfig,

    /// Receipt parser configuration.
    pub parser: ParserConfig,
}

/// Where documents and records are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Directory uploaded files are written to.
    pub upload_dir: PathBuf,

    /// Largest accepted upload in bytes.
    pub max_upload_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("finscan.db"),
            upload_dir: PathBuf::from("uploads"),
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing the layout OCR model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,

    /// Tesseract executable used by the fallback engine.
    pub tesseract_binary: PathBuf,

    /// Tesseract language code.
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
            tesseract_binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.model_dir.join(file_name)
    }
}

/// Processing pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Automatic retries after the first failed run.
    pub max_retries: u32,

    /// Backoff unit; retry `n` waits `n * retry_backoff_secs`.
    pub retry_backoff_secs: u64,

    /// Number of concurrent workers.
    pub workers: usize,

    /// Stored error messages are truncated to this many characters.
    pub error_message_limit: usize,

    /// Documents left in `processing` longer than this are considered abandoned.
    pub stale_after_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_secs: 60,
            workers: 2,
            error_message_limit: 500,
            stale_after_secs: 30 * 60,
        }
    }
}

/// Receipt parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Currency used when the text names none.
    pub default_currency: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
        }
    }
}

impl FinscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
