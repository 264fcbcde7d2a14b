//! Code extraction strategies
//!
//! Every strategy is best effort: a miss or a collaborator failure yields
//! `None` and a log line, never an error to the caller.

pub mod filename;
pub mod llm;
pub mod normalize;
pub mod ocr;
pub mod text;

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::core::message::{Code, ExtractionMethod};
use crate::error::Result;

pub use filename::extract_from_filename;
pub use llm::{CodeCompleter, CompletionClient};
pub use normalize::normalize_text;
pub use ocr::FrameOcr;
pub use text::{find_code, TextExtractor};

/// Bundles the configured strategies
pub struct Extractor {
    text: TextExtractor,
    ocr: Option<FrameOcr>,
}

impl Extractor {
    pub fn new(text: TextExtractor, ocr: Option<FrameOcr>) -> Self {
        Self { text, ocr }
    }

    /// Build the strategies the configuration enables
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let text = match &config.llm {
            Some(llm) => {
                let client = CompletionClient::new(llm, config.http_timeout)?;
                TextExtractor::with_completer(Arc::new(client))
            }
            None => TextExtractor::new(),
        };
        let ocr = config
            .ocr
            .enabled
            .then(|| FrameOcr::from_config(&config.ocr));

        Ok(Self::new(text, ocr))
    }

    pub fn ocr_enabled(&self) -> bool {
        self.ocr.is_some()
    }

    pub fn from_filename(&self, file_name: Option<&str>) -> Option<Code> {
        let Some(file_name) = file_name else {
            info!("Media has no filename");
            return None;
        };

        match extract_from_filename(file_name) {
            Some(code) => {
                info!("Code from filename {:?}: {}", file_name, code);
                Some(Code::new(code, ExtractionMethod::Filename))
            }
            None => {
                info!("No code in filename {:?}", file_name);
                None
            }
        }
    }

    pub async fn from_text(&self, text: &str) -> Option<Code> {
        match self.text.extract(text).await {
            Some((code, method)) => {
                info!("Code from text via {}: {}", method, code);
                Some(Code::new(code, method))
            }
            None => None,
        }
    }

    /// Run OCR on a downloaded video. Returns `None` when OCR is disabled.
    pub async fn from_video(&self, video: &Path) -> Option<Code> {
        let ocr = self.ocr.as_ref()?;
        match ocr.read_code(video).await {
            Ok(Some(code)) => {
                info!("Code from OCR: {}", code);
                Some(Code::new(code, ExtractionMethod::Ocr))
            }
            Ok(None) => {
                warn!("OCR could not detect a code");
                None
            }
            Err(e) => {
                warn!("OCR failed: {}", e);
                None
            }
        }
    }
}
