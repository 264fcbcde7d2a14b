//! Frame OCR for video drops
//!
//! The code is burnt into the clip a few seconds in, on the right half of the
//! frame. `ffmpeg` grabs that one frame, crops it to the region of interest
//! and binarizes it; `tesseract` reads it back as TSV word regions with a
//! confidence per word.

use log::debug;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::config::OcrConfig;
use crate::error::{RelayError, Result};
use crate::extract::text::{is_plausible_code, MAX_CODE_LEN, MIN_CODE_LEN};

/// Words that show up on drop frames next to the code
const FRAME_STOPWORDS: &[&str] = &["code", "bonus", "drop", "claim", "telegram", "winter", "enter"];

/// Region of interest as fractions of frame width/height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub x_start: f32,
    pub x_end: f32,
    pub y_start: f32,
    pub y_end: f32,
}

impl Default for Roi {
    fn default() -> Self {
        // Center-right band of the frame
        Self {
            x_start: 0.40,
            x_end: 0.95,
            y_start: 0.40,
            y_end: 0.70,
        }
    }
}

/// One piece of recognized text
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    pub text: String,
    pub confidence: f32,
}

pub struct FrameOcr {
    ffmpeg_path: String,
    tesseract_path: String,
    frame_offset: Duration,
    timeout: Duration,
    roi: Roi,
    threshold: u8,
}

impl FrameOcr {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            tesseract_path: config.tesseract_path.clone(),
            frame_offset: config.frame_offset,
            timeout: config.timeout,
            roi: Roi::default(),
            threshold: 150,
        }
    }

    /// ffmpeg filtergraph: crop to the ROI, binary threshold on luma, grayscale
    pub fn filter_graph(&self) -> String {
        let roi = self.roi;
        format!(
            "crop=iw*{:.3}:ih*{:.3}:iw*{:.3}:ih*{:.3},lutyuv=y='if(gt(val,{}),255,0)',format=gray",
            roi.x_end - roi.x_start,
            roi.y_end - roi.y_start,
            roi.x_start,
            roi.y_start,
            self.threshold
        )
    }

    /// Read a code off the video at `video`. `Ok(None)` means the frame was
    /// read but nothing usable was on it.
    pub async fn read_code(&self, video: &Path) -> Result<Option<String>> {
        let workdir = tempfile::tempdir()?;
        let frame = workdir.path().join("frame.png");

        self.grab_frame(video, &frame).await?;
        let regions = self.recognize(&frame).await?;
        debug!("OCR returned {} regions", regions.len());

        Ok(pick_code(&regions))
    }

    async fn grab_frame(&self, video: &Path, frame: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-hide_banner")
            .args(["-loglevel", "error", "-y"])
            .arg("-ss")
            .arg(format!("{:.3}", self.frame_offset.as_secs_f64()))
            .arg("-i")
            .arg(video)
            .args(["-frames:v", "1", "-vf"])
            .arg(self.filter_graph())
            .arg(frame);

        self.run("ffmpeg", cmd).await?;
        if !frame.exists() {
            return Err(RelayError::ExtractionError(format!(
                "ffmpeg produced no frame at {:?} (video shorter than offset?)",
                self.frame_offset
            )));
        }
        Ok(())
    }

    async fn recognize(&self, frame: &Path) -> Result<Vec<TextRegion>> {
        let mut cmd = Command::new(&self.tesseract_path);
        cmd.arg(frame).arg("stdout").args(["--psm", "6", "tsv"]);

        let output = self.run("tesseract", cmd).await?;
        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn run(&self, name: &str, mut cmd: Command) -> Result<Output> {
        cmd.kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                RelayError::ExtractionError(format!("{} timed out after {:?}", name, self.timeout))
            })?
            .map_err(|e| RelayError::ExtractionError(format!("failed to run {}: {}", name, e)))?;

        if !output.status.success() {
            return Err(RelayError::ExtractionError(format!(
                "{} exited with {}: {}",
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }
}

fn flush_line(text: &mut String, confs: &mut Vec<f32>, regions: &mut Vec<TextRegion>) {
    if !text.is_empty() && !confs.is_empty() {
        regions.push(TextRegion {
            text: std::mem::take(text),
            confidence: confs.iter().sum::<f32>() / confs.len() as f32,
        });
    }
    text.clear();
    confs.clear();
}

/// Parse tesseract TSV output into word and line regions.
///
/// Lines are the words of one (block, paragraph, line) joined without
/// spaces, scored with the mean word confidence.
pub fn parse_tsv(tsv: &str) -> Vec<TextRegion> {
    let mut regions = Vec::new();
    let mut line_key: Option<(&str, &str, &str)> = None;
    let mut line_text = String::new();
    let mut line_confs: Vec<f32> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let Ok(confidence) = cols[10].parse::<f32>() else {
            continue;
        };
        let word = cols[11].trim();
        if confidence < 0.0 || word.is_empty() {
            continue;
        }

        let key = (cols[2], cols[3], cols[4]);
        if line_key != Some(key) {
            flush_line(&mut line_text, &mut line_confs, &mut regions);
            line_key = Some(key);
        }
        line_text.push_str(word);
        line_confs.push(confidence);

        regions.push(TextRegion {
            text: word.to_string(),
            confidence,
        });
    }
    flush_line(&mut line_text, &mut line_confs, &mut regions);

    regions
}

fn clean_token(text: &str) -> &str {
    text.trim_matches(|c: char| !c.is_ascii_alphanumeric())
}

fn is_code_shaped(token: &str) -> bool {
    is_plausible_code(token) && !FRAME_STOPWORDS.contains(&token.to_lowercase().as_str())
}

/// Pick the code among OCR regions.
///
/// Regions are ranked by confidence. A code-shaped token mixing letters and
/// digits wins first, then any code-shaped token; failing both, the
/// highest-confidence text with whitespace removed is returned.
pub fn pick_code(regions: &[TextRegion]) -> Option<String> {
    let mut ranked: Vec<&TextRegion> = regions.iter().collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let tokens: Vec<&str> = ranked.iter().map(|r| clean_token(&r.text)).collect();

    let mixed = tokens.iter().find(|t| {
        is_code_shaped(t)
            && t.chars().any(|c| c.is_ascii_alphabetic())
            && t.chars().any(|c| c.is_ascii_digit())
    });
    if let Some(token) = mixed.or_else(|| tokens.iter().find(|t| is_code_shaped(t))) {
        return Some(token.to_string());
    }

    ranked
        .iter()
        .map(|r| r.text.split_whitespace().collect::<String>())
        .find(|text| (MIN_CODE_LEN..=MAX_CODE_LEN * 2).contains(&text.len()))
}
