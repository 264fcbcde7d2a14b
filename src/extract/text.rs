//! Code extraction from message text and captions

use lazy_regex::regex;
use log::{debug, warn};
use std::sync::Arc;

use crate::core::message::ExtractionMethod;
use crate::extract::llm::CodeCompleter;
use crate::extract::normalize::normalize_text;

pub const MIN_CODE_LEN: usize = 4;
pub const MAX_CODE_LEN: usize = 24;

/// An ASCII alphanumeric token of code length
pub fn is_plausible_code(token: &str) -> bool {
    (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_alphanumeric())
}

fn has_letters_and_digits(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic()) && token.chars().any(|c| c.is_ascii_digit())
}

/// Find a code in text using the regex heuristics only.
///
/// The text is normalized first, so running this on already-normalized text
/// yields the same answer.
pub fn find_code(text: &str) -> Option<String> {
    let text = normalize_text(text);

    // "Code: winter24", "bonus code - winter24", "code is winter24"
    let keyword = regex!(r"(?i)\bcode\s*(?::|-|\bis\b)\s*([A-Za-z0-9]+)\b");
    if let Some(code) = keyword
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|token| is_plausible_code(token))
    {
        return Some(code.to_string());
    }

    // "-winter24" as a standalone token, or "- winter24" opening a line
    let hyphenated = regex!(r"(?m)(?:^[ \t]*-[ \t]?|(?:^|\s)-)([A-Za-z0-9]+)\b");
    if let Some(code) = hyphenated
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|token| is_plausible_code(token))
    {
        return Some(code.to_string());
    }

    // First token mixing letters and digits
    let token = regex!(r"\b[A-Za-z0-9]+\b");
    token
        .find_iter(&text)
        .map(|m| m.as_str())
        .find(|token| is_plausible_code(token) && has_letters_and_digits(token))
        .map(str::to_string)
}

/// Whether the text teases a code with underscore placeholders.
///
/// Plain snake_case words are not masks: a masked token has a digit, a
/// leading or trailing blank, or a run of blanks.
pub fn has_masked_code(text: &str) -> bool {
    let text = normalize_text(text);
    let masked = regex!(r"\b[A-Za-z0-9_]+\b");
    masked.find_iter(&text).any(|m| {
        let token = m.as_str();
        let visible = token.chars().filter(|c| c.is_ascii_alphanumeric()).count();
        let looks_masked = token.starts_with('_')
            || token.ends_with('_')
            || token.contains("__")
            || token.chars().any(|c| c.is_ascii_digit());
        token.contains('_')
            && visible >= 2
            && looks_masked
            && (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&token.len())
    })
}

/// Text strategy: regex heuristics plus an optional completion fallback for
/// masked codes
#[derive(Clone, Default)]
pub struct TextExtractor {
    completer: Option<Arc<dyn CodeCompleter>>,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self { completer: None }
    }

    pub fn with_completer(completer: Arc<dyn CodeCompleter>) -> Self {
        Self {
            completer: Some(completer),
        }
    }

    pub async fn extract(&self, text: &str) -> Option<(String, ExtractionMethod)> {
        if text.trim().is_empty() {
            return None;
        }

        if has_masked_code(text) {
            match &self.completer {
                Some(completer) => match completer.complete_code(&normalize_text(text)).await {
                    Ok(Some(code)) => return Some((code, ExtractionMethod::Llm)),
                    Ok(None) => debug!("Completion service found no code in masked text"),
                    Err(e) => warn!("Completion service failed: {}", e),
                },
                None => debug!("Masked code found but no completion service configured"),
            }
        }

        find_code(text).map(|code| (code, ExtractionMethod::Regex))
    }
}
