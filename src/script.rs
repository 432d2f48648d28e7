use crate::error::{Result, VideoError};

/// Separator used when joining script lines into one narration string.
pub const SENTENCE_SEPARATOR: &str = ". ";

/// Splits a raw script into trimmed, non-empty lines in input order.
/// A script with no usable lines is rejected before any work starts.
pub fn normalize_script(script: &str) -> Result<Vec<String>> {
    let lines: Vec<String> = script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if lines.is_empty() {
        return Err(VideoError::EmptyScript);
    }
    Ok(lines)
}

/// Joins normalized script lines into the single narration string handed to
/// the voice synthesizer.
pub fn narration_text(lines: &[String]) -> String {
    lines.join(SENTENCE_SEPARATOR)
}
