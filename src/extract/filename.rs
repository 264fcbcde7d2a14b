use std::path::Path;

/// Pull a code out of a media filename.
///
/// Drops come as `"Code Drop - Telegram Winter_flakex15.mp4"`: the code is the
/// token after the last underscore, extension excluded. The token must be
/// non-empty and purely alphanumeric.
pub fn extract_from_filename(file_name: &str) -> Option<String> {
    if file_name.is_empty() {
        return None;
    }

    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let (_, candidate) = stem.rsplit_once('_')?;

    if !candidate.is_empty() && candidate.chars().all(char::is_alphanumeric) {
        Some(candidate.to_string())
    } else {
        None
    }
}
