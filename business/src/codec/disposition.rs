use std::sync::LazyLock;

use regex::Regex;

/// Name used when a response carries no usable filename.
pub const DEFAULT_FILENAME: &str = "downloaded-file";

static FILENAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="(.+?)""#).expect("filename pattern is valid"));

/// Extracts the quoted `filename="..."` token from a Content-Disposition value.
///
/// The match is lazy: it ends at the first closing quote, so trailing
/// parameters such as `size="12"` never leak into the name, and a name that
/// itself contains `"` is cut at that quote. Surrounding whitespace inside the
/// quotes is trimmed. A greedy `(.+)` would instead run to the last quote in
/// the header.
///
/// Best effort: a missing header, a non-matching value or a blank name all
/// yield [`DEFAULT_FILENAME`].
pub fn extract_filename(header: Option<&str>) -> String {
    header
        .and_then(|value| FILENAME_PATTERN.captures(value))
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().trim())
        .filter(|name| !name.is_empty())
        .map_or_else(|| DEFAULT_FILENAME.to_string(), str::to_string)
}
