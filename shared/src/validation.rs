//! Input normalization for free-text fields

/// Trim a free-text name; blank input means "not given"
pub fn normalize_name(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Split a comma-separated brand list into distinct, trimmed names.
///
/// Order of first appearance is kept; empty segments are dropped.
pub fn parse_brand_names(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Case-insensitive substring pattern for `ILIKE`, or `None` for a blank term.
///
/// `%`, `_` and the escape character itself are matched literally.
pub fn contains_pattern(term: Option<&str>) -> Option<String> {
    let term = normalize_name(term)?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// Allowed image extensions for item photos
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extension of an uploaded file name, lower-cased, if it is an accepted image type
pub fn image_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
