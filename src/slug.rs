/// Fallback identifier used when there is no text to slugify.
pub const EMPTY_SLUG: &str = "section";

/// Maps arbitrary text to an identifier that is safe to use as a DOM id or
/// URL fragment.
///
/// The output only contains `[a-z0-9-_]` and never two dashes in a row.
/// Absent or empty input yields [`EMPTY_SLUG`].
pub fn slugify(input: Option<&str>) -> String {
    let text = match input {
        Some(text) if !text.is_empty() => text,
        _ => return EMPTY_SLUG.to_string(),
    };
    let lowered = text.to_lowercase();
    let dashed = lowered.split_whitespace().collect::<Vec<_>>().join("-");
    let mut slug = String::with_capacity(dashed.len());
    for ch in dashed.chars() {
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_') {
            continue;
        }
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(ch);
    }
    slug
}
