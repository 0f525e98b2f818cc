//! Search-term normalization shared by the cache key and outbound requests.

/// Lower-cases `input`, then upper-cases the first letter of each
/// space-delimited token. Surrounding whitespace is trimmed; inner spacing
/// is preserved.
///
/// `"tacos"`, `"Tacos"`, and `"TACOS"` all become `"Tacos"`.
#[must_use]
pub fn title_case(input: &str) -> String {
    input
        .trim()
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(token: &str) -> String {
    let lower = token.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
