//! Media type inference for raw script responses.

pub const TEXT_PLAIN: &str = "text/plain";

/// Filename suffix -> media type. Anything not listed is served as plain text.
const SUFFIX_TABLE: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".css", "text/css"),
    (".js", "application/javascript"),
    (".json", "application/json"),
    (".xml", "application/xml"),
];

/// Resolve the media type for a filename using a case-insensitive suffix match.
pub fn resolve(filename: Option<&str>) -> &'static str {
    let Some(name) = filename else {
        return TEXT_PLAIN;
    };
    let lower = name.trim().to_ascii_lowercase();

    SUFFIX_TABLE
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
        .map(|(_, mime)| *mime)
        .unwrap_or(TEXT_PLAIN)
}
