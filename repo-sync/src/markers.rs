//! Decoding of the marker files a repository carries at its root.
//!
//! Two files flag the repository by their mere existence (`.personal`,
//! `.mycrolinks`); `.tags` carries a category on its first line followed by
//! one tag per line. Everything here works on already-fetched contents.

use crate::model::FilePresence;

pub const PERSONAL_MARKER: &str = ".personal";
pub const MYCROLINKS_MARKER: &str = ".mycrolinks";
pub const TAGS_FILE: &str = ".tags";

/// Presence markers in the order they are checked and mutated.
pub const PRESENCE_MARKERS: [&str; 2] = [PERSONAL_MARKER, MYCROLINKS_MARKER];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMarkers {
    pub file_presence: FilePresence,
    pub category: String,
    pub tags: Vec<String>
}

/// Classify a repository from the raw contents of its presence markers.
///
/// `None` means the file does not exist; an empty string is still present.
pub fn classify_presence(personal: Option<&str>, mycrolinks: Option<&str>) -> FilePresence {
    FilePresence::from_markers(personal.is_some(), mycrolinks.is_some())
}

/// Split `.tags` content into its category line and the remaining tags.
pub fn parse_tags(content: Option<&str>) -> (String, Vec<String>) {
    let Some(content) = content else {
        return (String::new(), Vec::new());
    };

    let mut lines = content.split('\n').map(|line| line.trim().to_string());
    let category = lines.next().unwrap_or_default();
    (category, lines.collect())
}

/// Render a category and tag list back into `.tags` file content.
pub fn encode_tags(category: &str, tags: &[String]) -> String {
    format!("{}\n{}", category, tags.join("\n"))
}

/// Marker filenames a repository must hold to be classified as `presence`.
pub fn target_markers(presence: FilePresence) -> Vec<&'static str> {
    let mut markers = Vec::with_capacity(2);
    if presence.wants_personal() {
        markers.push(PERSONAL_MARKER);
    }
    if presence.wants_mycrolinks() {
        markers.push(MYCROLINKS_MARKER);
    }
    markers
}

pub fn decode(
    personal: Option<&str>,
    mycrolinks: Option<&str>,
    tags: Option<&str>
) -> DecodedMarkers {
    let (category, tags) = parse_tags(tags);
    DecodedMarkers {
        file_presence: classify_presence(personal, mycrolinks),
        category,
        tags
    }
}
