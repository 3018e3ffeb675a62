use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of every repository's derived metadata, sorted by name.
pub type Mirror = Vec<RepoMetadata>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private
}

impl Visibility {
    pub fn from_private_flag(private: bool) -> Self {
        if private { Self::Private } else { Self::Public }
    }
}

/// Classification derived from which presence marker files a repository holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilePresence {
    #[default]
    Private,
    Personal,
    Mycrolinks,
    Common
}

impl FilePresence {
    pub fn from_markers(personal: bool, mycrolinks: bool) -> Self {
        match (personal, mycrolinks) {
            (true, true) => Self::Common,
            (true, false) => Self::Personal,
            (false, true) => Self::Mycrolinks,
            (false, false) => Self::Private
        }
    }

    pub fn wants_personal(self) -> bool {
        matches!(self, Self::Personal | Self::Common)
    }

    pub fn wants_mycrolinks(self) -> bool {
        matches!(self, Self::Mycrolinks | Self::Common)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Personal => "personal",
            Self::Mycrolinks => "mycrolinks",
            Self::Common => "common"
        }
    }
}

impl fmt::Display for FilePresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub name: String,
    #[serde(alias = "html_url")]
    pub url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub visibility: Visibility,
    pub file_presence: FilePresence,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>
}

/// Caller-submitted edit for a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_presence: FilePresence,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>
}

impl EditRequest {
    /// Edit that leaves every editable field of `record` as it is.
    pub fn unchanged(record: &RepoMetadata) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            file_presence: record.file_presence,
            category: record.category.clone(),
            tags: record.tags.clone()
        }
    }
}

/// Repository as reported by the remote host listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_private: bool
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoPage {
    pub repositories: Vec<RemoteRepository>,
    pub next_page_token: Option<String>
}

/// File contents plus the opaque revision token the host assigned to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub version: String
}

impl RemoteFile {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_presence_serialization() {
        let json = serde_json::to_string(&FilePresence::Mycrolinks).unwrap();
        assert_eq!(json, "\"mycrolinks\"");

        let parsed: FilePresence = serde_json::from_str("\"common\"").unwrap();
        assert_eq!(parsed, FilePresence::Common);
    }

    #[test]
    fn test_file_presence_marker_wants() {
        assert!(FilePresence::Common.wants_personal());
        assert!(FilePresence::Common.wants_mycrolinks());
        assert!(FilePresence::Personal.wants_personal());
        assert!(!FilePresence::Personal.wants_mycrolinks());
        assert!(!FilePresence::Private.wants_personal());
        assert!(!FilePresence::Private.wants_mycrolinks());
    }

    #[test]
    fn test_visibility_from_flag() {
        assert_eq!(Visibility::from_private_flag(true), Visibility::Private);
        assert_eq!(Visibility::from_private_flag(false), Visibility::Public);
    }

    #[test]
    fn test_metadata_accepts_html_url_alias() {
        let json = r#"{
            "name": "dotfiles",
            "html_url": "https://github.com/octo/dotfiles",
            "description": null,
            "created_at": "2021-03-01T10:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "visibility": "public",
            "file_presence": "personal",
            "category": "config",
            "tags": ["shell", "vim"]
        }"#;

        let record: RepoMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(record.url, "https://github.com/octo/dotfiles");
        assert_eq!(record.file_presence, FilePresence::Personal);
        assert_eq!(record.tags, vec!["shell", "vim"]);

        let out = serde_json::to_value(&record).unwrap();
        assert!(out.get("url").is_some());
        assert!(out.get("html_url").is_none());
    }
}
