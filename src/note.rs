//! Core data structures for the novanode application.
//!
//! This module contains the domain records held by the note store:
//! notes, folders and the partial updates applied to notes.
use chrono::{DateTime, TimeDelta, Utc};
use pulldown_cmark::{Event, Parser, TagEnd};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to freshly created notes
pub const DEFAULT_NOTE_TITLE: &str = "New Note";

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: String,
    /// Note title
    pub title: String,
    /// Note content in Markdown format
    pub content: String,
    /// Folder the note is filed under. Not checked against the folder list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// Tags for organization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Whether the note is pinned to the favorites list
    #[serde(default)]
    pub is_favorite: bool,
    /// Header image, either a URL or a `data:` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl Note {
    /// Creates an empty note with a fresh identifier
    pub fn new() -> Self {
        Note {
            id: Uuid::new_v4().simple().to_string(),
            title: DEFAULT_NOTE_TITLE.to_string(),
            content: String::new(),
            folder_id: None,
            tags: Vec::new(),
            updated_at: Utc::now(),
            is_favorite: false,
            cover_image: None,
        }
    }

    /// Merges the set fields of `patch` into the note and refreshes `updated_at`.
    ///
    /// The timestamp moves forward on every call, even when the patch is empty
    /// or the wall clock went backwards.
    pub fn apply(&mut self, patch: NotePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(folder_id) = patch.folder_id {
            self.folder_id = folder_id;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(cover_image) = patch.cover_image {
            self.cover_image = cover_image;
        }
        self.touch();
    }

    fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + TimeDelta::nanoseconds(1)
        };
    }

    /// Case-insensitive substring match over title, content and tags.
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }

    /// Plain-text preview of the content with markdown syntax stripped,
    /// at most `max_chars` characters long.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let mut text = String::new();
        for event in Parser::new(&self.content) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                    text.push(' ')
                }
                _ => {}
            }
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(max_chars).collect()
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

/// A named collection with a display color. Read-only at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    /// Display hint, e.g. `#3b82f6`
    pub color: String,
}

impl Folder {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Folder {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// A partial update for a [`Note`]. Unset fields are left untouched.
///
/// Optional note fields use a nested `Option` so they can be cleared:
/// `Some(None)` removes the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder_id: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub cover_image: Option<Option<String>>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        NotePatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        NotePatch {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        NotePatch {
            tags: Some(tags),
            ..Default::default()
        }
    }

    pub fn favorite(is_favorite: bool) -> Self {
        NotePatch {
            is_favorite: Some(is_favorite),
            ..Default::default()
        }
    }

    pub fn cover_image(cover_image: Option<String>) -> Self {
        NotePatch {
            cover_image: Some(cover_image),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == NotePatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_has_defaults() {
        let note = Note::new();
        assert_eq!(note.title, "New Note");
        assert!(note.content.is_empty());
        assert!(note.tags.is_empty());
        assert!(note.folder_id.is_none());
        assert!(note.cover_image.is_none());
        assert!(!note.is_favorite);
    }

    #[test]
    fn fresh_notes_get_distinct_ids() {
        assert_ne!(Note::new().id, Note::new().id);
    }

    #[test]
    fn apply_merges_only_set_fields() {
        let mut note = Note::new();
        note.content = "keep me".to_string();
        note.apply(NotePatch::title("Groceries"));
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "keep me");

        note.apply(NotePatch::cover_image(Some("https://example.com/a.png".into())));
        assert_eq!(note.cover_image.as_deref(), Some("https://example.com/a.png"));
        note.apply(NotePatch::cover_image(None));
        assert!(note.cover_image.is_none());
    }

    #[test]
    fn empty_patch_still_advances_timestamp() {
        let mut note = Note::new();
        let before = note.updated_at;
        note.apply(NotePatch::default());
        assert!(note.updated_at > before);
    }

    #[test]
    fn timestamp_advances_when_clock_is_behind() {
        let mut note = Note::new();
        note.updated_at = Utc::now() + TimeDelta::days(1);
        let before = note.updated_at;
        note.apply(NotePatch::content("x"));
        assert!(note.updated_at > before);
    }

    #[test]
    fn excerpt_strips_markdown() {
        let mut note = Note::new();
        note.content = "# Roadmap\n\n## Goals\n- Ship **fast**\n- Use `cargo`".to_string();
        assert_eq!(note.excerpt(100), "Roadmap Goals Ship fast Use cargo");
        assert_eq!(note.excerpt(7), "Roadmap");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut note = Note::new();
        note.is_favorite = true;
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["isFavorite"], true);
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("coverImage").is_none());
    }
}
