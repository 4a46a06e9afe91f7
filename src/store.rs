//! The in-memory note store: notes in display order, folders and the
//! active-note selection.
use chrono::{TimeDelta, Utc};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use log::{debug, info, trace, warn};

use crate::{Folder, Note, NotePatch, NovaError, Result};

/// Owns the notes, the folders and the active-note selection.
///
/// Notes are kept in display order, newest first. All operations are
/// synchronous; callers that share a store wrap it in a mutex.
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: Vec<Note>,
    folders: Vec<Folder>,
    active: Option<String>,
}

impl NoteStore {
    /// Creates a store over the given folders and notes with nothing selected
    pub fn new(folders: Vec<Folder>, notes: Vec<Note>) -> Self {
        Self {
            notes,
            folders,
            active: None,
        }
    }

    /// Builds the starter workspace shown on first launch.
    ///
    /// Three folders, two notes, and the first note opened.
    pub fn with_sample_data() -> Self {
        let folders = vec![
            Folder::new("f1", "Work", "#3b82f6"),
            Folder::new("f2", "Personal", "#10b981"),
            Folder::new("f3", "Projects", "#f59e0b"),
        ];

        let now = Utc::now();
        let notes = vec![
            Note {
                id: "1".to_string(),
                title: "Product Roadmap 2025".to_string(),
                content: "# Product Roadmap 2025\n\n## Goals\n- Launch Gemini integration\n- Improve mobile experience\n- Add real-time collaboration".to_string(),
                folder_id: Some("f1".to_string()),
                tags: vec!["strategic".to_string(), "product".to_string()],
                updated_at: now,
                is_favorite: true,
                cover_image: Some("https://picsum.photos/seed/roadmap/1200/400".to_string()),
            },
            Note {
                id: "2".to_string(),
                title: "Workout Routine".to_string(),
                content: "## Daily Routine\n- 50 Pushups\n- 10km Run\n- 15min Stretching".to_string(),
                folder_id: Some("f2".to_string()),
                tags: vec!["health".to_string()],
                updated_at: now - TimeDelta::days(1),
                is_favorite: false,
                cover_image: None,
            },
        ];

        let mut store = Self::new(folders, notes);
        store.active = store.notes.first().map(|n| n.id.clone());
        store
    }

    /// Creates an empty note at the front of the list and opens it
    pub fn create(&mut self) -> Note {
        let mut note = Note::new();
        // uuid collisions are not expected, but the id must stay unique
        while self.position(&note.id).is_some() {
            note = Note::new();
        }

        info!("Created note: {}", note.id);
        self.notes.insert(0, note.clone());
        self.active = Some(note.id.clone());
        note
    }

    /// Merges `patch` into the note with the given ID.
    ///
    /// `updated_at` advances even when the patch changes nothing. Unknown IDs
    /// leave the store untouched and return `NoteNotFound`.
    pub fn update(&mut self, id: &str, patch: NotePatch) -> Result<&Note> {
        let Some(index) = self.position(id) else {
            warn!("Cannot update note {}: Note not found", id);
            return Err(NovaError::NoteNotFound { id: id.to_string() });
        };

        trace!("Applying patch to note {}: {:?}", id, patch);
        let note = &mut self.notes[index];
        note.apply(patch);
        debug!("Note {} updated at {}", id, note.updated_at);
        Ok(&self.notes[index])
    }

    /// Flips the favorite flag and returns the new value
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool> {
        let current = self
            .get(id)
            .map(|n| n.is_favorite)
            .ok_or_else(|| NovaError::NoteNotFound { id: id.to_string() })?;
        self.update(id, NotePatch::favorite(!current))
            .map(|n| n.is_favorite)
    }

    /// Removes a note. Clears the selection if it was the open note.
    pub fn delete(&mut self, id: &str) -> Result<Note> {
        let Some(index) = self.position(id) else {
            warn!("Cannot delete note {}: Note not found", id);
            return Err(NovaError::NoteNotFound { id: id.to_string() });
        };

        let removed = self.notes.remove(index);
        if self.active.as_deref() == Some(id) {
            debug!("Deleted note {} was open, clearing selection", id);
            self.active = None;
        }

        info!("Deleted note: {}", id);
        Ok(removed)
    }

    /// Notes whose title, content or any tag contains `query`, ignoring case.
    ///
    /// Results keep store order. An empty query matches every note.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let needle = query.to_lowercase();
        let results: Vec<&Note> = self.notes.iter().filter(|n| n.matches(&needle)).collect();
        debug!("Search '{}' matched {} notes", query, results.len());
        results
    }

    /// Finds a note by exact ID, falling back to the best fuzzy title match
    pub fn resolve(&self, id_or_title: &str) -> Option<&Note> {
        if let Some(note) = self.get(id_or_title) {
            return Some(note);
        }

        let matcher = SkimMatcherV2::default();
        self.notes
            .iter()
            .filter_map(|n| matcher.fuzzy_match(&n.title, id_or_title).map(|s| (s, n)))
            // max_by_key keeps the last maximum; iterate in reverse so ties go to the newest
            .rev()
            .max_by_key(|(score, _)| *score)
            .map(|(_, note)| note)
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn favorites(&self) -> Vec<&Note> {
        self.notes.iter().filter(|n| n.is_favorite).collect()
    }

    pub fn in_folder(&self, folder_id: &str) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.folder_id.as_deref() == Some(folder_id))
            .collect()
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    /// Looks a folder up by ID or, ignoring case, by name
    pub fn folder(&self, id_or_name: &str) -> Option<&Folder> {
        self.folders
            .iter()
            .find(|f| f.id == id_or_name)
            .or_else(|| {
                self.folders
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(id_or_name))
            })
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    /// Opens the given note, or clears the selection with `None`
    pub fn set_active(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if self.position(id).is_none() => {
                Err(NovaError::NoteNotFound { id: id.to_string() })
            }
            _ => {
                self.active = id.map(str::to_string);
                Ok(())
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }
}
