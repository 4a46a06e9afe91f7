//! Shared value types for the novanode application.
//!
//! Chat transcript records, citations, the session operation kinds and the
//! interactive command set all live here.
use std::fmt;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::NovaError;

/// A specialized Result type for novanode operations.
pub type Result<T> = std::result::Result<T, NovaError>;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn in a conversation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        ChatMessage {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A web source cited by a grounded answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

/// Answer text plus the sources the service grounded it on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// One of the one-click actions offered by the assistant panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Summarize,
    ActionItems,
    DeepSearch,
}

/// The kinds of work a conversation session can be busy with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ask,
    Summarize,
    ActionItems,
    DeepSearch,
}

impl From<QuickAction> for Operation {
    fn from(action: QuickAction) -> Self {
        match action {
            QuickAction::Summarize => Operation::Summarize,
            QuickAction::ActionItems => Operation::ActionItems,
            QuickAction::DeepSearch => Operation::DeepSearch,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Ask => "question",
            Operation::Summarize => "summary",
            Operation::ActionItems => "action item extraction",
            Operation::DeepSearch => "web search",
        };
        f.write_str(name)
    }
}

/// Busy state of a conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Busy(Operation),
}

impl SessionStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Busy(_))
    }
}

/// Commands accepted by the interactive prompt
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note and open it
    New,

    /// List notes
    List {
        /// Only show favorites
        #[clap(short, long)]
        favorites: bool,

        /// Only show notes in this folder (id or name)
        #[clap(long)]
        folder: Option<String>,
    },

    /// Open a note by ID or title
    Open {
        /// Note ID, or words from its title
        target: Vec<String>,
    },

    /// Close the open note
    Close,

    /// Show the open note in full
    Show,

    /// Set the title of the open note
    Title {
        text: Vec<String>,
    },

    /// Replace the content of the open note
    Write {
        text: Vec<String>,
    },

    /// Edit the content of the open note in an external editor
    Edit,

    /// Tag operations on the open note
    Tag {
        /// Tags to add (comma-separated)
        #[clap(short, long)]
        add: Option<String>,

        /// Tags to remove (comma-separated)
        #[clap(short, long)]
        remove: Option<String>,
    },

    /// Toggle the favorite flag of the open note
    Fav,

    /// Delete a note (defaults to the open note)
    Delete {
        id: Option<String>,
    },

    /// Search notes by title, content or tag
    Search {
        query: Vec<String>,
    },

    /// List folders
    Folders,

    /// Summarize the open note
    Summarize,

    /// Extract action items from the open note
    Todo,

    /// Search the web
    DeepSearch {
        query: Vec<String>,
    },

    /// Ask the assistant about the open note
    Ask {
        question: Vec<String>,
    },

    /// Generate a title for the open note
    GenTitle,

    /// Generate a cover image for the open note
    GenCover,

    /// Show the conversation and its citations
    Chat,

    /// Toggle the recording indicator
    Record,

    /// Abort in-flight assistant calls
    Cancel,

    /// Clear the conversation
    Reset,

    /// Leave the program
    #[clap(alias = "exit")]
    Quit,
}
