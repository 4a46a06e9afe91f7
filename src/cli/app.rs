//! CLI module for the novanode application
//!
//! This module handles the interactive prompt: it parses each typed line into
//! a command and drives the workspace with it.
use std::{
    fs::{read_to_string, OpenOptions},
    future::Future,
    io::{stdout, Write},
    path::Path,
    process::Command,
};

use clap::Parser;
use console::style;
use log::{debug, info};
use shell_words::split;
use tempfile::Builder;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    edit_tags, format_datetime, format_time, parse_tags, term_width, wrap_text, ChatMessage,
    Commands, Config, Note, NotePatch, NovaError, PromptLine, QuickAction, Result, Role,
    Workspace,
};

/// Whether the prompt should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// CLI Application handler - processes prompt commands against the workspace
pub struct App {
    /// The workspace being edited
    workspace: Workspace,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application over the given workspace and config
    pub fn new(workspace: Workspace, config: Config, verbose: bool) -> Self {
        Self {
            workspace,
            config,
            verbose,
        }
    }

    /// Reads commands from stdin until `quit` or end of input
    pub async fn run_interactive(&self) -> Result<()> {
        println!(
            "{} - type {} for commands",
            style("NovaNode").bold().magenta(),
            style("help").cyan()
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{} ", style(">").magenta());
            stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            match self.run_line(&line).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => eprintln!("{} {}", style("error:").red().bold(), e),
            }
        }

        self.workspace.cancel_all();
        Ok(())
    }

    /// Parses and runs one line of input
    pub async fn run_line(&self, line: &str) -> Result<Flow> {
        let args = split(line).map_err(|e| NovaError::InvalidFormat {
            message: format!("Failed to parse input: {}", e),
        })?;
        if args.is_empty() {
            return Ok(Flow::Continue);
        }

        match PromptLine::try_parse_from(args) {
            Ok(parsed) => self.run(parsed.command).await,
            Err(e) => {
                // covers `help` as well as usage errors
                e.print()?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Run the given command
    pub async fn run(&self, command: Commands) -> Result<Flow> {
        if self.verbose {
            debug!("Running command: {:?}", command);
        }

        match command {
            Commands::New => {
                let note = self.workspace.create_note().await;
                println!("Note created with ID: {}", note.id);
            }

            Commands::List { favorites, folder } => self.list_notes(favorites, folder).await?,

            Commands::Open { target } => self.open_note(&target.join(" ")).await?,

            Commands::Close => self.workspace.open_note(None).await?,

            Commands::Show => {
                let note = self.require_active().await?;
                self.display_note(&note, true);
            }

            Commands::Title { text } => {
                let id = self.require_active().await?.id;
                self.workspace
                    .update_note(&id, NotePatch::title(text.join(" ")))
                    .await?;
            }

            Commands::Write { text } => {
                let id = self.require_active().await?.id;
                let content = text.join(" ").replace("\\n", "\n");
                self.workspace
                    .update_note(&id, NotePatch::content(content))
                    .await?;
            }

            Commands::Edit => self.handle_edit().await?,

            Commands::Tag { add, remove } => {
                let note = self.require_active().await?;
                let tags = edit_tags(&note.tags, &parse_tags(add), &parse_tags(remove));
                let note = self
                    .workspace
                    .update_note(&note.id, NotePatch::tags(tags))
                    .await?;
                println!("Tags: {}", format_tags(&note.tags));
            }

            Commands::Fav => {
                let id = self.require_active().await?.id;
                let store = self.workspace.store();
                let is_favorite = store.lock().await.toggle_favorite(&id)?;
                println!(
                    "{}",
                    if is_favorite {
                        "Added to favorites"
                    } else {
                        "Removed from favorites"
                    }
                );
            }

            Commands::Delete { id } => {
                let id = match id {
                    Some(id) => id,
                    None => self.require_active().await?.id,
                };
                let note = self.workspace.delete_note(&id).await?;
                println!("Note '{}' ({}) has been deleted.", note.title, note.id);
            }

            Commands::Search { query } => self.handle_search(&query.join(" ")).await,

            Commands::Folders => {
                let store = self.workspace.store();
                let store = store.lock().await;
                for folder in store.folders() {
                    println!(
                        "{:<4} {:<12} {} notes  {}",
                        folder.id,
                        style(&folder.name).bold(),
                        store.in_folder(&folder.id).len(),
                        style(&folder.color).dim()
                    );
                }
            }

            Commands::Summarize => {
                self.spawn_quick_action("Summary", QuickAction::Summarize, String::new())
            }

            Commands::Todo => {
                self.spawn_quick_action("Action items", QuickAction::ActionItems, String::new())
            }

            Commands::DeepSearch { query } => {
                self.spawn_quick_action("Deep search", QuickAction::DeepSearch, query.join(" "))
            }

            Commands::Ask { question } => {
                let workspace = self.workspace.handle();
                let question = question.join(" ");
                spawn_assistant("Question", async move { workspace.ask(&question).await });
            }

            Commands::GenTitle => {
                let id = self.require_active().await?.id;
                let workspace = self.workspace.handle();
                spawn_editor_task("Title", async move { workspace.generate_title(&id).await });
            }

            Commands::GenCover => {
                let id = self.require_active().await?.id;
                let workspace = self.workspace.handle();
                spawn_editor_task("Cover", async move {
                    let image = workspace.generate_cover(&id).await?;
                    // data URLs are long, report only what kind of image arrived
                    Ok::<_, NovaError>(
                        image.map(|image| image.split(',').next().unwrap_or_default().to_string()),
                    )
                });
            }

            Commands::Chat => self.display_chat(),

            Commands::Record => {
                let recording = self.workspace.session().toggle_recording();
                println!("Recording {}", if recording { "on" } else { "off" });
            }

            Commands::Cancel => {
                self.workspace.cancel_all();
                println!("Canceled in-flight requests");
            }

            Commands::Reset => {
                self.workspace.session().reset();
                println!("Conversation cleared");
            }

            Commands::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    async fn require_active(&self) -> Result<Note> {
        self.workspace
            .active_note()
            .await
            .ok_or(NovaError::NoActiveNote)
    }

    async fn open_note(&self, target: &str) -> Result<()> {
        let id = {
            let store = self.workspace.store();
            let store = store.lock().await;
            store
                .resolve(target)
                .map(|n| n.id.clone())
                .ok_or_else(|| NovaError::NoteNotFound {
                    id: target.to_string(),
                })?
        };

        self.workspace.open_note(Some(&id)).await?;
        if let Some(note) = self.workspace.active_note().await {
            self.display_note(&note, false);
        }
        Ok(())
    }

    /// List notes according to provided filters
    async fn list_notes(&self, favorites: bool, folder: Option<String>) -> Result<()> {
        let store = self.workspace.store();
        let store = store.lock().await;

        let notes: Vec<&Note> = match (&folder, favorites) {
            (Some(name), _) => {
                let folder = store.folder(name).ok_or_else(|| NovaError::InvalidFormat {
                    message: format!("Unknown folder: {}", name),
                })?;
                store
                    .in_folder(&folder.id)
                    .into_iter()
                    .filter(|n| !favorites || n.is_favorite)
                    .collect()
            }
            (None, true) => store.favorites(),
            (None, false) => store.notes().iter().collect(),
        };

        self.display_notes(&notes, store.active_id());
        Ok(())
    }

    async fn handle_search(&self, query: &str) {
        let results = self.workspace.search(query).await;
        if results.is_empty() {
            println!("No notes found matching query: \"{}\"", query);
            return;
        }

        let refs: Vec<&Note> = results.iter().collect();
        let active = self.workspace.active_note().await.map(|n| n.id);
        self.display_notes(&refs, active.as_deref());
        println!("\nFound {} matching notes.", results.len());
    }

    /// Display notes in text format
    fn display_notes(&self, notes: &[&Note], active: Option<&str>) {
        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return;
        }

        let term_width = term_width();
        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let marker = if active == Some(note.id.as_str()) { "*" } else { " " };
            let star = if note.is_favorite { " \u{2605}" } else { "" };
            println!(
                "{} {}{}  {}",
                marker,
                style(&note.title).bold(),
                style(star).yellow(),
                style(format!("[{}]", note.id)).dim()
            );

            let preview = note.excerpt(100);
            if !preview.is_empty() {
                println!("  {}", preview);
            }
            if !note.tags.is_empty() {
                println!("  {}", style(format_tags(&note.tags)).cyan());
            }
        }
    }

    fn display_note(&self, note: &Note, full: bool) {
        println!("ID: {} | Updated: {}", note.id, format_datetime(&note.updated_at));
        println!("Title: {}", style(&note.title).bold());
        if let Some(folder) = &note.folder_id {
            println!("Folder: {}", folder);
        }
        if !note.tags.is_empty() {
            println!("Tags: {}", style(format_tags(&note.tags)).cyan());
        }
        if let Some(cover) = &note.cover_image {
            let shown = if cover.starts_with("data:") {
                "(generated image)"
            } else {
                cover.as_str()
            };
            println!("Cover: {}", style(shown).dim());
        }

        if full {
            println!("\n{}", note.content);
        } else {
            let preview = note.excerpt(100);
            if !preview.is_empty() {
                println!("\n{}", preview);
            }
        }
    }

    fn display_chat(&self) {
        let session = self.workspace.session();
        let messages = session.messages();
        if messages.is_empty() {
            println!("Ask about this note, generate tasks, or search the web.");
        }
        for message in &messages {
            print_message(message);
        }

        let citations = session.citations();
        if !citations.is_empty() {
            println!("\n{}", style("Citations").dim().bold());
            for citation in citations {
                println!("  {}  {}", citation.title, style(citation.uri).underlined());
            }
        }
        if session.is_busy() {
            println!("{}", style("Thinking...").dim());
        }
    }

    async fn handle_edit(&self) -> Result<()> {
        let note = self.require_active().await?;
        let content = self.open_editor_with_content(&note.title, &note.content)?;
        self.workspace
            .update_note(&note.id, NotePatch::content(content))
            .await?;
        println!("Content updated from editor");
        Ok(())
    }

    // Helper function to open editor with existing content
    fn open_editor_with_content(&self, title: &str, existing_content: &str) -> Result<String> {
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        let mut file = OpenOptions::new().write(true).open(&temp_path)?;
        writeln!(file, "<!-- Editing: {} -->", title)?;
        write!(file, "{}", existing_content)?;
        drop(file);

        let editor_cmd = self.config.get_editor_command();
        info!("Opening editor to edit note content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(process_editor_content(&content))
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        // Handle shell-like command parsing
        let args = split(editor_cmd).map_err(|e| NovaError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let Some((program, rest)) = args.split_first() else {
            return Err(NovaError::EditorError {
                message: "Empty editor command".to_string(),
            });
        };

        let status = Command::new(program)
            .args(rest)
            .arg(file_path)
            .status()
            .map_err(|e| NovaError::EditorError {
                message: format!("Failed to execute editor command: {}", e),
            })?;

        if !status.success() {
            return Err(NovaError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }

    fn spawn_quick_action(&self, label: &'static str, action: QuickAction, input: String) {
        let workspace = self.workspace.handle();
        spawn_assistant(label, async move { workspace.quick_action(action, &input).await });
    }
}

/// Runs an assistant call in the background and prints the reply
fn spawn_assistant<F>(label: &'static str, fut: F)
where
    F: Future<Output = Result<Option<ChatMessage>>> + Send + 'static,
{
    tokio::spawn(async move {
        match fut.await {
            Ok(Some(message)) => {
                println!();
                print_message(&message);
            }
            Ok(None) => println!("\n{}: nothing to work with", label),
            Err(NovaError::Canceled) => println!("\n{} canceled", label),
            Err(e) => eprintln!("\n{} {}: {}", style("error:").red().bold(), label, e),
        }
    });
}

/// Runs a title or cover generation in the background
fn spawn_editor_task<F>(label: &'static str, fut: F)
where
    F: Future<Output = Result<Option<String>>> + Send + 'static,
{
    tokio::spawn(async move {
        match fut.await {
            Ok(Some(value)) => println!("\n{} updated: {}", label, value),
            Ok(None) => println!("\n{} unchanged", label),
            Err(NovaError::Canceled) => println!("\n{} generation canceled", label),
            Err(e) => eprintln!("\n{} {}: {}", style("error:").red().bold(), label, e),
        }
    });
}

fn print_message(message: &ChatMessage) {
    let who = match message.role {
        Role::User => style("you").cyan().bold(),
        Role::Assistant => style("nova").magenta().bold(),
    };
    println!("{} {}", who, style(format_time(&message.timestamp)).dim());
    println!("{}", wrap_text(&message.text, term_width().saturating_sub(2).max(20)));
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

fn process_editor_content(content: &str) -> String {
    // Remove HTML comments from content
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("<!--") || !line.trim_end().ends_with("-->"))
        .collect::<Vec<&str>>()
        .join("\n")
}
