//! NoteHub CLI: share and manage notes from the command line.
//!
//! Reads backend settings from the environment (see `Config::from_env`) and
//! signs in with NOTEHUB_EMAIL and NOTEHUB_PASSWORD.

use anyhow::Context;
use clap::{Parser, Subcommand};
use notehub_cli::{init_tracing, note_line};
use notehub_core::models::{FileReference, NoteFilters, NoteMetadata, NoteUpdate};
use notehub_core::{Config, ErrorMetadata, NoteError};
use notehub_upload::{NoteCoordinator, SupabaseSession};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "notehub", about = "NoteHub notes CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct NoteFields {
    /// Note title
    #[arg(long)]
    title: Option<String>,
    /// Subject, e.g. "Physics"
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    semester: Option<String>,
    #[arg(long)]
    branch: Option<String>,
    /// Tag; repeat for several
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl NoteFields {
    fn into_metadata(self) -> anyhow::Result<NoteMetadata> {
        let title = self.title.context("--title is required")?;
        let subject = self.subject.context("--subject is required")?;
        let mut metadata = NoteMetadata::new(title, subject).with_tags(self.tags);
        metadata.description = self.description;
        metadata.semester = self.semester;
        metadata.branch = self.branch;
        Ok(metadata)
    }

    fn into_update(self) -> NoteUpdate {
        NoteUpdate {
            title: self.title,
            subject: self.subject,
            description: self.description,
            semester: self.semester,
            branch: self.branch,
            tags: (!self.tags.is_empty()).then_some(self.tags),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF or image and create a note for it
    Upload {
        /// Path or URL of the file
        file: String,
        /// Override the detected content type
        #[arg(long)]
        content_type: Option<String>,
        #[command(flatten)]
        fields: NoteFields,
    },
    /// Change a note's details, optionally replacing its file
    Update {
        id: Uuid,
        /// Replacement file
        #[arg(long)]
        file: Option<String>,
        #[command(flatten)]
        fields: NoteFields,
    },
    /// Delete one of your notes and its file
    Delete { id: Uuid },
    /// Download a note's file
    Download {
        id: Uuid,
        /// Where to write the file
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Like a note
    Like { id: Uuid },
    /// Show a single note
    Get { id: Uuid },
    /// List notes, newest first
    List {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Search title and description
        #[arg(long)]
        search: Option<String>,
        /// Only your own notes
        #[arg(long)]
        mine: bool,
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Most liked notes
    Trending {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn file_reference(file: String, content_type: Option<String>) -> FileReference {
    let reference = FileReference::from_uri(file);
    match content_type {
        Some(ct) => reference.with_content_type(ct),
        None => reference,
    }
}

/// Print the user-facing message for a note error and keep the details in the log.
fn report(err: NoteError) -> anyhow::Error {
    tracing::debug!(error = %err, code = err.error_code(), "Command failed");
    anyhow::anyhow!("{} ({})", err.user_message(), err.error_code())
}

async fn connect() -> anyhow::Result<NoteCoordinator> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    let session = Arc::new(SupabaseSession::from_config(&config).map_err(report)?);
    let email = std::env::var("NOTEHUB_EMAIL").context("NOTEHUB_EMAIL not set")?;
    let password = std::env::var("NOTEHUB_PASSWORD").context("NOTEHUB_PASSWORD not set")?;
    session
        .sign_in_with_password(&email, &password)
        .await
        .map_err(report)?;

    NoteCoordinator::from_config(&config, session)
        .await
        .map_err(report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let notes = connect().await?;

    match cli.command {
        Commands::Upload {
            file,
            content_type,
            fields,
        } => {
            let metadata = fields.into_metadata()?;
            let note = notes
                .create_note_with_file(metadata, file_reference(file, content_type))
                .await
                .map_err(report)?;
            print_json(&note)?;
        }
        Commands::Update { id, file, fields } => {
            let patch = fields.into_update();
            let note = match file {
                Some(file) => notes
                    .update_note_with_file(id, patch, file_reference(file, None))
                    .await,
                None => notes.update_note(id, patch).await,
            }
            .map_err(report)?;
            print_json(&note)?;
        }
        Commands::Delete { id } => {
            notes.delete_note(id).await.map_err(report)?;
            print_json(&serde_json::json!({ "success": true, "message": format!("Note {} deleted", id) }))?;
        }
        Commands::Download { id, output } => {
            let data = notes.download_note_file(id).await.map_err(report)?;
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&serde_json::json!({ "path": output, "size_bytes": data.len() }))?;
        }
        Commands::Like { id } => {
            let likes = notes.like_note(id).await.map_err(report)?;
            print_json(&serde_json::json!({ "id": id, "likes": likes }))?;
        }
        Commands::Get { id } => {
            let note = notes.get_note(id).await.map_err(report)?;
            print_json(&note)?;
        }
        Commands::List {
            subject,
            branch,
            semester,
            tags,
            search,
            mine,
            limit,
        } => {
            let listed = if mine {
                notes.my_notes().await
            } else {
                let filters = NoteFilters {
                    subject,
                    branch,
                    semester,
                    tags,
                    search,
                    ..Default::default()
                };
                notes.list_notes(&filters, Some(limit)).await
            }
            .map_err(report)?;
            for note in &listed {
                println!("{}", note_line(note));
            }
        }
        Commands::Trending { limit } => {
            let trending = notes.trending_notes(limit).await.map_err(report)?;
            for note in &trending {
                println!("{}", note_line(note));
            }
        }
    }

    Ok(())
}
