//! Command-line client for an inkdraft document store.

mod file_surface;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use file_surface::FileSurface;
use inkdraft_client::{
    spawn_editor, DocumentSummary, EditorOptions, ExportPipeline, HttpGateway,
    PersistenceGateway,
};
use inkdraft_core::export::print::{Margins, Orientation, PageSize, PrintOptions};
use inkdraft_core::export::ExportFormat;
use inkdraft_core::models::document::{Collaborator, Document, SaveDocumentRequest};
use inkdraft_core::{Config, Delta, DocumentSnapshot, Notification, SessionState};
use serde_json::{json, Value};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "inkdraft_core=info,inkdraft_client=info,inkdraft_cli=info";

#[derive(Parser)]
#[command(name = "inkdraft", about = "inkdraft document CLI", version)]
struct Cli {
    /// Document store API base URL (can also be set via INKDRAFT_SERVER)
    #[arg(short, long, env = "INKDRAFT_SERVER")]
    server: Option<String>,

    /// Bearer token for the document store
    #[arg(long, env = "INKDRAFT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Accept self-signed TLS certificates
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Create a document from a file or stdin
    New {
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        /// Treat the input as delta JSON instead of plain text
        #[arg(long)]
        delta: bool,
    },
    List,
    Get {
        id: String,
    },
    Delete {
        id: String,
    },
    /// Invite collaborators by email
    Invite {
        id: String,
        #[arg(required = true)]
        emails: Vec<String>,
    },
    /// Export a document to pdf, docx or html
    Export {
        id: String,
        #[arg(short, long, default_value = "pdf")]
        format: ExportFormat,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        #[arg(long, default_value = "a4")]
        page_size: PageSize,
        #[arg(long)]
        landscape: bool,
        /// Page margin in points
        #[arg(long, default_value_t = 36.0)]
        margin: f32,
    },
    /// Edit a document through a local plain-text file with autosave
    Edit {
        id: String,
        /// File mirroring the document text
        #[arg(short, long)]
        file: PathBuf,
        /// How often to check the file for changes, in milliseconds
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

fn explicit_override(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Environment config with command-line flags layered on top.
fn resolve_config(
    server: Option<String>,
    token: Option<String>,
    timeout: Option<u64>,
    insecure: bool,
) -> Config {
    let mut config = Config::from_env();
    if let Some(server) = explicit_override(server) {
        config.server_url = server;
    }
    if let Some(token) = explicit_override(token) {
        config.token = Some(token);
    }
    if let Some(timeout) = timeout {
        config.request_timeout_secs = timeout;
    }
    config.accept_invalid_certs |= insecure;
    config
}

fn format_list_output(documents: &[DocumentSummary], json: bool) -> Result<String> {
    if json {
        let rows: Vec<Value> = documents
            .iter()
            .map(|document| {
                json!({
                    "id": document.id,
                    "title": document.title,
                    "createdAt": document.created_at,
                })
            })
            .collect();
        return Ok(serde_json::to_string_pretty(&rows)?);
    }
    Ok(documents
        .iter()
        .map(|document| format!("{:<26} {}", document.id, document.title))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn format_get_output(document: &Document, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(&json!({
            "id": document.id,
            "title": document.title,
            "content": document.content,
            "createdAt": document.created_at,
            "collaborators": document.collaborators,
        }))?);
    }
    Ok(format!(
        "# {}\n\n{}",
        document.title,
        document.content.plain_text().trim_end()
    ))
}

fn format_invite_output(collaborators: &[Collaborator], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(collaborators)?);
    }
    Ok(collaborators
        .iter()
        .map(|collaborator| {
            format!(
                "{:<32} {:?} ({:?})",
                collaborator.email, collaborator.permission, collaborator.status
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Body of a new document from raw input.
fn new_document_request(
    input: &str,
    title: Option<&str>,
    as_delta: bool,
) -> Result<SaveDocumentRequest> {
    let content = if as_delta {
        let delta = Delta::parse(input).context("input is not valid delta JSON")?;
        if !delta.is_document() {
            bail!("delta input must contain only inserts");
        }
        delta
    } else if input.is_empty() {
        Delta::default_document()
    } else {
        Delta::from_plain_text(input)
    };
    Ok(SaveDocumentRequest::new(title.unwrap_or_default(), &content)?)
}

fn print_options(page_size: PageSize, landscape: bool, margin: f32) -> PrintOptions {
    PrintOptions {
        page_size,
        orientation: if landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        },
        margins: Margins::uniform(margin),
        ..PrintOptions::default()
    }
}

fn report(notification: &Notification) {
    if notification.is_error() {
        eprintln!("error: {}", notification.text());
    } else {
        eprintln!("{}", notification.text());
    }
}

async fn run_edit(
    gateway: Arc<HttpGateway>,
    config: &Config,
    id: String,
    file: PathBuf,
    poll: Duration,
) -> Result<()> {
    let editor = spawn_editor(gateway, id.clone(), EditorOptions::from_config(config));
    if editor.wait_loaded().await? == SessionState::Error {
        while let Ok(notification) = editor.evt_rx.try_recv() {
            report(&notification);
        }
        editor.shutdown().await?;
        bail!("could not open document {}", id);
    }

    let mut surface = FileSurface::new(&file);
    editor.attach_surface(&mut surface).await?;
    info!(doc_id = %id, file = %surface.path().display(), "editing; press Ctrl-C to finish");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(poll);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(err) = result {
                    warn!(error = %err, "could not listen for Ctrl-C");
                }
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = surface.poll() {
                    warn!(error = %err, "file poll failed");
                }
                while let Ok(notification) = editor.evt_rx.try_recv() {
                    report(&notification);
                }
            }
        }
    }

    // Pick up edits made since the last tick.
    if let Err(err) = surface.poll() {
        warn!(error = %err, "file poll failed");
    }
    let evt_rx = editor.evt_rx.clone();
    let outcome = editor.shutdown().await?;
    while let Ok(notification) = evt_rx.try_recv() {
        report(&notification);
    }
    if outcome.dirty {
        bail!(
            "revision {} of document {} was not saved",
            outcome.revision,
            id
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        server,
        token,
        json,
        timeout,
        insecure,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    init_tracing();
    let config = resolve_config(server, token, timeout, insecure);
    let gateway = HttpGateway::new(&config).context("configuring document store client")?;

    match command {
        Commands::Completions { .. } => {}
        Commands::New { file, title, delta } => {
            let input = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let request = new_document_request(&input, title.as_deref(), delta)?;
            let id = gateway.create(&request).await.context("New failed")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "id": id, "title": request.title }))?
                );
            } else {
                println!("Created: {} ({})", request.title, id);
            }
        }
        Commands::List => {
            let documents = gateway.list().await.context("List failed")?;
            let output = format_list_output(&documents, json)?;
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Commands::Get { id } => {
            let document = gateway.fetch(&id).await.context("Get failed")?;
            println!("{}", format_get_output(&document, json)?);
        }
        Commands::Delete { id } => {
            gateway.delete(&id).await.context("Delete failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&json!({ "deleted": id }))?);
            } else {
                println!("Deleted document: {}", id);
            }
        }
        Commands::Invite { id, emails } => {
            let collaborators = gateway
                .invite(&id, &emails)
                .await
                .context("Invite failed")?;
            println!("{}", format_invite_output(&collaborators, json)?);
        }
        Commands::Export {
            id,
            format,
            out,
            page_size,
            landscape,
            margin,
        } => {
            let document = gateway.fetch(&id).await.context("Export failed")?;
            let snapshot = DocumentSnapshot {
                id: document.id,
                title: document.title,
                content: document.content,
                revision: 0,
            };
            let (notifier, _notifications) = crossbeam_channel::unbounded();
            let pipeline = ExportPipeline::new(Arc::new(gateway), notifier, out)
                .with_print_options(print_options(page_size, landscape, margin));
            let path = pipeline
                .export(format, &snapshot)
                .await
                .with_context(|| format!("{} export failed", format.label()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&json!({ "path": path }))?);
            } else {
                println!("Exported {} to {}", format.label(), path.display());
            }
        }
        Commands::Edit { id, file, poll_ms } => {
            run_edit(
                Arc::new(gateway),
                &config,
                id,
                file,
                Duration::from_millis(poll_ms.max(50)),
            )
            .await?;
        }
    }

    Ok(())
}
