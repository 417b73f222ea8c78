//! marketmind-cli: client for the MarketMind content service
//!
//! Keeps the active content id in a small state file between invocations and
//! talks to `marketmind-server` over HTTP.
//!
//! # Subcommands
//! - `id show | set <id> | set --example | clear`: manage the active content id
//! - `load <type>`                                : print a stored record
//! - `save <type> <file>`                         : store a JSON file as a record
//! - `clear`                                      : delete every stored record
//! - `list [--type <type>]`                       : list stored records
//! - `generate <product>`                         : run a generation session
//! - `chat <persona> <message>`                   : talk to one persona
//! - `group-chat <message>`                       : ask every persona at once
//! - `heatmap <image> <persona>`                  : persona heatmap of an image
//! - `status`                                     : show server health

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use clap::{Parser, Subcommand};
use marketmind_core::{ContentId, ContentIdStore, ContentType, FileIdPersistence, MarketMindConfig};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8767";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "marketmind-cli",
    version,
    about = "MarketMind content service client"
)]
struct Cli {
    /// MarketMind HTTP server URL (overrides MARKETMIND_HTTP_URL env var)
    #[arg(long, env = "MARKETMIND_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Config file; only the [client] section is used
    #[arg(long, default_value = "marketmind.toml")]
    config: String,

    /// Active content id file (overrides the config value)
    #[arg(long, env = "MARKETMIND_ID_FILE")]
    id_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show or change the active content id
    Id {
        #[command(subcommand)]
        action: IdAction,
    },

    /// Print a stored record as JSON
    Load {
        /// campaigns, personas, market-research, executive-brief or gtm-plan
        content_type: ContentType,

        /// Content id to use instead of the active one
        #[arg(long)]
        id: Option<String>,
    },

    /// Store a JSON file as a record
    Save {
        content_type: ContentType,
        file: PathBuf,

        #[arg(long)]
        id: Option<String>,
    },

    /// Delete every stored record
    Clear,

    /// List stored records
    List {
        #[arg(long = "type")]
        content_type: Option<ContentType>,
    },

    /// Generate a new content bundle and make it the active one
    Generate {
        /// Product description
        product: String,

        /// Company description
        #[arg(long)]
        company: Option<String>,

        /// Delete all stored content first
        #[arg(long)]
        reset: bool,
    },

    /// Chat with one persona of the active content
    Chat { persona: String, message: String },

    /// Send one message to every persona of the active content
    GroupChat { message: String },

    /// Analyze how a persona would view an image
    Heatmap { image: PathBuf, persona: String },

    /// Show MarketMind server status
    Status,
}

#[derive(Debug, Subcommand)]
enum IdAction {
    /// Print the active content id
    Show,

    /// Make an id the active one
    Set {
        id: Option<String>,

        /// Use the preset example content instead
        #[arg(long, conflicts_with = "id")]
        example: bool,
    },

    /// Forget the active content id
    Clear,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub content_type: String,
    pub content_id: String,
    pub size_bytes: u64,
    pub modified_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse {
    pub records: Vec<RecordSummary>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub content_id: ContentId,
    pub saved: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PersonaReply {
    pub persona_name: String,
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupChatReply {
    pub responses: Vec<PersonaReply>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the id a command should act on. `None` means there is nothing to
/// load yet, which is not an error.
fn resolve_id(store: &ContentIdStore, explicit: Option<String>) -> anyhow::Result<Option<ContentId>> {
    match explicit {
        Some(raw) => Ok(Some(ContentId::new(raw)?)),
        None => Ok(store.get()),
    }
}

/// MIME type for an uploaded image, from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn http_client(timeout_secs: u64) -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Turn a non-2xx response into an error carrying the server's message.
fn check(resp: Response) -> anyhow::Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    let msg = body["error"].as_str().unwrap_or("unknown error").to_string();
    anyhow::bail!("server returned {}: {}", status, msg)
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn no_active_id() -> anyhow::Result<()> {
    eprintln!("No active content id. Run `marketmind-cli generate` or `marketmind-cli id set`.");
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn do_id(store: &ContentIdStore, action: IdAction) -> anyhow::Result<()> {
    match action {
        IdAction::Show => match store.get() {
            Some(id) => println!("{}", id),
            None => println!("(unset)"),
        },
        IdAction::Set { id, example } => {
            let id = match (id, example) {
                (_, true) => ContentId::example(),
                (Some(raw), false) => ContentId::new(raw)?,
                (None, false) => anyhow::bail!("provide an id or --example"),
            };
            store.set(id.clone())?;
            println!("Active content id: {}", id);
        }
        IdAction::Clear => {
            store.clear()?;
            println!("Active content id cleared");
        }
    }
    Ok(())
}

fn do_load(server: &str, id: &ContentId, content_type: ContentType) -> anyhow::Result<()> {
    let client = http_client(30)?;
    let resp = client
        .get(format!("{}/load", server))
        .query(&[("contentId", id.as_str()), ("contentType", content_type.as_str())])
        .send()?;
    let body: serde_json::Value = check(resp)?.json()?;
    print_json(&body)
}

fn do_save(
    server: &str,
    id: &ContentId,
    content_type: ContentType,
    file: &Path,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let client = http_client(30)?;
    let resp = client
        .post(format!("{}/save", server))
        .json(&serde_json::json!({
            "contentId": id,
            "contentType": content_type,
            "content": content,
        }))
        .send()?;
    check(resp)?;
    println!("Saved {}-{}.json", content_type, id);
    Ok(())
}

fn do_clear(server: &str) -> anyhow::Result<()> {
    let client = http_client(30)?;
    let resp = client.post(format!("{}/clear", server)).send()?;
    let body: serde_json::Value = check(resp)?.json()?;
    println!(
        "{} ({} removed)",
        body["message"].as_str().unwrap_or("Cleared"),
        body["removed"].as_u64().unwrap_or(0)
    );
    Ok(())
}

fn do_list(server: &str, content_type: Option<ContentType>) -> anyhow::Result<()> {
    let client = http_client(30)?;
    let mut req = client.get(format!("{}/list", server));
    if let Some(t) = content_type {
        req = req.query(&[("contentType", t.as_str())]);
    }
    let list: ListResponse = check(req.send()?)?.json()?;

    if list.count == 0 {
        eprintln!("No stored content");
        return Ok(());
    }
    for r in &list.records {
        println!(
            "{:<16} {:<24} {:>8} B  {}",
            r.content_type,
            r.content_id,
            r.size_bytes,
            r.modified_at.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn do_generate(
    server: &str,
    store: &ContentIdStore,
    product: &str,
    company: Option<String>,
    reset: bool,
) -> anyhow::Result<()> {
    // Generation runs five backend round trips; allow for slow models.
    let client = http_client(600)?;
    eprintln!("Generating content...");
    let resp = client
        .post(format!("{}/generate", server))
        .json(&serde_json::json!({
            "productInfo": product,
            "companyInfo": company,
            "reset": reset,
        }))
        .send()?;
    let report: GenerateResponse = check(resp)?.json()?;

    store.set(report.content_id.clone())?;
    println!("Active content id: {}", report.content_id);
    println!("Saved:  {}", report.saved.join(", "));
    if !report.failed.is_empty() {
        eprintln!("Failed: {}", report.failed.join(", "));
    }
    Ok(())
}

fn do_chat(server: &str, id: &ContentId, persona: &str, message: &str) -> anyhow::Result<()> {
    let client = http_client(120)?;
    let resp = client
        .post(format!("{}/chat", server))
        .json(&serde_json::json!({
            "contentId": id,
            "personaName": persona,
            "messages": [{"role": "user", "content": message}],
        }))
        .send()?;
    let body: serde_json::Value = check(resp)?.json()?;
    println!("{}: {}", persona, body["response"].as_str().unwrap_or(""));
    Ok(())
}

fn do_group_chat(server: &str, id: &ContentId, message: &str) -> anyhow::Result<()> {
    let client = http_client(300)?;
    let resp = client
        .post(format!("{}/group-chat", server))
        .json(&serde_json::json!({
            "contentId": id,
            "initialMessage": message,
        }))
        .send()?;
    let reply: GroupChatReply = check(resp)?.json()?;
    for r in &reply.responses {
        println!("{}: {}\n", r.persona_name, r.response);
    }
    Ok(())
}

fn do_heatmap(server: &str, image: &Path, persona: &str) -> anyhow::Result<()> {
    let bytes = std::fs::read(image)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    let client = http_client(300)?;
    let resp = client
        .post(format!("{}/heatmap", server))
        .json(&serde_json::json!({
            "image": encoded,
            "mimeType": mime_for_path(image),
            "persona": persona,
        }))
        .send()?;
    let body: serde_json::Value = check(resp)?.json()?;
    print_json(&body)
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let client = http_client(10)?;
    let url = format!("{}/health", server);

    match client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("MarketMind server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:           {}", body["version"].as_str().unwrap_or("?"));
            println!("Content dir:       {}", body["content_dir"].as_str().unwrap_or("?"));
        }
        Ok(r) => anyhow::bail!("server unhealthy (HTTP {})", r.status()),
        Err(e) => anyhow::bail!("cannot reach {}: {}", url, e),
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn run(cli: Cli) -> anyhow::Result<()> {
    let server = cli.server.trim_end_matches('/').to_string();
    let id_file = match cli.id_file {
        Some(path) => path,
        None => PathBuf::from(MarketMindConfig::load(&cli.config)?.client.id_file),
    };
    let store = ContentIdStore::initialize(FileIdPersistence::new(id_file))?;

    match cli.command {
        Commands::Id { action } => do_id(&store, action),
        Commands::Load { content_type, id } => match resolve_id(&store, id)? {
            Some(id) => do_load(&server, &id, content_type),
            None => no_active_id(),
        },
        Commands::Save {
            content_type,
            file,
            id,
        } => match resolve_id(&store, id)? {
            Some(id) => do_save(&server, &id, content_type, &file),
            None => no_active_id(),
        },
        Commands::Clear => do_clear(&server),
        Commands::List { content_type } => do_list(&server, content_type),
        Commands::Generate {
            product,
            company,
            reset,
        } => do_generate(&server, &store, &product, company, reset),
        Commands::Chat { persona, message } => match store.get() {
            Some(id) => do_chat(&server, &id, &persona, &message),
            None => no_active_id(),
        },
        Commands::GroupChat { message } => match store.get() {
            Some(id) => do_group_chat(&server, &id, &message),
            None => no_active_id(),
        },
        Commands::Heatmap { image, persona } => do_heatmap(&server, &image, &persona),
        Commands::Status => do_status(&server),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("marketmind-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
