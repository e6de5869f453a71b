//! ContentForge CLI - generate text and images from the terminal

mod client;
mod session;

use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{Parser, Subcommand};
use contentforge_core::auth::SignUpOutcome;
use contentforge_core::config::Config;
use contentforge_core::generate::{ImageRequest, TextRequest};
use contentforge_core::prompt::{IMAGE_TEMPLATES, TEXT_TEMPLATES, preview};
use contentforge_core::providers::GeneratedImage;
use contentforge_core::storage::{Generation, GenerationKind, NewGeneration};
use tracing::debug;

use client::ApiClient;
use session::SessionStore;

#[derive(Parser)]
#[command(name = "contentforge")]
#[command(author, version, about = "AI content studio for text and images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Server URL (overrides client.server_url)
    #[arg(long, global = true)]
    server: Option<String>,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Generate text from a prompt
    Text {
        prompt: String,
        /// Template key (content-creator, marketing, education, developer)
        #[arg(short, long)]
        template: Option<String>,
        /// Provider (huggingface, gemini, mistral)
        #[arg(short, long)]
        provider: Option<String>,
        /// Save the result to the gallery
        #[arg(long)]
        save: bool,
    },

    /// Generate an image from a prompt
    Image {
        prompt: String,
        /// Style name, e.g. Photorealistic or Minimalist
        #[arg(short, long)]
        style: Option<String>,
        /// Detail level from 0 to 100
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
        complexity: Option<u8>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Provider (huggingface, gemini)
        #[arg(short, long)]
        provider: Option<String>,
        /// Where to write the image (defaults to a timestamped file)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Save the result to the gallery
        #[arg(long)]
        save: bool,
    },

    /// Browse saved generations
    Gallery {
        #[command(subcommand)]
        action: GalleryAction,
    },

    /// Show prompt templates and styles
    Templates,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum GalleryAction {
    /// List saved generations, newest first
    List {
        /// Only text or only image
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show one generation
    Show { id: String },
    /// Delete a generation
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

/// Everything a command needs to talk to the server
struct App {
    config: Config,
    client: ApiClient,
    sessions: SessionStore,
    format: OutputFormat,
    quiet: bool,
}

impl App {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = Config::load()?;
        let server = cli
            .server
            .clone()
            .unwrap_or_else(|| config.client.server_url.clone());
        Ok(Self {
            client: ApiClient::new(&server)?,
            sessions: SessionStore::new(Config::config_dir()?),
            config,
            format: cli.format,
            quiet: cli.quiet,
        })
    }

    /// Client carrying the stored session, refreshed if close to expiry
    async fn authed_client(&self) -> anyhow::Result<ApiClient> {
        let session = self.sessions.fresh(&self.client, &self.config.auth).await?;
        debug!(signed_in = session.is_some(), server = self.client.base_url(), "Using server");
        Ok(self
            .client
            .clone()
            .with_access_token(session.map(|s| s.access_token)))
    }

    fn print_json(&self, value: &impl serde::Serialize) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("contentforge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        if let Some(suggestion) = e
            .downcast_ref::<contentforge_core::Error>()
            .and_then(|core| core.suggestion())
        {
            eprintln!("  Try: {}", suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Config { action } => return cmd_config(action, cli.quiet),
        Commands::Templates => return cmd_templates(cli.format),
        _ => {}
    }

    let ctx = App::new(&cli)?;
    match cli.command {
        Commands::Login { email, password } => cmd_login(&ctx, &email, &password).await,
        Commands::Signup { email, password } => cmd_signup(&ctx, &email, &password).await,
        Commands::Logout => cmd_logout(&ctx).await,
        Commands::Text {
            prompt,
            template,
            provider,
            save,
        } => cmd_text(&ctx, prompt, template, provider, save).await,
        Commands::Image {
            prompt,
            style,
            complexity,
            width,
            height,
            provider,
            out,
            save,
        } => {
            let request = ImageRequest {
                prompt: Some(prompt),
                style,
                complexity: complexity.map(f64::from),
                width,
                height,
                provider,
            };
            cmd_image(&ctx, request, out, save).await
        }
        Commands::Gallery { action } => cmd_gallery(&ctx, action).await,
        Commands::Templates | Commands::Config { .. } => Ok(()),
    }
}

async fn cmd_login(ctx: &App, email: &str, password: &str) -> anyhow::Result<()> {
    let session = ctx.client.sign_in(email, password).await?;
    ctx.sessions.save(&session)?;
    if !ctx.quiet {
        println!(
            "Signed in as {}",
            session.user.email.as_deref().unwrap_or(&session.user.id)
        );
    }
    Ok(())
}

async fn cmd_signup(ctx: &App, email: &str, password: &str) -> anyhow::Result<()> {
    match ctx.client.sign_up(email, password).await? {
        SignUpOutcome::Session(session) => {
            ctx.sessions.save(&session)?;
            if !ctx.quiet {
                println!("Account created. Signed in as {}", email);
            }
        }
        SignUpOutcome::ConfirmationRequired { .. } => {
            println!("Account created. Check {} to confirm it, then run `contentforge login`.", email);
        }
    }
    Ok(())
}

async fn cmd_logout(ctx: &App) -> anyhow::Result<()> {
    if let Some(session) = ctx.sessions.load()? {
        let client = ctx
            .client
            .clone()
            .with_access_token(Some(session.access_token));
        if let Err(e) = client.sign_out().await {
            tracing::warn!(error = %e, "Server sign-out failed; clearing local session anyway");
        }
    }

    let removed = ctx.sessions.clear()?;
    if !ctx.quiet {
        if removed {
            println!("Signed out.");
        } else {
            println!("Not signed in.");
        }
    }
    Ok(())
}

async fn cmd_text(
    ctx: &App,
    prompt: String,
    template: Option<String>,
    provider: Option<String>,
    save: bool,
) -> anyhow::Result<()> {
    let client = ctx.authed_client().await?;
    let template = template.unwrap_or_else(|| ctx.config.text.default_template.clone());

    let request = TextRequest {
        prompt: Some(prompt.clone()),
        template: Some(template.clone()),
        provider,
    };
    let text = client.generate_text(&request).await?;

    let saved = if save {
        let new = NewGeneration::text(prompt, text.clone()).with_template(template);
        Some(client.save_generation(&new).await?)
    } else {
        None
    };

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&serde_json::json!({
            "text": text,
            "saved": saved.as_ref().map(|g| &g.id),
        }))?,
        OutputFormat::Text => {
            println!("{}", text);
            if let (Some(g), false) = (saved, ctx.quiet) {
                eprintln!("Saved to gallery as {}", g.id);
            }
        }
    }
    Ok(())
}

async fn cmd_image(
    ctx: &App,
    request: ImageRequest,
    out: Option<PathBuf>,
    save: bool,
) -> anyhow::Result<()> {
    let client = ctx.authed_client().await?;
    let data_url = client.generate_image(&request).await?;
    let image = decode_data_url(&data_url)?;

    let path = out.unwrap_or_else(|| default_image_path(&image));
    std::fs::write(&path, &image.bytes)
        .with_context(|| format!("Failed to write image: {}", path.display()))?;

    let saved = if save {
        let mut new = NewGeneration::image(request.prompt.clone().unwrap_or_default(), data_url);
        if let Some(style) = &request.style {
            new = new.with_style(style.clone());
        }
        if let Some(complexity) = request.complexity {
            new = new.with_complexity(complexity.round() as i32);
        }
        Some(client.save_generation(&new).await?)
    } else {
        None
    };

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&serde_json::json!({
            "path": path,
            "mimeType": image.mime_type,
            "bytes": image.bytes.len(),
            "saved": saved.as_ref().map(|g| &g.id),
        }))?,
        OutputFormat::Text => {
            if !ctx.quiet {
                println!("Wrote {} ({} bytes)", path.display(), image.bytes.len());
                if let Some(g) = saved {
                    println!("Saved to gallery as {}", g.id);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_gallery(ctx: &App, action: GalleryAction) -> anyhow::Result<()> {
    let client = ctx.authed_client().await?;
    match action {
        GalleryAction::List { kind, limit } => {
            let kind = kind
                .map(|k| {
                    GenerationKind::parse(&k)
                        .ok_or_else(|| anyhow!("Unknown type '{}'. Use text or image.", k))
                })
                .transpose()?;
            let generations = client.list_generations(kind, limit).await?;

            if ctx.format == OutputFormat::Json {
                return ctx.print_json(&generations);
            }
            if generations.is_empty() {
                println!("No saved generations.");
                return Ok(());
            }
            for g in &generations {
                println!(
                    "{}  {:<5}  {}  {}",
                    g.id,
                    g.kind,
                    g.created_at.format("%Y-%m-%d %H:%M"),
                    preview(&g.prompt, 60)
                );
            }
        }
        GalleryAction::Show { id } => {
            let generation = client.get_generation(&id).await?;
            if ctx.format == OutputFormat::Json {
                return ctx.print_json(&generation);
            }
            print_generation(&generation);
        }
        GalleryAction::Delete { id } => {
            client.delete_generation(&id).await?;
            if !ctx.quiet {
                println!("Deleted {}", id);
            }
        }
    }
    Ok(())
}

fn print_generation(g: &Generation) {
    println!("{} ({})", g.id, g.kind);
    println!("  Created: {}", g.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Prompt: {}", g.prompt);
    if let Some(template) = &g.template {
        println!("  Template: {}", template);
    }
    if let Some(style) = &g.style {
        println!("  Style: {}", style);
    }
    if let Some(complexity) = g.complexity {
        println!("  Complexity: {}", complexity);
    }
    match g.kind {
        GenerationKind::Text => println!("\n{}", g.output),
        GenerationKind::Image => println!("  Image: {}", preview(&g.output, 48)),
    }
}

fn cmd_templates(format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&contentforge_core::prompt::catalog())?
        );
        return Ok(());
    }

    println!("Text templates:");
    for t in TEXT_TEMPLATES {
        println!("  {:<16} {}", t.key, t.description);
    }
    println!("\nImage templates:");
    for t in IMAGE_TEMPLATES {
        println!("  {:<16} {}", t.key, t.description);
        println!("  {:<16} styles: {}", "", t.styles.join(", "));
    }
    Ok(())
}

fn cmd_config(action: &ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}

/// Split a `data:<mime>;base64,<payload>` URL
fn decode_data_url(url: &str) -> anyhow::Result<GeneratedImage> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("Server returned an image that is not a data URL"))?;
    let (mime_type, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| anyhow!("Image data URL is not base64 encoded"))?;
    let bytes = BASE64
        .decode(payload)
        .context("Failed to decode image data")?;
    if bytes.is_empty() {
        bail!("Server returned an empty image");
    }
    Ok(GeneratedImage {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

fn default_image_path(image: &GeneratedImage) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("contentforge-{}.{}", stamp, image.extension()))
}

#[cfg(test)]
mod main_tests;
