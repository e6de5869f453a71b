//! ContentForge server binary

use anyhow::Context;
use clap::Parser;
use contentforge_core::auth::AuthClient;
use contentforge_core::prelude::*;
use contentforge_core::storage::open_store;
use contentforge_server::{AppState, serve};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "contentforge-server")]
#[command(author, version, about = "ContentForge HTTP API", long_about = None)]
struct Args {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Require a bearer token on generation and gallery routes
    #[arg(long)]
    require_auth: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("contentforge=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if args.require_auth {
        config.auth.require_auth = true;
    }
    let credentials = Credentials::from_env()?;

    let registry = ProviderRegistry::from_config(&config.providers, &credentials)?;
    for kind in ProviderKind::ALL {
        if credentials.api_key(kind).is_none() {
            warn!(
                provider = %kind,
                env = kind.credential_env(),
                "No API key set; requests to this provider will fail"
            );
        }
    }

    let store = open_store(&config, &credentials)
        .await
        .context("Failed to open generation store")?;

    let auth = match credentials.supabase.as_ref() {
        Some(supabase) => Some(AuthClient::new(supabase)?),
        None => {
            if config.auth.require_auth {
                anyhow::bail!("auth.require_auth is on but Supabase credentials are not set");
            }
            warn!("Supabase credentials not set; auth routes are disabled");
            None
        }
    };

    info!(
        storage = store.backend(),
        require_auth = config.auth.require_auth,
        "Starting ContentForge server"
    );

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let generator = Generator::new(registry, &config);
    let state = AppState::new(generator, store, auth, &config);

    serve(&format!("{}:{}", host, port), state).await
}
