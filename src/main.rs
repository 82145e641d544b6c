use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use configuration::{CacheBackend, Config};
use core_types::DateRange;
use tokio_util::sync::CancellationToken;
use web_server::service::parse_series;

/// The main entry point for the EtsyNova analytics backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = configuration::load_config()?;
    let _guard = configuration::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            web_server::run_server(config).await
        }
        Commands::Fetch(args) => handle_fetch(args, config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Shop analytics for Etsy sellers: KPIs, top listings, trends and funnel.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Fetch and aggregate one view, then print it as JSON.
    Fetch(FetchArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to bind, overriding `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding `server.port`.
    #[arg(long)]
    port: Option<u16>,

    /// Response cache backend, overriding `cache.backend`.
    #[arg(long, value_enum)]
    cache: Option<CacheBackend>,
}

impl ServeArgs {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(backend) = self.cache {
            config.cache.backend = backend;
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FetchKind {
    Shop,
    Listings,
    Trends,
    Funnel,
}

#[derive(Parser)]
struct FetchArgs {
    /// Which view to fetch.
    #[arg(value_enum)]
    kind: FetchKind,

    /// The Etsy shop id.
    #[arg(long)]
    shop_id: String,

    /// First day of the window (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the window (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// For `shop`: include deltas against the previous period.
    #[arg(long)]
    compare: bool,

    /// For `listings`: how many listings to request.
    #[arg(long, default_value_t = 50)]
    limit: u32,

    /// For `trends`: comma-separated series names.
    #[arg(long)]
    series: Option<String>,
}

// ==============================================================================
// Fetch Command Logic
// ==============================================================================

async fn handle_fetch(args: FetchArgs, config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let range = DateRange::new(args.from, args.to)?;

    let (metrics, _cache) = web_server::build_metrics_service(&config, CancellationToken::new()).await?;
    tracing::info!(kind = ?args.kind, shop_id = %args.shop_id, mock_mode = metrics.mode().is_mock(), "Fetching.");

    let output = match args.kind {
        FetchKind::Shop => {
            serde_json::to_value(metrics.shop_metrics(&args.shop_id, &range, args.compare).await?)?
        }
        FetchKind::Listings => serde_json::to_value(metrics.listings(&args.shop_id, &range, args.limit).await?)?,
        FetchKind::Trends => {
            let series = parse_series(args.series.as_deref());
            serde_json::to_value(metrics.trends(&args.shop_id, &range, &series).await?)?
        }
        FetchKind::Funnel => serde_json::to_value(metrics.funnel(&args.shop_id, &range).await?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
