use {
    clap::{Parser, Subcommand},
    navigant_gateway::{
        auth::{Authenticator, TrustingAuthenticator},
        build_state, server, GatewayConfig,
    },
    std::sync::Arc,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "navigant-server", about = "Remote browser-automation control plane")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "NAVIGANT_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false, env = "NAVIGANT_JSON_LOGS")]
    json_logs: bool,

    /// Address to bind to (overrides NAVIGANT_BIND).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on for REST/WebSocket; gRPC listens on port + 1
    /// (overrides NAVIGANT_PORT).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Bearer/API-key value that is granted the `admin` role by the
    /// bundled trusting authenticator. Wire a real [`Authenticator`] via
    /// [`navigant_gateway::build_state`] for production deployments.
    #[arg(long, global = true, env = "NAVIGANT_ADMIN_KEY")]
    admin_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Serve,
    /// Load and print the effective configuration, then exit.
    Config,
}

fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true).with_thread_ids(false)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(false).with_ansi(true))
            .init();
    }
}

fn load_config(cli: &Cli) -> GatewayConfig {
    let mut config = GatewayConfig::from_env();
    if let Some(ref bind) = cli.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "navigant-server starting");

    match cli.command {
        None | Some(Commands::Serve) => run_server(cli).await,
        Some(Commands::Config) => {
            let config = load_config(&cli);
            println!("{config:#?}");
            Ok(())
        },
    }
}

async fn run_server(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli);

    let metrics_config = navigant_metrics::MetricsRecorderConfig {
        enabled: true,
        prefix: None,
        global_labels: Vec::new(),
    };
    let metrics = navigant_metrics::init_metrics(metrics_config).ok();

    let authenticator: Arc<dyn Authenticator> = Arc::new(TrustingAuthenticator {
        admin_key: cli.admin_key.clone(),
    });
    if authenticator_is_permissive(&cli) {
        tracing::warn!(
            "no NAVIGANT_ADMIN_KEY configured: every presented credential is trusted as its own \
             non-admin user. Wire a real Authenticator before exposing this gateway publicly."
        );
    }

    let state = build_state(config, authenticator, metrics);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("navigant-server: shutdown signal received");
    };
    server::serve(state, shutdown).await
}

fn authenticator_is_permissive(cli: &Cli) -> bool {
    cli.admin_key.is_none()
}
